#![deny(clippy::all)]

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod chart;
pub mod encode;
pub mod persistance;
pub mod rate;
mod rational;
pub mod scopy;

pub const CHANNEL_COUNT: usize = 16;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(u8);

impl ChannelId {
    pub fn new(id: u8) -> Option<Self> {
        (id < CHANNEL_COUNT as u8).then_some(Self(id))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Channel {}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    pub fn bit(self) -> u8 {
        match self {
            Level::Low => 0,
            Level::High => 1,
        }
    }

    pub fn inverted(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
    Microseconds,
}

impl TimeUnit {
    pub fn factor(self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Milliseconds => 1e-3,
            TimeUnit::Microseconds => 1e-6,
        }
    }
}

/// One run of a digital pattern: hold `level` for `duration` of `unit`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    level: Level,
    duration: f64,
    unit: TimeUnit,
}

impl Segment {
    /// Returns `None` unless the duration is a finite positive number.
    pub fn new(level: Level, duration: f64, unit: TimeUnit) -> Option<Self> {
        (duration.is_finite() && duration > 0.0).then_some(Self {
            level,
            duration,
            unit,
        })
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    pub fn seconds(&self) -> f64 {
        self.duration * self.unit.factor()
    }

    pub fn inverted(&self) -> Self {
        Self {
            level: self.level.inverted(),
            ..*self
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    id: ChannelId,
    segments: Vec<Segment>,
}

impl Channel {
    fn new(id: ChannelId) -> Self {
        Self {
            id,
            segments: Vec::new(),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// An empty channel idles at low.
    pub fn last_level(&self) -> Level {
        self.segments
            .last()
            .map(|segment| segment.level())
            .unwrap_or(Level::Low)
    }

    /// Cumulative segment boundaries in seconds, starting at 0. One entry
    /// more than there are segments.
    pub fn timeline(&self) -> Vec<f64> {
        let mut times = Vec::with_capacity(self.segments.len() + 1);
        let mut at = 0.0;
        times.push(at);
        for segment in &self.segments {
            at += segment.seconds();
            times.push(at);
        }
        times
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertPlace {
    Above,
    Below,
}

/// All channels' segment sequences at a point in time. Channel order is
/// insertion order, which also fixes the column order of encoded tables.
#[derive(Clone, Debug)]
pub struct State {
    channels: Vec<Channel>,
    dirty: bool,
}

impl State {
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
            dirty: false,
        }
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> + '_ {
        self.channels.iter()
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|channel| channel.id == id)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Replaces the channel's whole segment list, creating the channel at the
    /// end of the insertion order if it wasn't part of the set yet.
    pub fn set_channel_segments(&mut self, id: ChannelId, segments: Vec<Segment>) {
        self.channel_entry(id).segments = segments;
        self.dirty = true;
    }

    pub fn append_segment(&mut self, id: ChannelId, segment: Segment) {
        self.channel_entry(id).segments.push(segment);
        self.dirty = true;
    }

    /// Replaces the segment at `index`, returning false if there is none.
    pub fn correct_segment(&mut self, id: ChannelId, index: usize, segment: Segment) -> bool {
        let channel = self.channel_entry(id);
        match channel.segments.get_mut(index) {
            Some(slot) => *slot = segment,
            None => return false,
        }

        self.dirty = true;
        true
    }

    /// Removes the segments at the given indices; out of range indices are
    /// ignored.
    pub fn delete_segments(&mut self, id: ChannelId, indices: &[usize]) {
        let channel = self.channel_entry(id);
        let mut indices = indices.to_vec();
        indices.sort_unstable();
        indices.dedup();

        let mut changed = false;
        for index in indices.into_iter().rev() {
            if index < channel.segments.len() {
                channel.segments.remove(index);
                changed = true;
            }
        }

        self.dirty |= changed;
    }

    /// Flips high and low on the segments at the given indices.
    pub fn invert_segments(&mut self, id: ChannelId, indices: &[usize]) {
        let channel = self.channel_entry(id);

        let mut changed = false;
        for &index in indices {
            if let Some(segment) = channel.segments.get_mut(index) {
                *segment = segment.inverted();
                changed = true;
            }
        }

        self.dirty |= changed;
    }

    /// Inserts `repeat` copies of `run` above or below the segment at `at`.
    pub fn insert_run(
        &mut self,
        id: ChannelId,
        at: usize,
        place: InsertPlace,
        run: &[Segment],
        repeat: usize,
    ) {
        if run.is_empty() || repeat == 0 {
            return;
        }

        let channel = self.channel_entry(id);
        let position = match place {
            InsertPlace::Above => at,
            InsertPlace::Below => at + 1,
        }
        .min(channel.segments.len());

        let repeated: Vec<Segment> = run
            .iter()
            .cycle()
            .take(run.len() * repeat)
            .copied()
            .collect();
        channel.segments.splice(position..position, repeated);
        self.dirty = true;
    }

    /// Overwrites `to` with a copy of `from`'s pattern.
    pub fn copy_channel(&mut self, from: ChannelId, to: ChannelId) -> bool {
        let Some(source) = self.channel(from).map(|channel| channel.segments.clone()) else {
            return false;
        };

        self.channel_entry(to).segments = source;
        self.dirty = true;
        true
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clean(&mut self) {
        self.dirty = false;
    }

    fn channel_entry(&mut self, id: ChannelId) -> &mut Channel {
        if let Some(index) = self.channels.iter().position(|channel| channel.id == id) {
            &mut self.channels[index]
        } else {
            self.channels.push(Channel::new(id));
            self.channels.last_mut().unwrap()
        }
    }
}

impl Default for State {
    /// The full device channel set, all empty.
    fn default() -> Self {
        let mut state = Self::new();
        for id in 0..CHANNEL_COUNT as u8 {
            state.channel_entry(ChannelId(id));
        }
        state.dirty = false;
        state
    }
}
