use std::error::Error;
use std::fmt;

use log::warn;

use crate::{Channel, ChannelId, Level, Segment, State};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidRateError(pub u64);

impl fmt::Display for InvalidRateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sample rate must be a positive number of hertz, got {}", self.0)
    }
}

impl Error for InvalidRateError {}

/// A rectangular sample-by-channel matrix of bits at a fixed rate. Column
/// order is the pattern set's channel insertion order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedTable {
    channels: Vec<ChannelId>,
    rows: Vec<Vec<u8>>,
    sample_rate: u64,
}

impl EncodedTable {
    pub fn sample_count(&self) -> usize {
        self.rows.len()
    }

    /// The effective rate. Cyclic encoding can scale this above the rate
    /// that was passed in, so downstream consumers must read it back from
    /// here.
    pub fn sample_rate(&self) -> u64 {
        self.sample_rate
    }

    pub fn channels(&self) -> &[ChannelId] {
        &self.channels
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn cell(&self, sample: usize, column: usize) -> Option<u8> {
        self.rows.get(sample).and_then(|row| row.get(column)).copied()
    }

    /// One channel's full bit sequence, top to bottom.
    pub fn column(&self, column: usize) -> Vec<u8> {
        self.rows
            .iter()
            .filter_map(|row| row.get(column).copied())
            .collect()
    }
}

fn segment_samples(segment: &Segment, sample_rate: u64) -> u64 {
    (segment.seconds() * sample_rate as f64) as u64
}

// Walks one channel's segments a sample at a time. Once the list is
// exhausted the cursor keeps answering with the last level it saw.
struct SegmentCursor<'a> {
    channel: ChannelId,
    segments: std::slice::Iter<'a, Segment>,
    level: Level,
    remaining: u64,
}

impl<'a> SegmentCursor<'a> {
    fn new(channel: &'a Channel) -> Self {
        Self {
            channel: channel.id(),
            segments: channel.segments().iter(),
            level: Level::Low,
            remaining: 0,
        }
    }

    fn next_sample(&mut self, sample_rate: u64) -> Level {
        while self.remaining == 0 {
            let Some(segment) = self.segments.next() else {
                break;
            };

            self.level = segment.level();
            self.remaining = segment_samples(segment, sample_rate);
            if self.remaining == 0 {
                warn!(
                    "a {}s segment on {} is shorter than one sample at {} Hz and is skipped",
                    segment.seconds(),
                    self.channel,
                    sample_rate
                );
            }
        }

        let level = self.level;
        self.remaining = self.remaining.saturating_sub(1);
        level
    }
}

/// Converts a pattern set into a sample table at `sample_rate`.
///
/// The longest channel fixes the row count before padding; shorter channels
/// hold their last level. In cyclic mode the row count is stretched onto a
/// multiple-of-four boundary by scaling count and rate together, so the
/// wall-clock duration is unchanged. In one-shot mode the table is padded
/// with all-low rows up to the next multiple of four, plus an extra four
/// quiescent rows when no padding would otherwise separate a high tail from
/// the end of the buffer.
pub fn encode(
    state: &State,
    sample_rate: u64,
    cyclic: bool,
) -> Result<EncodedTable, InvalidRateError> {
    if sample_rate == 0 {
        return Err(InvalidRateError(sample_rate));
    }
    let mut sample_rate = sample_rate;

    let mut raw_total = state
        .channels()
        .map(|channel| {
            channel
                .segments()
                .iter()
                .map(|segment| segment_samples(segment, sample_rate))
                .sum::<u64>()
        })
        .max()
        .unwrap_or(0);

    if cyclic {
        if raw_total % 4 == 0 {
            // already sits on a cyclic boundary
        } else if raw_total % 2 == 0 {
            raw_total *= 2;
            sample_rate *= 2;
        } else {
            raw_total *= 4;
            sample_rate *= 4;
        }
    }

    let mut total = (raw_total.div_ceil(4) * 4).max(4);

    // the device wants an all-low settling region after a one-shot run;
    // only add one when the rounding above didn't already create it
    if total == raw_total
        && !cyclic
        && state.channels().any(|channel| channel.last_level() != Level::Low)
    {
        total += 4;
    }

    let mut cursors: Vec<SegmentCursor> = state.channels().map(SegmentCursor::new).collect();

    let mut rows = Vec::with_capacity(total as usize);
    for _ in 0..raw_total {
        rows.push(
            cursors
                .iter_mut()
                .map(|cursor| cursor.next_sample(sample_rate).bit())
                .collect(),
        );
    }
    for _ in raw_total..total {
        rows.push(vec![0; cursors.len()]);
    }

    Ok(EncodedTable {
        channels: state.channels().map(Channel::id).collect(),
        rows,
        sample_rate,
    })
}
