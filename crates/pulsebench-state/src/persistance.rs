use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ChannelId, Level, Segment, State, TimeUnit, CHANNEL_COUNT};

const FORMAT_VERSION: u32 = 1;

/// The on-disk shape of a pattern set. Deliberately decoupled from `State`
/// so loading can validate every field before anything is constructed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedState {
    version: u32,
    channels: Vec<PersistedChannel>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PersistedChannel {
    id: u8,
    segments: Vec<PersistedSegment>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PersistedSegment {
    level: Level,
    duration: f64,
    unit: TimeUnit,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PersistError {
    UnsupportedVersion(u32),
    UnknownChannel(u8),
    DuplicateChannel(u8),
    InvalidDuration {
        channel: u8,
        segment: usize,
        duration: f64,
    },
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::UnsupportedVersion(version) => {
                write!(f, "snapshot format version {version} is not supported")
            }
            PersistError::UnknownChannel(id) => {
                write!(f, "channel id {id} is outside the device's {CHANNEL_COUNT} channels")
            }
            PersistError::DuplicateChannel(id) => {
                write!(f, "channel id {id} appears more than once")
            }
            PersistError::InvalidDuration {
                channel,
                segment,
                duration,
            } => write!(
                f,
                "segment {segment} of channel {channel} has an invalid duration {duration}"
            ),
        }
    }
}

impl Error for PersistError {}

impl PersistedState {
    pub fn new_from_state(state: &State) -> Self {
        Self {
            version: FORMAT_VERSION,
            channels: state
                .channels()
                .map(|channel| PersistedChannel {
                    id: channel.id().index() as u8,
                    segments: channel
                        .segments()
                        .iter()
                        .map(|segment| PersistedSegment {
                            level: segment.level(),
                            duration: segment.duration(),
                            unit: segment.unit(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn to_state(&self) -> Result<State, PersistError> {
        if self.version != FORMAT_VERSION {
            return Err(PersistError::UnsupportedVersion(self.version));
        }

        let mut state = State::new();

        for channel in &self.channels {
            let id = ChannelId::new(channel.id)
                .ok_or(PersistError::UnknownChannel(channel.id))?;
            if state.channel(id).is_some() {
                return Err(PersistError::DuplicateChannel(channel.id));
            }

            let mut segments = Vec::with_capacity(channel.segments.len());
            for (index, segment) in channel.segments.iter().enumerate() {
                let segment = Segment::new(segment.level, segment.duration, segment.unit)
                    .ok_or(PersistError::InvalidDuration {
                        channel: channel.id,
                        segment: index,
                        duration: segment.duration,
                    })?;
                segments.push(segment);
            }

            state.set_channel_segments(id, segments);
        }

        state.clean();
        Ok(state)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ch(id: u8) -> ChannelId {
        ChannelId::new(id).unwrap()
    }

    fn example_state() -> State {
        let mut state = State::default();
        state.append_segment(
            ch(0),
            Segment::new(Level::High, 1.0, TimeUnit::Milliseconds).unwrap(),
        );
        state.append_segment(
            ch(0),
            Segment::new(Level::Low, 2.5, TimeUnit::Microseconds).unwrap(),
        );
        state.append_segment(
            ch(9),
            Segment::new(Level::High, 3.0, TimeUnit::Seconds).unwrap(),
        );
        state
    }

    #[test]
    fn round_trips_through_ron() {
        let state = example_state();

        let serialized = ron::to_string(&PersistedState::new_from_state(&state)).unwrap();
        let restored: PersistedState = ron::from_str(&serialized).unwrap();
        let restored = restored.to_state().unwrap();

        assert_eq!(restored.channel_count(), state.channel_count());
        for (restored, original) in restored.channels().zip(state.channels()) {
            assert_eq!(restored, original);
        }
        assert!(!restored.is_dirty());
    }

    #[test]
    fn unknown_versions_are_rejected() {
        let snapshot: PersistedState = ron::from_str("(version: 9, channels: [])").unwrap();

        assert_eq!(
            snapshot.to_state().unwrap_err(),
            PersistError::UnsupportedVersion(9)
        );
    }

    #[test]
    fn out_of_range_channels_are_rejected() {
        let snapshot: PersistedState =
            ron::from_str("(version: 1, channels: [(id: 16, segments: [])])").unwrap();

        assert_eq!(
            snapshot.to_state().unwrap_err(),
            PersistError::UnknownChannel(16)
        );
    }

    #[test]
    fn duplicate_channels_are_rejected() {
        let snapshot: PersistedState =
            ron::from_str("(version: 1, channels: [(id: 1, segments: []), (id: 1, segments: [])])")
                .unwrap();

        assert_eq!(
            snapshot.to_state().unwrap_err(),
            PersistError::DuplicateChannel(1)
        );
    }

    #[test]
    fn non_positive_durations_are_rejected() {
        let snapshot: PersistedState = ron::from_str(
            "(version: 1, channels: [(id: 0, segments: [(level: High, duration: -2.0, unit: Milliseconds)])])",
        )
        .unwrap();

        assert_eq!(
            snapshot.to_state().unwrap_err(),
            PersistError::InvalidDuration {
                channel: 0,
                segment: 0,
                duration: -2.0,
            }
        );
    }
}
