use std::error::Error;
use std::fmt;
use std::time::Duration;

use pulsebench_state::scopy::SampleBuffer;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlanError {
    ZeroRate,
    CyclicLength(usize),
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::ZeroRate => f.write_str("playback needs a positive sample rate"),
            PlanError::CyclicLength(length) => write!(
                f,
                "cyclic playback needs a multiple of four samples, got {length}"
            ),
        }
    }
}

impl Error for PlanError {}

/// A validated buffer/rate pairing, the only shape the device boundary
/// accepts. Constructing one proves the buffer and rate are consistent:
/// cyclic replay requires the length to sit on a four sample boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybackPlan {
    buffer: SampleBuffer,
    sample_rate: u64,
    cyclic: bool,
}

impl PlaybackPlan {
    pub fn new(buffer: SampleBuffer, sample_rate: u64, cyclic: bool) -> Result<Self, PlanError> {
        if sample_rate == 0 {
            return Err(PlanError::ZeroRate);
        }
        if cyclic && buffer.len() % 4 != 0 {
            return Err(PlanError::CyclicLength(buffer.len()));
        }

        Ok(Self {
            buffer,
            sample_rate,
            cyclic,
        })
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    pub fn sample_rate(&self) -> u64 {
        self.sample_rate
    }

    pub fn cyclic(&self) -> bool {
        self.cyclic
    }

    /// Wall-clock time one pass through the buffer takes.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.buffer.len() as f64 / self.sample_rate as f64)
    }
}

/// What the digital output hardware has to offer. Session management
/// (opening the device, enabling channels) lives with the implementor; the
/// plan hands over a consistent buffer/rate pair and nothing else.
pub trait DigitalOutput {
    fn configure(&mut self, sample_rate: u64) -> anyhow::Result<()>;
    fn push(&mut self, plan: &PlaybackPlan) -> anyhow::Result<()>;
    fn stop(&mut self) -> anyhow::Result<()>;
}
