use std::collections::BTreeSet;
use std::error::Error;
use std::fmt;

use log::warn;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{ToPrimitive, Zero};

use crate::rational;
use crate::State;

/// The output clock ceiling of the target device.
pub const MAX_SAMPLE_RATE: u64 = 1_000_000;

// matches the device resolution: durations are snapped to fractions no finer
// than a microsecond grid before the gcd fold
const MAX_DENOMINATOR: u64 = 1_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmptyPatternError;

impl fmt::Display for EmptyPatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("no channel has any segments, cannot infer a sample rate")
    }
}

impl Error for EmptyPatternError {}

/// The lowest integer rate in Hz that still represents every distinct
/// segment duration exactly: the reciprocal of the rational gcd of all
/// durations, clamped to `[1, MAX_SAMPLE_RATE]`.
///
/// The result depends only on the set of distinct durations, never on
/// channel order.
pub fn optimal_sample_rate(state: &State) -> Result<u64, EmptyPatternError> {
    let mut durations: BTreeSet<BigRational> = BTreeSet::new();
    let mut saw_segment = false;

    for channel in state.channels() {
        for segment in channel.segments() {
            saw_segment = true;
            if let Some(duration) =
                rational::from_float_limited(segment.seconds(), MAX_DENOMINATOR)
            {
                if duration.is_zero() {
                    warn!(
                        "a {}s segment on {} is below the rate inference resolution",
                        segment.seconds(),
                        channel.id()
                    );
                } else {
                    durations.insert(duration);
                }
            }
        }
    }

    let mut durations = durations.into_iter();
    let Some(first) = durations.next() else {
        if saw_segment {
            // every duration was too short to resolve, so ask for the
            // fastest clock the device has
            return Ok(MAX_SAMPLE_RATE);
        }
        return Err(EmptyPatternError);
    };

    let g = durations.fold(first, |acc, duration| {
        rational::rational_gcd(&acc, &duration)
    });

    let max = BigRational::from_integer(BigInt::from(MAX_SAMPLE_RATE));
    let rate = g.recip();
    if rate >= max {
        Ok(MAX_SAMPLE_RATE)
    } else {
        Ok(rate.to_integer().to_u64().unwrap_or(1).max(1))
    }
}
