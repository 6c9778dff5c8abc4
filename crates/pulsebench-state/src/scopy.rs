use std::error::Error;
use std::fmt;

use crate::encode::EncodedTable;
use crate::CHANNEL_COUNT;

// the decoder addresses these by position, not by label
const SAMPLE_COUNT_LINE: usize = 3;
const SAMPLE_RATE_LINE: usize = 4;
const DATA_START_LINE: usize = 8;

/// Free-text metadata for the table preamble. None of it is read back by
/// the decoder, which only cares about the fixed line positions of the
/// sample count and rate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableHeader {
    pub tool_version: String,
    pub exported_on: String,
    pub device: String,
    pub tool: String,
}

impl Default for TableHeader {
    fn default() -> Self {
        Self {
            tool_version: env!("CARGO_PKG_VERSION").to_owned(),
            exported_on: String::new(),
            device: "M2K".to_owned(),
            tool: "Logic Analyzer".to_owned(),
        }
    }
}

/// Writes the table in the logic analyzer's CSV layout: seven semicolon
/// metadata lines, a channel header line, then one line per sample with a
/// leading sample index.
pub fn table_to_string(table: &EncodedTable, header: &TableHeader) -> String {
    let mut lines = Vec::with_capacity(table.sample_count() + DATA_START_LINE);

    lines.push(format!(";Scopy version,{}", header.tool_version));
    lines.push(format!(";Exported on,{}", header.exported_on));
    lines.push(format!(";Device,{}", header.device));
    lines.push(format!(";Nr of samples,{}", table.sample_count()));
    lines.push(format!(";Sample rate,{}", table.sample_rate()));
    lines.push(format!(";Tool,{}", header.tool));
    lines.push(";Additional Information,".to_owned());

    let mut column_header = "Sample".to_owned();
    for column in 0..table.channels().len() {
        column_header.push_str(&format!(",Channel {column}"));
    }
    lines.push(column_header);

    for (index, row) in table.rows().enumerate() {
        let mut line = index.to_string();
        for &cell in row {
            line.push(',');
            line.push(char::from(b'0' + cell));
        }
        lines.push(line);
    }

    lines.join("\n") + "\n"
}

/// One packed integer per sample: bit `i` carries channel `i`'s level.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SampleBuffer {
    samples: Vec<u16>,
}

impl SampleBuffer {
    pub fn from_samples(samples: Vec<u16>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    pub fn bit(&self, sample: usize, channel: usize) -> Option<u8> {
        self.samples
            .get(sample)
            .map(|&value| ((value >> channel) & 1) as u8)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodeError {
    Format(String),
    LengthMismatch { declared: u64, parsed: u64 },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Format(message) => write!(f, "malformed sample table: {message}"),
            DecodeError::LengthMismatch { declared, parsed } => write!(
                f,
                "table declares {declared} samples but contains {parsed}"
            ),
        }
    }
}

impl Error for DecodeError {}

/// Parses a serialized table back into the bit-packed buffer the playback
/// device consumes, plus the declared sample rate.
///
/// This is the consistency gate before any hardware handoff: a table whose
/// data rows disagree with the declared sample count is rejected whole.
pub fn decode_table(text: &str) -> Result<(SampleBuffer, u64), DecodeError> {
    let mut declared = None;
    let mut sample_rate = None;
    let mut samples = Vec::new();

    for (index, line) in text.lines().enumerate() {
        if index == SAMPLE_COUNT_LINE {
            declared = Some(header_count(line, index)?);
        } else if index == SAMPLE_RATE_LINE {
            sample_rate = Some(header_count(line, index)?);
        } else if index >= DATA_START_LINE {
            samples.push(data_row(line, index)?);
        }
    }

    let declared = declared
        .ok_or_else(|| DecodeError::Format("the sample count line is missing".to_owned()))?;
    let sample_rate = sample_rate
        .ok_or_else(|| DecodeError::Format("the sample rate line is missing".to_owned()))?;

    if samples.len() as u64 != declared {
        return Err(DecodeError::LengthMismatch {
            declared,
            parsed: samples.len() as u64,
        });
    }

    Ok((SampleBuffer { samples }, sample_rate))
}

fn header_count(line: &str, index: usize) -> Result<u64, DecodeError> {
    let value = line.split(',').nth(1).ok_or_else(|| {
        DecodeError::Format(format!("line {} has no value field", index + 1))
    })?;

    value.trim().parse().map_err(|_| {
        DecodeError::Format(format!(
            "line {} should hold a number, got {value:?}",
            index + 1
        ))
    })
}

fn data_row(line: &str, index: usize) -> Result<u16, DecodeError> {
    let mut value = 0u16;

    // the first field repeats the sample index and carries no state
    for (channel, cell) in line.split(',').skip(1).enumerate() {
        if channel >= CHANNEL_COUNT {
            return Err(DecodeError::Format(format!(
                "line {} has more than {CHANNEL_COUNT} channel columns",
                index + 1
            )));
        }

        match cell.trim() {
            "0" => {}
            "1" => value |= 1 << channel,
            other => {
                return Err(DecodeError::Format(format!(
                    "line {} column {} should be 0 or 1, got {other:?}",
                    index + 1,
                    channel + 2
                )))
            }
        }
    }

    Ok(value)
}
