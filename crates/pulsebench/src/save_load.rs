use std::fs;
use std::path::Path;

use log::debug;

use pulsebench_state::persistance::PersistedState;
use pulsebench_state::scopy::{self, SampleBuffer, TableHeader};
use pulsebench_state::{encode, rate, State};

pub fn save(state: &State, filepath: &Path) -> anyhow::Result<()> {
    let persisted = PersistedState::new_from_state(state);

    let output = ron::ser::to_string_pretty(&persisted, ron::ser::PrettyConfig::default())?;
    fs::write(filepath, output)?;
    debug!("saved pattern snapshot to {}", filepath.display());

    Ok(())
}

pub fn load(filepath: &Path) -> anyhow::Result<State> {
    let content = fs::read_to_string(filepath)?;
    let deserialized: PersistedState = ron::from_str(&content)?;

    Ok(deserialized.to_state()?)
}

pub struct ExportSummary {
    pub sample_count: usize,
    pub sample_rate: u64,
}

/// Encodes the pattern set and writes the analyzer CSV table. When no rate
/// is given the optimal one is inferred from the pattern; either way the
/// summary reports the rate the table actually carries, which cyclic
/// encoding may have scaled up.
pub fn export(
    state: &State,
    filepath: &Path,
    sample_rate: Option<u64>,
    cyclic: bool,
) -> anyhow::Result<ExportSummary> {
    let sample_rate = match sample_rate {
        Some(sample_rate) => sample_rate,
        None => rate::optimal_sample_rate(state)?,
    };

    let table = encode::encode(state, sample_rate, cyclic)?;
    debug!(
        "encoded {} samples at {} Hz (cyclic: {cyclic})",
        table.sample_count(),
        table.sample_rate()
    );

    let header = TableHeader {
        exported_on: chrono::Local::now().format("%a %b %d/%m/%Y").to_string(),
        ..TableHeader::default()
    };
    fs::write(filepath, scopy::table_to_string(&table, &header))?;

    Ok(ExportSummary {
        sample_count: table.sample_count(),
        sample_rate: table.sample_rate(),
    })
}

/// Re-reads an exported table and decodes it the way the playback path
/// would, surfacing any inconsistency before a device ever sees the data.
pub fn check(filepath: &Path) -> anyhow::Result<(SampleBuffer, u64)> {
    let content = fs::read_to_string(filepath)?;

    Ok(scopy::decode_table(&content)?)
}
