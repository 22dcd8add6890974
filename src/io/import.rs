//! Sample history import from CSV or JSON.
//!
//! CSV files need a header row. Column names follow [`EnergySample`]'s
//! fields (or their short aliases); optional columns may be left out or left
//! empty. JSON files hold an array of sample objects. Either way the result
//! is sorted by timestamp.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::debug;

use crate::error::PlannerError;
use crate::sim::types::EnergySample;

/// Loads samples from `path`, choosing the format by file extension.
///
/// # Errors
///
/// Returns [`PlannerError::UnsupportedFormat`] for extensions other than
/// `.csv` and `.json`, or the underlying I/O or decode error.
pub fn load_samples(path: &Path) -> Result<Vec<EnergySample>, PlannerError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let samples = match ext.as_deref() {
        Some("csv") => read_samples_csv(BufReader::new(File::open(path)?))?,
        Some("json") => read_samples_json(BufReader::new(File::open(path)?))?,
        _ => return Err(PlannerError::UnsupportedFormat(path.to_path_buf())),
    };
    debug!(path = %path.display(), count = samples.len(), "samples loaded");
    Ok(samples)
}

/// Reads samples from CSV.
///
/// # Errors
///
/// Returns [`PlannerError::Csv`] on malformed rows or missing required
/// columns.
pub fn read_samples_csv(reader: impl Read) -> Result<Vec<EnergySample>, PlannerError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut samples = rdr
        .deserialize::<EnergySample>()
        .collect::<Result<Vec<_>, _>>()?;
    sort_by_timestamp(&mut samples);
    Ok(samples)
}

/// Reads samples from a JSON array.
///
/// # Errors
///
/// Returns [`PlannerError::Json`] if the document is not an array of
/// samples.
pub fn read_samples_json(reader: impl Read) -> Result<Vec<EnergySample>, PlannerError> {
    let mut samples: Vec<EnergySample> = serde_json::from_reader(reader)?;
    sort_by_timestamp(&mut samples);
    Ok(samples)
}

fn sort_by_timestamp(samples: &mut [EnergySample]) {
    samples.sort_by_key(|s| s.timestamp_ms);
}
