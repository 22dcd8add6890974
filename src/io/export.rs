//! CSV export for battery sweeps, dispatch traces and sample histories.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::recommend::{BatteryCandidate, RecommendationThresholds};
use crate::sim::dispatch::HourStep;
use crate::sim::types::EnergySample;

/// Column header of the battery sweep export.
const SWEEP_HEADER: &str = "added_kwh,total_kwh,yearly_benefit,investment_cost,payback_years,\
                            yearly_saved_import_kwh,yearly_export_delta_kwh,\
                            imported_kwh,exported_kwh,autonomy_pct,meaningful";

/// Column header of the hourly dispatch trace export.
const TRACE_HEADER: &str = "timestamp_ms,load_wh,pv_wh,net_wh,charge_input_wh,stored_wh,\
                            discharge_output_wh,drawn_wh,imported_wh,exported_wh,soc_wh";

/// Column header of the sample history export; matches the import columns.
const SAMPLE_HEADER: &str = "timestamp_ms,pv_wh,load_wh,soc_percent,grid_import_wh,\
                             grid_export_wh,battery_charge_wh,battery_discharge_wh";

fn optional(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_default()
}

/// Exports sweep candidates to a CSV file.
///
/// `meaningful` marks the rows that clear `thresholds`. A payback that never
/// happens is left empty.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_sweep_csv(
    candidates: &[BatteryCandidate],
    thresholds: &RecommendationThresholds,
    path: &Path,
) -> io::Result<()> {
    let file = File::create(path)?;
    write_sweep_csv(candidates, thresholds, io::BufWriter::new(file))
}

/// Writes sweep candidates as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_sweep_csv(
    candidates: &[BatteryCandidate],
    thresholds: &RecommendationThresholds,
    writer: impl Write,
) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(SWEEP_HEADER.split(',').map(str::trim))?;

    for c in candidates {
        let payback = if c.payback_years.is_finite() {
            format!("{:.2}", c.payback_years)
        } else {
            String::new()
        };
        wtr.write_record(&[
            format!("{:.1}", c.added_kwh),
            format!("{:.1}", c.total_kwh),
            format!("{:.4}", c.yearly_benefit),
            format!("{:.2}", c.investment_cost),
            payback,
            format!("{:.4}", c.yearly_saved_import_kwh),
            format!("{:.4}", c.yearly_export_delta_kwh),
            format!("{:.4}", c.imported_wh / 1000.0),
            format!("{:.4}", c.exported_wh / 1000.0),
            format!("{:.2}", c.autonomy_percent),
            c.is_meaningful(thresholds).to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports an hourly dispatch trace to a CSV file.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_trace_csv(steps: &[HourStep], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_trace_csv(steps, io::BufWriter::new(file))
}

/// Writes an hourly dispatch trace as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_trace_csv(steps: &[HourStep], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(TRACE_HEADER.split(',').map(str::trim))?;

    for s in steps {
        wtr.write_record(&[
            s.timestamp_ms.to_string(),
            format!("{:.4}", s.load_wh),
            format!("{:.4}", s.pv_wh),
            format!("{:.4}", s.net_wh),
            format!("{:.4}", s.charge_input_wh),
            format!("{:.4}", s.stored_wh),
            format!("{:.4}", s.discharge_output_wh),
            format!("{:.4}", s.drawn_wh),
            format!("{:.4}", s.imported_wh),
            format!("{:.4}", s.exported_wh),
            format!("{:.4}", s.soc_wh),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports samples in the importable CSV layout.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_samples_csv(samples: &[EnergySample], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_samples_csv(samples, io::BufWriter::new(file))
}

/// Writes samples as CSV to any writer. Missing values are left empty.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_samples_csv(samples: &[EnergySample], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(SAMPLE_HEADER.split(',').map(str::trim))?;

    for s in samples {
        wtr.write_record(&[
            s.timestamp_ms.to_string(),
            format!("{:.4}", s.pv_wh),
            format!("{:.4}", s.load_wh),
            optional(s.soc_percent),
            optional(s.grid_import_wh),
            optional(s.grid_export_wh),
            optional(s.battery_charge_wh),
            optional(s.battery_discharge_wh),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
