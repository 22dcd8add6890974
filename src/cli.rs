//! Command-line arguments.

use std::path::PathBuf;

use chrono::DateTime;
use clap::Parser;
use solar_planner::config::PlannerConfig;
use solar_planner::sim::window::SimulationWindow;

#[derive(Debug, Parser)]
#[command(name = "solar-planner", version)]
#[command(about = "Replays household energy history to size PV and battery upgrades")]
#[command(
    long_about = "Replays hourly household energy history to compare the installed system\n\
    against a PV and battery upgrade, projects the yearly benefit and payback,\n\
    and recommends an additional battery size.\n\
    \nWithout --samples a seeded synthetic year is planned.\n\
    \nExamples:\n  \
    solar-planner --samples history.csv --pv-percent 30 --battery-kwh 5\n  \
    solar-planner --preset storage_upgrade --demo-days 180 --json\n  \
    solar-planner --config scenarios/pv_upgrade.toml --sweep-out sweep.csv"
)]
pub struct Cli {
    /// TOML planner configuration
    #[arg(long, conflicts_with = "preset")]
    pub config: Option<PathBuf>,

    /// Built-in preset (baseline, pv_upgrade, storage_upgrade)
    #[arg(long)]
    pub preset: Option<String>,

    /// Hourly history to plan from (.csv or .json)
    #[arg(long, env = "SOLAR_PLANNER_SAMPLES")]
    pub samples: Option<PathBuf>,

    /// Days of synthetic history when no --samples file is given
    #[arg(long, default_value_t = 365, conflicts_with = "samples")]
    pub demo_days: u32,

    /// Seed for the synthetic history
    #[arg(long, default_value_t = 42, conflicts_with = "samples")]
    pub seed: u64,

    /// Extra PV as a percentage of the current array
    #[arg(long)]
    pub pv_percent: Option<f64>,

    /// Extra battery capacity (kWh)
    #[arg(long)]
    pub battery_kwh: Option<f64>,

    /// History window to simulate
    #[arg(long, value_parser = parse_window)]
    pub window: Option<SimulationWindow>,

    /// Reference time for the window (RFC 3339); defaults to now for files
    /// and to the end of the history for synthetic data
    #[arg(long, value_parser = parse_rfc3339_ms)]
    pub now: Option<i64>,

    /// Write the battery sweep to CSV
    #[arg(long)]
    pub sweep_out: Option<PathBuf>,

    /// Write the hourly flows of the upgrade scenario to CSV
    #[arg(long)]
    pub trace_out: Option<PathBuf>,

    /// Write the planned history to CSV
    #[arg(long)]
    pub samples_out: Option<PathBuf>,

    /// Print the outcome as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    pub verbose: bool,

    /// Start the REST API server instead of planning once
    #[cfg(feature = "api")]
    #[arg(long)]
    pub serve: bool,

    /// API server port
    #[cfg(feature = "api")]
    #[arg(long, default_value_t = 3000)]
    pub port: u16,
}

impl Cli {
    /// Resolves the base configuration: `--config`, else `--preset`, else
    /// the baseline, with command-line overrides applied.
    pub fn planner_config(&self) -> anyhow::Result<PlannerConfig> {
        let mut config = match (&self.config, &self.preset) {
            (Some(path), _) => PlannerConfig::from_toml_file(path)?,
            (None, Some(name)) => PlannerConfig::from_preset(name)?,
            (None, None) => PlannerConfig::baseline(),
        };
        if let Some(pct) = self.pv_percent {
            config.scenario.added_pv_percent = pct;
        }
        if let Some(kwh) = self.battery_kwh {
            config.scenario.added_battery_kwh = kwh;
        }
        if let Some(window) = self.window {
            config.scenario.window = window;
        }
        Ok(config)
    }
}

fn parse_window(s: &str) -> Result<SimulationWindow, String> {
    s.parse()
}

fn parse_rfc3339_ms(s: &str) -> Result<i64, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.timestamp_millis())
        .map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}
