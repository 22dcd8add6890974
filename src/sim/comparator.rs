//! Base / PV-only / PV+battery scenario comparison.
//!
//! All three scenarios share one starting charge so that differences come
//! from the upgrade only. When the history has a measured state of charge the
//! first reading anchors every scenario; otherwise each scenario's own
//! steady-state charge is used.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use super::battery_model::BatteryModel;
use super::dispatch::{DispatchParams, measured_baseline, simulate};
use super::steady_state::estimate_initial_soc;
use super::types::{EnergySample, ScenarioResult, SimulationMode};

/// Where a scenario's starting charge came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialSocSource {
    /// First measured state-of-charge reading in the window.
    Measured,
    /// Fixed-point estimate from [`estimate_initial_soc`].
    SteadyState,
}

impl fmt::Display for InitialSocSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Measured => write!(f, "measured"),
            Self::SteadyState => write!(f, "steady state"),
        }
    }
}

/// One evaluated scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenarioRun {
    /// Energy totals.
    pub result: ScenarioResult,
    /// Measured or simulated.
    pub mode: SimulationMode,
    /// Battery capacity the scenario was evaluated with (Wh).
    pub capacity_wh: f64,
    /// PV increase applied (percent).
    pub added_pv_percent: f64,
    /// Starting charge, `None` for measured results.
    pub initial_soc_wh: Option<f64>,
}

impl ScenarioRun {
    /// Dispatch inputs that reproduce this run, `None` for measured results.
    pub fn dispatch_params(&self) -> Option<DispatchParams> {
        self.initial_soc_wh.map(|initial_soc_wh| DispatchParams {
            added_pv_percent: self.added_pv_percent,
            capacity_wh: self.capacity_wh,
            initial_soc_wh,
        })
    }
}

/// The three compared scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenarioSet {
    /// Current system as installed.
    pub base: ScenarioRun,
    /// PV increased, battery unchanged.
    pub pv_only: ScenarioRun,
    /// PV increased and battery enlarged.
    pub pv_plus_battery: ScenarioRun,
    /// How simulated starting charges were chosen.
    pub initial_soc_source: InitialSocSource,
}

/// Absolute starting charge from the first state-of-charge reading.
///
/// The percentage is clamped to 0..=100 and converted against the installed
/// capacity. Returns `None` when no sample carries a reading.
pub fn measured_initial_soc_wh(samples: &[EnergySample], base_capacity_wh: f64) -> Option<f64> {
    samples
        .iter()
        .find_map(|s| s.soc_percent)
        .map(|pct| pct.clamp(0.0, 100.0) / 100.0 * base_capacity_wh.max(0.0))
}

/// Simulates one scenario, anchored or at its own steady state.
pub fn run_simulated(
    samples: &[EnergySample],
    model: &BatteryModel,
    added_pv_percent: f64,
    capacity_wh: f64,
    anchor_soc_wh: Option<f64>,
) -> ScenarioRun {
    let initial_soc_wh = anchor_soc_wh.unwrap_or_else(|| {
        estimate_initial_soc(samples, added_pv_percent, capacity_wh, model).initial_soc_wh
    });
    let params = DispatchParams {
        added_pv_percent,
        capacity_wh,
        initial_soc_wh,
    };
    ScenarioRun {
        result: simulate(samples, params, model),
        mode: SimulationMode::Simulated,
        capacity_wh,
        added_pv_percent,
        initial_soc_wh: Some(initial_soc_wh),
    }
}

/// Evaluates the base, PV-only and PV+battery scenarios.
///
/// # Arguments
///
/// * `samples` - Complete-day history
/// * `model` - Inferred battery model
/// * `base_capacity_wh` - Installed battery capacity (Wh)
/// * `added_pv_percent` - PV increase for the upgraded scenarios
/// * `added_battery_kwh` - Battery increase for the PV+battery scenario
///
/// The base scenario uses measured grid totals when the history has them.
pub fn compare_scenarios(
    samples: &[EnergySample],
    model: &BatteryModel,
    base_capacity_wh: f64,
    added_pv_percent: f64,
    added_battery_kwh: f64,
) -> ScenarioSet {
    let anchor = measured_initial_soc_wh(samples, base_capacity_wh);
    let initial_soc_source = if anchor.is_some() {
        InitialSocSource::Measured
    } else {
        InitialSocSource::SteadyState
    };

    let base = match measured_baseline(samples) {
        Some(result) => ScenarioRun {
            result,
            mode: SimulationMode::Measured,
            capacity_wh: base_capacity_wh,
            added_pv_percent: 0.0,
            initial_soc_wh: None,
        },
        None => run_simulated(samples, model, 0.0, base_capacity_wh, anchor),
    };
    let pv_only = run_simulated(samples, model, added_pv_percent, base_capacity_wh, anchor);
    let upgraded_capacity_wh = base_capacity_wh + added_battery_kwh.max(0.0) * 1000.0;
    let pv_plus_battery =
        run_simulated(samples, model, added_pv_percent, upgraded_capacity_wh, anchor);

    debug!(
        base_mode = %base.mode,
        soc_source = %initial_soc_source,
        base_import_wh = base.result.imported_wh,
        pv_only_import_wh = pv_only.result.imported_wh,
        upgraded_import_wh = pv_plus_battery.result.imported_wh,
        "scenarios compared"
    );

    ScenarioSet {
        base,
        pv_only,
        pv_plus_battery,
        initial_soc_source,
    }
}
