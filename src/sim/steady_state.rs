//! Fixed-point estimate of the battery charge at the start of the window.

use serde::Serialize;
use tracing::debug;

use super::battery_model::BatteryModel;
use super::dispatch::{DispatchParams, simulate};
use super::types::EnergySample;

/// Upper bound on simulation passes.
pub const STEADY_STATE_MAX_ITERATIONS: usize = 10;
/// Passes stop once start and end charge differ by less than this (Wh).
pub const STEADY_STATE_TOLERANCE_WH: f64 = 1.0;

/// Result of the steady-state search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SteadyStateEstimate {
    /// Starting charge to use (Wh), within `[0, capacity]`.
    pub initial_soc_wh: f64,
    /// Simulation passes performed.
    pub iterations: usize,
    /// Whether the tolerance was reached before the pass limit.
    pub converged: bool,
}

/// Finds a starting charge that the window itself reproduces at its end.
///
/// Starts from an empty battery and feeds each pass's ending charge into the
/// next pass, for at most [`STEADY_STATE_MAX_ITERATIONS`] passes.
pub fn estimate_initial_soc(
    samples: &[EnergySample],
    added_pv_percent: f64,
    capacity_wh: f64,
    model: &BatteryModel,
) -> SteadyStateEstimate {
    let capacity_wh = capacity_wh.max(0.0);
    let mut guess = 0.0;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < STEADY_STATE_MAX_ITERATIONS {
        iterations += 1;
        let params = DispatchParams {
            added_pv_percent,
            capacity_wh,
            initial_soc_wh: guess,
        };
        let end = simulate(samples, params, model).ending_state_of_charge_wh;
        let delta = (end - guess).abs();
        guess = end;
        if delta < STEADY_STATE_TOLERANCE_WH {
            converged = true;
            break;
        }
    }

    debug!(capacity_wh, iterations, converged, soc_wh = guess, "steady-state charge");

    SteadyStateEstimate {
        initial_soc_wh: guess.clamp(0.0, capacity_wh),
        iterations,
        converged,
    }
}
