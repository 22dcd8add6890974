//! Hour-by-hour battery dispatch.
//!
//! The [`Dispatcher`] replays samples in order: PV surplus charges the
//! battery (limited by power, headroom and efficiency) and the rest is
//! exported; deficits are served from the battery first and the rest is
//! imported. [`simulate`] runs a whole slice and returns the totals.

use serde::Serialize;

use super::battery_model::BatteryModel;
use super::types::{EnergySample, ScenarioResult};

/// Inputs of a single simulated scenario.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchParams {
    /// Extra PV as a percentage of the measured production.
    pub added_pv_percent: f64,
    /// Usable battery capacity (Wh).
    pub capacity_wh: f64,
    /// Stored energy before the first hour (Wh). Clamped to `[0, capacity]`.
    pub initial_soc_wh: f64,
}

impl DispatchParams {
    /// Multiplier applied to every PV sample.
    pub fn pv_factor(&self) -> f64 {
        1.0 + self.added_pv_percent / 100.0
    }
}

/// Energy flows of one simulated hour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HourStep {
    /// Start of the hour, Unix epoch milliseconds.
    pub timestamp_ms: i64,
    /// Household load (Wh).
    pub load_wh: f64,
    /// Scaled PV production (Wh).
    pub pv_wh: f64,
    /// PV minus load (Wh); positive is surplus.
    pub net_wh: f64,
    /// Energy taken from the surplus to charge (Wh).
    pub charge_input_wh: f64,
    /// Energy added to the battery after charge losses (Wh).
    pub stored_wh: f64,
    /// Energy delivered to the load by the battery (Wh).
    pub discharge_output_wh: f64,
    /// Energy removed from the battery, including discharge losses (Wh).
    pub drawn_wh: f64,
    /// Energy imported (Wh).
    pub imported_wh: f64,
    /// Energy exported (Wh).
    pub exported_wh: f64,
    /// Stored energy at the end of the hour (Wh).
    pub soc_wh: f64,
}

/// Stateful single-battery dispatcher.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    model: BatteryModel,
    pv_factor: f64,
    capacity_wh: f64,
    soc_wh: f64,
    total_load_wh: f64,
    total_pv_wh: f64,
    imported_wh: f64,
    exported_wh: f64,
}

impl Dispatcher {
    /// Creates a dispatcher.
    ///
    /// # Arguments
    ///
    /// * `params` - PV scaling, capacity and starting charge
    /// * `model` - Efficiency and power limits of the battery
    ///
    /// Negative capacity is treated as no battery; the starting charge is
    /// clamped into `[0, capacity]`.
    pub fn new(params: DispatchParams, model: BatteryModel) -> Self {
        let capacity_wh = params.capacity_wh.max(0.0);
        Self {
            model,
            pv_factor: params.pv_factor(),
            capacity_wh,
            soc_wh: params.initial_soc_wh.clamp(0.0, capacity_wh),
            total_load_wh: 0.0,
            total_pv_wh: 0.0,
            imported_wh: 0.0,
            exported_wh: 0.0,
        }
    }

    /// Current stored energy (Wh).
    pub fn soc_wh(&self) -> f64 {
        self.soc_wh
    }

    /// Advances one hour.
    pub fn step(&mut self, sample: &EnergySample) -> HourStep {
        let pv_wh = sample.pv_wh * self.pv_factor;
        let load_wh = sample.load_wh;
        let net_wh = pv_wh - load_wh;

        let mut charge_input_wh = 0.0;
        let mut stored_wh = 0.0;
        let mut discharge_output_wh = 0.0;
        let mut drawn_wh = 0.0;
        let mut imported_wh = 0.0;
        let mut exported_wh = 0.0;

        if net_wh > 0.0 {
            let eta_c = self.model.charge_efficiency;
            let room_wh = if eta_c > 0.0 {
                (self.capacity_wh - self.soc_wh).max(0.0) / eta_c
            } else {
                0.0
            };
            charge_input_wh = net_wh
                .min(self.model.max_charge_wh_per_hour.max(0.0))
                .min(room_wh);
            stored_wh = charge_input_wh * eta_c;
            self.soc_wh = (self.soc_wh + stored_wh).min(self.capacity_wh);
            exported_wh = net_wh - charge_input_wh;
        } else {
            let deficit_wh = -net_wh;
            let eta_d = self.model.discharge_efficiency;
            discharge_output_wh = deficit_wh
                .min(self.model.max_discharge_wh_per_hour.max(0.0))
                .min(self.soc_wh * eta_d);
            drawn_wh = if eta_d > 0.0 {
                discharge_output_wh / eta_d
            } else {
                0.0
            };
            self.soc_wh = (self.soc_wh - drawn_wh).max(0.0);
            imported_wh = deficit_wh - discharge_output_wh;
        }

        self.total_load_wh += load_wh;
        self.total_pv_wh += pv_wh;
        self.imported_wh += imported_wh;
        self.exported_wh += exported_wh;

        HourStep {
            timestamp_ms: sample.timestamp_ms,
            load_wh,
            pv_wh,
            net_wh,
            charge_input_wh,
            stored_wh,
            discharge_output_wh,
            drawn_wh,
            imported_wh,
            exported_wh,
            soc_wh: self.soc_wh,
        }
    }

    /// Totals accumulated so far.
    pub fn finish(&self) -> ScenarioResult {
        ScenarioResult::from_totals(
            self.total_load_wh,
            self.total_pv_wh,
            self.imported_wh,
            self.exported_wh,
            self.soc_wh,
        )
    }
}

/// Simulates `samples` in order and returns the scenario totals.
pub fn simulate(
    samples: &[EnergySample],
    params: DispatchParams,
    model: &BatteryModel,
) -> ScenarioResult {
    let mut dispatcher = Dispatcher::new(params, *model);
    for sample in samples {
        dispatcher.step(sample);
    }
    dispatcher.finish()
}

/// Like [`simulate`] but keeps every hour.
pub fn trace(
    samples: &[EnergySample],
    params: DispatchParams,
    model: &BatteryModel,
) -> Vec<HourStep> {
    let mut dispatcher = Dispatcher::new(params, *model);
    samples.iter().map(|s| dispatcher.step(s)).collect()
}

/// Sums the measured grid columns when any sample carries them.
///
/// Missing values count as zero and the ending charge is reported as 0.
/// Returns `None` when no sample has grid data.
pub fn measured_baseline(samples: &[EnergySample]) -> Option<ScenarioResult> {
    if !samples.iter().any(EnergySample::has_grid_flows) {
        return None;
    }
    let (load, pv, imported, exported) =
        samples
            .iter()
            .fold((0.0, 0.0, 0.0, 0.0), |(l, p, i, e), s| {
                (
                    l + s.load_wh,
                    p + s.pv_wh,
                    i + s.grid_import_wh.unwrap_or(0.0),
                    e + s.grid_export_wh.unwrap_or(0.0),
                )
            });
    Some(ScenarioResult::from_totals(load, pv, imported, exported, 0.0))
}
