//! Core data types shared by the simulation modules.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One clock hour of measured household energy flows.
///
/// `pv_wh` and `load_wh` are always present. The optional columns are only
/// available when the inverter reports them; the short keys used by the
/// dashboard export (`t`, `p`, `l`, `s`, `gi`, `ge`, `bc`, `bd`) are accepted
/// as aliases.
///
/// # Examples
///
/// ```
/// use solar_planner::sim::types::EnergySample;
///
/// let s = EnergySample::new(0, 1500.0, 400.0).with_soc(55.0);
/// assert_eq!(s.soc_percent, Some(55.0));
/// assert!(s.grid_import_wh.is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergySample {
    /// Start of the hour, Unix epoch milliseconds.
    #[serde(alias = "t")]
    pub timestamp_ms: i64,
    /// PV production during the hour (Wh).
    #[serde(alias = "p")]
    pub pv_wh: f64,
    /// Household consumption during the hour (Wh).
    #[serde(alias = "l")]
    pub load_wh: f64,
    /// Battery state of charge at the start of the hour (percent).
    #[serde(default, alias = "s")]
    pub soc_percent: Option<f64>,
    /// Energy imported from the grid (Wh).
    #[serde(default, alias = "gi")]
    pub grid_import_wh: Option<f64>,
    /// Energy exported to the grid (Wh).
    #[serde(default, alias = "ge")]
    pub grid_export_wh: Option<f64>,
    /// Energy flowing into the battery (Wh, positive).
    #[serde(default, alias = "bc")]
    pub battery_charge_wh: Option<f64>,
    /// Energy flowing out of the battery (Wh, positive).
    #[serde(default, alias = "bd")]
    pub battery_discharge_wh: Option<f64>,
}

impl EnergySample {
    /// Creates a sample with only PV and load measured.
    pub fn new(timestamp_ms: i64, pv_wh: f64, load_wh: f64) -> Self {
        Self {
            timestamp_ms,
            pv_wh,
            load_wh,
            soc_percent: None,
            grid_import_wh: None,
            grid_export_wh: None,
            battery_charge_wh: None,
            battery_discharge_wh: None,
        }
    }

    /// Attaches a measured state of charge.
    pub fn with_soc(mut self, soc_percent: f64) -> Self {
        self.soc_percent = Some(soc_percent);
        self
    }

    /// Attaches measured grid import and export.
    pub fn with_grid(mut self, import_wh: f64, export_wh: f64) -> Self {
        self.grid_import_wh = Some(import_wh);
        self.grid_export_wh = Some(export_wh);
        self
    }

    /// Attaches measured battery charge and discharge flows.
    pub fn with_battery_flows(mut self, charge_wh: f64, discharge_wh: f64) -> Self {
        self.battery_charge_wh = Some(charge_wh);
        self.battery_discharge_wh = Some(discharge_wh);
        self
    }

    /// Whether either grid flow column is present.
    pub fn has_grid_flows(&self) -> bool {
        self.grid_import_wh.is_some() || self.grid_export_wh.is_some()
    }

    /// Whether either battery flow column is present.
    pub fn has_battery_flows(&self) -> bool {
        self.battery_charge_wh.is_some() || self.battery_discharge_wh.is_some()
    }
}

/// How a scenario result was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationMode {
    /// Summed directly from measured grid flows.
    Measured,
    /// Produced by the dispatch simulator.
    Simulated,
}

impl fmt::Display for SimulationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Measured => write!(f, "measured"),
            Self::Simulated => write!(f, "simulated"),
        }
    }
}

/// Energy totals of one scenario over the whole sample window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Sum of household load (Wh).
    pub total_load_wh: f64,
    /// Sum of (scaled) PV production (Wh).
    pub total_pv_wh: f64,
    /// Energy drawn from the grid (Wh).
    pub imported_wh: f64,
    /// Energy fed into the grid (Wh).
    pub exported_wh: f64,
    /// Share of load served without grid import (percent).
    pub autonomy_percent: f64,
    /// Battery energy left after the last hour (Wh).
    pub ending_state_of_charge_wh: f64,
}

impl ScenarioResult {
    /// Builds a result from accumulated totals, deriving autonomy.
    pub fn from_totals(
        total_load_wh: f64,
        total_pv_wh: f64,
        imported_wh: f64,
        exported_wh: f64,
        ending_state_of_charge_wh: f64,
    ) -> Self {
        Self {
            total_load_wh,
            total_pv_wh,
            imported_wh,
            exported_wh,
            autonomy_percent: autonomy_percent(total_load_wh, imported_wh),
            ending_state_of_charge_wh,
        }
    }
}

/// `100 × (1 − imported/load)`, or 0 when there was no load.
pub fn autonomy_percent(total_load_wh: f64, imported_wh: f64) -> f64 {
    if total_load_wh > 0.0 {
        100.0 * (1.0 - imported_wh / total_load_wh)
    } else {
        0.0
    }
}

/// User-chosen upgrade and the prices it is evaluated at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParameters {
    /// Extra PV as a percentage of the existing array (>= 0).
    pub added_pv_percent: f64,
    /// Extra battery capacity (kWh, >= 0).
    pub added_battery_kwh: f64,
    /// PV installation cost per kWp.
    pub cost_per_kwp: f64,
    /// Battery installation cost per kWh.
    pub cost_per_kwh_battery: f64,
    /// Price paid per imported kWh.
    pub grid_cost_per_kwh: f64,
    /// Price received per exported kWh.
    pub feed_in_per_kwh: f64,
}
