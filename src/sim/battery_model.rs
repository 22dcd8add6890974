//! Battery efficiency and power-limit inference from measured flows.

use serde::{Deserialize, Serialize};

use super::types::EnergySample;

/// Positive flow samples (charge + discharge) required before the
/// measurements are trusted.
pub const MIN_MEASURED_FLOW_SAMPLES: usize = 24;
/// Lower clamp for the measured round-trip efficiency.
pub const ROUND_TRIP_EFFICIENCY_MIN: f64 = 0.6;
/// Upper clamp for the measured round-trip efficiency.
pub const ROUND_TRIP_EFFICIENCY_MAX: f64 = 1.0;
/// Percentile of hourly flows used as the power limit.
pub const POWER_LIMIT_PERCENTILE: f64 = 95.0;

/// Efficiency and hourly power limits of the household battery.
///
/// Unbounded limits are `f64::INFINITY` (serialized as `null` in JSON).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryModel {
    /// Fraction of input energy that ends up stored, in (0, 1].
    pub charge_efficiency: f64,
    /// Fraction of stored energy delivered to the load, in (0, 1].
    pub discharge_efficiency: f64,
    /// Maximum charge input per hour (Wh).
    #[serde(deserialize_with = "unbounded_or")]
    pub max_charge_wh_per_hour: f64,
    /// Maximum discharge output per hour (Wh).
    #[serde(deserialize_with = "unbounded_or")]
    pub max_discharge_wh_per_hour: f64,
    /// Whether the parameters come from measured flows.
    pub measured: bool,
}

fn unbounded_or<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<f64> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or(f64::INFINITY))
}

impl Default for BatteryModel {
    fn default() -> Self {
        Self::ideal()
    }
}

impl BatteryModel {
    /// Lossless battery without power limits, used when nothing is measured.
    pub fn ideal() -> Self {
        Self {
            charge_efficiency: 1.0,
            discharge_efficiency: 1.0,
            max_charge_wh_per_hour: f64::INFINITY,
            max_discharge_wh_per_hour: f64::INFINITY,
            measured: false,
        }
    }

    /// Product of the per-direction efficiencies.
    pub fn round_trip_efficiency(&self) -> f64 {
        self.charge_efficiency * self.discharge_efficiency
    }

    /// Infers the model from the positive battery flows in `samples`.
    ///
    /// With fewer than [`MIN_MEASURED_FLOW_SAMPLES`] positive flows the
    /// [`ideal`](Self::ideal) model is returned. Otherwise the round-trip
    /// efficiency `Σdischarge / Σcharge` is clamped to
    /// `[ROUND_TRIP_EFFICIENCY_MIN, ROUND_TRIP_EFFICIENCY_MAX]` and split
    /// evenly (square root) between both directions; power limits are the
    /// [`POWER_LIMIT_PERCENTILE`]th percentile of each direction. When one
    /// direction has no flows at all, efficiency stays at 1 and that
    /// direction stays unbounded.
    pub fn infer(samples: &[EnergySample]) -> Self {
        let charge: Vec<f64> = samples
            .iter()
            .filter_map(|s| s.battery_charge_wh)
            .filter(|v| *v > 0.0)
            .collect();
        let discharge: Vec<f64> = samples
            .iter()
            .filter_map(|s| s.battery_discharge_wh)
            .filter(|v| *v > 0.0)
            .collect();

        if charge.len() + discharge.len() < MIN_MEASURED_FLOW_SAMPLES {
            return Self::ideal();
        }

        let sum_charge: f64 = charge.iter().sum();
        let sum_discharge: f64 = discharge.iter().sum();
        let efficiency = if sum_charge > 0.0 && sum_discharge > 0.0 {
            (sum_discharge / sum_charge)
                .clamp(ROUND_TRIP_EFFICIENCY_MIN, ROUND_TRIP_EFFICIENCY_MAX)
                .sqrt()
        } else {
            1.0
        };

        Self {
            charge_efficiency: efficiency,
            discharge_efficiency: efficiency,
            max_charge_wh_per_hour: percentile(&charge, POWER_LIMIT_PERCENTILE)
                .map_or(f64::INFINITY, |v| v.max(0.0)),
            max_discharge_wh_per_hour: percentile(&discharge, POWER_LIMIT_PERCENTILE)
                .map_or(f64::INFINITY, |v| v.max(0.0)),
            measured: true,
        }
    }
}

/// Nearest-rank-below percentile: index `floor(p/100 × (n − 1))` of the
/// ascending sort. `None` for an empty slice.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let last = sorted.len() - 1;
    let rank = (p / 100.0 * last as f64).floor();
    let idx = if rank <= 0.0 {
        0
    } else {
        (rank as usize).min(last)
    };
    Some(sorted[idx])
}
