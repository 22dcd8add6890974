//! Seeded synthetic household history.
//!
//! [`generate`] produces hourly [`EnergySample`]s from a seasonal PV profile,
//! a sinusoidal household load and, optionally, a lossy reference battery
//! whose state of charge and flows are recorded alongside measured grid
//! totals. Identical configurations always produce identical histories.

/// Reference battery behind the measured columns.
pub mod battery;
/// Household consumption model.
pub mod load;
/// Seasonal PV production model.
pub mod solar;

use chrono::{DateTime, Datelike, Timelike};
use rand::{Rng, rngs::StdRng};

use crate::sim::types::EnergySample;

pub use battery::{BatteryFlow, ReferenceBattery};
pub use load::HouseholdLoad;
pub use solar::SolarProfile;

const HOUR_MS: i64 = 3_600_000;
/// Seed offset for the load RNG to avoid correlation with the PV weather.
const LOAD_SEED_OFFSET: u64 = 31;

/// Gaussian noise via the Box-Muller transform.
///
/// Returns 0 when `std_dev` is not positive.
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }
    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}

/// Parameters of a synthetic history.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    /// Days to generate.
    pub days: u32,
    /// First hour, Unix epoch milliseconds (UTC).
    pub start_ms: i64,
    /// Master random seed.
    pub seed: u64,
    /// Installed PV (kWp).
    pub pv_kwp: f64,
    /// Mean household load per hour (Wh).
    pub load_base_wh: f64,
    /// Daily load swing (Wh).
    pub load_amp_wh: f64,
    /// Installed battery (kWh); 0 disables the battery columns.
    pub battery_kwh: f64,
    /// Battery power rating (Wh per hour).
    pub battery_power_wh: f64,
    /// Per-direction battery efficiency.
    pub battery_efficiency: f64,
    /// Record grid import/export columns.
    pub record_grid: bool,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            days: 365,
            // 2024-01-01T00:00:00Z
            start_ms: 1_704_067_200_000,
            seed: 42,
            pv_kwp: 6.0,
            load_base_wh: 450.0,
            load_amp_wh: 250.0,
            battery_kwh: 5.0,
            battery_power_wh: 2_500.0,
            battery_efficiency: 0.95,
            record_grid: true,
        }
    }
}

/// Generates `config.days × 24` hourly samples.
pub fn generate(config: &SynthConfig) -> Vec<EnergySample> {
    let mut pv = SolarProfile::new(config.pv_kwp, config.seed);
    let mut load = HouseholdLoad::new(
        config.load_base_wh,
        config.load_amp_wh,
        config.seed.wrapping_add(LOAD_SEED_OFFSET),
    );
    let has_battery = config.battery_kwh > 0.0;
    let mut battery = ReferenceBattery::new(
        config.battery_kwh * 1000.0,
        config.battery_power_wh,
        config.battery_efficiency,
        config.battery_efficiency,
        0.5,
    );

    let hours = i64::from(config.days) * 24;
    let mut samples = Vec::with_capacity(hours as usize);
    for i in 0..hours {
        let timestamp_ms = config.start_ms + i * HOUR_MS;
        let Some(utc) = DateTime::from_timestamp_millis(timestamp_ms) else {
            break;
        };
        let hour = utc.hour();
        if i == 0 || hour == 0 {
            pv.advance_day();
        }

        let pv_wh = pv.hour_wh(hour, utc.ordinal());
        let load_wh = load.hour_wh(hour);
        let net_wh = pv_wh - load_wh;
        let mut sample = EnergySample::new(timestamp_ms, pv_wh, load_wh);

        let flow = if has_battery {
            sample = sample.with_soc(battery.soc_percent());
            let flow = battery.respond(net_wh);
            sample = sample.with_battery_flows(flow.charge_wh, flow.discharge_wh);
            flow
        } else {
            BatteryFlow::default()
        };

        if config.record_grid {
            let residual = net_wh - flow.charge_wh + flow.discharge_wh;
            sample = sample.with_grid((-residual).max(0.0), residual.max(0.0));
        }
        samples.push(sample);
    }
    samples
}
