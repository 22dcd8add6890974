//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use solar_planner::sim::types::EnergySample;
use solar_planner::synth::{SynthConfig, generate};

/// One hour in milliseconds.
pub const HOUR_MS: i64 = 3_600_000;

/// 2024-03-01T00:00:00Z.
pub const MARCH_1: i64 = 1_709_251_200_000;

/// Sunny day starting at `start_ms`: 2000 Wh PV in hours 8–17, flat 500 Wh
/// load.
pub fn sunny_day(start_ms: i64) -> Vec<EnergySample> {
    (0..24)
        .map(|h| {
            let pv = if (8..18).contains(&h) { 2000.0 } else { 0.0 };
            EnergySample::new(start_ms + h * HOUR_MS, pv, 500.0)
        })
        .collect()
}

/// `days` consecutive sunny days starting at [`MARCH_1`].
pub fn sunny_days(days: i64) -> Vec<EnergySample> {
    (0..days)
        .flat_map(|d| sunny_day(MARCH_1 + d * 24 * HOUR_MS))
        .collect()
}

/// Synthetic history with every measured column (seed 42).
pub fn synthetic(days: u32) -> Vec<EnergySample> {
    generate(&SynthConfig {
        days,
        ..SynthConfig::default()
    })
}

/// Synthetic PV and load only: no battery, no grid columns.
pub fn synthetic_bare(days: u32) -> Vec<EnergySample> {
    generate(&SynthConfig {
        days,
        battery_kwh: 0.0,
        record_grid: false,
        ..SynthConfig::default()
    })
}
