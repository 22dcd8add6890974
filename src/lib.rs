//! Household solar and battery upgrade planner.
//!
//! Replays hourly PV, load and (optionally) battery history through a
//! battery dispatch model to compare the installed system against a PV
//! and battery upgrade, projects the financial benefit, and sweeps
//! additional battery sizes to recommend one.

/// REST API exposing the planner (requires the `api` feature).
#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod error;
pub mod finance;
/// CSV and JSON import/export of histories, sweeps and traces.
pub mod io;
pub mod planner;
pub mod recommend;
/// Battery model, dispatch, windows and scenario comparison.
pub mod sim;
pub mod synth;
pub mod tariff;
