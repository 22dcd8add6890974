/// CSV export of sweeps, traces and samples.
pub mod export;
/// CSV / JSON sample import.
pub mod import;
