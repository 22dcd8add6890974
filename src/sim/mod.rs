/// Battery efficiency and power-limit inference.
pub mod battery_model;
pub mod comparator;
/// Hourly dispatch simulator.
pub mod dispatch;
pub mod steady_state;
pub mod types;
/// Window selection, local days and coverage.
pub mod window;
