use std::f64::consts::PI;

use rand::{SeedableRng, rngs::StdRng};

use super::gaussian_noise;

/// Household consumption with a daily sinusoid plus Gaussian noise.
///
/// # Examples
///
/// ```
/// use solar_planner::synth::load::HouseholdLoad;
///
/// let mut load = HouseholdLoad::new(450.0, 250.0, 42);
/// let evening = load.hour_wh(19);
/// assert!(evening >= 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct HouseholdLoad {
    /// Mean consumption per hour (Wh).
    pub base_wh: f64,
    /// Amplitude of the daily swing (Wh).
    pub amp_wh: f64,
    /// Phase offset of the sinusoid (radians).
    pub phase_rad: f64,
    /// Standard deviation of the hourly noise (Wh).
    pub noise_std: f64,
    rng: StdRng,
}

impl HouseholdLoad {
    /// Creates a load peaking in the early evening.
    ///
    /// # Arguments
    ///
    /// * `base_wh` - Mean consumption per hour (Wh)
    /// * `amp_wh` - Amplitude of the daily swing (Wh)
    /// * `seed` - Random seed for reproducible noise
    pub fn new(base_wh: f64, amp_wh: f64, seed: u64) -> Self {
        Self {
            base_wh,
            amp_wh,
            // sin peaks at hour 18.5
            phase_rad: -2.0 * PI * 12.5 / 24.0,
            noise_std: base_wh.abs() * 0.1,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Consumption during `hour_of_day` (Wh, never negative).
    pub fn hour_wh(&mut self, hour_of_day: u32) -> f64 {
        let day_pos = f64::from(hour_of_day % 24) / 24.0;
        let sinus = (2.0 * PI * day_pos + self.phase_rad).sin();
        let noise = gaussian_noise(&mut self.rng, self.noise_std);
        (self.base_wh + self.amp_wh * sinus + noise).max(0.0)
    }
}
