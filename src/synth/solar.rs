use std::f64::consts::PI;

use rand::{SeedableRng, rngs::StdRng};

use super::gaussian_noise;

/// Lower clamp of the daily cloud multiplier.
const CLOUD_MIN: f64 = 0.15;
/// Upper clamp of the daily cloud multiplier.
const CLOUD_MAX: f64 = 1.0;
/// Day of year with the longest daylight (northern hemisphere).
const SUMMER_SOLSTICE_DOY: f64 = 172.0;

/// Rooftop PV production with a seasonal half-cosine daylight shape.
///
/// Day length and peak output follow the season. A day-to-day AR(1) cloud
/// multiplier makes sunny and overcast spells cluster, and each hour gets a
/// little independent noise on top.
#[derive(Debug, Clone)]
pub struct SolarProfile {
    /// Peak output on a clear summer day (Wh per hour).
    pub peak_wh: f64,
    /// Daylight length at the equinox (hours).
    pub mean_day_hours: f64,
    /// Half the difference between summer and winter daylight (hours).
    pub day_hours_swing: f64,
    /// Share of peak lost at midwinter (0..1).
    pub winter_derate: f64,
    /// AR(1) persistence of the cloud multiplier (0..1).
    pub alpha: f64,
    /// Innovation standard deviation of the cloud multiplier.
    pub cloud_noise_std: f64,
    /// Hourly noise standard deviation as a fraction of output.
    pub noise_std: f64,
    cloud: f64,
    rng: StdRng,
}

impl SolarProfile {
    /// Creates a profile for an array of `kwp` peak power.
    ///
    /// # Arguments
    ///
    /// * `kwp` - Installed peak power (kWp); negative values are treated as 0
    /// * `seed` - Random seed for reproducible weather
    pub fn new(kwp: f64, seed: u64) -> Self {
        Self {
            peak_wh: kwp.max(0.0) * 1000.0 * 0.85,
            mean_day_hours: 12.0,
            day_hours_swing: 3.5,
            winter_derate: 0.6,
            alpha: 0.7,
            cloud_noise_std: 0.25,
            noise_std: 0.05,
            cloud: 0.8,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seasonal position in `[-1, 1]`: 1 at midsummer, -1 at midwinter.
    fn season(day_of_year: u32) -> f64 {
        (2.0 * PI * (f64::from(day_of_year) - SUMMER_SOLSTICE_DOY) / 365.25).cos()
    }

    /// Clear-sky fraction of peak for `hour_of_day` on `day_of_year`.
    pub fn clear_sky_fraction(&self, hour_of_day: u32, day_of_year: u32) -> f64 {
        let season = Self::season(day_of_year);
        let day_hours = self.mean_day_hours + self.day_hours_swing * season;
        let sunrise = 12.0 - day_hours / 2.0;
        let pos = (f64::from(hour_of_day) + 0.5 - sunrise) / day_hours;
        if pos <= 0.0 || pos >= 1.0 {
            return 0.0;
        }
        let intensity = 1.0 - self.winter_derate * (1.0 - season) / 2.0;
        (PI * pos).sin() * intensity
    }

    /// Moves the cloud multiplier on by one day.
    pub fn advance_day(&mut self) -> f64 {
        let eps = gaussian_noise(&mut self.rng, self.cloud_noise_std);
        self.cloud = (self.alpha * self.cloud + (1.0 - self.alpha) * (CLOUD_MAX + eps))
            .clamp(CLOUD_MIN, CLOUD_MAX);
        self.cloud
    }

    /// Production during one hour (Wh, never negative).
    pub fn hour_wh(&mut self, hour_of_day: u32, day_of_year: u32) -> f64 {
        let frac = self.clear_sky_fraction(hour_of_day, day_of_year);
        if frac <= 0.0 {
            return 0.0;
        }
        let noise = 1.0 + gaussian_noise(&mut self.rng, self.noise_std);
        (self.peak_wh * frac * self.cloud * noise).max(0.0)
    }
}
