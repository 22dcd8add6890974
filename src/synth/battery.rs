/// Energy moved by the reference battery during one hour.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BatteryFlow {
    /// Surplus energy taken in (Wh).
    pub charge_wh: f64,
    /// Energy delivered to the house (Wh).
    pub discharge_wh: f64,
}

/// Lossy self-consumption battery that produces the measured columns of a
/// synthetic history.
///
/// Charges from PV surplus and discharges into deficits, limited by an
/// hourly power rating, the stored energy and per-direction efficiencies.
#[derive(Debug, Clone)]
pub struct ReferenceBattery {
    /// Usable capacity (Wh).
    pub capacity_wh: f64,
    /// Stored energy (Wh).
    pub soc_wh: f64,
    /// Power rating in either direction (Wh per hour).
    pub max_power_wh: f64,
    /// Charging efficiency (0..=1).
    pub eta_c: f64,
    /// Discharging efficiency (0..=1).
    pub eta_d: f64,
}

impl ReferenceBattery {
    /// Creates a battery starting at `initial_soc` (fraction of capacity).
    ///
    /// # Arguments
    ///
    /// * `capacity_wh` - Usable capacity (Wh); negative values mean none
    /// * `max_power_wh` - Power rating per hour (Wh)
    /// * `eta_c` - Charging efficiency, clamped into (0, 1]
    /// * `eta_d` - Discharging efficiency, clamped into (0, 1]
    /// * `initial_soc` - Starting charge as a fraction, clamped into [0, 1]
    pub fn new(capacity_wh: f64, max_power_wh: f64, eta_c: f64, eta_d: f64, initial_soc: f64) -> Self {
        let capacity_wh = capacity_wh.max(0.0);
        Self {
            capacity_wh,
            soc_wh: capacity_wh * initial_soc.clamp(0.0, 1.0),
            max_power_wh: max_power_wh.max(0.0),
            eta_c: eta_c.clamp(f64::EPSILON, 1.0),
            eta_d: eta_d.clamp(f64::EPSILON, 1.0),
        }
    }

    /// State of charge as a percentage of capacity (0 without capacity).
    pub fn soc_percent(&self) -> f64 {
        if self.capacity_wh > 0.0 {
            self.soc_wh / self.capacity_wh * 100.0
        } else {
            0.0
        }
    }

    /// Responds to one hour of net production (`pv - load`, Wh).
    pub fn respond(&mut self, net_wh: f64) -> BatteryFlow {
        if net_wh > 0.0 {
            let room_wh = (self.capacity_wh - self.soc_wh).max(0.0) / self.eta_c;
            let charge_wh = net_wh.min(self.max_power_wh).min(room_wh);
            self.soc_wh = (self.soc_wh + charge_wh * self.eta_c).min(self.capacity_wh);
            BatteryFlow {
                charge_wh,
                discharge_wh: 0.0,
            }
        } else {
            let available_wh = self.soc_wh * self.eta_d;
            let discharge_wh = (-net_wh).min(self.max_power_wh).min(available_wh);
            self.soc_wh = (self.soc_wh - discharge_wh / self.eta_d).max(0.0);
            BatteryFlow {
                charge_wh: 0.0,
                discharge_wh,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charge_limited_by_power() {
        let mut b = ReferenceBattery::new(10_000.0, 2_000.0, 1.0, 1.0, 0.0);
        let flow = b.respond(5_000.0);
        assert_eq!(flow.charge_wh, 2_000.0);
        assert_eq!(b.soc_wh, 2_000.0);
    }

    #[test]
    fn charge_loses_energy() {
        let mut b = ReferenceBattery::new(10_000.0, 5_000.0, 0.9, 1.0, 0.0);
        b.respond(1_000.0);
        assert!((b.soc_wh - 900.0).abs() < 1e-9);
    }

    #[test]
    fn discharge_limited_by_energy() {
        let mut b = ReferenceBattery::new(1_000.0, 5_000.0, 1.0, 0.5, 0.4);
        let flow = b.respond(-1_000.0);
        // 400 Wh stored delivers 200 Wh at 50 %
        assert!((flow.discharge_wh - 200.0).abs() < 1e-9);
        assert!(b.soc_wh.abs() < 1e-9);
    }

    #[test]
    fn soc_stays_in_bounds() {
        let mut b = ReferenceBattery::new(3_000.0, 1_500.0, 0.95, 0.95, 0.5);
        for i in 0..200 {
            let net = if i % 3 == 0 { -2_500.0 } else { 1_800.0 };
            b.respond(net);
            assert!(b.soc_wh >= 0.0 && b.soc_wh <= b.capacity_wh);
            assert!((0.0..=100.0).contains(&b.soc_percent()));
        }
    }

    #[test]
    fn no_capacity_no_flow() {
        let mut b = ReferenceBattery::new(0.0, 1_000.0, 1.0, 1.0, 1.0);
        assert_eq!(b.respond(500.0), BatteryFlow::default());
        assert_eq!(b.respond(-500.0), BatteryFlow::default());
        assert_eq!(b.soc_percent(), 0.0);
    }
}
