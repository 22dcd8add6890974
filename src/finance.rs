//! Yearly benefit and payback of an upgrade.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::sim::comparator::ScenarioSet;
use crate::sim::types::{ScenarioParameters, ScenarioResult};

/// Floor on the years a history represents, avoiding division blow-ups.
pub const MIN_YEARS_COVERED: f64 = 0.1;
/// Assumed installed PV when neither configuration nor data tell.
pub const DEFAULT_BASE_KWP: f64 = 5.0;
/// PV installation cost per kWp when none is given.
pub const DEFAULT_COST_PER_KWP: f64 = 1000.0;
/// Battery installation cost per kWh when none is given.
pub const DEFAULT_COST_PER_KWH_BATTERY: f64 = 400.0;

/// Years spanned by `complete_days`, floored at [`MIN_YEARS_COVERED`].
pub fn years_covered(complete_days: usize) -> f64 {
    (complete_days as f64 / 365.0).max(MIN_YEARS_COVERED)
}

/// Money gained moving from `from` to `to` over the window.
///
/// Saved imports are valued at the grid price and additional exports at
/// the feed-in price. Negative when `to` is worse.
pub fn benefit(from: &ScenarioResult, to: &ScenarioResult, params: &ScenarioParameters) -> f64 {
    let saved_import_kwh = (from.imported_wh - to.imported_wh) / 1000.0;
    let extra_export_kwh = (to.exported_wh - from.exported_wh) / 1000.0;
    saved_import_kwh * params.grid_cost_per_kwh + extra_export_kwh * params.feed_in_per_kwh
}

/// Years until `investment` is recovered.
///
/// Zero for a free upgrade, infinite when the upgrade never pays off.
pub fn payback_years(investment: f64, yearly_benefit: f64) -> f64 {
    if investment <= 0.0 {
        0.0
    } else if yearly_benefit <= 0.0 {
        f64::INFINITY
    } else {
        investment / yearly_benefit
    }
}

/// Installed PV peak power (kWp).
///
/// A positive configured value wins. Otherwise the highest hourly PV sample
/// is rounded up to whole kWp, and without samples [`DEFAULT_BASE_KWP`] is
/// assumed.
pub fn estimate_base_kwp(configured_kwp: Option<f64>, max_pv_wh: Option<f64>) -> f64 {
    match (configured_kwp.filter(|k| *k > 0.0), max_pv_wh) {
        (Some(kwp), _) => kwp,
        (None, Some(wh)) => (wh / 1000.0).ceil(),
        (None, None) => DEFAULT_BASE_KWP,
    }
}

/// Serializes non-finite numbers as `null`.
pub(crate) fn finite_or_null<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_none()
    }
}

/// Investment, yearly benefit and payback of one upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FinancialProjection {
    /// Up-front cost.
    pub investment_cost: f64,
    /// Benefit per year.
    pub yearly_benefit: f64,
    /// Years to recover the investment; `INFINITY` (JSON `null`) if never.
    #[serde(serialize_with = "finite_or_null")]
    pub payback_years: f64,
}

impl FinancialProjection {
    /// Projects `total_benefit` earned over `years` onto a yearly basis.
    pub fn new(investment_cost: f64, total_benefit: f64, years: f64) -> Self {
        let yearly_benefit = total_benefit / years;
        Self {
            investment_cost,
            yearly_benefit,
            payback_years: payback_years(investment_cost, yearly_benefit),
        }
    }

    /// Whether the investment is ever recovered.
    pub fn pays_back(&self) -> bool {
        self.payback_years.is_finite()
    }
}

impl fmt::Display for FinancialProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invest {:>9.2}  benefit {:>8.2}/yr  payback ",
            self.investment_cost, self.yearly_benefit
        )?;
        if self.pays_back() {
            write!(f, "{:.1} yr", self.payback_years)
        } else {
            write!(f, "never")
        }
    }
}

/// Projections for the three ways of looking at an upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FinancialBreakdown {
    /// PV+battery scenario against the base.
    pub combined: FinancialProjection,
    /// PV-only scenario against the base.
    pub pv_only: FinancialProjection,
    /// PV+battery scenario against PV-only.
    pub battery_incremental: FinancialProjection,
    /// Installed PV used to size the PV investment (kWp).
    pub base_kwp: f64,
    /// PV added by the upgrade (kWp).
    pub added_kwp: f64,
    /// Years the history represents.
    pub years_covered: f64,
}

/// Builds the financial breakdown of `scenarios`.
pub fn project(
    scenarios: &ScenarioSet,
    params: &ScenarioParameters,
    base_kwp: f64,
    years: f64,
) -> FinancialBreakdown {
    let added_kwp = base_kwp * params.added_pv_percent / 100.0;
    let pv_cost = added_kwp * params.cost_per_kwp;
    let battery_cost = params.added_battery_kwh * params.cost_per_kwh_battery;

    let base = &scenarios.base.result;
    let pv_only = &scenarios.pv_only.result;
    let upgraded = &scenarios.pv_plus_battery.result;

    FinancialBreakdown {
        combined: FinancialProjection::new(
            pv_cost + battery_cost,
            benefit(base, upgraded, params),
            years,
        ),
        pv_only: FinancialProjection::new(pv_cost, benefit(base, pv_only, params), years),
        battery_incremental: FinancialProjection::new(
            battery_cost,
            benefit(pv_only, upgraded, params),
            years,
        ),
        base_kwp,
        added_kwp,
        years_covered: years,
    }
}
