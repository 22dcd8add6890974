//! Battery add-on sweep and recommendation.
//!
//! Every candidate size from 0 to the configured maximum is simulated on top
//! of the PV-only scenario from one shared starting charge. A candidate is
//! *meaningful* when its yearly benefit and payback clear the thresholds;
//! the recommended size is the meaningful candidate with the shortest
//! payback.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::finance::{benefit, finite_or_null, payback_years};
use crate::sim::battery_model::BatteryModel;
use crate::sim::comparator::{measured_initial_soc_wh, run_simulated};
use crate::sim::steady_state::estimate_initial_soc;
use crate::sim::types::{EnergySample, ScenarioParameters};

/// Smallest yearly benefit worth recommending.
pub const MIN_YEARLY_BENEFIT: f64 = 5.0;
/// Longest acceptable payback (years).
pub const MAX_PAYBACK_YEARS: f64 = 25.0;
/// Largest add-on evaluated (kWh).
pub const MAX_CANDIDATE_KWH: u32 = 30;
/// Upper bound accepted for `max_candidate_kwh`.
pub const MAX_CANDIDATE_KWH_LIMIT: u32 = 100;
/// Spacing between evaluated add-ons (kWh).
pub const CANDIDATE_STEP_KWH: u32 = 1;

/// Limits applied to the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecommendationThresholds {
    /// Minimum yearly benefit of a meaningful add-on.
    pub min_yearly_benefit: f64,
    /// Maximum payback of a meaningful add-on (years).
    pub max_payback_years: f64,
    /// Largest add-on evaluated (kWh).
    pub max_candidate_kwh: u32,
    /// Spacing between add-ons (kWh).
    pub candidate_step_kwh: u32,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            min_yearly_benefit: MIN_YEARLY_BENEFIT,
            max_payback_years: MAX_PAYBACK_YEARS,
            max_candidate_kwh: MAX_CANDIDATE_KWH,
            candidate_step_kwh: CANDIDATE_STEP_KWH,
        }
    }
}

/// One evaluated add-on size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatteryCandidate {
    /// Add-on capacity (kWh).
    pub added_kwh: f64,
    /// Installed plus add-on capacity (kWh).
    pub total_kwh: f64,
    /// Benefit per year against the PV-only scenario.
    pub yearly_benefit: f64,
    /// Cost of the add-on.
    pub investment_cost: f64,
    /// Years to recover `investment_cost`; `INFINITY` (JSON `null`) if never.
    #[serde(serialize_with = "finite_or_null")]
    pub payback_years: f64,
    /// Grid import avoided per year against PV-only (kWh).
    pub yearly_saved_import_kwh: f64,
    /// Change in grid export per year against PV-only (kWh); usually negative.
    pub yearly_export_delta_kwh: f64,
    /// Grid import with this add-on (Wh).
    pub imported_wh: f64,
    /// Grid export with this add-on (Wh).
    pub exported_wh: f64,
    /// Autonomy with this add-on (percent).
    pub autonomy_percent: f64,
}

impl BatteryCandidate {
    /// Whether the candidate clears every threshold.
    pub fn is_meaningful(&self, thresholds: &RecommendationThresholds) -> bool {
        self.added_kwh > 0.0
            && self.yearly_benefit > 0.0
            && self.yearly_benefit >= thresholds.min_yearly_benefit
            && self.payback_years <= thresholds.max_payback_years
    }
}

/// Outcome of the sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    /// Every evaluated size, ascending, starting at 0 kWh.
    pub candidates: Vec<BatteryCandidate>,
    /// Meaningful add-on with the shortest payback.
    pub recommended: Option<BatteryCandidate>,
    /// Add-on with the highest yearly benefit, meaningful or not.
    pub best_yearly: Option<BatteryCandidate>,
    /// Thresholds the candidates were judged against.
    pub thresholds: RecommendationThresholds,
    /// Starting charge shared by every candidate (Wh).
    pub initial_soc_wh: f64,
}

/// Picks `(recommended, best_yearly)` among the non-zero add-ons.
///
/// Ties keep the smaller size.
pub fn select(
    candidates: &[BatteryCandidate],
    thresholds: &RecommendationThresholds,
) -> (Option<BatteryCandidate>, Option<BatteryCandidate>) {
    let mut recommended: Option<BatteryCandidate> = None;
    let mut best_yearly: Option<BatteryCandidate> = None;

    for c in candidates.iter().filter(|c| c.added_kwh > 0.0) {
        if best_yearly.is_none_or(|b| c.yearly_benefit > b.yearly_benefit) {
            best_yearly = Some(*c);
        }
        if c.is_meaningful(thresholds)
            && recommended.is_none_or(|r| c.payback_years < r.payback_years)
        {
            recommended = Some(*c);
        }
    }

    (recommended, best_yearly)
}

/// Sweeps battery add-ons on top of the PV-only scenario.
///
/// # Arguments
///
/// * `samples` - Complete-day history
/// * `model` - Inferred battery model
/// * `base_capacity_wh` - Installed battery capacity (Wh)
/// * `params` - PV increase and prices; `added_battery_kwh` is ignored
/// * `years` - Years the history represents
/// * `thresholds` - Sweep range and recommendation limits
pub fn sweep(
    samples: &[EnergySample],
    model: &BatteryModel,
    base_capacity_wh: f64,
    params: &ScenarioParameters,
    years: f64,
    thresholds: &RecommendationThresholds,
) -> Recommendation {
    let initial_soc_wh = measured_initial_soc_wh(samples, base_capacity_wh).unwrap_or_else(|| {
        estimate_initial_soc(samples, params.added_pv_percent, base_capacity_wh, model)
            .initial_soc_wh
    });
    let anchor = Some(initial_soc_wh);
    let pv_only = run_simulated(
        samples,
        model,
        params.added_pv_percent,
        base_capacity_wh,
        anchor,
    );

    let step = thresholds.candidate_step_kwh.max(1) as usize;
    let max_kwh = thresholds.max_candidate_kwh.min(MAX_CANDIDATE_KWH_LIMIT);
    let candidates: Vec<BatteryCandidate> = (0..=max_kwh)
        .step_by(step)
        .map(|kwh| {
            let added_kwh = f64::from(kwh);
            let run = run_simulated(
                samples,
                model,
                params.added_pv_percent,
                base_capacity_wh + added_kwh * 1000.0,
                anchor,
            );
            let yearly_benefit = benefit(&pv_only.result, &run.result, params) / years;
            let investment_cost = added_kwh * params.cost_per_kwh_battery;
            BatteryCandidate {
                added_kwh,
                total_kwh: base_capacity_wh / 1000.0 + added_kwh,
                yearly_benefit,
                investment_cost,
                payback_years: payback_years(investment_cost, yearly_benefit),
                yearly_saved_import_kwh: (pv_only.result.imported_wh - run.result.imported_wh)
                    / 1000.0
                    / years,
                yearly_export_delta_kwh: (run.result.exported_wh - pv_only.result.exported_wh)
                    / 1000.0
                    / years,
                imported_wh: run.result.imported_wh,
                exported_wh: run.result.exported_wh,
                autonomy_percent: run.result.autonomy_percent,
            }
        })
        .collect();

    let (recommended, best_yearly) = select(&candidates, thresholds);
    debug!(candidates = candidates.len(), initial_soc_wh, "battery sweep done");
    match &recommended {
        Some(r) => info!(
            added_kwh = r.added_kwh,
            payback_years = r.payback_years,
            "battery add-on recommended"
        ),
        None => info!("no battery add-on clears the thresholds"),
    }

    Recommendation {
        candidates,
        recommended,
        best_yearly,
        thresholds: *thresholds,
        initial_soc_wh,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(added_kwh: f64, yearly_benefit: f64, payback_years: f64) -> BatteryCandidate {
        BatteryCandidate {
            added_kwh,
            total_kwh: 5.0 + added_kwh,
            yearly_benefit,
            investment_cost: 0.0,
            payback_years,
            yearly_saved_import_kwh: 0.0,
            yearly_export_delta_kwh: 0.0,
            imported_wh: 0.0,
            exported_wh: 0.0,
            autonomy_percent: 0.0,
        }
    }

    #[test]
    fn small_benefit_is_not_recommended() {
        let t = RecommendationThresholds::default();
        let cands = vec![candidate(0.0, 0.0, 0.0), candidate(1.0, 4.0, 3.0)];
        let (rec, best) = select(&cands, &t);
        assert!(rec.is_none());
        assert_eq!(best.map(|b| b.added_kwh), Some(1.0));
    }

    #[test]
    fn shortest_payback_wins() {
        let t = RecommendationThresholds::default();
        let cands = vec![
            candidate(0.0, 0.0, 0.0),
            candidate(1.0, 20.0, 12.0),
            candidate(2.0, 35.0, 9.0),
            candidate(3.0, 40.0, 11.0),
            candidate(4.0, 50.0, 30.0),
        ];
        let (rec, best) = select(&cands, &t);
        assert_eq!(rec.map(|r| r.added_kwh), Some(2.0));
        assert_eq!(best.map(|b| b.added_kwh), Some(4.0));
    }

    #[test]
    fn ties_keep_smaller_size() {
        let t = RecommendationThresholds::default();
        let cands = vec![candidate(1.0, 10.0, 8.0), candidate(2.0, 10.0, 8.0)];
        let (rec, best) = select(&cands, &t);
        assert_eq!(rec.map(|r| r.added_kwh), Some(1.0));
        assert_eq!(best.map(|b| b.added_kwh), Some(1.0));
    }

    #[test]
    fn zero_add_on_never_selected() {
        let t = RecommendationThresholds::default();
        let cands = vec![candidate(0.0, 100.0, 0.0)];
        assert_eq!(select(&cands, &t), (None, None));
    }

    #[test]
    fn infinite_payback_is_not_meaningful() {
        let t = RecommendationThresholds::default();
        assert!(!candidate(3.0, 10.0, f64::INFINITY).is_meaningful(&t));
        assert!(candidate(3.0, 10.0, 25.0).is_meaningful(&t));
        assert!(!candidate(3.0, 4.99, 2.0).is_meaningful(&t));
    }

    #[test]
    fn sweep_covers_every_step() {
        let samples: Vec<EnergySample> = (0..24)
            .map(|h| {
                let pv = if (8..18).contains(&h) { 2000.0 } else { 0.0 };
                EnergySample::new(h * 3_600_000, pv, 500.0)
            })
            .collect();
        let params = ScenarioParameters {
            added_pv_percent: 0.0,
            added_battery_kwh: 0.0,
            cost_per_kwp: 1000.0,
            cost_per_kwh_battery: 400.0,
            grid_cost_per_kwh: 0.30,
            feed_in_per_kwh: 0.08,
        };
        let t = RecommendationThresholds {
            max_candidate_kwh: 10,
            candidate_step_kwh: 2,
            ..RecommendationThresholds::default()
        };
        let rec = sweep(&samples, &BatteryModel::ideal(), 0.0, &params, 1.0, &t);
        let sizes: Vec<f64> = rec.candidates.iter().map(|c| c.added_kwh).collect();
        assert_eq!(sizes, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(rec.candidates[0].yearly_benefit, 0.0);
        assert_eq!(rec.candidates[0].payback_years, 0.0);
        assert_eq!(rec.initial_soc_wh, 0.0);
        // imports fall monotonically with size
        for pair in rec.candidates.windows(2) {
            assert!(pair[1].imported_wh <= pair[0].imported_wh + 1e-9);
        }
    }

    #[test]
    fn sweep_reports_yearly_deltas_against_pv_only() {
        // Two sunny days, empty 0 kWh base: PV-only imports 16 dark hours
        // (8000 Wh) and exports 30 000 Wh. A 2 kWh add-on fills at 1500 Wh/h
        // and covers 4 evening hours per day.
        let samples: Vec<EnergySample> = (0..48)
            .map(|h| {
                let pv = if (8..18).contains(&(h % 24)) { 2000.0 } else { 0.0 };
                EnergySample::new(h * 3_600_000, pv, 500.0)
            })
            .collect();
        let params = ScenarioParameters {
            added_pv_percent: 0.0,
            added_battery_kwh: 0.0,
            cost_per_kwp: 1000.0,
            cost_per_kwh_battery: 400.0,
            grid_cost_per_kwh: 0.30,
            feed_in_per_kwh: 0.08,
        };
        let t = RecommendationThresholds {
            max_candidate_kwh: 2,
            ..RecommendationThresholds::default()
        };
        let rec = sweep(&samples, &BatteryModel::ideal(), 0.0, &params, 0.5, &t);
        let two = rec.candidates[2];
        assert_eq!(two.added_kwh, 2.0);
        // 4000 Wh less import and export over half a year → 8 kWh/yr each.
        assert!((two.yearly_saved_import_kwh - 8.0).abs() < 1e-9);
        assert!((two.yearly_export_delta_kwh + 8.0).abs() < 1e-9);
        assert!((two.yearly_benefit - (8.0 * 0.30 - 8.0 * 0.08)).abs() < 1e-9);
        assert_eq!(two.investment_cost, 800.0);
        assert_eq!(rec.candidates[0].yearly_saved_import_kwh, 0.0);
        assert_eq!(rec.candidates[0].yearly_export_delta_kwh, 0.0);
    }
}
