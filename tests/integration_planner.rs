//! Integration tests for the planning pipeline.

mod common;

use approx::assert_relative_eq;
use chrono::NaiveDate;
use solar_planner::finance::{FinancialProjection, benefit};
use solar_planner::planner::{PlanOutcome, PlanRequest, plan, trace_scenario};
use solar_planner::recommend::{BatteryCandidate, RecommendationThresholds, select};
use solar_planner::sim::battery_model::BatteryModel;
use solar_planner::sim::comparator::InitialSocSource;
use solar_planner::sim::dispatch::{DispatchParams, simulate, trace};
use solar_planner::sim::types::{EnergySample, ScenarioParameters, ScenarioResult, SimulationMode};
use solar_planner::sim::window::SimulationWindow;
use solar_planner::tariff::{Tariff, TariffRates, TariffSource};

fn empty_battery(capacity_wh: f64) -> DispatchParams {
    DispatchParams {
        added_pv_percent: 0.0,
        capacity_wh,
        initial_soc_wh: 0.0,
    }
}

fn ready(request: &PlanRequest) -> Box<solar_planner::planner::PlanReport> {
    match plan(request) {
        PlanOutcome::Ready(report) => report,
        other => panic!("expected a report, got {other:?}"),
    }
}

#[test]
fn sunny_days_fill_and_drain_battery() {
    let samples = common::sunny_days(2);
    let result = simulate(&samples, empty_battery(5000.0), &BatteryModel::ideal());

    // Day 1: 8 dark hours imported. Day 2: 2000 Wh carried over covers 4 of them.
    assert_relative_eq!(result.imported_wh, 6000.0);
    assert_relative_eq!(result.exported_wh, 20_000.0);
    assert_relative_eq!(result.ending_state_of_charge_wh, 2000.0);
    assert_relative_eq!(result.total_load_wh, 24_000.0);
    assert_relative_eq!(result.autonomy_percent, 75.0);

    let steps = trace(&samples, empty_battery(5000.0), &BatteryModel::ideal());
    assert_relative_eq!(steps[10].soc_wh, 4500.0);
    assert_relative_eq!(steps[11].soc_wh, 5000.0);
    assert_relative_eq!(steps[11].exported_wh, 1000.0);
    assert_relative_eq!(steps[23].soc_wh, 2000.0);
    assert_relative_eq!(steps[27].soc_wh, 0.0);
    assert_relative_eq!(steps[27].imported_wh, 0.0);
    assert_relative_eq!(steps[28].imported_wh, 500.0);
}

#[test]
fn flows_infer_round_trip_efficiency() {
    let charges = (0..10).map(|h| EnergySample::new(h * common::HOUR_MS, 0.0, 0.0).with_battery_flows(100.0, 0.0));
    let discharges = (10..26).map(|h| EnergySample::new(h * common::HOUR_MS, 0.0, 0.0).with_battery_flows(0.0, 50.0));
    let samples: Vec<EnergySample> = charges.chain(discharges).collect();

    let model = BatteryModel::infer(&samples);
    assert!(model.measured);
    assert_relative_eq!(model.round_trip_efficiency(), 0.8, epsilon = 1e-9);
    assert_relative_eq!(model.charge_efficiency, 0.894, epsilon = 1e-3);
    assert_relative_eq!(model.discharge_efficiency, 0.894, epsilon = 1e-3);
    assert_relative_eq!(model.max_charge_wh_per_hour, 100.0);
    assert_relative_eq!(model.max_discharge_wh_per_hour, 50.0);
}

#[test]
fn yearly_benefit_and_payback() {
    let prices = ScenarioParameters {
        added_pv_percent: 0.0,
        added_battery_kwh: 0.0,
        cost_per_kwp: 0.0,
        cost_per_kwh_battery: 0.0,
        grid_cost_per_kwh: 0.30,
        feed_in_per_kwh: 0.08,
    };
    let before = ScenarioResult::from_totals(500_000.0, 0.0, 300_000.0, 50_000.0, 0.0);
    let after = ScenarioResult::from_totals(500_000.0, 0.0, 200_000.0, 70_000.0, 0.0);

    let total = benefit(&before, &after, &prices);
    let projection = FinancialProjection::new(500.0, total, 1.0);
    assert_relative_eq!(projection.yearly_benefit, 31.6, epsilon = 1e-9);
    assert_relative_eq!(projection.payback_years, 15.82, epsilon = 0.01);
    assert!(projection.pays_back());
}

#[test]
fn small_benefit_is_not_recommended() {
    let candidate = BatteryCandidate {
        added_kwh: 1.0,
        total_kwh: 6.0,
        yearly_benefit: 4.0,
        investment_cost: 12.0,
        payback_years: 3.0,
        yearly_saved_import_kwh: 20.0,
        yearly_export_delta_kwh: -25.0,
        imported_wh: 0.0,
        exported_wh: 0.0,
        autonomy_percent: 0.0,
    };
    let (recommended, best) = select(&[candidate], &RecommendationThresholds::default());
    assert!(recommended.is_none());
    assert_eq!(best, Some(candidate));
}

#[test]
fn partial_day_is_insufficient() {
    let samples: Vec<EnergySample> = common::sunny_day(common::MARCH_1).into_iter().take(10).collect();
    let outcome = plan(&PlanRequest::new(samples));
    assert!(matches!(outcome, PlanOutcome::InsufficientData { .. }));
    assert_eq!(outcome.coverage().days_with_data, 1);
    assert_eq!(outcome.coverage().complete_days, 0);
}

#[test]
fn plan_is_deterministic() {
    let mut request = PlanRequest::new(common::synthetic(30));
    request.added_pv_percent = 25.0;
    request.added_battery_kwh = 3.0;
    assert_eq!(plan(&request), plan(&request));
}

#[test]
fn simulated_hours_conserve_energy() {
    let samples = common::synthetic_bare(60);
    let params = DispatchParams {
        added_pv_percent: 40.0,
        capacity_wh: 8000.0,
        initial_soc_wh: 3000.0,
    };
    let model = BatteryModel {
        charge_efficiency: 0.95,
        discharge_efficiency: 0.95,
        max_charge_wh_per_hour: 2500.0,
        max_discharge_wh_per_hour: 2500.0,
        measured: true,
    };
    let steps = trace(&samples, params, &model);
    assert_eq!(steps.len(), samples.len());

    let mut soc = params.initial_soc_wh;
    for s in &steps {
        let supply = s.pv_wh + s.imported_wh + s.discharge_output_wh;
        let demand = s.load_wh + s.exported_wh + s.charge_input_wh;
        assert!((supply - demand).abs() < 1e-6, "unbalanced hour {s:?}");
        assert!(s.soc_wh >= 0.0 && s.soc_wh <= params.capacity_wh + 1e-9);
        assert!(s.charge_input_wh <= 2500.0 + 1e-9);
        assert!(s.discharge_output_wh <= 2500.0 + 1e-9);
        assert!((soc + s.stored_wh - s.drawn_wh - s.soc_wh).abs() < 1e-6);
        soc = s.soc_wh;
    }
}

#[test]
fn measured_grid_columns_drive_baseline() {
    let samples = common::synthetic(20);
    let imported: f64 = samples.iter().filter_map(|s| s.grid_import_wh).sum();
    let exported: f64 = samples.iter().filter_map(|s| s.grid_export_wh).sum();

    let mut request = PlanRequest::new(samples);
    request.window = SimulationWindow::All;
    request.added_pv_percent = 20.0;
    let report = ready(&request);

    let base = &report.scenarios.base;
    assert_eq!(base.mode, SimulationMode::Measured);
    assert_relative_eq!(base.result.imported_wh, imported, epsilon = 1e-6);
    assert_relative_eq!(base.result.exported_wh, exported, epsilon = 1e-6);
    assert_eq!(base.result.ending_state_of_charge_wh, 0.0);
    assert_eq!(report.scenarios.pv_only.mode, SimulationMode::Simulated);
    assert_eq!(report.scenarios.initial_soc_source, InitialSocSource::Measured);
    assert!(trace_scenario(&request, &report, base).is_none());
}

#[test]
fn synthetic_battery_efficiency_is_recovered() {
    let samples = common::synthetic(120);
    let model = BatteryModel::infer(&samples);
    assert!(model.measured);
    // Reference battery runs at 95 % per direction.
    assert_relative_eq!(model.round_trip_efficiency(), 0.9025, epsilon = 0.01);
    assert!(model.max_charge_wh_per_hour <= 2500.0 + 1e-9);
    assert!(model.max_discharge_wh_per_hour <= 2500.0 + 1e-9);
}

#[test]
fn bare_history_uses_ideal_battery_and_steady_state() {
    let mut request = PlanRequest::new(common::synthetic_bare(14));
    request.window = SimulationWindow::All;
    request.added_battery_kwh = 5.0;
    let report = ready(&request);

    assert!(!report.battery_model.measured);
    assert_eq!(report.scenarios.base.mode, SimulationMode::Simulated);
    assert_eq!(report.scenarios.initial_soc_source, InitialSocSource::SteadyState);
    assert!(!report.data_basis.has_soc);

    let upgraded = &report.scenarios.pv_plus_battery;
    let steps = trace_scenario(&request, &report, upgraded).expect("simulated scenario");
    assert_eq!(steps.len(), 14 * 24);
    let imported: f64 = steps.iter().map(|s| s.imported_wh).sum();
    assert_relative_eq!(imported, upgraded.result.imported_wh, epsilon = 1e-6);
}

#[test]
fn more_battery_never_imports_more() {
    let mut request = PlanRequest::new(common::synthetic_bare(30));
    request.window = SimulationWindow::All;
    request.added_pv_percent = 50.0;
    let report = ready(&request);

    let candidates = &report.recommendation.candidates;
    assert_eq!(candidates.len(), 31);
    assert_eq!(candidates[0].added_kwh, 0.0);
    assert_eq!(candidates[0].yearly_benefit, 0.0);
    for pair in candidates.windows(2) {
        assert!(pair[1].imported_wh <= pair[0].imported_wh + 1e-6);
    }
    if let Some(rec) = report.recommendation.recommended {
        assert!(rec.added_kwh > 0.0);
        assert!(rec.is_meaningful(&report.recommendation.thresholds));
    }
}

#[test]
fn dated_tariff_prices_the_plan() {
    let mut request = PlanRequest::new(common::sunny_days(3));
    request.window = SimulationWindow::All;
    request.tariffs = vec![
        Tariff {
            valid_from: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            cost_per_kwh: 0.25,
            feed_in_per_kwh: 0.10,
        },
        Tariff {
            valid_from: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            cost_per_kwh: 0.40,
            feed_in_per_kwh: 0.05,
        },
        Tariff {
            valid_from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            cost_per_kwh: 0.50,
            feed_in_per_kwh: 0.01,
        },
    ];
    let report = ready(&request);
    assert_eq!(report.tariff.source, TariffSource::Tariff);
    assert_eq!(report.tariff.grid_cost_per_kwh, 0.40);
    assert_eq!(report.parameters.feed_in_per_kwh, 0.05);

    request.tariff = Some(TariffRates {
        grid_cost_per_kwh: 0.35,
        feed_in_per_kwh: 0.07,
    });
    let report = ready(&request);
    assert_eq!(report.tariff.source, TariffSource::Explicit);
    assert_eq!(report.parameters.grid_cost_per_kwh, 0.35);
}

#[test]
fn no_tariff_uses_defaults() {
    let mut request = PlanRequest::new(common::sunny_days(1));
    request.window = SimulationWindow::All;
    let report = ready(&request);
    assert_eq!(report.tariff.source, TariffSource::Default);
    assert_eq!(report.tariff.grid_cost_per_kwh, 0.30);
    assert_eq!(report.tariff.feed_in_per_kwh, 0.08);
}

#[test]
fn base_kwp_estimated_from_peak_hour() {
    let mut request = PlanRequest::new(common::sunny_days(2));
    request.window = SimulationWindow::All;
    request.added_pv_percent = 50.0;
    let report = ready(&request);
    // Peak hour 2000 Wh → 2 kWp, 50 % more → 1 kWp at 1000/kWp.
    assert_eq!(report.financials.base_kwp, 2.0);
    assert_eq!(report.financials.added_kwp, 1.0);
    assert_relative_eq!(report.financials.pv_only.investment_cost, 1000.0);

    request.system_capacity_kwp = Some(8.0);
    let report = ready(&request);
    assert_eq!(report.financials.base_kwp, 8.0);
}

#[test]
fn year_window_keeps_last_365_days() {
    let samples = common::synthetic_bare(400);
    let request = PlanRequest::new(samples);
    let outcome = plan(&request);
    let coverage = outcome.coverage();
    assert_eq!(coverage.expected_days, 365);
    assert_eq!(coverage.complete_days, 365);
    assert_eq!(coverage.percent, 100);

    let report = outcome.report().expect("ready");
    assert_relative_eq!(report.financials.years_covered, 1.0);
}

#[test]
fn validation_reports_every_bad_field() {
    let mut request = PlanRequest::new(common::sunny_days(1));
    request.added_pv_percent = -1.0;
    request.cost_per_kwp = f64::NAN;
    request.utc_offset_minutes = 20 * 60;
    let fields: Vec<String> = request.validate().into_iter().map(|e| e.field).collect();
    assert_eq!(fields, ["added_pv_percent", "cost_per_kwp", "utc_offset_minutes"]);
}

#[test]
fn outcome_json_is_tagged() {
    let mut request = PlanRequest::new(common::sunny_days(1));
    request.window = SimulationWindow::All;
    let json = serde_json::to_value(plan(&request)).unwrap();
    assert_eq!(json["status"], "ready");
    assert!(json["battery_model"]["max_charge_wh_per_hour"].is_null());

    let json = serde_json::to_value(plan(&PlanRequest::new(Vec::new()))).unwrap();
    assert_eq!(json["status"], "insufficient_data");
}

#[test]
fn sample_order_does_not_change_the_plan() {
    let mut request = PlanRequest::new(common::synthetic(30));
    request.window = SimulationWindow::All;
    request.added_pv_percent = 30.0;
    request.added_battery_kwh = 4.0;

    let mut shuffled = request.clone();
    shuffled.samples.reverse();
    shuffled.samples.rotate_left(137);
    for pair in shuffled.samples.chunks_mut(2) {
        pair.reverse();
    }
    assert_ne!(shuffled.samples, request.samples);

    let report = ready(&request);
    let report_shuffled = ready(&shuffled);
    assert_eq!(report, report_shuffled);

    let run = &report.scenarios.pv_plus_battery;
    assert_eq!(
        trace_scenario(&request, &report, run),
        trace_scenario(&shuffled, &report_shuffled, run),
    );
}
