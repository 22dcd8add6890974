//! End-to-end planning: history in, upgrade report out.
//!
//! [`plan`] composes window selection, battery inference, scenario
//! comparison, the financial projection and the battery sweep into a
//! [`PlanReport`]. Too little history is reported as
//! [`PlanOutcome::InsufficientData`] rather than as an error.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ConfigError;
use crate::finance::{
    DEFAULT_COST_PER_KWH_BATTERY, DEFAULT_COST_PER_KWP, FinancialBreakdown, estimate_base_kwp,
    project, years_covered,
};
use crate::recommend::{MAX_CANDIDATE_KWH_LIMIT, Recommendation, RecommendationThresholds, sweep};
use crate::sim::battery_model::BatteryModel;
use crate::sim::comparator::{InitialSocSource, ScenarioRun, ScenarioSet, compare_scenarios};
use crate::sim::dispatch::{HourStep, trace};
use crate::sim::types::{EnergySample, ScenarioParameters};
use crate::sim::window::{DataCoverage, DayCalendar, HistoryWindow, SimulationWindow, select_window};
use crate::tariff::{ActiveTariff, Tariff, TariffRates, active_tariff};

/// Installed battery assumed when none is configured (kWh).
pub const DEFAULT_BATTERY_CAPACITY_KWH: f64 = 5.0;
/// Largest accepted UTC offset magnitude (minutes).
pub const MAX_UTC_OFFSET_MINUTES: i32 = 18 * 60;

fn default_cost_per_kwp() -> f64 {
    DEFAULT_COST_PER_KWP
}

fn default_cost_per_kwh_battery() -> f64 {
    DEFAULT_COST_PER_KWH_BATTERY
}

/// Installed capacity to simulate with; missing or non-positive means the
/// default.
pub fn base_capacity_kwh(configured: Option<f64>) -> f64 {
    configured
        .filter(|k| *k > 0.0)
        .unwrap_or(DEFAULT_BATTERY_CAPACITY_KWH)
}

/// Everything needed to produce a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanRequest {
    /// Hourly history, ordered by timestamp.
    pub samples: Vec<EnergySample>,
    /// Explicit prices; take precedence over `tariffs`.
    #[serde(default)]
    pub tariff: Option<TariffRates>,
    /// Dated tariffs to choose the active one from.
    #[serde(default)]
    pub tariffs: Vec<Tariff>,
    /// Extra PV (percent of current array).
    #[serde(default)]
    pub added_pv_percent: f64,
    /// Extra battery (kWh).
    #[serde(default)]
    pub added_battery_kwh: f64,
    /// PV cost per kWp.
    #[serde(default = "default_cost_per_kwp")]
    pub cost_per_kwp: f64,
    /// Battery cost per kWh.
    #[serde(default = "default_cost_per_kwh_battery")]
    pub cost_per_kwh_battery: f64,
    /// Installed battery (kWh).
    #[serde(default)]
    pub battery_capacity_kwh: Option<f64>,
    /// Installed PV peak power (kWp).
    #[serde(default)]
    pub system_capacity_kwp: Option<f64>,
    /// History span to simulate.
    #[serde(default)]
    pub window: SimulationWindow,
    /// Reference time for the window; defaults to the newest sample.
    #[serde(default)]
    pub now_ms: Option<i64>,
    /// Local-day offset east of UTC (minutes).
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Battery sweep range and limits.
    #[serde(default)]
    pub thresholds: RecommendationThresholds,
}

impl PlanRequest {
    /// Request with default prices and no upgrade.
    pub fn new(samples: Vec<EnergySample>) -> Self {
        Self {
            samples,
            tariff: None,
            tariffs: Vec::new(),
            added_pv_percent: 0.0,
            added_battery_kwh: 0.0,
            cost_per_kwp: DEFAULT_COST_PER_KWP,
            cost_per_kwh_battery: DEFAULT_COST_PER_KWH_BATTERY,
            battery_capacity_kwh: None,
            system_capacity_kwp: None,
            window: SimulationWindow::default(),
            now_ms: None,
            utc_offset_minutes: 0,
            thresholds: RecommendationThresholds::default(),
        }
    }

    /// Reference time: `now_ms`, else the newest sample, else the epoch.
    pub fn reference_time_ms(&self) -> i64 {
        self.now_ms
            .or_else(|| self.samples.iter().map(|s| s.timestamp_ms).max())
            .unwrap_or(0)
    }

    /// Calendar for local-day grouping.
    pub fn calendar(&self) -> DayCalendar {
        DayCalendar::new(self.utc_offset_minutes)
    }

    /// Windowed, complete-day history.
    pub fn history(&self) -> HistoryWindow {
        select_window(
            &self.samples,
            self.window,
            self.reference_time_ms(),
            &self.calendar(),
        )
    }

    /// Checks every numeric input; an empty vector means valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut non_negative = |field: &str, value: f64| {
            if !value.is_finite() || value < 0.0 {
                errors.push(ConfigError {
                    field: field.into(),
                    message: format!("must be a finite number >= 0, got {value}"),
                });
            }
        };

        non_negative("added_pv_percent", self.added_pv_percent);
        non_negative("added_battery_kwh", self.added_battery_kwh);
        non_negative("cost_per_kwp", self.cost_per_kwp);
        non_negative("cost_per_kwh_battery", self.cost_per_kwh_battery);
        if let Some(rates) = &self.tariff {
            non_negative("tariff.grid_cost_per_kwh", rates.grid_cost_per_kwh);
            non_negative("tariff.feed_in_per_kwh", rates.feed_in_per_kwh);
        }
        for (i, t) in self.tariffs.iter().enumerate() {
            non_negative(&format!("tariffs[{i}].cost_per_kwh"), t.cost_per_kwh);
            non_negative(&format!("tariffs[{i}].feed_in_per_kwh"), t.feed_in_per_kwh);
        }
        if let Some(kwh) = self.battery_capacity_kwh {
            non_negative("battery_capacity_kwh", kwh);
        }
        if let Some(kwp) = self.system_capacity_kwp {
            non_negative("system_capacity_kwp", kwp);
        }
        non_negative("thresholds.min_yearly_benefit", self.thresholds.min_yearly_benefit);
        non_negative("thresholds.max_payback_years", self.thresholds.max_payback_years);

        if self.thresholds.candidate_step_kwh == 0 {
            errors.push(ConfigError {
                field: "thresholds.candidate_step_kwh".into(),
                message: "must be > 0".into(),
            });
        }
        if self.thresholds.max_candidate_kwh > MAX_CANDIDATE_KWH_LIMIT {
            errors.push(ConfigError {
                field: "thresholds.max_candidate_kwh".into(),
                message: format!("must be <= {MAX_CANDIDATE_KWH_LIMIT}"),
            });
        }
        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            errors.push(ConfigError {
                field: "utc_offset_minutes".into(),
                message: format!("must be within ±{MAX_UTC_OFFSET_MINUTES}"),
            });
        }
        if let Some((i, _)) = self
            .samples
            .iter()
            .enumerate()
            .find(|(_, s)| !s.pv_wh.is_finite() || !s.load_wh.is_finite())
        {
            errors.push(ConfigError {
                field: format!("samples[{i}]"),
                message: "pv_wh and load_wh must be finite".into(),
            });
        }

        errors
    }
}

/// Which inputs the plan could rely on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DataBasis {
    /// Some sample has a state-of-charge reading.
    pub has_soc: bool,
    /// Some sample has battery flow readings.
    pub has_battery_flows: bool,
    /// Some sample has grid flow readings.
    pub has_grid_flows: bool,
    /// How starting charges were chosen.
    pub initial_soc_source: InitialSocSource,
    /// Measured round-trip efficiency, rounded percent.
    pub round_trip_efficiency_percent: Option<u32>,
    /// Whether a power limit was derived from measurements.
    pub power_limits_inferred: bool,
}

impl DataBasis {
    /// Summarizes the simulated history.
    pub fn describe(
        samples: &[EnergySample],
        model: &BatteryModel,
        initial_soc_source: InitialSocSource,
    ) -> Self {
        Self {
            has_soc: samples.iter().any(|s| s.soc_percent.is_some()),
            has_battery_flows: samples.iter().any(EnergySample::has_battery_flows),
            has_grid_flows: samples.iter().any(EnergySample::has_grid_flows),
            initial_soc_source,
            round_trip_efficiency_percent: model
                .measured
                .then(|| (model.round_trip_efficiency() * 100.0).round() as u32),
            power_limits_inferred: model.measured
                && (model.max_charge_wh_per_hour.is_finite()
                    || model.max_discharge_wh_per_hour.is_finite()),
        }
    }
}

/// Full planning result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanReport {
    /// History span used.
    pub window: SimulationWindow,
    /// Coverage of that span.
    pub coverage: DataCoverage,
    /// Which inputs were available.
    pub data_basis: DataBasis,
    /// Inferred battery behaviour.
    pub battery_model: BatteryModel,
    /// Prices used.
    pub tariff: ActiveTariff,
    /// Upgrade and prices evaluated.
    pub parameters: ScenarioParameters,
    /// Installed battery used for simulation (kWh).
    pub base_capacity_kwh: f64,
    /// Base, PV-only and PV+battery scenarios.
    pub scenarios: ScenarioSet,
    /// Investment, benefit and payback.
    pub financials: FinancialBreakdown,
    /// Battery add-on sweep.
    pub recommendation: Recommendation,
}

/// Result of [`plan`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlanOutcome {
    /// No complete day in the window.
    InsufficientData {
        /// Coverage that was found.
        coverage: DataCoverage,
    },
    /// A full report.
    Ready(Box<PlanReport>),
}

impl PlanOutcome {
    /// The report, if one was produced.
    pub fn report(&self) -> Option<&PlanReport> {
        match self {
            Self::Ready(report) => Some(report),
            Self::InsufficientData { .. } => None,
        }
    }

    /// Coverage of the window in either case.
    pub fn coverage(&self) -> &DataCoverage {
        match self {
            Self::Ready(report) => &report.coverage,
            Self::InsufficientData { coverage } => coverage,
        }
    }
}

/// Runs the complete planning pipeline.
///
/// The request is not validated here; call [`PlanRequest::validate`] first
/// when the inputs come from outside.
pub fn plan(request: &PlanRequest) -> PlanOutcome {
    let history = request.history();

    if !history.coverage.is_sufficient() {
        warn!(
            window = %request.window,
            days_with_data = history.coverage.days_with_data,
            "no complete day in window"
        );
        return PlanOutcome::InsufficientData {
            coverage: history.coverage,
        };
    }

    let samples = &history.samples;
    let model = BatteryModel::infer(samples);
    info!(
        measured = model.measured,
        charge_efficiency = model.charge_efficiency,
        discharge_efficiency = model.discharge_efficiency,
        max_charge_wh = model.max_charge_wh_per_hour,
        max_discharge_wh = model.max_discharge_wh_per_hour,
        "battery model inferred"
    );

    let base_kwh = base_capacity_kwh(request.battery_capacity_kwh);
    let base_capacity_wh = base_kwh * 1000.0;
    let today = request
        .calendar()
        .local_date(request.reference_time_ms())
        .unwrap_or(NaiveDate::MIN);
    let tariff = match request.tariff {
        Some(rates) => ActiveTariff::from(rates),
        None => active_tariff(&request.tariffs, today),
    };
    let parameters = ScenarioParameters {
        added_pv_percent: request.added_pv_percent,
        added_battery_kwh: request.added_battery_kwh,
        cost_per_kwp: request.cost_per_kwp,
        cost_per_kwh_battery: request.cost_per_kwh_battery,
        grid_cost_per_kwh: tariff.grid_cost_per_kwh,
        feed_in_per_kwh: tariff.feed_in_per_kwh,
    };

    let scenarios = compare_scenarios(
        samples,
        &model,
        base_capacity_wh,
        parameters.added_pv_percent,
        parameters.added_battery_kwh,
    );
    let years = years_covered(history.coverage.complete_days);
    let base_kwp = estimate_base_kwp(request.system_capacity_kwp, history.max_pv_wh);
    let financials = project(&scenarios, &parameters, base_kwp, years);
    let recommendation = sweep(
        samples,
        &model,
        base_capacity_wh,
        &parameters,
        years,
        &request.thresholds,
    );
    let data_basis = DataBasis::describe(samples, &model, scenarios.initial_soc_source);

    info!(
        complete_days = history.coverage.complete_days,
        years,
        base_kwp,
        yearly_benefit = financials.combined.yearly_benefit,
        "plan ready"
    );

    PlanOutcome::Ready(Box::new(PlanReport {
        window: request.window,
        coverage: history.coverage,
        data_basis,
        battery_model: model,
        tariff,
        parameters,
        base_capacity_kwh: base_kwh,
        scenarios,
        financials,
        recommendation,
    }))
}

/// Hour-by-hour flows of a simulated scenario of `report`.
///
/// Returns `None` for measured scenarios.
pub fn trace_scenario(
    request: &PlanRequest,
    report: &PlanReport,
    run: &ScenarioRun,
) -> Option<Vec<HourStep>> {
    let params = run.dispatch_params()?;
    let history = request.history();
    Some(trace(&history.samples, params, &report.battery_model))
}

fn fmt_scenario(f: &mut fmt::Formatter<'_>, label: &str, run: &ScenarioRun) -> fmt::Result {
    let r = &run.result;
    writeln!(
        f,
        "{label:<20} import {:>10.1} kWh  export {:>10.1} kWh  autonomy {:>5.1}%  ({})",
        r.imported_wh / 1000.0,
        r.exported_wh / 1000.0,
        r.autonomy_percent,
        run.mode
    )
}

impl fmt::Display for PlanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.coverage;
        let p = &self.parameters;
        writeln!(f, "--- Upgrade Plan ---")?;
        writeln!(
            f,
            "Window:              {} ({} of {} days complete, {}%)",
            self.window, c.complete_days, c.expected_days, c.percent
        )?;
        writeln!(
            f,
            "Upgrade:             +{:.0}% PV, +{:.1} kWh battery (base {:.1} kWh)",
            p.added_pv_percent, p.added_battery_kwh, self.base_capacity_kwh
        )?;
        writeln!(
            f,
            "Tariff:              {:.3}/kWh import, {:.3}/kWh feed-in ({})",
            p.grid_cost_per_kwh, p.feed_in_per_kwh, self.tariff.source
        )?;
        match self.data_basis.round_trip_efficiency_percent {
            Some(rte) => writeln!(f, "Battery efficiency:  {rte}% round trip (measured)")?,
            None => writeln!(f, "Battery efficiency:  assumed lossless")?,
        }
        writeln!(f, "Start charge:        {}", self.data_basis.initial_soc_source)?;
        fmt_scenario(f, "Base", &self.scenarios.base)?;
        fmt_scenario(f, "PV only", &self.scenarios.pv_only)?;
        fmt_scenario(f, "PV + battery", &self.scenarios.pv_plus_battery)?;
        writeln!(f, "Combined:            {}", self.financials.combined)?;
        writeln!(f, "PV only:             {}", self.financials.pv_only)?;
        writeln!(f, "Battery increment:   {}", self.financials.battery_incremental)?;
        match &self.recommendation.best_yearly {
            Some(b) => writeln!(
                f,
                "Best yearly benefit: +{:.0} kWh ({:.2}/yr)",
                b.added_kwh, b.yearly_benefit
            )?,
            None => writeln!(f, "Best yearly benefit: none")?,
        }
        match &self.recommendation.recommended {
            Some(r) => write!(
                f,
                "Recommended battery: +{:.0} kWh (payback {:.1} yr)",
                r.added_kwh, r.payback_years
            ),
            None => write!(f, "Recommended battery: none"),
        }
    }
}

impl fmt::Display for PlanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(report) => write!(f, "{report}"),
            Self::InsufficientData { coverage } => write!(
                f,
                "Insufficient data: {} complete days of {} expected ({} days with data)",
                coverage.complete_days, coverage.expected_days, coverage.days_with_data
            ),
        }
    }
}
