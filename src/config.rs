//! TOML planner configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::PlannerError;
use crate::finance::{DEFAULT_COST_PER_KWH_BATTERY, DEFAULT_COST_PER_KWP};
use crate::planner::{MAX_UTC_OFFSET_MINUTES, PlanRequest};
use crate::recommend::{MAX_CANDIDATE_KWH_LIMIT, RecommendationThresholds};
use crate::sim::types::EnergySample;
use crate::sim::window::SimulationWindow;
use crate::tariff::Tariff;

/// Top-level planner configuration parsed from TOML.
///
/// Every section is optional and defaults to the baseline preset. Load from
/// TOML with [`PlannerConfig::from_toml_file`] or pick a preset with
/// [`PlannerConfig::from_preset`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlannerConfig {
    /// Installed system.
    #[serde(default)]
    pub system: SystemConfig,
    /// Upgrade to evaluate.
    #[serde(default)]
    pub scenario: ScenarioConfig,
    /// Installation prices.
    #[serde(default)]
    pub costs: CostConfig,
    /// Dated electricity tariffs.
    #[serde(default)]
    pub tariffs: Vec<Tariff>,
    /// Battery sweep limits.
    #[serde(default)]
    pub recommendation: RecommendationThresholds,
}

/// Installed system parameters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SystemConfig {
    /// Installed battery (kWh); missing or non-positive means 5 kWh.
    pub battery_capacity_kwh: Option<f64>,
    /// Installed PV peak power (kWp); estimated from data when missing.
    pub system_capacity_kwp: Option<f64>,
    /// Local-day offset east of UTC (minutes).
    pub utc_offset_minutes: i32,
}

/// Upgrade to evaluate.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Extra PV (percent of current array).
    pub added_pv_percent: f64,
    /// Extra battery (kWh).
    pub added_battery_kwh: f64,
    /// History span to simulate.
    pub window: SimulationWindow,
}

/// Installation prices.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostConfig {
    /// PV cost per kWp.
    pub cost_per_kwp: f64,
    /// Battery cost per kWh.
    pub cost_per_kwh_battery: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            cost_per_kwp: DEFAULT_COST_PER_KWP,
            cost_per_kwh_battery: DEFAULT_COST_PER_KWH_BATTERY,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"scenario.added_pv_percent"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl PlannerConfig {
    /// Current system, no upgrade.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Half again as much PV, battery unchanged.
    pub fn pv_upgrade() -> Self {
        Self {
            scenario: ScenarioConfig {
                added_pv_percent: 50.0,
                ..ScenarioConfig::default()
            },
            ..Self::default()
        }
    }

    /// PV unchanged, 5 kWh more storage.
    pub fn storage_upgrade() -> Self {
        Self {
            scenario: ScenarioConfig {
                added_battery_kwh: 5.0,
                ..ScenarioConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &'static [&'static str] = &["baseline", "pv_upgrade", "storage_upgrade"];

    /// Loads a named preset.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::UnknownPreset`] if the name is not one of
    /// [`Self::PRESETS`].
    pub fn from_preset(name: &str) -> Result<Self, PlannerError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "pv_upgrade" => Ok(Self::pv_upgrade()),
            "storage_upgrade" => Ok(Self::storage_upgrade()),
            _ => Err(PlannerError::UnknownPreset {
                name: name.to_string(),
                available: Self::PRESETS.join(", "),
            }),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, PlannerError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, PlannerError> {
        Ok(toml::from_str(s)?)
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if the configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut check = |field: &str, value: f64| {
            if !value.is_finite() || value < 0.0 {
                errors.push(ConfigError {
                    field: field.into(),
                    message: format!("must be >= 0, got {value}"),
                });
            }
        };

        let sys = &self.system;
        if let Some(kwh) = sys.battery_capacity_kwh {
            check("system.battery_capacity_kwh", kwh);
        }
        if let Some(kwp) = sys.system_capacity_kwp {
            check("system.system_capacity_kwp", kwp);
        }

        check("scenario.added_pv_percent", self.scenario.added_pv_percent);
        check("scenario.added_battery_kwh", self.scenario.added_battery_kwh);
        check("costs.cost_per_kwp", self.costs.cost_per_kwp);
        check("costs.cost_per_kwh_battery", self.costs.cost_per_kwh_battery);

        for (i, t) in self.tariffs.iter().enumerate() {
            check(&format!("tariffs[{i}].cost_per_kwh"), t.cost_per_kwh);
            check(&format!("tariffs[{i}].feed_in_per_kwh"), t.feed_in_per_kwh);
        }

        let rec = &self.recommendation;
        check("recommendation.min_yearly_benefit", rec.min_yearly_benefit);
        check("recommendation.max_payback_years", rec.max_payback_years);

        if rec.candidate_step_kwh == 0 {
            errors.push(ConfigError {
                field: "recommendation.candidate_step_kwh".into(),
                message: "must be > 0".into(),
            });
        }
        if rec.max_candidate_kwh > MAX_CANDIDATE_KWH_LIMIT {
            errors.push(ConfigError {
                field: "recommendation.max_candidate_kwh".into(),
                message: format!("must be <= {MAX_CANDIDATE_KWH_LIMIT}"),
            });
        }
        if sys.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            errors.push(ConfigError {
                field: "system.utc_offset_minutes".into(),
                message: format!("must be within ±{MAX_UTC_OFFSET_MINUTES}"),
            });
        }

        errors
    }

    /// Builds a plan request for `samples` evaluated at `now_ms`.
    pub fn to_request(&self, samples: Vec<EnergySample>, now_ms: Option<i64>) -> PlanRequest {
        PlanRequest {
            samples,
            tariff: None,
            tariffs: self.tariffs.clone(),
            added_pv_percent: self.scenario.added_pv_percent,
            added_battery_kwh: self.scenario.added_battery_kwh,
            cost_per_kwp: self.costs.cost_per_kwp,
            cost_per_kwh_battery: self.costs.cost_per_kwh_battery,
            battery_capacity_kwh: self.system.battery_capacity_kwh,
            system_capacity_kwp: self.system.system_capacity_kwp,
            window: self.scenario.window,
            now_ms,
            utc_offset_minutes: self.system.utc_offset_minutes,
            thresholds: self.recommendation,
        }
    }
}
