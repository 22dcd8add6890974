//! Dated electricity tariffs and selection of the one in force.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Grid price used when no tariff is configured.
pub const DEFAULT_GRID_COST_PER_KWH: f64 = 0.30;
/// Feed-in price used when no tariff is configured.
pub const DEFAULT_FEED_IN_PER_KWH: f64 = 0.08;

/// A tariff taking effect on `valid_from`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tariff {
    /// First day the prices apply.
    pub valid_from: NaiveDate,
    /// Price per imported kWh.
    pub cost_per_kwh: f64,
    /// Price per exported kWh.
    pub feed_in_per_kwh: f64,
}

/// Explicit price pair, bypassing dated tariffs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TariffRates {
    /// Price per imported kWh.
    pub grid_cost_per_kwh: f64,
    /// Price per exported kWh.
    pub feed_in_per_kwh: f64,
}

/// Where the active prices came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TariffSource {
    /// A dated tariff from the list.
    Tariff,
    /// Rates passed in directly.
    Explicit,
    /// Built-in fallback prices.
    Default,
}

impl fmt::Display for TariffSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tariff => write!(f, "tariff"),
            Self::Explicit => write!(f, "explicit"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Prices used for the financial projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActiveTariff {
    /// Price per imported kWh.
    pub grid_cost_per_kwh: f64,
    /// Price per exported kWh.
    pub feed_in_per_kwh: f64,
    /// Start date of the selected tariff, if one was selected.
    pub valid_from: Option<NaiveDate>,
    /// Origin of the prices.
    pub source: TariffSource,
}

impl ActiveTariff {
    /// Built-in fallback prices.
    pub fn fallback() -> Self {
        Self {
            grid_cost_per_kwh: DEFAULT_GRID_COST_PER_KWH,
            feed_in_per_kwh: DEFAULT_FEED_IN_PER_KWH,
            valid_from: None,
            source: TariffSource::Default,
        }
    }
}

impl From<TariffRates> for ActiveTariff {
    fn from(rates: TariffRates) -> Self {
        Self {
            grid_cost_per_kwh: rates.grid_cost_per_kwh,
            feed_in_per_kwh: rates.feed_in_per_kwh,
            valid_from: None,
            source: TariffSource::Explicit,
        }
    }
}

/// Picks the tariff in force on `today`.
///
/// The latest tariff with `valid_from <= today` wins. If every tariff starts
/// in the future the newest one is used, and with no tariffs at all the
/// built-in defaults apply. Among tariffs sharing a start date the first
/// listed wins.
pub fn active_tariff(tariffs: &[Tariff], today: NaiveDate) -> ActiveTariff {
    let current = tariffs
        .iter()
        .rev()
        .filter(|t| t.valid_from <= today)
        .max_by_key(|t| t.valid_from);
    let selected = current.or_else(|| tariffs.iter().rev().max_by_key(|t| t.valid_from));

    match selected {
        Some(t) => ActiveTariff {
            grid_cost_per_kwh: t.cost_per_kwh,
            feed_in_per_kwh: t.feed_in_per_kwh,
            valid_from: Some(t.valid_from),
            source: TariffSource::Tariff,
        },
        None => {
            warn!(
                grid_cost_per_kwh = DEFAULT_GRID_COST_PER_KWH,
                feed_in_per_kwh = DEFAULT_FEED_IN_PER_KWH,
                "no tariff configured, using default prices"
            );
            ActiveTariff::fallback()
        }
    }
}
