//! Time-window selection and data coverage.
//!
//! Windows are aligned to local calendar days: the window ends at the start
//! of the local day after `now` and spans a fixed number of days backwards.
//! Only days with at least [`COMPLETE_DAY_MIN_SAMPLES`] hourly samples are
//! simulated.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::types::EnergySample;

/// Hourly samples a local day needs to count as complete.
pub const COMPLETE_DAY_MIN_SAMPLES: usize = 23;

const DAY_MS: i64 = 86_400_000;

/// History span used for simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationWindow {
    /// Last 7 days.
    Week,
    /// Last 30 days.
    Month,
    /// Last 182 days.
    HalfYear,
    /// Last 365 days.
    #[default]
    Year,
    /// Every sample.
    All,
}

impl SimulationWindow {
    /// Accepted names, as used in config files and on the command line.
    pub const NAMES: &'static [&'static str] = &["week", "month", "half_year", "year", "all"];

    /// Length in days, or `None` for [`SimulationWindow::All`].
    pub fn days(self) -> Option<u32> {
        match self {
            Self::Week => Some(7),
            Self::Month => Some(30),
            Self::HalfYear => Some(182),
            Self::Year => Some(365),
            Self::All => None,
        }
    }
}

impl fmt::Display for SimulationWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::HalfYear => "half_year",
            Self::Year => "year",
            Self::All => "all",
        };
        f.write_str(name)
    }
}

impl FromStr for SimulationWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "week" | "7d" => Ok(Self::Week),
            "month" | "30d" => Ok(Self::Month),
            "half_year" | "halfyear" | "182d" => Ok(Self::HalfYear),
            "year" | "365d" => Ok(Self::Year),
            "all" => Ok(Self::All),
            other => Err(format!(
                "unknown window '{other}', expected one of: {}",
                Self::NAMES.join(", ")
            )),
        }
    }
}

/// Maps timestamps onto local calendar days with a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCalendar {
    offset: FixedOffset,
}

impl Default for DayCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl DayCalendar {
    /// Calendar in UTC.
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    /// Calendar at `utc_offset_minutes` east of UTC.
    ///
    /// Offsets outside ±24 h fall back to UTC.
    pub fn new(utc_offset_minutes: i32) -> Self {
        match utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
        {
            Some(offset) => Self { offset },
            None => Self::utc(),
        }
    }

    /// Local date containing `timestamp_ms`.
    pub fn local_date(&self, timestamp_ms: i64) -> Option<NaiveDate> {
        DateTime::from_timestamp_millis(timestamp_ms)
            .map(|utc| utc.with_timezone(&self.offset).date_naive())
    }

    /// Epoch milliseconds of local midnight starting `date`.
    pub fn start_of_day_ms(&self, date: NaiveDate) -> Option<i64> {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        self.offset
            .from_local_datetime(&midnight)
            .single()
            .map(|dt| dt.timestamp_millis())
    }

    /// Half-open `[start, end)` bounds of `window` relative to `now_ms`.
    ///
    /// Returns `None` for [`SimulationWindow::All`] or when `now_ms` is out
    /// of the representable date range.
    pub fn bounds(&self, window: SimulationWindow, now_ms: i64) -> Option<WindowBounds> {
        let days = window.days()?;
        let today = self.local_date(now_ms)?;
        let tomorrow = today.succ_opt()?;
        let end_ms = self.start_of_day_ms(tomorrow)?;
        Some(WindowBounds {
            start_ms: end_ms - i64::from(days) * DAY_MS,
            end_ms,
            days,
        })
    }
}

/// Half-open time range of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowBounds {
    /// First included millisecond.
    pub start_ms: i64,
    /// First excluded millisecond.
    pub end_ms: i64,
    /// Calendar days spanned.
    pub days: u32,
}

impl WindowBounds {
    /// Whether `timestamp_ms` falls inside the range.
    pub fn contains(&self, timestamp_ms: i64) -> bool {
        self.start_ms <= timestamp_ms && timestamp_ms < self.end_ms
    }
}

/// How much of the window is backed by complete data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataCoverage {
    /// Local days with at least [`COMPLETE_DAY_MIN_SAMPLES`] samples.
    pub complete_days: usize,
    /// Local days with any sample.
    pub days_with_data: usize,
    /// Days the window should contain.
    pub expected_days: usize,
    /// `expected_days - complete_days`, floored at zero.
    pub missing_days: usize,
    /// Complete days as a rounded percentage of expected days (0..=100).
    pub percent: u32,
    /// Complete days as a percentage of days with data (0..=100).
    pub quality_percent: f64,
}

impl DataCoverage {
    /// Whether any complete day is available for simulation.
    pub fn is_sufficient(&self) -> bool {
        self.complete_days > 0
    }
}

/// Samples selected for simulation plus coverage statistics.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    /// Samples on complete days, sorted by timestamp.
    pub samples: Vec<EnergySample>,
    /// Coverage of the window.
    pub coverage: DataCoverage,
    /// Time bounds, `None` for [`SimulationWindow::All`].
    pub bounds: Option<WindowBounds>,
    /// Highest hourly PV value among all windowed samples (Wh).
    pub max_pv_wh: Option<f64>,
}

/// Restricts `samples` to `window` and drops incomplete local days.
pub fn select_window(
    samples: &[EnergySample],
    window: SimulationWindow,
    now_ms: i64,
    calendar: &DayCalendar,
) -> HistoryWindow {
    let bounds = calendar.bounds(window, now_ms);
    let windowed: Vec<(NaiveDate, &EnergySample)> = samples
        .iter()
        .filter(|s| bounds.is_none_or(|b| b.contains(s.timestamp_ms)))
        .filter_map(|s| calendar.local_date(s.timestamp_ms).map(|d| (d, s)))
        .collect();

    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for (date, _) in &windowed {
        *per_day.entry(*date).or_default() += 1;
    }

    let complete_days = per_day
        .values()
        .filter(|n| **n >= COMPLETE_DAY_MIN_SAMPLES)
        .count();
    let days_with_data = per_day.len();
    let expected_days = match bounds {
        Some(b) => b.days as usize,
        None => days_with_data,
    };
    let percent = if expected_days > 0 {
        ((complete_days as f64 / expected_days as f64) * 100.0)
            .round()
            .min(100.0) as u32
    } else {
        0
    };
    let quality_percent = if days_with_data > 0 {
        complete_days as f64 / days_with_data as f64 * 100.0
    } else {
        0.0
    };

    let max_pv_wh = windowed
        .iter()
        .map(|(_, s)| s.pv_wh)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))));

    let mut samples: Vec<EnergySample> = windowed
        .iter()
        .filter(|(date, _)| per_day.get(date).copied().unwrap_or(0) >= COMPLETE_DAY_MIN_SAMPLES)
        .map(|(_, s)| **s)
        .collect();
    samples.sort_by_key(|s| s.timestamp_ms);

    HistoryWindow {
        samples,
        coverage: DataCoverage {
            complete_days,
            days_with_data,
            expected_days,
            missing_days: expected_days.saturating_sub(complete_days),
            percent,
            quality_percent,
        },
        bounds,
        max_pv_wh,
    }
}
