use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bar granularities supported by the scanner.
///
/// Variants are declared shortest first so the derived ordering follows bar
/// duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    OneMin,
    ThreeMin,
    FiveMin,
    FifteenMin,
    ThirtyMin,
    OneHour,
    TwoHour,
    FourHour,
    SixHour,
    EightHour,
    TwelveHour,
    OneDay,
    ThreeDay,
    OneWeek,
}

impl Timeframe {
    /// Returns the duration of this timeframe in minutes
    pub fn to_minutes(&self) -> i64 {
        match self {
            Timeframe::OneMin => 1,
            Timeframe::ThreeMin => 3,
            Timeframe::FiveMin => 5,
            Timeframe::FifteenMin => 15,
            Timeframe::ThirtyMin => 30,
            Timeframe::OneHour => 60,
            Timeframe::TwoHour => 120,
            Timeframe::FourHour => 240,
            Timeframe::SixHour => 360,
            Timeframe::EightHour => 480,
            Timeframe::TwelveHour => 720,
            Timeframe::OneDay => 1440,
            Timeframe::ThreeDay => 4320,
            Timeframe::OneWeek => 10080,
        }
    }

    /// Bar duration in milliseconds, the unit exchange timestamps use.
    pub fn duration_ms(&self) -> i64 {
        self.to_minutes() * 60 * 1000
    }

    /// Exchange interval code ("1m", "4h", "1w", ...).
    ///
    /// This is also the value stored in the `timeframe` column.
    pub fn code(&self) -> &'static str {
        match self {
            Timeframe::OneMin => "1m",
            Timeframe::ThreeMin => "3m",
            Timeframe::FiveMin => "5m",
            Timeframe::FifteenMin => "15m",
            Timeframe::ThirtyMin => "30m",
            Timeframe::OneHour => "1h",
            Timeframe::TwoHour => "2h",
            Timeframe::FourHour => "4h",
            Timeframe::SixHour => "6h",
            Timeframe::EightHour => "8h",
            Timeframe::TwelveHour => "12h",
            Timeframe::OneDay => "1d",
            Timeframe::ThreeDay => "3d",
            Timeframe::OneWeek => "1w",
        }
    }

    /// Returns all available timeframes in ascending order
    pub fn all() -> Vec<Timeframe> {
        vec![
            Timeframe::OneMin,
            Timeframe::ThreeMin,
            Timeframe::FiveMin,
            Timeframe::FifteenMin,
            Timeframe::ThirtyMin,
            Timeframe::OneHour,
            Timeframe::TwoHour,
            Timeframe::FourHour,
            Timeframe::SixHour,
            Timeframe::EightHour,
            Timeframe::TwelveHour,
            Timeframe::OneDay,
            Timeframe::ThreeDay,
            Timeframe::OneWeek,
        ]
    }

    /// Returns the start timestamp (ms) of the bar containing `timestamp_ms`.
    ///
    /// Bars are aligned on the Unix epoch, which matches exchange alignment for
    /// every granularity up to a day. Weekly bars on Binance open on Monday, so
    /// they are shifted by the four days between 1970-01-01 (a Thursday) and
    /// the following Monday.
    pub fn period_start(&self, timestamp_ms: i64) -> i64 {
        let duration = self.duration_ms();
        let offset = match self {
            Timeframe::OneWeek => 4 * Timeframe::OneDay.duration_ms(),
            _ => 0,
        };
        (timestamp_ms - offset).div_euclid(duration) * duration + offset
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        // Exchanges use "1M" for one month, so minutes are matched case-sensitively.
        let code = if trimmed.ends_with('M') {
            trimmed.to_string()
        } else {
            trimmed.to_lowercase()
        };
        Timeframe::all()
            .into_iter()
            .find(|tf| tf.code() == code)
            .ok_or_else(|| {
                anyhow!(
                    "Invalid timeframe: '{}'. Valid options: 1m, 3m, 5m, 15m, 30m, 1h, 2h, 4h, 6h, 8h, 12h, 1d, 3d, 1w",
                    s
                )
            })
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
