//! Timeframe enumeration and per-timeframe policy.
//!
//! The closed set of supported timeframes, their nominal bar intervals,
//! the minimum bar counts required for validation, and the coarser base
//! interval used when a timeframe has no direct provider interval.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported chart timeframes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Timeframe {
    /// 1 minute
    M1,
    /// 5 minutes
    M5,
    /// 15 minutes
    M15,
    /// 30 minutes
    M30,
    /// 1 hour
    H1,
    /// 4 hours
    H4,
    /// 1 day
    D1,
    /// 1 week
    W1,
    /// 1 month (nominal 30 days)
    #[serde(rename = "MN1")]
    Mn1,
}

impl Timeframe {
    /// All timeframes, coarsest last.
    pub const ALL: [Self; 9] = [
        Self::M1,
        Self::M5,
        Self::M15,
        Self::M30,
        Self::H1,
        Self::H4,
        Self::D1,
        Self::W1,
        Self::Mn1,
    ];

    /// Nominal interval between consecutive bars.
    #[must_use]
    pub fn duration(self) -> Duration {
        match self {
            Self::M1 => Duration::minutes(1),
            Self::M5 => Duration::minutes(5),
            Self::M15 => Duration::minutes(15),
            Self::M30 => Duration::minutes(30),
            Self::H1 => Duration::hours(1),
            Self::H4 => Duration::hours(4),
            Self::D1 => Duration::days(1),
            Self::W1 => Duration::weeks(1),
            Self::Mn1 => Duration::days(30),
        }
    }

    /// Minimum bar count a frame must carry to pass validation.
    #[must_use]
    pub const fn min_bars(self) -> usize {
        match self {
            Self::M1 | Self::M5 | Self::M15 | Self::M30 | Self::H1 | Self::H4 => 50,
            Self::D1 => 100,
            Self::W1 | Self::Mn1 => 52,
        }
    }

    /// Returns true for timeframes finer than one day.
    #[must_use]
    pub const fn is_intraday(self) -> bool {
        matches!(
            self,
            Self::M1 | Self::M5 | Self::M15 | Self::M30 | Self::H1 | Self::H4
        )
    }

    /// The interval actually requested from a data provider.
    ///
    /// H4 and MN1 have no direct provider interval; they are fetched at a
    /// supported coarser-grained base and resampled.
    #[must_use]
    pub const fn provider_base(self) -> Self {
        match self {
            Self::H4 => Self::H1,
            Self::Mn1 => Self::D1,
            other => other,
        }
    }

    /// Returns true when fetches at this timeframe require resampling.
    #[must_use]
    pub fn needs_resample(self) -> bool {
        self.provider_base() != self
    }

    /// Wire/file form of the timeframe (`M15`, `H4`, `MN1`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::M1 => "M1",
            Self::M5 => "M5",
            Self::M15 => "M15",
            Self::M30 => "M30",
            Self::H1 => "H1",
            Self::H4 => "H4",
            Self::D1 => "D1",
            Self::W1 => "W1",
            Self::Mn1 => "MN1",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = UnknownTimeframe;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "M1" => Ok(Self::M1),
            "M5" => Ok(Self::M5),
            "M15" => Ok(Self::M15),
            "M30" => Ok(Self::M30),
            "H1" => Ok(Self::H1),
            "H4" => Ok(Self::H4),
            "D1" => Ok(Self::D1),
            "W1" => Ok(Self::W1),
            "MN1" => Ok(Self::Mn1),
            _ => Err(UnknownTimeframe(s.to_string())),
        }
    }
}

/// Parse error for [`Timeframe`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown timeframe '{0}'")]
pub struct UnknownTimeframe(pub String);
