//! Colour tiers

use std::fmt;
use testcov_core::{Thresholds, TierColors};

/// Colour band a percentage falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    /// Below the medium threshold
    Low,
    /// From the medium threshold up to and including the high threshold
    Medium,
    /// Above the high threshold
    High,
}

impl Tier {
    /// Tier for `percent` under `thresholds`
    #[must_use]
    pub fn for_percent(percent: f64, thresholds: &Thresholds) -> Self {
        if percent < thresholds.medium {
            Self::Low
        } else if percent <= thresholds.high {
            Self::Medium
        } else {
            Self::High
        }
    }

    /// Configured colour for this tier
    #[must_use]
    pub fn color(self, colors: &TierColors) -> &str {
        match self {
            Self::Low => &colors.low,
            Self::Medium => &colors.medium,
            Self::High => &colors.high,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}
