//! Alert tiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Categorical alert level. Ordered by urgency: `Skip < WatchList < HighPriority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertTier {
    Skip,
    WatchList,
    HighPriority,
}

impl AlertTier {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertTier::Skip => "skip",
            AlertTier::WatchList => "watch_list",
            AlertTier::HighPriority => "high_priority",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "skip" => Some(AlertTier::Skip),
            "watch_list" => Some(AlertTier::WatchList),
            "high_priority" => Some(AlertTier::HighPriority),
            _ => None,
        }
    }
}

impl fmt::Display for AlertTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score breakpoints for the tiers, plus the optional signal-count alert.
///
/// A policy without a watch list is two-tier: `Skip` or `HighPriority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub high_priority: u32,
    pub watch_list: Option<u32>,
    /// Alert when at least this many category signals fire, whatever the tier.
    pub signals_required: Option<u32>,
}

impl TierThresholds {
    /// Tier depends on the total alone and never decreases as it rises.
    pub fn tier_for(&self, total: u32) -> AlertTier {
        if total >= self.high_priority {
            AlertTier::HighPriority
        } else if self.watch_list.is_some_and(|w| total >= w) {
            AlertTier::WatchList
        } else {
            AlertTier::Skip
        }
    }

    pub fn alert_triggered(&self, tier: AlertTier, signals_met: u32) -> bool {
        tier > AlertTier::Skip || self.signals_required.is_some_and(|n| signals_met >= n)
    }

    pub(crate) fn validate(&self, max_total: u32) -> Result<(), String> {
        if self.high_priority > max_total {
            return Err(format!(
                "high_priority threshold {} exceeds the maximum total {max_total}",
                self.high_priority
            ));
        }
        if let Some(w) = self.watch_list {
            if w >= self.high_priority {
                return Err(format!(
                    "watch_list threshold {w} must be below high_priority {}",
                    self.high_priority
                ));
            }
        }
        if let Some(n) = self.signals_required {
            if n == 0 || n > 3 {
                return Err(format!("signals_required {n} must be between 1 and 3"));
            }
        }
        Ok(())
    }
}
