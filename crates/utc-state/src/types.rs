//! Domain types for the feature store.
//!
//! A [`Feature`] holds the smoothed queueing estimates and current
//! protection level of a single unit. Utilization is never stored; it is
//! derived from the persisted rate pair every time it is read.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a tracked unit (e.g. "payments-api", "user:alice").
pub type UnitId = String;

// ── Protection level ──────────────────────────────────────────────

/// Discrete enforcement mode derived from utilization.
///
/// Variants are ordered by strictness, so `Permissive < RequireApproval <
/// ReadOnly` and `max()` picks the more restrictive of two levels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionLevel {
    /// All operations allowed.
    #[default]
    Permissive,
    /// Writes need human approval.
    RequireApproval,
    /// Writes denied, reads allowed.
    ReadOnly,
}

impl ProtectionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permissive => "permissive",
            Self::RequireApproval => "require_approval",
            Self::ReadOnly => "read_only",
        }
    }

    /// Numeric severity (0, 1, 2) for gauges and comparisons across processes.
    pub fn severity(&self) -> u8 {
        match self {
            Self::Permissive => 0,
            Self::RequireApproval => 1,
            Self::ReadOnly => 2,
        }
    }

    /// One level less strict, saturating at `Permissive`.
    pub fn relaxed(&self) -> Self {
        match self {
            Self::ReadOnly => Self::RequireApproval,
            Self::RequireApproval | Self::Permissive => Self::Permissive,
        }
    }

    pub fn allows_writes(&self) -> bool {
        matches!(self, Self::Permissive)
    }

    pub fn requires_approval_for_writes(&self) -> bool {
        matches!(self, Self::RequireApproval)
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::ReadOnly)
    }
}

impl fmt::Display for ProtectionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unrecognised protection level name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown protection level: {0}")]
pub struct UnknownLevel(pub String);

impl FromStr for ProtectionLevel {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(Self::Permissive),
            "require_approval" => Ok(Self::RequireApproval),
            "read_only" => Ok(Self::ReadOnly),
            other => Err(UnknownLevel(other.to_string())),
        }
    }
}

// ── Feature ───────────────────────────────────────────────────────

/// Smoothed queueing estimates for one unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    pub unit: UnitId,
    /// Smoothed arrival rate (λ̂), never negative.
    pub lambda_hat: f64,
    /// Smoothed service rate (μ̂), already floored at the capacity epsilon.
    pub mu_hat: f64,
    /// Current protection level.
    pub level: ProtectionLevel,
    /// Number of observations folded into the estimates.
    pub observation_count: u64,
    /// Unix timestamp (seconds) of the first observation.
    pub created_at: u64,
    /// Unix timestamp (seconds) of the last mutation.
    pub updated_at: u64,
}

impl Feature {
    /// A feature for a unit that has not absorbed any observation yet.
    pub fn new(unit: impl Into<UnitId>, now: u64) -> Self {
        Self {
            unit: unit.into(),
            lambda_hat: 0.0,
            mu_hat: 0.0,
            level: ProtectionLevel::Permissive,
            observation_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Utilization ratio ρ = λ̂ / μ̂, derived from the stored pair.
    pub fn rho(&self) -> f64 {
        self.lambda_hat / self.mu_hat
    }

    /// Build the key for the features table.
    pub fn table_key(&self) -> &str {
        &self.unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_order_by_strictness() {
        assert!(ProtectionLevel::Permissive < ProtectionLevel::RequireApproval);
        assert!(ProtectionLevel::RequireApproval < ProtectionLevel::ReadOnly);
        assert_eq!(
            ProtectionLevel::Permissive.max(ProtectionLevel::ReadOnly),
            ProtectionLevel::ReadOnly
        );
    }

    #[test]
    fn level_relaxes_one_step() {
        assert_eq!(ProtectionLevel::ReadOnly.relaxed(), ProtectionLevel::RequireApproval);
        assert_eq!(ProtectionLevel::RequireApproval.relaxed(), ProtectionLevel::Permissive);
        assert_eq!(ProtectionLevel::Permissive.relaxed(), ProtectionLevel::Permissive);
    }

    #[test]
    fn level_string_forms() {
        for level in [
            ProtectionLevel::Permissive,
            ProtectionLevel::RequireApproval,
            ProtectionLevel::ReadOnly,
        ] {
            assert_eq!(level.as_str().parse::<ProtectionLevel>().unwrap(), level);
            let json = serde_json::to_string(&level).unwrap();
            assert_eq!(json, format!("\"{}\"", level.as_str()));
        }
        assert_eq!(
            "locked".parse::<ProtectionLevel>(),
            Err(UnknownLevel("locked".to_string()))
        );
    }

    #[test]
    fn write_gating_helpers() {
        assert!(ProtectionLevel::Permissive.allows_writes());
        assert!(!ProtectionLevel::RequireApproval.allows_writes());
        assert!(ProtectionLevel::RequireApproval.requires_approval_for_writes());
        assert!(ProtectionLevel::ReadOnly.is_read_only());
    }

    #[test]
    fn rho_is_derived_not_stored() {
        let mut feature = Feature::new("payments-api", 1000);
        feature.lambda_hat = 70.0;
        feature.mu_hat = 100.0;
        assert!((feature.rho() - 0.7).abs() < 1e-12);

        let json = serde_json::to_value(&feature).unwrap();
        assert!(json.get("rho").is_none());
        assert_eq!(json["level"], "permissive");
    }
}
