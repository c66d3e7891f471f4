//! Protection state machine — asymmetric hysteresis over utilization.
//!
//! Escalation jumps straight to the highest level implied by ρ. Relaxation
//! moves down one level per evaluation and only when ρ is below the lower
//! `relax_threshold`; between `relax_threshold` and `threshold_low` the
//! level holds.

use serde::{Deserialize, Serialize};
use utc_state::ProtectionLevel;

use crate::error::ConfigError;

pub const DEFAULT_THRESHOLD_LOW: f64 = 0.6;
pub const DEFAULT_THRESHOLD_HIGH: f64 = 0.9;
pub const DEFAULT_RELAX_THRESHOLD: f64 = 0.5;

/// Direction of a single evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Escalated,
    Relaxed,
    Held,
}

/// Outcome of evaluating one utilization sample against a current level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub from: ProtectionLevel,
    pub to: ProtectionLevel,
    pub rho: f64,
}

impl Transition {
    pub fn kind(&self) -> TransitionKind {
        match self.to.cmp(&self.from) {
            std::cmp::Ordering::Greater => TransitionKind::Escalated,
            std::cmp::Ordering::Less => TransitionKind::Relaxed,
            std::cmp::Ordering::Equal => TransitionKind::Held,
        }
    }

    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Threshold set driving the protection state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProtectionPolicy {
    threshold_low: f64,
    threshold_high: f64,
    relax_threshold: f64,
}

impl Default for ProtectionPolicy {
    fn default() -> Self {
        Self {
            threshold_low: DEFAULT_THRESHOLD_LOW,
            threshold_high: DEFAULT_THRESHOLD_HIGH,
            relax_threshold: DEFAULT_RELAX_THRESHOLD,
        }
    }
}

impl ProtectionPolicy {
    /// Build a policy, requiring `0 <= relax < low < high <= 1`.
    pub fn new(
        threshold_low: f64,
        threshold_high: f64,
        relax_threshold: f64,
    ) -> Result<Self, ConfigError> {
        let ordered = 0.0 <= relax_threshold
            && relax_threshold < threshold_low
            && threshold_low < threshold_high
            && threshold_high <= 1.0;
        if !ordered {
            return Err(ConfigError::Thresholds {
                relax: relax_threshold,
                low: threshold_low,
                high: threshold_high,
            });
        }
        Ok(Self {
            threshold_low,
            threshold_high,
            relax_threshold,
        })
    }

    pub fn threshold_low(&self) -> f64 {
        self.threshold_low
    }

    pub fn threshold_high(&self) -> f64 {
        self.threshold_high
    }

    pub fn relax_threshold(&self) -> f64 {
        self.relax_threshold
    }

    /// The level a fresh unit would get from `rho` alone, ignoring history.
    pub fn implied_level(&self, rho: f64) -> ProtectionLevel {
        if rho.is_nan() || rho >= self.threshold_high {
            ProtectionLevel::ReadOnly
        } else if rho >= self.threshold_low {
            ProtectionLevel::RequireApproval
        } else {
            ProtectionLevel::Permissive
        }
    }

    /// Evaluate one utilization sample against the current level.
    ///
    /// A NaN `rho` counts as overload.
    pub fn evaluate(&self, current: ProtectionLevel, rho: f64) -> Transition {
        let to = if rho.is_nan() || rho >= self.threshold_low {
            current.max(self.implied_level(rho))
        } else if rho < self.relax_threshold {
            current.relaxed()
        } else {
            current
        };
        Transition {
            from: current,
            to,
            rho,
        }
    }

    /// Shorthand for `evaluate(current, rho).to`.
    pub fn next_level(&self, current: ProtectionLevel, rho: f64) -> ProtectionLevel {
        self.evaluate(current, rho).to
    }
}
