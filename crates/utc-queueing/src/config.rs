//! Engine configuration, loadable from a flat TOML file.
//!
//! ```toml
//! alpha = 0.3
//! threshold_low = 0.6
//! threshold_high = 0.9
//! relax_threshold = 0.5
//! epsilon = 1e-9
//! ```
//!
//! Every field is optional and falls back to its default. Values are
//! validated eagerly; an `EngineConfig` that exists is a valid one.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::protection::{
    DEFAULT_RELAX_THRESHOLD, DEFAULT_THRESHOLD_HIGH, DEFAULT_THRESHOLD_LOW, ProtectionPolicy,
};
use crate::smoothing::validate_alpha;

pub const DEFAULT_ALPHA: f64 = 0.3;
pub const DEFAULT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// EWMA weight given to each new observation, in `(0, 1]`.
    pub alpha: f64,
    /// Utilization at or above which writes require approval.
    pub threshold_low: f64,
    /// Utilization at or above which the unit goes read-only.
    pub threshold_high: f64,
    /// Utilization below which the level may relax one step.
    pub relax_threshold: f64,
    /// Capacity floor; smoothed service rates never drop below it.
    pub epsilon: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            threshold_low: DEFAULT_THRESHOLD_LOW,
            threshold_high: DEFAULT_THRESHOLD_HIGH,
            relax_threshold: DEFAULT_RELAX_THRESHOLD,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl EngineConfig {
    pub fn new(
        alpha: f64,
        threshold_low: f64,
        threshold_high: f64,
        relax_threshold: f64,
        epsilon: f64,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            alpha,
            threshold_low,
            threshold_high,
            relax_threshold,
            epsilon,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check ranges and threshold ordering.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_alpha(self.alpha)?;
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(ConfigError::Epsilon(self.epsilon));
        }
        self.policy().map(|_| ())
    }

    /// The state machine thresholds as a validated policy.
    pub fn policy(&self) -> Result<ProtectionPolicy, ConfigError> {
        ProtectionPolicy::new(self.threshold_low, self.threshold_high, self.relax_threshold)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.alpha, 0.3);
        assert_eq!(config.policy().unwrap(), ProtectionPolicy::default());
    }

    #[test]
    fn parse_partial_file_keeps_defaults() {
        let config = EngineConfig::from_toml_str("alpha = 0.5\n").unwrap();
        assert_eq!(config.alpha, 0.5);
        assert_eq!(config.threshold_low, 0.6);
        assert_eq!(config.threshold_high, 0.9);
        assert_eq!(config.relax_threshold, 0.5);
        assert_eq!(config.epsilon, DEFAULT_EPSILON);
    }

    #[test]
    fn parse_empty_file_is_default() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn rejects_bad_alpha() {
        assert!(matches!(
            EngineConfig::from_toml_str("alpha = 0.0"),
            Err(ConfigError::Alpha(_))
        ));
        assert!(matches!(
            EngineConfig::new(1.5, 0.6, 0.9, 0.5, 1e-9),
            Err(ConfigError::Alpha(_))
        ));
        assert!(EngineConfig::new(1.0, 0.6, 0.9, 0.5, 1e-9).is_ok());
    }

    #[test]
    fn rejects_bad_epsilon() {
        for eps in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                EngineConfig::new(0.3, 0.6, 0.9, 0.5, eps),
                Err(ConfigError::Epsilon(_))
            ));
        }
    }

    #[test]
    fn rejects_misordered_thresholds() {
        let err = EngineConfig::from_toml_str("threshold_low = 0.95").unwrap_err();
        assert!(matches!(err, ConfigError::Thresholds { .. }));
        assert!(err.to_string().contains("low (0.95)"));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(
            EngineConfig::from_toml_str("alpah = 0.3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        let config = EngineConfig::new(0.25, 0.7, 0.95, 0.4, 1e-6).unwrap();
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        assert_eq!(EngineConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = EngineConfig::from_file(Path::new("/nonexistent/engine.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
