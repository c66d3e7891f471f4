//! ProtectionService — the only component with side effects.
//!
//! Orchestrates one observation: load the unit's feature, smooth both rates,
//! derive ρ, run the state machine, persist. Updates to the same unit are
//! serialized through a per-unit lock so no observation is lost to a stale
//! prior; different units never contend. Reads take no unit lock and see
//! whatever complete feature the store last committed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{debug, info, warn};

use utc_state::{Feature, FeatureStore, ProtectionLevel};

use crate::config::EngineConfig;
use crate::error::{QueueingError, QueueingResult};
use crate::protection::{ProtectionPolicy, TransitionKind};
use crate::smoothing::smooth;
use crate::utilization::{floor_capacity, utilization};

/// Read-only projection of a unit's feature for dashboards and gatekeepers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub unit: String,
    pub lambda_hat: f64,
    pub mu_hat: f64,
    pub rho: f64,
    pub level: ProtectionLevel,
    pub interpretation: String,
    pub recommendation: String,
    pub observation_count: u64,
    pub updated_at: u64,
}

impl MetricsSummary {
    fn from_feature(feature: &Feature) -> Self {
        let rho = feature.rho();
        let (health, recommendation) = match feature.level {
            ProtectionLevel::Permissive => ("healthy", "All operations allowed"),
            ProtectionLevel::RequireApproval => (
                "elevated",
                "Writes require approval due to increased load",
            ),
            ProtectionLevel::ReadOnly => ("critical", "Read-only mode to prevent overload"),
        };
        Self {
            unit: feature.unit.clone(),
            lambda_hat: feature.lambda_hat,
            mu_hat: feature.mu_hat,
            rho,
            level: feature.level,
            interpretation: format!("System is {:.1}% utilized ({health})", rho * 100.0),
            recommendation: recommendation.to_string(),
            observation_count: feature.observation_count,
            updated_at: feature.updated_at,
        }
    }
}

/// Computes and persists protection levels for tracked units.
pub struct ProtectionService<S> {
    store: S,
    config: EngineConfig,
    policy: ProtectionPolicy,
    /// One lock per unit that has ever been updated through this instance.
    unit_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: FeatureStore> ProtectionService<S> {
    /// Create a service over `store`, validating `config` up front.
    pub fn new(store: S, config: EngineConfig) -> QueueingResult<Self> {
        config.validate()?;
        let policy = config.policy()?;
        info!(
            alpha = config.alpha,
            threshold_low = config.threshold_low,
            threshold_high = config.threshold_high,
            relax_threshold = config.relax_threshold,
            epsilon = config.epsilon,
            "protection service initialized"
        );
        Ok(Self {
            store,
            config,
            policy,
            unit_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn policy(&self) -> &ProtectionPolicy {
        &self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fold one `(arrival, service)` observation into the unit's feature.
    ///
    /// The first observation for a unit cold-starts the estimates with the
    /// raw rates. Invalid input is rejected before anything is loaded.
    pub fn update_feature(
        &self,
        unit: &str,
        arrival_rate: f64,
        service_rate: f64,
    ) -> QueueingResult<Feature> {
        validate_unit(unit)?;
        if !(arrival_rate.is_finite() && arrival_rate >= 0.0) {
            return Err(QueueingError::Validation(format!(
                "arrival rate must be finite and >= 0, got {arrival_rate}"
            )));
        }
        if !(service_rate.is_finite() && service_rate > 0.0) {
            return Err(QueueingError::Validation(format!(
                "service rate must be finite and > 0, got {service_rate}"
            )));
        }

        let lock = self.unit_lock(unit);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let now = epoch_secs();
        let prior = self.store.load(unit)?;
        let cold_start = prior.is_none();
        let mut feature = prior.unwrap_or_else(|| Feature::new(unit, now));
        let (prior_lambda, prior_mu) = if cold_start {
            (None, None)
        } else {
            (Some(feature.lambda_hat), Some(feature.mu_hat))
        };

        let lambda_hat = smooth(prior_lambda, arrival_rate, self.config.alpha)?;
        let mu_hat = floor_capacity(
            smooth(prior_mu, service_rate, self.config.alpha)?,
            self.config.epsilon,
        );
        let rho = utilization(lambda_hat, mu_hat, self.config.epsilon)?;
        let transition = self.policy.evaluate(feature.level, rho);

        feature.lambda_hat = lambda_hat;
        feature.mu_hat = mu_hat;
        feature.level = transition.to;
        feature.observation_count += 1;
        feature.updated_at = now;

        self.store.save(&feature)?;

        match transition.kind() {
            TransitionKind::Escalated => warn!(
                %unit,
                from = %transition.from,
                to = %transition.to,
                rho,
                "protection escalated"
            ),
            TransitionKind::Relaxed => info!(
                %unit,
                from = %transition.from,
                to = %transition.to,
                rho,
                "protection relaxed"
            ),
            TransitionKind::Held => debug!(
                %unit,
                level = %transition.to,
                rho,
                lambda_hat,
                mu_hat,
                cold_start,
                "feature updated"
            ),
        }

        Ok(feature)
    }

    /// Current persisted level. Never creates a feature.
    pub fn get_protection_level(&self, unit: &str) -> QueueingResult<ProtectionLevel> {
        Ok(self.load_existing(unit)?.level)
    }

    /// Human-readable projection of a unit's estimates and level.
    pub fn get_metrics_summary(&self, unit: &str) -> QueueingResult<MetricsSummary> {
        let feature = self.load_existing(unit)?;
        Ok(MetricsSummary::from_feature(&feature))
    }

    /// All tracked units, busiest first.
    pub fn list_features(&self) -> QueueingResult<Vec<Feature>> {
        let mut features = self.store.list()?;
        features.sort_by(|a, b| {
            b.rho()
                .total_cmp(&a.rho())
                .then_with(|| a.unit.cmp(&b.unit))
        });
        Ok(features)
    }

    /// Drop a unit's feature so its next observation cold-starts.
    /// Returns true if the unit was tracked.
    pub fn reset_unit(&self, unit: &str) -> QueueingResult<bool> {
        validate_unit(unit)?;
        let lock = self.unit_lock(unit);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let existed = self.store.remove(unit)?;
        info!(%unit, existed, "unit reset");
        Ok(existed)
    }

    fn load_existing(&self, unit: &str) -> QueueingResult<Feature> {
        validate_unit(unit)?;
        self.store
            .load(unit)?
            .ok_or_else(|| QueueingError::NotFound(unit.to_string()))
    }

    fn unit_lock(&self, unit: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .unit_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(unit.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn validate_unit(unit: &str) -> QueueingResult<()> {
    if unit.trim().is_empty() {
        return Err(QueueingError::Validation(
            "unit identifier must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
