//! Observation replay — feeds recorded `(arrival, service)` samples into
//! the protection service at a fixed pace.
//!
//! Input is JSON lines:
//!
//! ```text
//! {"unit": "payments-api", "arrival_rate": 70.0, "service_rate": 100.0}
//! {"unit": "payments-api", "arrival_rate": 95.0, "service_rate": 100.0}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use utc_queueing::{ProtectionService, QueueingError};
use utc_state::FeatureStore;

/// One recorded sample for a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub unit: String,
    pub arrival_rate: f64,
    pub service_rate: f64,
}

/// What a replay run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplayStats {
    pub applied: usize,
    pub rejected: usize,
    pub interrupted: bool,
}

/// Parse JSON-lines observations.
pub fn parse_observations(content: &str) -> anyhow::Result<Vec<Observation>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(idx, line)| {
            serde_json::from_str::<Observation>(line)
                .with_context(|| format!("invalid observation on line {}", idx + 1))
        })
        .collect()
}

/// Apply `observations` one per `interval` tick until done or shutdown.
///
/// Observations the service rejects as invalid are logged and counted;
/// any other service error aborts the replay. Shutdown is signalled by a
/// change on (or drop of) the `shutdown` sender.
pub async fn run_replay<S: FeatureStore>(
    service: Arc<ProtectionService<S>>,
    observations: Vec<Observation>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<ReplayStats> {
    // tokio intervals panic on a zero period.
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    let mut stats = ReplayStats::default();

    info!(
        count = observations.len(),
        interval_ms = interval.as_millis() as u64,
        "replay started"
    );

    for obs in observations {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => {
                info!(applied = stats.applied, "replay interrupted");
                stats.interrupted = true;
                break;
            }
        }

        match service.update_feature(&obs.unit, obs.arrival_rate, obs.service_rate) {
            Ok(_) => stats.applied += 1,
            Err(QueueingError::Validation(reason)) => {
                warn!(unit = %obs.unit, %reason, "observation rejected");
                stats.rejected += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("replay failed on unit {}", obs.unit));
            }
        }
    }

    info!(
        applied = stats.applied,
        rejected = stats.rejected,
        "replay finished"
    );
    Ok(stats)
}
