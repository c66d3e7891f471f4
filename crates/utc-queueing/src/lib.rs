//! utc-queueing — predictive protection levels from queueing signals.
//!
//! Callers report observed arrival (λ) and service (μ) rates per unit. The
//! engine smooths both with an EWMA, derives utilization ρ = λ̂/μ̂, and feeds
//! ρ through an asymmetric hysteresis state machine that decides the unit's
//! protection level.
//!
//! # Protection Algorithm
//!
//! ```text
//! λ̂ = α·λ_obs + (1-α)·λ̂_prev        (cold start: λ̂ = λ_obs)
//! μ̂ = α·μ_obs + (1-α)·μ̂_prev        (floored at ε)
//! ρ  = λ̂ / μ̂
//!
//! if ρ >= high:    ReadOnly                      // jump straight up
//! elif ρ >= low:   max(current, RequireApproval) // never drops here
//! elif ρ < relax:  current relaxed one step      // ReadOnly → RequireApproval → Permissive
//! else:            current                       // dead zone
//! ```
//!
//! Escalation is immediate; recovery needs one confirmed low-load
//! observation per level, which keeps units from flapping near a boundary.

pub mod config;
pub mod error;
pub mod prometheus;
pub mod protection;
pub mod service;
pub mod smoothing;
pub mod utilization;

pub use config::EngineConfig;
pub use error::{ConfigError, QueueingError, QueueingResult};
pub use prometheus::render_prometheus;
pub use protection::{ProtectionPolicy, Transition, TransitionKind};
pub use service::{MetricsSummary, ProtectionService};
pub use smoothing::smooth;
pub use utilization::utilization;
