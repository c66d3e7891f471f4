//! Utilization ratio from smoothed rates.

use crate::error::{QueueingError, QueueingResult};

/// Floor a capacity estimate at `epsilon`. NaN collapses to the floor too.
pub fn floor_capacity(mu_hat: f64, epsilon: f64) -> f64 {
    if mu_hat >= epsilon { mu_hat } else { epsilon }
}

/// Compute ρ = λ̂ / max(μ̂, ε).
///
/// A collapsing or misreported capacity is not an error: it is clamped to
/// `epsilon`, which yields a very large ρ and pushes the unit toward the
/// most restrictive level. There is no upper clamp; ρ > 1 means overload.
pub fn utilization(lambda_hat: f64, mu_hat: f64, epsilon: f64) -> QueueingResult<f64> {
    if lambda_hat.is_nan() || lambda_hat < 0.0 {
        return Err(QueueingError::Validation(format!(
            "arrival estimate must be >= 0, got {lambda_hat}"
        )));
    }
    Ok(lambda_hat / floor_capacity(mu_hat, epsilon))
}
