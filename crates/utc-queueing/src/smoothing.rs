//! Exponential smoothing of rate observations.

use crate::error::ConfigError;

/// Check that a smoothing factor lies in `(0, 1]`.
pub fn validate_alpha(alpha: f64) -> Result<(), ConfigError> {
    if alpha > 0.0 && alpha <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::Alpha(alpha))
    }
}

/// Blend an observation into a prior estimate.
///
/// Returns `observed` unchanged on cold start (`prior == None`), otherwise
/// `alpha * observed + (1 - alpha) * prior`.
pub fn smooth(prior: Option<f64>, observed: f64, alpha: f64) -> Result<f64, ConfigError> {
    validate_alpha(alpha)?;
    Ok(match prior {
        None => observed,
        Some(prior) => alpha * observed + (1.0 - alpha) * prior,
    })
}
