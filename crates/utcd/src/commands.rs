//! Subcommand implementations. Each writes its result to `out` so the
//! binary prints to stdout while logs stay on stderr.

use std::io::Write;

use utc_queueing::{ProtectionService, QueueingError, render_prometheus};
use utc_state::FeatureStore;

pub fn observe<S: FeatureStore>(
    service: &ProtectionService<S>,
    out: &mut impl Write,
    unit: &str,
    arrival_rate: f64,
    service_rate: f64,
) -> anyhow::Result<()> {
    service.update_feature(unit, arrival_rate, service_rate)?;
    let summary = service.get_metrics_summary(unit)?;
    writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
    Ok(())
}

/// Print the unit's level. An untracked unit is reported, not treated as
/// a failure: gatekeepers are expected to fall back to permissive.
pub fn level<S: FeatureStore>(
    service: &ProtectionService<S>,
    out: &mut impl Write,
    unit: &str,
) -> anyhow::Result<()> {
    match service.get_protection_level(unit) {
        Ok(level) => writeln!(out, "{level}")?,
        Err(QueueingError::NotFound(_)) => {
            writeln!(out, "{unit} is not tracked (treat as permissive)")?
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub fn summary<S: FeatureStore>(
    service: &ProtectionService<S>,
    out: &mut impl Write,
    unit: &str,
) -> anyhow::Result<()> {
    let summary = service.get_metrics_summary(unit)?;
    writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
    Ok(())
}

pub fn list<S: FeatureStore>(
    service: &ProtectionService<S>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let features = service.list_features()?;
    if features.is_empty() {
        writeln!(out, "no units tracked")?;
        return Ok(());
    }
    writeln!(
        out,
        "{:<32} {:>12} {:>12} {:>8}  LEVEL",
        "UNIT", "LAMBDA", "MU", "RHO"
    )?;
    for f in features {
        writeln!(
            out,
            "{:<32} {:>12.2} {:>12.2} {:>8.3}  {}",
            f.unit,
            f.lambda_hat,
            f.mu_hat,
            f.rho(),
            f.level
        )?;
    }
    Ok(())
}

pub fn reset<S: FeatureStore>(
    service: &ProtectionService<S>,
    out: &mut impl Write,
    unit: &str,
) -> anyhow::Result<()> {
    if service.reset_unit(unit)? {
        writeln!(out, "{unit} reset")?;
    } else {
        writeln!(out, "{unit} was not tracked")?;
    }
    Ok(())
}

pub fn metrics<S: FeatureStore>(
    service: &ProtectionService<S>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let features = service.list_features()?;
    out.write_all(render_prometheus(&features).as_bytes())?;
    Ok(())
}
