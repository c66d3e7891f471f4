//! Prometheus text exposition format.
//!
//! Renders tracked features into the Prometheus text exposition format
//! for scraping by a Prometheus server or compatible agent.

use utc_state::Feature;

/// Render a list of features into Prometheus text format.
///
/// Produces GAUGE and COUNTER metrics with `unit` labels.
pub fn render_prometheus(features: &[Feature]) -> String {
    let mut out = String::new();

    out.push_str("# HELP utc_lambda_hat Smoothed arrival rate.\n");
    out.push_str("# TYPE utc_lambda_hat gauge\n");
    for f in features {
        out.push_str(&format!(
            "utc_lambda_hat{{unit=\"{}\"}} {:.4}\n",
            escape_label(&f.unit),
            f.lambda_hat
        ));
    }

    out.push_str("# HELP utc_mu_hat Smoothed service rate.\n");
    out.push_str("# TYPE utc_mu_hat gauge\n");
    for f in features {
        out.push_str(&format!(
            "utc_mu_hat{{unit=\"{}\"}} {:.4}\n",
            escape_label(&f.unit),
            f.mu_hat
        ));
    }

    out.push_str("# HELP utc_utilization Utilization ratio (lambda_hat / mu_hat).\n");
    out.push_str("# TYPE utc_utilization gauge\n");
    for f in features {
        out.push_str(&format!(
            "utc_utilization{{unit=\"{}\"}} {:.4}\n",
            escape_label(&f.unit),
            f.rho()
        ));
    }

    out.push_str(
        "# HELP utc_protection_level Protection level (0=permissive, 1=require_approval, 2=read_only).\n",
    );
    out.push_str("# TYPE utc_protection_level gauge\n");
    for f in features {
        out.push_str(&format!(
            "utc_protection_level{{unit=\"{}\"}} {}\n",
            escape_label(&f.unit),
            f.level.severity()
        ));
    }

    out.push_str("# HELP utc_observations_total Observations folded into the estimates.\n");
    out.push_str("# TYPE utc_observations_total counter\n");
    for f in features {
        out.push_str(&format!(
            "utc_observations_total{{unit=\"{}\"}} {}\n",
            escape_label(&f.unit),
            f.observation_count
        ));
    }

    out
}

/// Escape a label value per the exposition format.
fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
