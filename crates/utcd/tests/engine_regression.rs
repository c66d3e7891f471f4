//! Engine regression tests.
//!
//! Drives the protection service over an on-disk feature store the way the
//! daemon does: open, observe, drop, reopen, read.

use utc_queueing::*;
use utc_state::*;

fn open_service(path: &std::path::Path) -> ProtectionService<StateStore> {
    let store = StateStore::open(path).unwrap();
    ProtectionService::new(store, EngineConfig::default()).unwrap()
}

#[test]
fn payments_api_walkthrough() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("utc.redb");
    let svc = open_service(&db_path);

    let f = svc.update_feature("payments-api", 70.0, 100.0).unwrap();
    assert_eq!(f.level, ProtectionLevel::RequireApproval);
    assert!((f.rho() - 0.7).abs() < 1e-9);

    let f = svc.update_feature("payments-api", 95.0, 100.0).unwrap();
    assert!((f.lambda_hat - 77.5).abs() < 1e-9);
    assert!((f.rho() - 0.775).abs() < 1e-9);
    assert_eq!(f.level, ProtectionLevel::RequireApproval);

    let f = svc.update_feature("payments-api", 150.0, 100.0).unwrap();
    assert!(f.rho() >= 0.9);
    assert_eq!(f.level, ProtectionLevel::ReadOnly);

    let f = svc.update_feature("payments-api", 0.0, 540.0).unwrap();
    assert!(f.rho() < 0.5);
    assert_eq!(f.level, ProtectionLevel::RequireApproval);

    let f = svc.update_feature("payments-api", 0.0, 540.0).unwrap();
    assert_eq!(f.level, ProtectionLevel::Permissive);
}

#[test]
fn level_and_estimates_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("utc.redb");

    {
        let svc = open_service(&db_path);
        svc.update_feature("orders", 95.0, 100.0).unwrap();
    }

    // A new process picks up where the old one left off.
    let svc = open_service(&db_path);
    assert_eq!(
        svc.get_protection_level("orders").unwrap(),
        ProtectionLevel::ReadOnly
    );

    // History carries over: one idle sample is not enough to leave read-only.
    let f = svc.update_feature("orders", 0.0, 100.0).unwrap();
    assert!((f.lambda_hat - 66.5).abs() < 1e-9);
    assert_eq!(f.level, ProtectionLevel::ReadOnly);
    assert_eq!(f.observation_count, 2);
}

#[test]
fn summary_and_exposition_agree() {
    let store = StateStore::open_in_memory().unwrap();
    let svc = ProtectionService::new(store, EngineConfig::default()).unwrap();
    svc.update_feature("search", 30.0, 100.0).unwrap();
    svc.update_feature("checkout", 92.0, 100.0).unwrap();

    let summary = svc.get_metrics_summary("checkout").unwrap();
    assert_eq!(summary.level, ProtectionLevel::ReadOnly);
    assert_eq!(summary.recommendation, "Read-only mode to prevent overload");
    assert_eq!(summary.interpretation, "System is 92.0% utilized (critical)");

    let text = render_prometheus(&svc.list_features().unwrap());
    assert!(text.contains("utc_protection_level{unit=\"checkout\"} 2"));
    assert!(text.contains("utc_protection_level{unit=\"search\"} 0"));
    assert!(text.contains("utc_utilization{unit=\"checkout\"} 0.9200"));
}

#[test]
fn custom_config_from_toml_changes_thresholds() {
    let config = EngineConfig::from_toml_str(
        r#"
alpha = 0.5
threshold_low = 0.7
threshold_high = 0.95
relax_threshold = 0.4
"#,
    )
    .unwrap();
    let store = StateStore::open_in_memory().unwrap();
    let svc = ProtectionService::new(store, config).unwrap();

    // 0.65 would require approval under the defaults.
    let f = svc.update_feature("api", 65.0, 100.0).unwrap();
    assert_eq!(f.level, ProtectionLevel::Permissive);

    let f = svc.update_feature("api", 125.0, 100.0).unwrap();
    // λ̂ = 0.5*125 + 0.5*65 = 95
    assert!((f.lambda_hat - 95.0).abs() < 1e-9);
    assert_eq!(f.level, ProtectionLevel::ReadOnly);
}
