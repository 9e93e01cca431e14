use kwgold_core::{Backoff, KwGoldConfig, TierRules};
use std::fs;

#[test]
fn explicit_config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kwgold.yaml");
    fs::write(
        &path,
        r#"
credentials:
  search_ad:
    customer_id: "12345"
    api_key: key
    secret_key: secret
oracle:
  timeout_secs: 5
  retry:
    max_attempts: 4
    backoff:
      exponential:
        base_ms: 250
expansion:
  max_pool_size: 50
  empty_result_tolerance: 10
"#,
    )
    .unwrap();

    let config = KwGoldConfig::load(Some(&path)).unwrap();
    assert_eq!(config.credentials.search_ad.customer_id, "12345");
    assert_eq!(config.oracle.timeout_secs, 5);
    assert_eq!(config.oracle.retry.max_attempts, 4);
    assert_eq!(
        config.oracle.retry.backoff,
        Backoff::Exponential { base_ms: 250 }
    );
    assert_eq!(config.expansion.max_pool_size, 50);
    assert_eq!(config.expansion.empty_result_tolerance, 10);
    // Untouched sections keep their defaults.
    assert_eq!(config.analyzer.checkpoint_batch_size, 20);
    assert_eq!(config.scheduler.error_retry_secs, 300);
}

#[test]
fn tier_rules_load_from_yaml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiers.yaml");
    fs::write(
        &path,
        r#"
tiers:
  - { max_documents: 300, max_volume: 400 }
  - { max_documents: 1000, min_volume: 400, max_volume: 2000 }
  - { max_documents: 5000, min_volume: 2000, max_volume: 10000 }
  - { max_documents: 20000, min_volume: 10000, max_volume: 50000 }
  - { min_volume: 50000 }
"#,
    )
    .unwrap();

    let rules = TierRules::load(&path).unwrap();
    assert!(!rules.is_empty());
    assert_eq!(rules.rule(2).unwrap().min_volume, 400);
}

#[test]
fn missing_tier_rule_file_yields_empty_table() {
    let dir = tempfile::tempdir().unwrap();
    let rules = TierRules::load(&dir.path().join("nope.yaml")).unwrap();
    assert!(rules.is_empty());
}

#[test]
fn short_tier_rule_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiers.yaml");
    fs::write(&path, "tiers:\n  - { max_documents: 300 }\n").unwrap();
    assert!(TierRules::load(&path).is_err());
}
