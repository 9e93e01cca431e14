use crate::{KwGoldError, Result, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration. Loaded from layered YAML files
/// (`config/base.yaml` plus an optional `config/local.yaml` override and
/// an optional explicit file) with `KWGOLD__`-prefixed environment
/// variables taking precedence over everything on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KwGoldConfig {
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub expansion: ExpansionConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl KwGoldConfig {
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/base").required(false))
            .add_source(config::File::with_name("config/local").required(false));
        if let Some(path) = explicit {
            builder = builder.add_source(config::File::from(path.to_path_buf()));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix("KWGOLD").separator("__"))
            .build()
            .map_err(|e| KwGoldError::Config(e.to_string()))?;
        settings
            .try_deserialize()
            .map_err(|e| KwGoldError::Config(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub search_ad: SearchAdCredentials,
    #[serde(default)]
    pub open_api: OpenApiCredentials,
}

/// Search-ad (keyword tool) API credentials; requests are HMAC-signed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchAdCredentials {
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub secret_key: String,
}

/// Open-API credentials for the document-count lookups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenApiCredentials {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

/// Knobs shared by all HTTP oracle adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Request timeout in seconds
    #[serde(default = "OracleConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retry policy applied uniformly by the adapters
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl OracleConfig {
    fn default_timeout_secs() -> u64 {
        10
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Keyword-expansion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpansionConfig {
    /// Ceiling on the discovered keyword pool
    #[serde(default = "ExpansionConfig::default_max_pool_size")]
    pub max_pool_size: usize,
    /// Courtesy pause between autocomplete calls while work remains
    #[serde(default = "ExpansionConfig::default_request_delay_ms")]
    pub request_delay_ms: u64,
    /// Consecutive empty responses tolerated before the run is cut short
    #[serde(default = "ExpansionConfig::default_empty_result_tolerance")]
    pub empty_result_tolerance: u32,
    /// How many seed keywords a run may start from
    #[serde(default = "ExpansionConfig::default_max_seeds")]
    pub max_seeds: usize,
}

impl ExpansionConfig {
    fn default_max_pool_size() -> usize {
        1000
    }

    fn default_request_delay_ms() -> u64 {
        50
    }

    fn default_empty_result_tolerance() -> u32 {
        50
    }

    fn default_max_seeds() -> usize {
        1
    }
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            max_pool_size: Self::default_max_pool_size(),
            request_delay_ms: Self::default_request_delay_ms(),
            empty_result_tolerance: Self::default_empty_result_tolerance(),
            max_seeds: Self::default_max_seeds(),
        }
    }
}

/// Competitiveness-analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Keywords processed between persistence checkpoints
    #[serde(default = "AnalyzerConfig::default_checkpoint_batch_size")]
    pub checkpoint_batch_size: usize,
    /// Pause between volume-oracle batches
    #[serde(default = "AnalyzerConfig::default_volume_batch_delay_ms")]
    pub volume_batch_delay_ms: u64,
    /// Pause after each per-keyword document-count lookup
    #[serde(default = "AnalyzerConfig::default_request_delay_ms")]
    pub request_delay_ms: u64,
    /// Pause between checkpoint batches
    #[serde(default = "AnalyzerConfig::default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    /// Tiers kept in the persisted table
    #[serde(default = "AnalyzerConfig::default_target_tiers")]
    pub target_tiers: Vec<u8>,
    /// Purge legacy tier-0 rows from the stored table on merge
    #[serde(default = "AnalyzerConfig::default_keep_classified_only")]
    pub keep_classified_only: bool,
}

impl AnalyzerConfig {
    fn default_checkpoint_batch_size() -> usize {
        20
    }

    fn default_volume_batch_delay_ms() -> u64 {
        50
    }

    fn default_request_delay_ms() -> u64 {
        20
    }

    fn default_batch_delay_ms() -> u64 {
        100
    }

    fn default_target_tiers() -> Vec<u8> {
        vec![1, 2, 3, 4, 5]
    }

    fn default_keep_classified_only() -> bool {
        true
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            checkpoint_batch_size: Self::default_checkpoint_batch_size(),
            volume_batch_delay_ms: Self::default_volume_batch_delay_ms(),
            request_delay_ms: Self::default_request_delay_ms(),
            batch_delay_ms: Self::default_batch_delay_ms(),
            target_tiers: Self::default_target_tiers(),
            keep_classified_only: Self::default_keep_classified_only(),
        }
    }
}

/// Background-scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Minutes between pipeline cycles
    #[serde(default = "SchedulerConfig::default_cycle_minutes")]
    pub cycle_minutes: u64,
    /// Subjects to pick from each cycle; empty means every subject with a
    /// seed file on disk
    #[serde(default)]
    pub subjects: Vec<String>,
    /// Seconds to wait before retrying after a failed cycle
    #[serde(default = "SchedulerConfig::default_error_retry_secs")]
    pub error_retry_secs: u64,
}

impl SchedulerConfig {
    fn default_cycle_minutes() -> u64 {
        30
    }

    fn default_error_retry_secs() -> u64 {
        300
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cycle_minutes: Self::default_cycle_minutes(),
            subjects: Vec::new(),
            error_retry_secs: Self::default_error_retry_secs(),
        }
    }
}

/// Where seed files, the persisted table, and run artifacts live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "StorageConfig::default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "StorageConfig::default_table_dir")]
    pub table_dir: PathBuf,
    #[serde(default = "StorageConfig::default_artifact_dir")]
    pub artifact_dir: PathBuf,
    #[serde(default = "StorageConfig::default_tier_rules")]
    pub tier_rules: PathBuf,
}

impl StorageConfig {
    fn default_data_dir() -> PathBuf {
        PathBuf::from("data/keywords")
    }

    fn default_table_dir() -> PathBuf {
        PathBuf::from("data/gold")
    }

    fn default_artifact_dir() -> PathBuf {
        PathBuf::from("data/runs")
    }

    fn default_tier_rules() -> PathBuf {
        PathBuf::from("config/tiers.yaml")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
            table_dir: Self::default_table_dir(),
            artifact_dir: Self::default_artifact_dir(),
            tier_rules: Self::default_tier_rules(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: KwGoldConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.expansion.max_pool_size, 1000);
        assert_eq!(config.expansion.max_seeds, 1);
        assert_eq!(config.analyzer.target_tiers, vec![1, 2, 3, 4, 5]);
        assert!(config.analyzer.keep_classified_only);
        assert_eq!(config.scheduler.cycle_minutes, 30);
        assert_eq!(config.oracle.timeout_secs, 10);
    }

    #[test]
    fn partial_sections_keep_sibling_defaults() {
        let text = r#"
expansion:
  max_pool_size: 200
analyzer:
  target_tiers: [1, 2, 3]
"#;
        let config: KwGoldConfig = serde_yaml::from_str(text).unwrap();
        assert_eq!(config.expansion.max_pool_size, 200);
        assert_eq!(config.expansion.request_delay_ms, 50);
        assert_eq!(config.analyzer.target_tiers, vec![1, 2, 3]);
        assert_eq!(config.analyzer.checkpoint_batch_size, 20);
    }
}
