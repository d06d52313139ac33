//! Configuration loading: the four external inputs named in the run
//! contract (pinned entities, sources, weights, plain-text lists) plus the
//! handful of environment-level settings (database URL, concurrency).

use crate::types::EntityType;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    MissingRequired(String),

    #[error("invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Operating environment, same shape as a typical service's dev/staging/prod
/// split even though this pipeline has no HTTP surface of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        match std::env::var("ENVIRONMENT")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            "staging" | "stage" => Self::Staging,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// One entry in the pinned-entities JSON file.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PinnedEntityConfig {
    pub entity_id: Uuid,
    pub entity_key: String,
    pub canonical_name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub external_ids: HashMap<String, String>,
    #[serde(default)]
    pub context_hints: Vec<String>,
    #[serde(default)]
    pub pin_reason: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RedditSourceConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub communities: Vec<String>,
    #[serde(default)]
    pub fetch_comments: bool,
    #[serde(default = "default_comment_limit")]
    pub comment_limit: usize,
    pub quota_ceiling: Option<u32>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct YoutubeSourceConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub fetch_comments: bool,
    #[serde(default = "default_comment_limit")]
    pub comment_limit: usize,
    pub quota_ceiling: Option<u32>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct GdeltSourceConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub domain_allowlist: Vec<String>,
    pub quota_ceiling: Option<u32>,
}

fn default_comment_limit() -> usize {
    50
}

/// The sources YAML: per-source enable/disable and options.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SourcesConfig {
    pub reddit: RedditSourceConfig,
    pub youtube: YoutubeSourceConfig,
    pub gdelt: GdeltSourceConfig,
}

/// Confidence component weights from §4.7, averaged after individual 0..100
/// scoring.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ConfidenceWeights {
    #[serde(default = "third")]
    pub sample_size: f64,
    #[serde(default = "third")]
    pub diversity: f64,
    #[serde(default = "third")]
    pub engagement_quality: f64,
}

fn third() -> f64 {
    1.0 / 3.0
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            sample_size: third(),
            diversity: third(),
            engagement_quality: third(),
        }
    }
}

/// Baseline component weights from §4.9, renormalized when a component is
/// missing.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct BaselineWeights {
    #[serde(default = "default_mention_volume_weight")]
    pub mention_volume: f64,
    #[serde(default = "default_search_interest_weight")]
    pub search_interest: f64,
    #[serde(default = "default_pageviews_weight")]
    pub pageviews: f64,
}

fn default_mention_volume_weight() -> f64 {
    0.4
}
fn default_search_interest_weight() -> f64 {
    0.3
}
fn default_pageviews_weight() -> f64 {
    0.3
}

impl Default for BaselineWeights {
    fn default() -> Self {
        Self {
            mention_volume: default_mention_volume_weight(),
            search_interest: default_search_interest_weight(),
            pageviews: default_pageviews_weight(),
        }
    }
}

/// The weights YAML: every tunable multiplier/threshold named in §4.5-4.11.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct WeightsConfig {
    #[serde(default)]
    pub source_weights: HashMap<String, f64>,
    #[serde(default = "default_implicit_weight")]
    pub implicit_mention_weight: f64,
    #[serde(default = "default_fame_baseline_weight")]
    pub fame_baseline_weight: f64,
    #[serde(default = "default_fame_attention_weight")]
    pub fame_attention_weight: f64,
    #[serde(default)]
    pub confidence_weights: ConfidenceWeights,
    #[serde(default)]
    pub baseline_weights: BaselineWeights,
    #[serde(default = "default_momentum_history")]
    pub momentum_history_requirement: usize,
    #[serde(default = "default_theme_count")]
    pub theme_count: usize,
    #[serde(default = "default_driver_count")]
    pub driver_count: usize,
    #[serde(default = "default_theme_min_mentions")]
    pub theme_min_mentions: usize,
    #[serde(default = "default_required_sources")]
    pub required_sources: usize,
    #[serde(default = "default_margin_threshold")]
    pub resolver_margin_threshold: f64,
    #[serde(default = "default_volume_scale")]
    pub confidence_volume_scale_k: f64,
}

fn default_implicit_weight() -> f64 {
    0.5
}
fn default_fame_baseline_weight() -> f64 {
    0.3
}
fn default_fame_attention_weight() -> f64 {
    0.7
}
fn default_momentum_history() -> usize {
    3
}
fn default_theme_count() -> usize {
    5
}
fn default_driver_count() -> usize {
    10
}
fn default_theme_min_mentions() -> usize {
    5
}
fn default_required_sources() -> usize {
    3
}
fn default_margin_threshold() -> f64 {
    0.15
}
fn default_volume_scale() -> f64 {
    10.0
}

/// Everything the pipeline needs for one invocation.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub environment: Environment,
    pub database_url: String,
    pub worker_concurrency: usize,
    pub request_timeout: Duration,
    pub pinned_entities: Vec<PinnedEntityConfig>,
    pub sources: SourcesConfig,
    pub weights: WeightsConfig,
    pub communities: Vec<String>,
    pub domain_allowlist: Vec<String>,
    pub ledger_path: PathBuf,
}

impl PipelineConfig {
    /// Load the four file-based inputs from `config_dir` plus the handful of
    /// environment-backed settings. `config_dir` is expected to contain
    /// `pinned_entities.json`, `sources.yaml`, `weights.yaml`,
    /// `communities.txt`, and `domain_allowlist.txt`.
    pub async fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let environment = Environment::from_env();

        let pinned_entities: Vec<PinnedEntityConfig> =
            read_json(&config_dir.join("pinned_entities.json")).await?;
        let sources: SourcesConfig = read_yaml(&config_dir.join("sources.yaml")).await?;
        let weights: WeightsConfig = read_yaml(&config_dir.join("weights.yaml")).await?;
        let communities = read_lines(&config_dir.join("communities.txt")).await?;
        let domain_allowlist = read_lines(&config_dir.join("domain_allowlist.txt")).await?;

        let database_url = std::env::var("DATABASE_URL").map_err(|_| {
            if environment.is_production() {
                ConfigError::MissingRequired("DATABASE_URL".to_string())
            } else {
                ConfigError::MissingRequired("DATABASE_URL".to_string())
            }
        })?;

        let worker_concurrency = std::env::var("WORKER_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(num_cpus::get);

        let request_timeout = Duration::from_secs(
            std::env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        );

        let ledger_path = std::env::var("QUOTA_LEDGER_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir.join("quota_ledger.json"));

        Ok(Self {
            environment,
            database_url,
            worker_concurrency,
            request_timeout,
            pinned_entities,
            sources,
            weights,
            communities,
            domain_allowlist,
            ledger_path,
        })
    }

    /// A stable fingerprint of the loaded configuration, stored on the Run
    /// row so a later reader can tell which weights/sources produced it.
    pub fn fingerprint(&self) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        self.pinned_entities.len().hash(&mut hasher);
        self.weights.driver_count.hash(&mut hasher);
        self.weights.theme_count.hash(&mut hasher);
        self.sources.reddit.enabled.hash(&mut hasher);
        self.sources.youtube.enabled.hash(&mut hasher);
        self.sources.gdelt.enabled.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    serde_json::from_slice(&bytes).map_err(|source| ConfigError::ParseJson { path: path.to_path_buf(), source })
}

async fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    serde_yaml::from_slice(&bytes).map_err(|source| ConfigError::ParseYaml { path: path.to_path_buf(), source })
}

async fn read_lines(path: &Path) -> Result<Vec<String>, ConfigError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    async fn write(path: &Path, contents: &str) {
        let mut f = tokio::fs::File::create(path).await.unwrap();
        f.write_all(contents.as_bytes()).await.unwrap();
    }

    #[tokio::test]
    async fn loads_full_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("pinned_entities.json"),
            r#"[{"entity_id":"00000000-0000-0000-0000-000000000001","entity_key":"p1","canonical_name":"Alice Example","type":"PERSON","aliases":["Alice"],"pin_reason":"seed"}]"#,
        )
        .await;
        write(
            &dir.path().join("sources.yaml"),
            "reddit:\n  enabled: true\n  communities: [\"movies\"]\n  fetch_comments: true\nyoutube:\n  enabled: false\n  channels: []\n  fetch_comments: false\ngdelt:\n  enabled: true\n  keywords: [\"premiere\"]\n  domain_allowlist: [\"example.com\"]\n",
        )
        .await;
        write(&dir.path().join("weights.yaml"), "source_weights:\n  REDDIT: 1.0\n").await;
        write(&dir.path().join("communities.txt"), "movies\n# comment\ntelevision\n").await;
        write(&dir.path().join("domain_allowlist.txt"), "example.com\n").await;

        std::env::set_var("DATABASE_URL", "postgres://localhost/test");
        let cfg = PipelineConfig::load(dir.path()).await.unwrap();

        assert_eq!(cfg.pinned_entities.len(), 1);
        assert_eq!(cfg.communities, vec!["movies", "television"]);
        assert!(cfg.sources.reddit.enabled);
        assert!(!cfg.sources.youtube.enabled);
        assert!(!cfg.fingerprint().is_empty());
    }
}
