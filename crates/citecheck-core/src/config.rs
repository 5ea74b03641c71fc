//! Tunable constants for every engine.
//!
//! The proximity windows and the overlap threshold were tuned against
//! observed failures; change them only after re-running `citecheck eval`
//! against a labelled corpus.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub const COURTLISTENER_TOKEN_ENV: &str = "COURTLISTENER_API_KEY";
pub const COURTLISTENER_BASE_URL: &str = "https://www.courtlistener.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub extract: ExtractConfig,
    pub cluster: ClusterConfig,
    pub verify: VerifyConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Characters before a citation searched for "Name v. Name".
    pub name_window: usize,
    /// Wider fallback window tolerating intervening punctuation.
    pub wide_name_window: usize,
    pub min_name_len: usize,
    /// Maximum gap between parallel citations.
    pub parallel_window: usize,
    /// Characters after a citation searched for its "(year)" parenthetical.
    pub year_window: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            name_window: 120,
            wide_name_window: 300,
            min_name_len: 5,
            parallel_window: 100,
            year_window: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Distinctive name tokens required before a shared name+year links two
    /// citations that are not adjacent.
    pub min_distinctive_tokens: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            min_distinctive_tokens: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub min_overlap: f32,
    pub min_name_len: usize,
    pub source_timeout_secs: u64,
    pub cluster_budget_secs: u64,
    pub workers: usize,
    pub cache_capacity: u64,
    pub min_request_interval_ms: u64,
    /// Per-source overrides of `min_request_interval_ms`, keyed by source name.
    pub source_intervals_ms: HashMap<String, u64>,
    pub retry_delay_ms: u64,
    pub courtlistener_token: Option<String>,
    pub courtlistener_base_url: String,
    /// Disable the HTML fallback sources.
    pub primary_only: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            min_overlap: 0.5,
            min_name_len: 5,
            source_timeout_secs: 8,
            cluster_budget_secs: 30,
            workers: 4,
            cache_capacity: 10_000,
            min_request_interval_ms: 1000,
            source_intervals_ms: HashMap::new(),
            retry_delay_ms: 1500,
            courtlistener_token: None,
            courtlistener_base_url: COURTLISTENER_BASE_URL.to_string(),
            primary_only: false,
        }
    }
}

impl VerifyConfig {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }

    pub fn cluster_budget(&self) -> Duration {
        Duration::from_secs(self.cluster_budget_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Minimum delay between two requests to the named source.
    pub fn request_interval(&self, source: &str) -> Duration {
        let ms = self
            .source_intervals_ms
            .get(source)
            .copied()
            .unwrap_or(self.min_request_interval_ms);
        Duration::from_millis(ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Documents of at least this many bytes run as queued jobs.
    pub sync_threshold_bytes: usize,
    pub max_concurrent_jobs: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sync_threshold_bytes: 20_000,
            max_concurrent_jobs: 2,
        }
    }
}

impl Config {
    /// Load from a TOML file. Missing sections and fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text)?;
        config.validate()?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Apply environment overrides (`COURTLISTENER_API_KEY`).
    pub fn with_env(mut self) -> Self {
        if let Ok(token) = std::env::var(COURTLISTENER_TOKEN_ENV)
            && !token.trim().is_empty()
        {
            self.verify.courtlistener_token = Some(token.trim().to_string());
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let v = &self.verify;
        if !(v.min_overlap > 0.0 && v.min_overlap <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "verify.min_overlap",
                reason: format!("{} is outside (0, 1]", v.min_overlap),
            });
        }
        if v.workers == 0 {
            return Err(ConfigError::Invalid {
                field: "verify.workers",
                reason: "must be at least 1".into(),
            });
        }
        if v.source_timeout_secs == 0 || v.cluster_budget_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "verify.source_timeout_secs",
                reason: "timeouts must be non-zero".into(),
            });
        }
        if self.pipeline.max_concurrent_jobs == 0 {
            return Err(ConfigError::Invalid {
                field: "pipeline.max_concurrent_jobs",
                reason: "must be at least 1".into(),
            });
        }
        if self.extract.wide_name_window < self.extract.name_window {
            return Err(ConfigError::Invalid {
                field: "extract.wide_name_window",
                reason: "must not be smaller than extract.name_window".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.verify.min_overlap, 0.5);
        assert_eq!(config.extract.parallel_window, 100);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[verify]\nmin_overlap = 0.6\n\n[verify.source_intervals_ms]\njustia = 2500\n"
        )
        .unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.verify.min_overlap, 0.6);
        assert_eq!(config.verify.workers, 4);
        assert_eq!(config.verify.request_interval("justia"), Duration::from_millis(2500));
        assert_eq!(config.verify.request_interval("web"), Duration::from_millis(1000));
        assert_eq!(config.pipeline.sync_threshold_bytes, 20_000);
    }

    #[test]
    fn out_of_range_overlap_rejected() {
        let mut config = Config::default();
        config.verify.min_overlap = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "verify.min_overlap", .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::load(Path::new("/nonexistent/citecheck.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn bad_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[verify\nmin_overlap = ").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
