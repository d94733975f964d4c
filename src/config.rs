//! Configuration management for hybrid retrieval
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.hybrid-retrieval/config.toml
//!
//! Configuration is loaded once at startup and shared read-only (`Arc`)
//! across every concurrent retrieval.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{Result, RetrievalError};

/// Tolerance for the dense + sparse default weights summing to one
const WEIGHT_SUM_EPSILON: f64 = 1e-6;

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HybridConfig {
    #[serde(default)]
    pub weights: WeightsConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default)]
    pub judge: JudgeConfig,
    #[serde(default)]
    pub dense: DenseConfig,
    #[serde(default)]
    pub sparse: SparseConfig,
}

/// Mixing weights and alpha clamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightsConfig {
    /// Fallback alpha (weight of the dense channel)
    pub dense_weight_default: f64,
    pub sparse_weight_default: f64,
    pub min_alpha: f64,
    pub max_alpha: f64,
}

/// Candidate depth and tuning switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k_dense: usize,
    pub top_k_sparse: usize,
    pub use_dynamic_tuning: bool,
    /// Both effectiveness values below this flag the response as low confidence
    pub effectiveness_threshold: f64,
}

/// Deadlines, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Overall per-request deadline covering channels and scorer
    pub request_timeout_ms: u64,
    /// Upper bound for a single judge attempt
    pub scorer_attempt_timeout_ms: u64,
    /// Pause before the single judge retry
    pub retry_backoff_ms: u64,
}

/// Relevance judge (Ollama)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    pub model: String,
    pub base_url: String,
    pub temperature: f64,
}

/// Dense backend (Qdrant + Ollama embeddings)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenseConfig {
    pub qdrant_url: String,
    pub embedding_model: String,
    pub embedding_url: String,
}

/// Sparse backend (Elasticsearch)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SparseConfig {
    pub elasticsearch_url: String,
    pub text_field: String,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            dense_weight_default: 0.5,
            sparse_weight_default: 0.5,
            min_alpha: 0.0,
            max_alpha: 1.0,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k_dense: 20,
            top_k_sparse: 20,
            use_dynamic_tuning: true,
            effectiveness_threshold: 0.3,
        }
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5000,
            scorer_attempt_timeout_ms: 3000,
            retry_backoff_ms: 100,
        }
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            model: "qwen2.5:7b-instruct".to_string(),
            base_url: "http://127.0.0.1:11434".to_string(),
            temperature: 0.0,
        }
    }
}

impl Default for DenseConfig {
    fn default() -> Self {
        Self {
            qdrant_url: "http://localhost:6334".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            embedding_url: "http://127.0.0.1:11434".to_string(),
        }
    }
}

impl Default for SparseConfig {
    fn default() -> Self {
        Self {
            elasticsearch_url: "http://localhost:9200".to_string(),
            text_field: "text".to_string(),
        }
    }
}

impl HybridConfig {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RetrievalError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: HybridConfig = toml::from_str(&contents)
            .map_err(|e| RetrievalError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(HybridConfig::default())
    }

    /// Standard config location, if a home directory can be determined
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".hybrid-retrieval").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let w = &self.weights;
        check_unit("dense_weight_default", w.dense_weight_default)?;
        check_unit("sparse_weight_default", w.sparse_weight_default)?;
        check_unit("min_alpha", w.min_alpha)?;
        check_unit("max_alpha", w.max_alpha)?;

        if (w.dense_weight_default + w.sparse_weight_default - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(RetrievalError::ConfigError(format!(
                "dense_weight_default + sparse_weight_default must equal 1.0 (got {} + {})",
                w.dense_weight_default, w.sparse_weight_default
            )));
        }

        if w.min_alpha > w.max_alpha {
            return Err(RetrievalError::ConfigError(format!(
                "min_alpha ({}) must not exceed max_alpha ({})",
                w.min_alpha, w.max_alpha
            )));
        }

        if self.retrieval.top_k_dense < 1 {
            return Err(RetrievalError::ConfigError(
                "top_k_dense must be at least 1".to_string(),
            ));
        }

        if self.retrieval.top_k_sparse < 1 {
            return Err(RetrievalError::ConfigError(
                "top_k_sparse must be at least 1".to_string(),
            ));
        }

        check_unit("effectiveness_threshold", self.retrieval.effectiveness_threshold)?;

        if self.timeouts.request_timeout_ms == 0 {
            return Err(RetrievalError::ConfigError(
                "request_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.timeouts.scorer_attempt_timeout_ms == 0 {
            return Err(RetrievalError::ConfigError(
                "scorer_attempt_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if !(self.judge.temperature >= 0.0) {
            return Err(RetrievalError::ConfigError(
                "judge temperature must be non-negative".to_string(),
            ));
        }

        if self.judge.model.trim().is_empty() {
            return Err(RetrievalError::ConfigError(
                "judge model must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| RetrievalError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RetrievalError::ConfigError(format!("Failed to create config dir: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| RetrievalError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.request_timeout_ms)
    }

    pub fn scorer_attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.scorer_attempt_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.timeouts.retry_backoff_ms)
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(RetrievalError::ConfigError(format!(
            "{} must be between 0.0 and 1.0 (got {})",
            name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = HybridConfig::default();
        assert_eq!(config.weights.dense_weight_default, 0.5);
        assert_eq!(config.retrieval.top_k_dense, 20);
        assert_eq!(config.retrieval.top_k_sparse, 20);
        assert!(config.retrieval.use_dynamic_tuning);
        assert_eq!(config.retrieval.effectiveness_threshold, 0.3);
    }

    #[test]
    fn test_config_validation_success() {
        let config = HybridConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_dense_weight() {
        let mut config = HybridConfig::default();
        config.weights.dense_weight_default = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_weights_must_sum_to_one() {
        let mut config = HybridConfig::default();
        config.weights.dense_weight_default = 0.7;
        config.weights.sparse_weight_default = 0.7;
        assert!(config.validate().is_err());

        config.weights.sparse_weight_default = 0.3;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_alpha_clamps() {
        let mut config = HybridConfig::default();
        config.weights.min_alpha = 0.8;
        config.weights.max_alpha = 0.2;
        assert!(config.validate().is_err());

        config.weights.min_alpha = -0.1;
        config.weights.max_alpha = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_top_k() {
        let mut config = HybridConfig::default();
        config.retrieval.top_k_sparse = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_threshold() {
        let mut config = HybridConfig::default();
        config.retrieval.effectiveness_threshold = 1.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_timeouts() {
        let mut config = HybridConfig::default();
        config.timeouts.request_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: HybridConfig = toml::from_str(
            r#"
            [retrieval]
            top_k_dense = 5
            use_dynamic_tuning = false
            "#,
        )
        .unwrap();
        assert_eq!(config.retrieval.top_k_dense, 5);
        assert_eq!(config.retrieval.top_k_sparse, 20);
        assert!(!config.retrieval.use_dynamic_tuning);
        assert_eq!(config.judge.model, "qwen2.5:7b-instruct");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = HybridConfig::default();
        config.weights.dense_weight_default = 0.6;
        config.weights.sparse_weight_default = 0.4;
        config.save(&path).unwrap();

        let loaded = HybridConfig::load(Some(path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[weights]\ndense_weight_default = 3.0\n").unwrap();

        assert!(matches!(
            HybridConfig::load_from_file(&path),
            Err(RetrievalError::ConfigError(_))
        ));
    }

    #[test]
    fn test_durations() {
        let config = HybridConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.scorer_attempt_timeout(), Duration::from_secs(3));
    }
}
