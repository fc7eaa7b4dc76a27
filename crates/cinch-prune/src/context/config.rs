//! Pruning configuration and its validation.
//!
//! A [`PruningConfig`] is built once per agent instance and is read-only
//! afterwards. Invariant violations are reported as [`ConfigError`] when the
//! config is loaded or handed to a
//! [`ContextPruner`](super::pruner::ContextPruner), never in the middle of
//! a call.
//!
//! # Example
//!
//! ```
//! use cinch_prune::context::config::{PruneMode, PruningConfig};
//!
//! let config = PruningConfig::from_json_str(
//!     r#"{ "mode": "cache-ttl", "ttl": "10m", "tools": { "deny": ["web_*"] } }"#,
//! )
//! .unwrap();
//! assert_eq!(config.mode, PruneMode::CacheTtl);
//! assert_eq!(config.ttl.as_secs(), 600);
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::context::rules::ToolRules;
use crate::context::strategies::{HardClearConfig, SoftTrimConfig};

/// When pruning runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PruneMode {
    /// Never prune.
    #[default]
    Off,
    /// Prune only once the provider prompt cache has presumably expired.
    #[serde(alias = "cache_ttl")]
    CacheTtl,
    /// Prune before every call.
    Always,
}

impl std::fmt::Display for PruneMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PruneMode::Off => write!(f, "off"),
            PruneMode::CacheTtl => write!(f, "cache-ttl"),
            PruneMode::Always => write!(f, "always"),
        }
    }
}

/// Configuration errors, raised at construction or load time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be within (0.0, 1.0], got {value}")]
    InvalidRatio { name: &'static str, value: f64 },
    #[error("soft_trim_ratio ({soft}) must not exceed hard_clear_ratio ({hard})")]
    RatioOrder { soft: f64, hard: f64 },
    #[error(
        "soft_trim.head_chars + soft_trim.tail_chars ({kept}) must be less than soft_trim.max_chars ({max})"
    )]
    TrimShape { kept: usize, max: usize },
    #[error("hard_clear.placeholder must not be empty when hard-clear is enabled")]
    EmptyPlaceholder,
    #[error(
        "hard_clear.placeholder ({len} chars) must be shorter than soft_trim.max_chars ({max})"
    )]
    PlaceholderTooLong { len: usize, max: usize },
    #[error("context window must be greater than zero tokens")]
    ZeroContextWindow,
    #[error("failed to read pruning config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse pruning config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration for context pruning.
///
/// Pruning reduces the size of old tool results before history is sent to
/// the model. It helps stay within context limits and, with providers that
/// cache prompts, avoids paying to re-cache a bloated prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PruningConfig {
    /// When pruning runs. Default: `off`.
    pub mode: PruneMode,
    /// Dwell time after the last call before `cache-ttl` pruning runs.
    /// Default: `5m`.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub ttl: Duration,
    /// Number of most recent assistant turns whose tool results are never
    /// pruned. Default: `3`.
    pub keep_last_assistants: usize,
    /// Context usage at which soft-trimming activates. Default: `0.3`.
    pub soft_trim_ratio: f64,
    /// Context usage at which hard-clearing activates. Default: `0.5`.
    pub hard_clear_ratio: f64,
    /// Total prunable characters below which pruning is skipped.
    /// Default: `50_000`.
    #[serde(alias = "min_prunable_tool_chars")]
    pub min_prunable_chars: usize,
    /// Per-block soft-trim shape.
    pub soft_trim: SoftTrimConfig,
    /// Hard-clear behavior.
    pub hard_clear: HardClearConfig,
    /// Tool-specific pruning rules.
    pub tools: ToolRules,
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            mode: PruneMode::Off,
            ttl: Duration::from_secs(5 * 60),
            keep_last_assistants: 3,
            soft_trim_ratio: 0.3,
            hard_clear_ratio: 0.5,
            min_prunable_chars: 50_000,
            soft_trim: SoftTrimConfig::default(),
            hard_clear: HardClearConfig::default(),
            tools: ToolRules::default(),
        }
    }
}

impl PruningConfig {
    /// A config with pruning turned off.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Set the pruning mode.
    pub fn with_mode(mut self, mode: PruneMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the cache TTL used in `cache-ttl` mode.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set how many recent assistant turns are protected.
    pub fn with_keep_last_assistants(mut self, n: usize) -> Self {
        self.keep_last_assistants = n;
        self
    }

    /// Set the soft-trim and hard-clear usage ratios.
    pub fn with_ratios(mut self, soft_trim: f64, hard_clear: f64) -> Self {
        self.soft_trim_ratio = soft_trim;
        self.hard_clear_ratio = hard_clear;
        self
    }

    /// Set the prunable-size floor.
    pub fn with_min_prunable_chars(mut self, chars: usize) -> Self {
        self.min_prunable_chars = chars;
        self
    }

    /// Set the tool rules.
    pub fn with_tools(mut self, tools: ToolRules) -> Self {
        self.tools = tools;
        self
    }

    /// Check every invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_ratio("soft_trim_ratio", self.soft_trim_ratio)?;
        check_ratio("hard_clear_ratio", self.hard_clear_ratio)?;
        if self.soft_trim_ratio > self.hard_clear_ratio {
            return Err(ConfigError::RatioOrder {
                soft: self.soft_trim_ratio,
                hard: self.hard_clear_ratio,
            });
        }

        let kept = self
            .soft_trim
            .head_chars
            .saturating_add(self.soft_trim.tail_chars);
        if kept >= self.soft_trim.max_chars {
            return Err(ConfigError::TrimShape {
                kept,
                max: self.soft_trim.max_chars,
            });
        }

        if self.hard_clear.enabled {
            let len = self.hard_clear.placeholder.chars().count();
            if len == 0 {
                return Err(ConfigError::EmptyPlaceholder);
            }
            if len >= self.soft_trim.max_chars {
                return Err(ConfigError::PlaceholderTooLong {
                    len,
                    max: self.soft_trim.max_chars,
                });
            }
        }

        Ok(())
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: PruningConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&data)?;
        debug!(
            "Loaded pruning config from {} (mode={}, keep_last_assistants={})",
            path.display(),
            config.mode,
            config.keep_last_assistants
        );
        Ok(config)
    }

    /// JSON Schema describing the config file format.
    pub fn json_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(PruningConfig);
        serde_json::to_value(schema)
            .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
    }
}

fn check_ratio(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidRatio { name, value })
    }
}
