//! Configuration loading and typed config structures for belief replay.
//!
//! The canonical configuration lives in `smm-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file.
//!
//! Visibility policies and agent identifiers stay in their textual form
//! (`V4`, `A1`) until [`SmmConfig::validate`] or
//! [`PipelineConfig::resolve`] turns them into typed values. The resolved
//! policy is handed to each [`BeliefModel`](crate::model::BeliefModel) at
//! construction.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use smm_types::{AgentId, VisibilityPolicy};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is not usable.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `smm-config.yaml`. Every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SmmConfig {
    /// The chain of belief models.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Which log to replay and where the reports go.
    #[serde(default)]
    pub replay: ReplayConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SmmConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for file locations:
    /// - `SMM_LOG_PATH` overrides `replay.log_path`
    /// - `SMM_LAYOUT_PATH` overrides `replay.layout_path`
    /// - `SMM_OUTPUT_PATH` overrides `replay.output_path`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.replay.apply_env_overrides();
        Ok(config)
    }

    /// Check every textual value that is only parsed on use.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an empty pipeline, a malformed
    /// visibility policy or agent id, or an unknown log level.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.resolve()?;
        if !matches!(
            self.logging.level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(ConfigError::Invalid {
                field: "logging.level".to_owned(),
                reason: format!("unknown level {:?}", self.logging.level),
            });
        }
        Ok(())
    }
}

/// The belief chain: one stage per model, in feeding order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PipelineConfig {
    /// Whether downstream stages adopt the first stage's belief on the first
    /// tick instead of starting from the bare layout.
    #[serde(default = "default_sync_on_first_view")]
    pub sync_on_first_view: bool,

    /// Stages, upstream first.
    #[serde(default = "default_stages")]
    pub stages: Vec<StageConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sync_on_first_view: default_sync_on_first_view(),
            stages: default_stages(),
        }
    }
}

impl PipelineConfig {
    /// Parse every stage's agent and visibility policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if there are no stages or a stage
    /// has a malformed agent or policy.
    pub fn resolve(&self) -> Result<Vec<ResolvedStage>, ConfigError> {
        if self.stages.is_empty() {
            return Err(ConfigError::Invalid {
                field: "pipeline.stages".to_owned(),
                reason: "at least one stage is required".to_owned(),
            });
        }
        self.stages
            .iter()
            .enumerate()
            .map(|(index, stage)| {
                let invalid = |field: &str, reason: String| ConfigError::Invalid {
                    field: format!("pipeline.stages[{index}].{field}"),
                    reason,
                };
                let agent = stage
                    .agent
                    .parse::<AgentId>()
                    .map_err(|e| invalid("agent", e.to_string()))?;
                let policy = stage
                    .visibility
                    .parse::<VisibilityPolicy>()
                    .map_err(|e| invalid("visibility", e.to_string()))?;
                Ok(ResolvedStage {
                    label: stage.label.clone(),
                    agent,
                    policy,
                })
            })
            .collect()
    }
}

/// One belief model as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StageConfig {
    /// Name used in reports.
    pub label: String,

    /// Observing agent, e.g. `A0`.
    #[serde(default = "default_agent")]
    pub agent: String,

    /// Visibility policy, e.g. `V4`.
    #[serde(default = "default_visibility")]
    pub visibility: String,
}

/// A stage with its agent and policy parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStage {
    /// Name used in reports.
    pub label: String,
    /// Observing agent.
    pub agent: AgentId,
    /// Visibility policy.
    pub policy: VisibilityPolicy,
}

/// How the replay drives the chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayMode {
    /// Every tick runs through the chain in order.
    #[default]
    Batch,
    /// Ticks go through the belief worker; stale ticks may be skipped.
    Live,
}

/// Replay input and output locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReplayConfig {
    /// Layout document used to seed every stage.
    #[serde(default = "default_layout_path")]
    pub layout_path: PathBuf,

    /// JSON-lines game log.
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,

    /// Only replay entries recorded on this layout.
    #[serde(default)]
    pub layout_filter: Option<String>,

    /// Report destination; stdout when unset.
    #[serde(default)]
    pub output_path: Option<PathBuf>,

    /// Batch or live replay.
    #[serde(default)]
    pub mode: ReplayMode,
}

impl ReplayConfig {
    /// Override file locations with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SMM_LOG_PATH") {
            self.log_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("SMM_LAYOUT_PATH") {
            self.layout_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("SMM_OUTPUT_PATH") {
            self.output_path = Some(PathBuf::from(val));
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            layout_path: default_layout_path(),
            log_path: default_log_path(),
            layout_filter: None,
            output_path: None,
            mode: ReplayMode::default(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines instead of human-readable ones.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

const fn default_sync_on_first_view() -> bool {
    true
}

fn default_stages() -> Vec<StageConfig> {
    vec![
        StageConfig {
            label: "truth".to_owned(),
            agent: "A0".to_owned(),
            visibility: "O20".to_owned(),
        },
        StageConfig {
            label: "robot".to_owned(),
            agent: "A0".to_owned(),
            visibility: "V4".to_owned(),
        },
        StageConfig {
            label: "human".to_owned(),
            agent: "A1".to_owned(),
            visibility: "D2".to_owned(),
        },
    ]
}

fn default_agent() -> String {
    "A0".to_owned()
}

fn default_visibility() -> String {
    "O20".to_owned()
}

fn default_layout_path() -> PathBuf {
    PathBuf::from("layouts/RSMM3.yaml")
}

fn default_log_path() -> PathBuf {
    PathBuf::from("logs/session.jsonl")
}

fn default_log_level() -> String {
    "info".to_owned()
}
