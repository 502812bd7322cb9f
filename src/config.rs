use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use jsonschema::{JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    #[serde(default)]
    pub instrument_path: Option<PathBuf>,
    #[serde(default)]
    pub score_path: Option<PathBuf>,
}

fn default_enabled_true() -> bool {
    true
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs/performer")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_rotation() -> LoggingRotation {
    LoggingRotation::Daily
}

fn default_logging_retention_days() -> usize {
    14
}

fn default_beam_width() -> usize {
    8
}

fn default_max_candidates_per_instance() -> usize {
    64
}

fn default_workers() -> usize {
    4
}

fn default_phrase_timeout_ms() -> u64 {
    30_000
}

fn default_phrase_retries() -> usize {
    1
}

fn default_checkpoint_state_path() -> PathBuf {
    PathBuf::from("./state/checkpoint.json")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
    /// One file per planning session, named after its session id.
    PerRun,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default = "default_logging_rotation")]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    pub retention_days: usize,
    #[serde(default = "default_enabled_true")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            rotation: default_logging_rotation(),
            retention_days: default_logging_retention_days(),
            stderr_warn_enabled: true,
        }
    }
}

/// Search bounds of one planning session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Snapshots kept per frontier and successors kept per snapshot.
    #[serde(default = "default_beam_width")]
    pub beam_width: usize,
    #[serde(default = "default_max_candidates_per_instance")]
    pub max_candidates_per_instance: usize,
    /// Blocking workers for independent sibling nodes; 1 plans sequentially.
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_phrase_timeout_ms")]
    pub phrase_timeout_ms: u64,
    /// Extra attempts after a phrase times out.
    #[serde(default = "default_phrase_retries")]
    pub phrase_retries: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            beam_width: default_beam_width(),
            max_candidates_per_instance: default_max_candidates_per_instance(),
            workers: default_workers(),
            phrase_timeout_ms: default_phrase_timeout_ms(),
            phrase_retries: default_phrase_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default = "default_checkpoint_state_path")]
    pub state_path: PathBuf,
    #[serde(default = "default_enabled_true")]
    pub enabled: bool,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            state_path: default_checkpoint_state_path(),
            enabled: true,
        }
    }
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config_value: Value = json5::from_str(&config_content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let config_base = config_path.parent().unwrap_or_else(|| Path::new("."));
        let schema_path = resolve_schema_path(config_base, &config_value)?;
        validate_against_schema(&config_value, &schema_path)?;

        let mut config: Config =
            serde_json::from_value(config_value).context("failed to deserialize performer config")?;

        if config.planner.beam_width == 0 {
            return Err(anyhow!("planner.beam_width must be at least 1"));
        }
        if config.planner.workers == 0 {
            return Err(anyhow!("planner.workers must be at least 1"));
        }

        if !config.checkpoint.state_path.is_absolute() {
            config.checkpoint.state_path = config_base.join(&config.checkpoint.state_path);
        }
        if !config.logging.dir.is_absolute() {
            config.logging.dir = config_base.join(&config.logging.dir);
        }
        for path in [&mut config.instrument_path, &mut config.score_path]
            .into_iter()
            .flatten()
        {
            if !path.is_absolute() {
                *path = config_base.join(&*path);
            }
        }

        Ok(config)
    }
}

fn resolve_schema_path(config_base: &Path, config_value: &Value) -> Result<PathBuf> {
    if let Some(path_text) = config_value.get("$schema").and_then(|value| value.as_str()) {
        let configured = PathBuf::from(path_text);
        if configured.is_absolute() {
            return Ok(configured);
        }
        return Ok(config_base.join(&configured));
    }

    let local_default = config_base.join("performer.schema.json");
    if local_default.exists() {
        return Ok(local_default);
    }

    Err(anyhow!(
        "unable to resolve schema path: expected $schema in config or performer.schema.json"
    ))
}

fn validate_against_schema(config_value: &Value, schema_path: &Path) -> Result<()> {
    let schema_content = fs::read_to_string(schema_path)
        .with_context(|| format!("failed to read schema {}", schema_path.display()))?;
    let schema: Value = serde_json::from_str(&schema_content)
        .with_context(|| format!("failed to parse schema {}", schema_path.display()))?;

    let compiled =
        JSONSchema::compile(&schema).map_err(|e| anyhow!("failed to compile schema: {e}"))?;

    match compiled.validate(config_value) {
        Ok(()) => Ok(()),
        Err(errors_iter) => {
            let validation_errors: Vec<ValidationError> = errors_iter.collect();
            let messages: Vec<String> = validation_errors
                .into_iter()
                .map(|error| error.to_string())
                .collect();
            Err(anyhow!("config validation failed: {}", messages.join("; ")))
        }
    }
}
