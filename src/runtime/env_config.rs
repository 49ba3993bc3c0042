//! Environment variable and config file support for [`RuntimeBuilder`](super::builder::RuntimeBuilder).
//!
//! # Configuration Layers
//!
//! Each layer overrides the one before it:
//!
//! 1. **Defaults**: [`RuntimeConfig::default()`]
//! 2. **Config file**: a TOML file or string (requires the `config-file` feature)
//! 3. **Environment variables**: `TASKRT_*`, applied by `with_env_overrides`
//! 4. **Programmatic**: builder methods called afterwards (`round_budget(64)`)
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `TASKRT_ROUND_BUDGET` | `usize` | `round_budget` |
//! | `TASKRT_MAX_DRAIN_ROUNDS` | `usize` | `max_drain_rounds` |

use crate::error::Error;
use crate::runtime::config::RuntimeConfig;

/// Environment variable name for the per-round node budget.
pub const ENV_ROUND_BUDGET: &str = "TASKRT_ROUND_BUDGET";
/// Environment variable name for the `run_until_idle` round cap.
pub const ENV_MAX_DRAIN_ROUNDS: &str = "TASKRT_MAX_DRAIN_ROUNDS";

/// Errors raised while reading configuration from the environment or a file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable or field held a value of the wrong shape.
    #[error("invalid value for {name}: expected {expected}, got {value:?}")]
    InvalidValue {
        /// Variable or field name.
        name: String,
        /// Human-readable description of the accepted values.
        expected: &'static str,
        /// The rejected value.
        value: String,
    },
    /// The config file could not be read.
    #[cfg(feature = "config-file")]
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that failed.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config file is not valid TOML for this schema.
    #[cfg(feature = "config-file")]
    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::invalid_config(err.to_string())
    }
}

/// Apply environment variable overrides to a [`RuntimeConfig`].
///
/// Only variables that are set in the environment are applied.
/// Returns an error if a variable is set but contains an unparseable value.
pub fn apply_env_overrides(config: &mut RuntimeConfig) -> Result<(), ConfigError> {
    if let Some(val) = read_env(ENV_ROUND_BUDGET) {
        config.round_budget = parse_usize(ENV_ROUND_BUDGET, &val)?;
    }
    if let Some(val) = read_env(ENV_MAX_DRAIN_ROUNDS) {
        config.max_drain_rounds = parse_usize(ENV_MAX_DRAIN_ROUNDS, &val)?;
    }
    Ok(())
}

/// Read an environment variable, returning `None` if unset.
fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_usize(var_name: &str, val: &str) -> Result<usize, ConfigError> {
    val.trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidValue {
            name: var_name.to_string(),
            expected: "unsigned integer",
            value: val.to_string(),
        })
}

// =========================================================================
// TOML config file support (feature-gated)
// =========================================================================

/// TOML-deserializable runtime configuration.
///
/// ```toml
/// [scheduler]
/// round_budget = 1000
/// max_drain_rounds = 100000
/// ```
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct RuntimeTomlConfig {
    /// Scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerToml,
}

/// Scheduler section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct SchedulerToml {
    /// Node visits per round.
    pub round_budget: Option<usize>,
    /// Round cap for `run_until_idle`.
    pub max_drain_rounds: Option<usize>,
}

/// Apply a parsed TOML config to a [`RuntimeConfig`].
///
/// Only fields that are `Some` in the TOML struct override the config.
#[cfg(feature = "config-file")]
pub fn apply_toml_config(config: &mut RuntimeConfig, toml: &RuntimeTomlConfig) {
    if let Some(v) = toml.scheduler.round_budget {
        config.round_budget = v;
    }
    if let Some(v) = toml.scheduler.max_drain_rounds {
        config.max_drain_rounds = v;
    }
}

/// Parse a TOML string into a [`RuntimeTomlConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_str(toml_str: &str) -> Result<RuntimeTomlConfig, ConfigError> {
    Ok(toml::from_str(toml_str)?)
}

/// Read and parse a TOML file into a [`RuntimeTomlConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_file(path: &std::path::Path) -> Result<RuntimeTomlConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_toml_str(&content)
}

// =========================================================================
// Tests
// =========================================================================


#[cfg(all(test, feature = "config-file"))]
mod toml_tests {
    use super::*;

    #[test]
    fn parse_toml_full_config() {
        let parsed = parse_toml_str(
            r"
[scheduler]
round_budget = 250
max_drain_rounds = 40
",
        )
        .unwrap();
        assert_eq!(parsed.scheduler.round_budget, Some(250));
        assert_eq!(parsed.scheduler.max_drain_rounds, Some(40));
    }

    #[test]
    fn parse_toml_empty_config() {
        let parsed = parse_toml_str("").unwrap();
        assert!(parsed.scheduler.round_budget.is_none());
    }

    #[test]
    fn parse_toml_wrong_type() {
        let result = parse_toml_str("[scheduler]\nround_budget = \"many\"\n");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn apply_toml_overrides_config() {
        let parsed = parse_toml_str("[scheduler]\nround_budget = 7\n").unwrap();
        let mut config = RuntimeConfig::default();
        apply_toml_config(&mut config, &parsed);
        assert_eq!(config.round_budget, 7);
    }

    #[test]
    fn toml_file_not_found() {
        let result = parse_toml_file(std::path::Path::new("/nonexistent/taskrt.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn toml_file_roundtrip() {
        let path = std::env::temp_dir().join(format!("taskrt-{}.toml", std::process::id()));
        std::fs::write(&path, "[scheduler]\nmax_drain_rounds = 3\n").unwrap();
        let parsed = parse_toml_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        let mut config = RuntimeConfig::default();
        apply_toml_config(&mut config, &parsed);
        assert_eq!(config.max_drain_rounds, 3);
    }
}
