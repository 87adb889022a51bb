//! Configuration management for the yourMoment pipeline.
//!
//! Three-layer loading:
//! 1. Built-in defaults
//! 2. TOML config file (`~/.yourmoment/config.toml`)
//! 3. Environment variable overrides (`YOURMOMENT_` prefix)

mod defaults;
mod env_overrides;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Top-level configuration for the yourMoment pipeline process.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Coordinator and timeout-enforcer tick intervals.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Retry and concurrency limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Database connection settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// AES-256-GCM credential/API-key encryption settings.
    #[serde(default)]
    pub crypto: CryptoConfig,

    /// Generated-comment disclosure requirements.
    #[serde(default)]
    pub disclosure: DisclosureConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            limits: LimitsConfig::default(),
            storage: StorageConfig::default(),
            crypto: CryptoConfig::default(),
            disclosure: DisclosureConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// How often the coordinator and timeout enforcer tick, in seconds.
///
/// Field names follow the *T_trigger*/*T_timeout*/*R_prep*/*R_post*
/// vocabulary used in operational docs and config files directly, rather
/// than renaming them into a different house style.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingConfig {
    /// Coordinator dispatch interval, seconds. Spec default: 60.
    #[serde(default = "defaults::default_t_trigger")]
    pub t_trigger_seconds: u64,

    /// Timeout enforcer interval, seconds. Spec default: 30.
    #[serde(default = "defaults::default_t_timeout")]
    pub t_timeout_seconds: u64,

    /// Per-credential delay between preparation fetches, seconds.
    #[serde(default = "defaults::default_r_prep")]
    pub r_prep_seconds: u64,

    /// Per-credential delay between posting attempts, seconds.
    #[serde(default = "defaults::default_r_post")]
    pub r_post_seconds: u64,
}

/// Retry and per-user resource limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Maximum posting retries before a record is marked failed.
    #[serde(default = "defaults::default_n_retry")]
    pub n_retry: i64,

    /// Maximum concurrently running processes per user.
    #[serde(default = "defaults::default_max_processes_per_user")]
    pub max_processes_per_user: u32,
}

/// Database connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "defaults::default_db_path")]
    pub db_path: String,
}

/// Where the AES-256-GCM encryption key is sourced from.
///
/// The key always comes from the environment; there is no first-run key
/// file generated or persisted to disk.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CryptoConfig {
    /// Name of the environment variable holding the base64-encoded
    /// 256-bit key. Defaults to `YOURMOMENT_ENCRYPTION_KEY`.
    #[serde(default = "defaults::default_encryption_key_env")]
    pub encryption_key_env: String,
}

/// Disclosure requirements for generated comments.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisclosureConfig {
    /// Prefix every posted comment must begin with.
    #[serde(default = "defaults::default_ai_comment_prefix")]
    pub ai_comment_prefix: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "defaults::default_log_filter")]
    pub default_filter: String,
}

impl Config {
    /// Load configuration from a TOML file with environment variable overrides.
    ///
    /// 1. Determine config file path (argument > `YOURMOMENT_CONFIG` env var > default)
    /// 2. Parse TOML file (or use defaults if the default path doesn't exist)
    /// 3. Apply environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Config, ConfigError> {
        let (path, explicit) = Self::resolve_config_path(config_path);

        let mut config = match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str::<Config>(&contents)
                .map_err(|e| ConfigError::ParseError { source: e })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if explicit {
                    return Err(ConfigError::FileNotFound {
                        path: path.display().to_string(),
                    });
                }
                Config::default()
            }
            Err(_) => {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration and validate it, returning all validation errors at once.
    pub fn load_and_validate(config_path: Option<&str>) -> Result<Config, Vec<ConfigError>> {
        let config = Config::load(config_path).map_err(|e| vec![e])?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration, returning all errors found (not just the first).
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        if self.timing.t_trigger_seconds == 0 {
            errors.push(ConfigError::InvalidValue {
                field: "timing.t_trigger_seconds".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if self.timing.t_timeout_seconds == 0 {
            errors.push(ConfigError::InvalidValue {
                field: "timing.t_timeout_seconds".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if self.limits.n_retry < 0 {
            errors.push(ConfigError::InvalidValue {
                field: "limits.n_retry".to_string(),
                message: "must not be negative".to_string(),
            });
        }
        if self.limits.max_processes_per_user == 0 {
            errors.push(ConfigError::InvalidValue {
                field: "limits.max_processes_per_user".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if self.disclosure.ai_comment_prefix.is_empty() {
            errors.push(ConfigError::InvalidValue {
                field: "disclosure.ai_comment_prefix".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn resolve_config_path(config_path: Option<&str>) -> (PathBuf, bool) {
        if let Some(path) = config_path {
            return (expand_tilde(path), true);
        }
        if let Ok(env_path) = env::var("YOURMOMENT_CONFIG") {
            return (expand_tilde(&env_path), true);
        }
        (expand_tilde("~/.yourmoment/config.toml"), false)
    }
}

/// Expand `~` at the start of a path to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
