//! Environment variable overrides for configuration.

use super::Config;
use crate::error::ConfigError;
use std::env;

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables use the `YOURMOMENT_` prefix with double
    /// underscores separating nested keys (e.g. `YOURMOMENT_TIMING__T_TRIGGER_SECONDS`).
    pub(super) fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = env::var("YOURMOMENT_TIMING__T_TRIGGER_SECONDS") {
            self.timing.t_trigger_seconds =
                parse_env_u64("YOURMOMENT_TIMING__T_TRIGGER_SECONDS", &val)?;
        }
        if let Ok(val) = env::var("YOURMOMENT_TIMING__T_TIMEOUT_SECONDS") {
            self.timing.t_timeout_seconds =
                parse_env_u64("YOURMOMENT_TIMING__T_TIMEOUT_SECONDS", &val)?;
        }
        if let Ok(val) = env::var("YOURMOMENT_TIMING__R_PREP_SECONDS") {
            self.timing.r_prep_seconds = parse_env_u64("YOURMOMENT_TIMING__R_PREP_SECONDS", &val)?;
        }
        if let Ok(val) = env::var("YOURMOMENT_TIMING__R_POST_SECONDS") {
            self.timing.r_post_seconds = parse_env_u64("YOURMOMENT_TIMING__R_POST_SECONDS", &val)?;
        }

        if let Ok(val) = env::var("YOURMOMENT_LIMITS__N_RETRY") {
            self.limits.n_retry = parse_env_i64("YOURMOMENT_LIMITS__N_RETRY", &val)?;
        }
        if let Ok(val) = env::var("YOURMOMENT_LIMITS__MAX_PROCESSES_PER_USER") {
            self.limits.max_processes_per_user =
                parse_env_u32("YOURMOMENT_LIMITS__MAX_PROCESSES_PER_USER", &val)?;
        }

        if let Ok(val) = env::var("YOURMOMENT_STORAGE__DB_PATH") {
            self.storage.db_path = val;
        }

        if let Ok(val) = env::var("YOURMOMENT_CRYPTO__ENCRYPTION_KEY_ENV") {
            self.crypto.encryption_key_env = val;
        }

        if let Ok(val) = env::var("YOURMOMENT_DISCLOSURE__AI_COMMENT_PREFIX") {
            self.disclosure.ai_comment_prefix = val;
        }

        if let Ok(val) = env::var("YOURMOMENT_LOGGING__DEFAULT_FILTER") {
            self.logging.default_filter = val;
        }

        Ok(())
    }
}

fn parse_env_u64(var_name: &str, val: &str) -> Result<u64, ConfigError> {
    val.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
        field: var_name.to_string(),
        message: format!("'{val}' is not a valid u64"),
    })
}

fn parse_env_i64(var_name: &str, val: &str) -> Result<i64, ConfigError> {
    val.parse::<i64>().map_err(|_| ConfigError::InvalidValue {
        field: var_name.to_string(),
        message: format!("'{val}' is not a valid i64"),
    })
}

fn parse_env_u32(var_name: &str, val: &str) -> Result<u32, ConfigError> {
    val.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
        field: var_name.to_string(),
        message: format!("'{val}' is not a valid u32"),
    })
}
