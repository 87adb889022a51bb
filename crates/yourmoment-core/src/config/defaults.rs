//! Default values for all configuration sections.

use super::{CryptoConfig, DisclosureConfig, LimitsConfig, LoggingConfig, StorageConfig, TimingConfig};

pub fn default_t_trigger() -> u64 {
    60
}
pub fn default_t_timeout() -> u64 {
    30
}
pub fn default_r_prep() -> u64 {
    2
}
pub fn default_r_post() -> u64 {
    5
}
pub fn default_n_retry() -> i64 {
    3
}
pub fn default_max_processes_per_user() -> u32 {
    10
}
pub fn default_db_path() -> String {
    "~/.yourmoment/yourmoment.db".to_string()
}
pub fn default_encryption_key_env() -> String {
    "YOURMOMENT_ENCRYPTION_KEY".to_string()
}
pub fn default_ai_comment_prefix() -> String {
    "[AI-generated]".to_string()
}
pub fn default_log_filter() -> String {
    "yourmoment=info,yourmoment_core=info,warn".to_string()
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            t_trigger_seconds: default_t_trigger(),
            t_timeout_seconds: default_t_timeout(),
            r_prep_seconds: default_r_prep(),
            r_post_seconds: default_r_post(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            n_retry: default_n_retry(),
            max_processes_per_user: default_max_processes_per_user(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            encryption_key_env: default_encryption_key_env(),
        }
    }
}

impl Default for DisclosureConfig {
    fn default() -> Self {
        Self {
            ai_comment_prefix: default_ai_comment_prefix(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: default_log_filter(),
        }
    }
}
