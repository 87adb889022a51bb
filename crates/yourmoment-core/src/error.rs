//! Error types for the yourMoment core library.
//!
//! Each module has its own error enum to provide clear error boundaries.
//! The library uses `thiserror` for structured, typed errors.

/// Errors related to configuration loading, parsing, and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required configuration field is absent.
    #[error("missing required config field: {field}")]
    MissingField {
        /// The name of the missing field.
        field: String,
    },

    /// A configuration field has an unacceptable value.
    #[error("invalid value for config field '{field}': {message}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// A description of why the value is invalid.
        message: String,
    },

    /// The configuration file does not exist at the specified path.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// The path that was searched.
        path: String,
    },

    /// TOML deserialization failed.
    #[error("failed to parse config file: {source}")]
    ParseError {
        /// The underlying TOML parse error.
        #[source]
        source: toml::de::Error,
    },
}

/// Errors from SQLite storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to connect to SQLite database.
    #[error("database connection error: {source}")]
    Connection {
        /// The underlying SQLx error.
        #[source]
        source: sqlx::Error,
    },

    /// Database migration failed.
    #[error("database migration error: {source}")]
    Migration {
        /// The underlying migration error.
        #[source]
        source: sqlx::migrate::MigrateError,
    },

    /// A database query failed.
    #[error("database query error: {source}")]
    Query {
        /// The underlying SQLx error.
        #[source]
        source: sqlx::Error,
    },

    /// A referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity that was looked up.
        entity: &'static str,
        /// The id that was searched for.
        id: String,
    },
}

/// Errors from the credential/secret encryption layer.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The encryption key environment variable is unset or malformed.
    #[error("encryption key unavailable: {message}")]
    KeyUnavailable {
        /// Details about why the key could not be loaded.
        message: String,
    },

    /// Authenticated encryption failed.
    #[error("encryption failed")]
    EncryptFailed,

    /// Authenticated decryption failed (wrong key, or ciphertext tampered with).
    #[error("decryption failed: ciphertext invalid or authentication tag mismatch")]
    DecryptFailed,

    /// The ciphertext blob is shorter than the minimum nonce length.
    #[error("ciphertext too short: got {len} bytes, need at least {min} bytes")]
    CiphertextTooShort {
        /// Number of bytes actually present.
        len: usize,
        /// Minimum number of bytes required.
        min: usize,
    },
}

/// Errors from scraping upstream sources (article discovery, content fetch, posting).
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// Network-level failure communicating with the upstream source.
    #[error("scrape network error: {source}")]
    Network {
        /// The underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The upstream source returned an unexpected status or body shape.
    #[error("scrape upstream error (status {status}): {message}")]
    Upstream {
        /// The HTTP status code.
        status: u16,
        /// The error message or body excerpt from the upstream source.
        message: String,
    },

    /// The upstream source is rate limiting requests.
    #[error("scrape rate limited{}", match .retry_after_secs {
        Some(secs) => format!(", retry after {secs}s"),
        None => String::new(),
    })]
    RateLimited {
        /// Seconds to wait before retrying, if provided by the upstream source.
        retry_after_secs: Option<u64>,
    },

    /// The credential used to authenticate against the upstream source was rejected.
    #[error("upstream credential rejected: {message}")]
    CredentialRejected {
        /// Details about the rejection.
        message: String,
    },

    /// Posting the generated comment failed.
    #[error("post failed: {message}")]
    PostFailed {
        /// Details about the failure.
        message: String,
    },
}

/// Errors from interacting with LLM providers (OpenAI-compatible, Anthropic).
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// HTTP request to the LLM endpoint failed.
    #[error("LLM HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// LLM API returned an error response.
    #[error("LLM API error (status {status}): {message}")]
    Api {
        /// The HTTP status code.
        status: u16,
        /// The error message from the API.
        message: String,
    },

    /// LLM provider rate limit hit.
    #[error("LLM rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// LLM response could not be parsed.
    #[error("failed to parse LLM response: {0}")]
    Parse(String),

    /// The referenced LLM provider config does not name a supported vendor.
    #[error("unsupported LLM vendor: {vendor}")]
    UnsupportedVendor {
        /// The vendor tag that was requested.
        vendor: String,
    },

    /// Content generation failed after retries.
    #[error("content generation failed: {0}")]
    GenerationFailed(String),
}

/// Errors from the broker (task queue) layer.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// The referenced task id does not exist.
    #[error("task not found: {task_id}")]
    TaskNotFound {
        /// The task id that was looked up.
        task_id: String,
    },

    /// A storage operation backing the broker failed.
    #[error("broker storage error: {source}")]
    Storage {
        /// The underlying storage error.
        #[source]
        source: StorageError,
    },

    /// The task is in a terminal state and cannot be transitioned.
    #[error("task {task_id} is already in terminal state {state}")]
    AlreadyTerminal {
        /// The task id.
        task_id: String,
        /// The terminal state the task is already in.
        state: String,
    },
}

impl From<StorageError> for BrokerError {
    fn from(source: StorageError) -> Self {
        BrokerError::Storage { source }
    }
}

/// Errors raised while running a pipeline stage or the coordinator.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A storage operation failed.
    #[error("pipeline storage error: {0}")]
    Storage(#[from] StorageError),

    /// A broker operation failed.
    #[error("pipeline broker error: {0}")]
    Broker(#[from] BrokerError),

    /// The scrape adapter failed.
    #[error("pipeline scrape error: {0}")]
    Scrape(#[from] ScrapeError),

    /// The LLM adapter failed.
    #[error("pipeline llm error: {0}")]
    Llm(#[from] LlmError),

    /// The crypto layer failed while decrypting a stored credential.
    #[error("pipeline crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// A work record referenced an entity that no longer exists.
    #[error("referenced {entity} missing for work record {work_record_id}")]
    DanglingReference {
        /// The kind of entity that is missing.
        entity: &'static str,
        /// The work record id that referenced it.
        work_record_id: String,
    },

    /// A process cannot start because its configuration is incomplete.
    #[error("process {process_id} cannot start: {reason}")]
    InvalidProcessConfig {
        /// The process id.
        process_id: String,
        /// Why the configuration is incomplete.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_missing_field_message() {
        let err = ConfigError::MissingField {
            field: "database.url".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "missing required config field: database.url"
        );
    }

    #[test]
    fn config_error_invalid_value_message() {
        let err = ConfigError::InvalidValue {
            field: "pipeline.retry_limit".to_string(),
            message: "must be greater than 0".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value for config field 'pipeline.retry_limit': must be greater than 0"
        );
    }

    #[test]
    fn config_error_file_not_found_message() {
        let err = ConfigError::FileNotFound {
            path: "/home/user/.yourmoment/config.toml".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "config file not found: /home/user/.yourmoment/config.toml"
        );
    }

    #[test]
    fn storage_error_not_found_message() {
        let err = StorageError::NotFound {
            entity: "work_record",
            id: "wr-1".to_string(),
        };
        assert_eq!(err.to_string(), "work_record not found: wr-1");
    }

    #[test]
    fn crypto_error_ciphertext_too_short_message() {
        let err = CryptoError::CiphertextTooShort { len: 4, min: 12 };
        assert_eq!(
            err.to_string(),
            "ciphertext too short: got 4 bytes, need at least 12 bytes"
        );
    }

    #[test]
    fn crypto_error_decrypt_failed_message() {
        let err = CryptoError::DecryptFailed;
        assert_eq!(
            err.to_string(),
            "decryption failed: ciphertext invalid or authentication tag mismatch"
        );
    }

    #[test]
    fn scrape_error_rate_limited_with_retry() {
        let err = ScrapeError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert_eq!(err.to_string(), "scrape rate limited, retry after 30s");
    }

    #[test]
    fn scrape_error_rate_limited_without_retry() {
        let err = ScrapeError::RateLimited {
            retry_after_secs: None,
        };
        assert_eq!(err.to_string(), "scrape rate limited");
    }

    #[test]
    fn scrape_error_upstream_message() {
        let err = ScrapeError::Upstream {
            status: 503,
            message: "service unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "scrape upstream error (status 503): service unavailable"
        );
    }

    #[test]
    fn llm_error_unsupported_vendor_message() {
        let err = LlmError::UnsupportedVendor {
            vendor: "cohere".to_string(),
        };
        assert_eq!(err.to_string(), "unsupported LLM vendor: cohere");
    }

    #[test]
    fn llm_error_rate_limited_message() {
        let err = LlmError::RateLimited {
            retry_after_secs: 30,
        };
        assert_eq!(err.to_string(), "LLM rate limited, retry after 30 seconds");
    }

    #[test]
    fn broker_error_task_not_found_message() {
        let err = BrokerError::TaskNotFound {
            task_id: "t-1".to_string(),
        };
        assert_eq!(err.to_string(), "task not found: t-1");
    }

    #[test]
    fn broker_error_already_terminal_message() {
        let err = BrokerError::AlreadyTerminal {
            task_id: "t-1".to_string(),
            state: "SUCCESS".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "task t-1 is already in terminal state SUCCESS"
        );
    }

    #[test]
    fn pipeline_error_dangling_reference_message() {
        let err = PipelineError::DanglingReference {
            entity: "llm_provider_config",
            work_record_id: "w-1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "referenced llm_provider_config missing for work record w-1"
        );
    }

    #[test]
    fn pipeline_error_wraps_storage_error() {
        let storage_err = StorageError::NotFound {
            entity: "user",
            id: "u-1".to_string(),
        };
        let err: PipelineError = storage_err.into();
        assert!(matches!(err, PipelineError::Storage(_)));
    }
}
