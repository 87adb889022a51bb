//! Domain entities for the monitoring pipeline.
//!
//! Plain structs deriving `sqlx::FromRow` directly against table columns;
//! status fields use small enums deriving `sqlx::Type` so the SQLite `TEXT`
//! column round-trips through a typed Rust value instead of a
//! stringly-typed field.

mod filters;
mod process;
mod record;

pub use filters::ProcessFilters;
pub use process::{
    MonitoringProcess, ProcessCounters, ProcessStatus, Stage, StageTaskIds, StopReason,
};
pub use record::{WorkRecord, WorkRecordStatus};

use serde::{Deserialize, Serialize};

/// A registered operator account. Scope boundary for all other entities.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A set of upstream login credentials, owned by a `User`.
///
/// `password_encrypted` holds an `EncryptionKey`-produced blob; plaintext
/// never leaves the crypto adapter.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct UpstreamCredential {
    pub id: String,
    pub user_id: String,
    pub display_name: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_encrypted: Vec<u8>,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_used_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Which LLM vendor and model a `MonitoringProcess` generates comments with.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    pub id: String,
    pub user_id: String,
    pub vendor_tag: String,
    pub model_name: String,
    #[serde(skip_serializing)]
    pub api_key_encrypted: Vec<u8>,
    pub temperature: f64,
    pub max_tokens: i64,
    pub json_mode: bool,
    pub is_active: bool,
}

/// A reusable prompt pair for comment generation.
///
/// `owner_user_id` is `None` for system templates shared across users.
/// `user_prompt_template` placeholders are `{article_title}`,
/// `{article_author}`, `{article_content}`, `{article_excerpt}`,
/// `{article_category}`, `{current_date}`, `{user_nickname}` — see
/// [`crate::template`] for rendering.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub id: String,
    pub owner_user_id: Option<String>,
    pub name: String,
    pub system_prompt: String,
    pub user_prompt_template: String,
    pub is_system: bool,
}
