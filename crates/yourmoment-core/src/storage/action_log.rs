//! Append-only audit trail of stage transitions and enforcer actions.
//!
//! Purely observability — not read by any pipeline component, only written
//! by workers and the enforcer as they act.

use super::DbPool;
use crate::error::StorageError;

/// One entry in the action audit log.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct ActionLogEntry {
    pub id: i64,
    pub process_id: Option<String>,
    pub stage: Option<String>,
    pub action: String,
    pub detail: Option<String>,
    pub created_at: String,
}

/// Record an action. `stage` is `None` for process-level actions (start/stop).
pub async fn log_action(
    pool: &DbPool,
    process_id: Option<&str>,
    stage: Option<&str>,
    action: &str,
    detail: Option<&str>,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO action_log (process_id, stage, action, detail, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(process_id)
    .bind(stage)
    .bind(action)
    .bind(detail)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Fetch the action log for a process, most recent first.
pub async fn get_actions_for_process(
    pool: &DbPool,
    process_id: &str,
    limit: i64,
) -> Result<Vec<ActionLogEntry>, StorageError> {
    sqlx::query_as::<_, ActionLogEntry>(
        "SELECT * FROM action_log WHERE process_id = ? ORDER BY id DESC LIMIT ?",
    )
    .bind(process_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })
}
