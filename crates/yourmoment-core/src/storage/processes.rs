//! CRUD and lifecycle operations for `MonitoringProcess`.
//!
//! `credential_ids`/`template_ids` live in the `process_credentials`/
//! `process_templates` join tables, not on the row itself — loaded
//! separately so a plain config read (§4.8 pattern 1) stays one query plus
//! two small joined-id-list queries, never a row with embedded collections.

use super::DbPool;
use crate::domain::{
    MonitoringProcess, ProcessCounters, ProcessFilters, ProcessStatus, StageTaskIds, StopReason,
};
use crate::error::StorageError;
use std::collections::HashMap;

/// Flat row shape matching `monitoring_processes` columns 1:1, the way
/// `storage/tweets.rs::DiscoveredTweet` maps directly onto its table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ProcessRow {
    id: String,
    user_id: String,
    name: String,
    description: Option<String>,
    llm_provider_id: String,
    filters_json: String,
    generate_only: bool,
    max_duration_minutes: i64,
    status: ProcessStatus,
    stop_reason: Option<StopReason>,
    started_at: Option<String>,
    expires_at: Option<String>,
    stopped_at: Option<String>,
    stage_task_ids_json: String,
    articles_discovered: i64,
    articles_prepared: i64,
    comments_generated: i64,
    comments_posted: i64,
    errors_by_stage_json: String,
    error_message: Option<String>,
    created_at: String,
    updated_at: String,
}

fn parse_ts(raw: &Option<String>) -> Option<chrono::DateTime<chrono::Utc>> {
    raw.as_deref()
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&chrono::Utc))
}

impl From<ProcessRow> for MonitoringProcess {
    fn from(row: ProcessRow) -> Self {
        MonitoringProcess {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            llm_provider_id: row.llm_provider_id,
            filters: ProcessFilters::from_json(&row.filters_json),
            generate_only: row.generate_only,
            max_duration_minutes: row.max_duration_minutes,
            status: row.status,
            stop_reason: row.stop_reason,
            started_at: parse_ts(&row.started_at),
            expires_at: parse_ts(&row.expires_at),
            stopped_at: parse_ts(&row.stopped_at),
            stage_task_ids: StageTaskIds::from_json(&row.stage_task_ids_json),
            counters: ProcessCounters {
                articles_discovered: row.articles_discovered,
                articles_prepared: row.articles_prepared,
                comments_generated: row.comments_generated,
                comments_posted: row.comments_posted,
                errors_by_stage: serde_json::from_str(&row.errors_by_stage_json)
                    .unwrap_or_default(),
            },
            error_message: row.error_message,
            created_at: chrono::DateTime::parse_from_rfc3339(&row.created_at)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::Utc::now()),
            updated_at: chrono::DateTime::parse_from_rfc3339(&row.updated_at)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::Utc::now()),
        }
    }
}

/// Insert a new process row in `CREATED` status. Does not populate the
/// join tables — call `set_process_credentials`/`set_process_templates`
/// in the same caller-level operation.
pub async fn insert_process(pool: &DbPool, process: &MonitoringProcess) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO monitoring_processes \
         (id, user_id, name, description, llm_provider_id, filters_json, generate_only, \
          max_duration_minutes, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&process.id)
    .bind(&process.user_id)
    .bind(&process.name)
    .bind(&process.description)
    .bind(&process.llm_provider_id)
    .bind(process.filters.to_json())
    .bind(process.generate_only)
    .bind(process.max_duration_minutes)
    .bind(process.status)
    .bind(process.created_at.to_rfc3339())
    .bind(process.updated_at.to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Config read (§4.8 pattern 1): a single SELECT, converted to an
/// in-memory snapshot. Returns `None` if the process does not exist.
pub async fn get_process(
    pool: &DbPool,
    process_id: &str,
) -> Result<Option<MonitoringProcess>, StorageError> {
    let row = sqlx::query_as::<_, ProcessRow>("SELECT * FROM monitoring_processes WHERE id = ?")
        .bind(process_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(row.map(MonitoringProcess::from))
}

/// All processes in `RUNNING` status, for the coordinator and enforcer ticks.
pub async fn list_running_processes(pool: &DbPool) -> Result<Vec<MonitoringProcess>, StorageError> {
    let rows = sqlx::query_as::<_, ProcessRow>(
        "SELECT * FROM monitoring_processes WHERE status = 'RUNNING'",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(rows.into_iter().map(MonitoringProcess::from).collect())
}

/// Replace the credential set for a process.
pub async fn set_process_credentials(
    pool: &DbPool,
    process_id: &str,
    credential_ids: &[String],
) -> Result<(), StorageError> {
    let mut tx = pool.begin().await.map_err(|e| StorageError::Query { source: e })?;
    sqlx::query("DELETE FROM process_credentials WHERE process_id = ?")
        .bind(process_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    for credential_id in credential_ids {
        sqlx::query(
            "INSERT INTO process_credentials (process_id, credential_id) VALUES (?, ?)",
        )
        .bind(process_id)
        .bind(credential_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    }
    tx.commit().await.map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Replace the template set for a process.
pub async fn set_process_templates(
    pool: &DbPool,
    process_id: &str,
    template_ids: &[String],
) -> Result<(), StorageError> {
    let mut tx = pool.begin().await.map_err(|e| StorageError::Query { source: e })?;
    sqlx::query("DELETE FROM process_templates WHERE process_id = ?")
        .bind(process_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    for template_id in template_ids {
        sqlx::query("INSERT INTO process_templates (process_id, template_id) VALUES (?, ?)")
            .bind(process_id)
            .bind(template_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Query { source: e })?;
    }
    tx.commit().await.map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Joined id list for a process's credentials.
pub async fn get_credential_ids(pool: &DbPool, process_id: &str) -> Result<Vec<String>, StorageError> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT credential_id FROM process_credentials WHERE process_id = ?",
    )
    .bind(process_id)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Joined id list for a process's templates.
pub async fn get_template_ids(pool: &DbPool, process_id: &str) -> Result<Vec<String>, StorageError> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT template_id FROM process_templates WHERE process_id = ?",
    )
    .bind(process_id)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Transition `CREATED → RUNNING`, stamping `started_at`/`expires_at`.
pub async fn mark_started(
    pool: &DbPool,
    process_id: &str,
    started_at: chrono::DateTime<chrono::Utc>,
    expires_at: chrono::DateTime<chrono::Utc>,
) -> Result<(), StorageError> {
    sqlx::query(
        "UPDATE monitoring_processes \
         SET status = 'RUNNING', started_at = ?, expires_at = ?, updated_at = ? \
         WHERE id = ?",
    )
    .bind(started_at.to_rfc3339())
    .bind(expires_at.to_rfc3339())
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(process_id)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Transition to `STOPPED`, clearing stage task ids, for both the
/// lifecycle service's manual stop and the timeout enforcer.
pub async fn mark_stopped(
    pool: &DbPool,
    process_id: &str,
    reason: StopReason,
) -> Result<(), StorageError> {
    sqlx::query(
        "UPDATE monitoring_processes \
         SET status = 'STOPPED', stop_reason = ?, stopped_at = ?, stage_task_ids_json = '{}', \
             updated_at = ? \
         WHERE id = ?",
    )
    .bind(reason)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(process_id)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Overwrite the stage task id map, used by the coordinator after dispatch.
pub async fn set_stage_task_ids(
    pool: &DbPool,
    process_id: &str,
    stage_task_ids: &StageTaskIds,
) -> Result<(), StorageError> {
    sqlx::query(
        "UPDATE monitoring_processes SET stage_task_ids_json = ?, updated_at = ? WHERE id = ?",
    )
    .bind(stage_task_ids.to_json())
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(process_id)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Atomic `counters.<column> += delta`, per the concurrency model's
/// "no read-modify-write in application code" rule.
pub async fn increment_counter(
    pool: &DbPool,
    process_id: &str,
    column: CounterColumn,
    delta: i64,
) -> Result<(), StorageError> {
    let sql = format!(
        "UPDATE monitoring_processes SET {col} = {col} + ?, updated_at = ? WHERE id = ?",
        col = column.column_name()
    );
    sqlx::query(&sql)
        .bind(delta)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(process_id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Which throughput counter to bump. A closed enum (rather than a raw
/// column-name string) so callers can't accidentally target an arbitrary
/// column via string interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterColumn {
    ArticlesDiscovered,
    ArticlesPrepared,
    CommentsGenerated,
    CommentsPosted,
}

impl CounterColumn {
    fn column_name(self) -> &'static str {
        match self {
            CounterColumn::ArticlesDiscovered => "articles_discovered",
            CounterColumn::ArticlesPrepared => "articles_prepared",
            CounterColumn::CommentsGenerated => "comments_generated",
            CounterColumn::CommentsPosted => "comments_posted",
        }
    }
}

/// Merge `delta` into `errors_by_stage[stage]`, read-modify-write within a
/// single short transaction (the map is small and process-owned, so this
/// stays within the <100ms budget unlike the plain integer counters above).
pub async fn bump_stage_error(
    pool: &DbPool,
    process_id: &str,
    stage: &str,
) -> Result<(), StorageError> {
    let mut tx = pool.begin().await.map_err(|e| StorageError::Query { source: e })?;
    let row: (String,) = sqlx::query_as(
        "SELECT errors_by_stage_json FROM monitoring_processes WHERE id = ?",
    )
    .bind(process_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    let mut errors: HashMap<String, i64> = serde_json::from_str(&row.0).unwrap_or_default();
    *errors.entry(stage.to_string()).or_insert(0) += 1;
    let updated = serde_json::to_string(&errors).unwrap_or_else(|_| "{}".to_string());

    sqlx::query(
        "UPDATE monitoring_processes SET errors_by_stage_json = ?, updated_at = ? WHERE id = ?",
    )
    .bind(updated)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(process_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    tx.commit().await.map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Mark a process `FAILED` with an explanatory message — reserved for
/// configuration invariant violations, not transient operational issues.
pub async fn mark_failed(
    pool: &DbPool,
    process_id: &str,
    error_message: &str,
) -> Result<(), StorageError> {
    sqlx::query(
        "UPDATE monitoring_processes SET status = 'FAILED', error_message = ?, updated_at = ? WHERE id = ?",
    )
    .bind(error_message)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(process_id)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}
