//! CRUD and stage-transition operations for `WorkRecord`, the coordination
//! primitive every stage worker reads and writes.

use super::DbPool;
use crate::domain::{Stage, WorkRecord, WorkRecordStatus};
use crate::error::StorageError;

#[derive(Debug, Clone, sqlx::FromRow)]
struct WorkRecordRow {
    id: String,
    process_id: String,
    user_id: String,
    credential_id: String,
    template_id: String,
    llm_provider_id: String,
    upstream_article_id: String,
    article_title: String,
    article_author: Option<String>,
    article_category: Option<String>,
    article_url: String,
    article_edited_at: Option<String>,
    article_content: Option<String>,
    article_raw_html: Option<String>,
    article_published_at: Option<String>,
    comment_content: Option<String>,
    upstream_comment_id: Option<String>,
    ai_model_name: Option<String>,
    ai_vendor_tag: Option<String>,
    generation_tokens: Option<i64>,
    generation_time_ms: Option<i64>,
    status: WorkRecordStatus,
    error_message: Option<String>,
    retry_count: i64,
    article_scraped_at: Option<String>,
    posted_at: Option<String>,
    failed_at: Option<String>,
    created_at: String,
    updated_at: String,
}

fn parse_ts(raw: &Option<String>) -> Option<chrono::DateTime<chrono::Utc>> {
    raw.as_deref()
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&chrono::Utc))
}

fn parse_required_ts(raw: &str) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .unwrap_or_else(|_| chrono::Utc::now())
}

impl From<WorkRecordRow> for WorkRecord {
    fn from(row: WorkRecordRow) -> Self {
        WorkRecord {
            id: row.id,
            process_id: row.process_id,
            user_id: row.user_id,
            credential_id: row.credential_id,
            template_id: row.template_id,
            llm_provider_id: row.llm_provider_id,
            upstream_article_id: row.upstream_article_id,
            article_title: row.article_title,
            article_author: row.article_author,
            article_category: row.article_category,
            article_url: row.article_url,
            article_edited_at: parse_ts(&row.article_edited_at),
            article_content: row.article_content,
            article_raw_html: row.article_raw_html,
            article_published_at: parse_ts(&row.article_published_at),
            comment_content: row.comment_content,
            upstream_comment_id: row.upstream_comment_id,
            ai_model_name: row.ai_model_name,
            ai_vendor_tag: row.ai_vendor_tag,
            generation_tokens: row.generation_tokens,
            generation_time_ms: row.generation_time_ms,
            status: row.status,
            error_message: row.error_message,
            retry_count: row.retry_count,
            article_scraped_at: parse_ts(&row.article_scraped_at),
            posted_at: parse_ts(&row.posted_at),
            failed_at: parse_ts(&row.failed_at),
            created_at: parse_required_ts(&row.created_at),
            updated_at: parse_required_ts(&row.updated_at),
        }
    }
}

/// A freshly enumerated article, not yet persisted — the unit the
/// discovery worker batch-inserts per `(credential, template)` pair.
#[derive(Debug, Clone)]
pub struct ProspectiveWorkRecord {
    pub process_id: String,
    pub user_id: String,
    pub credential_id: String,
    pub template_id: String,
    pub llm_provider_id: String,
    pub upstream_article_id: String,
    pub article_title: String,
    pub article_author: Option<String>,
    pub article_category: Option<String>,
    pub article_url: String,
    pub article_edited_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Batch write (§4.8 pattern 2): insert prospective records, skipping any
/// that violate the `(process_id, credential_id, template_id,
/// upstream_article_id)` uniqueness constraint. Returns the count actually
/// inserted, for the `articles_discovered` counter bump.
pub async fn insert_prospective_records(
    pool: &DbPool,
    records: &[ProspectiveWorkRecord],
) -> Result<u64, StorageError> {
    if records.is_empty() {
        return Ok(0);
    }
    let mut tx = pool.begin().await.map_err(|e| StorageError::Query { source: e })?;
    let mut inserted = 0u64;
    let now = chrono::Utc::now().to_rfc3339();

    for record in records {
        let id = uuid::Uuid::new_v4().to_string();
        let result = sqlx::query(
            "INSERT INTO work_records \
             (id, process_id, user_id, credential_id, template_id, llm_provider_id, \
              upstream_article_id, article_title, article_author, article_category, \
              article_url, article_edited_at, status, retry_count, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'DISCOVERED', 0, ?, ?) \
             ON CONFLICT (process_id, credential_id, template_id, upstream_article_id) DO NOTHING",
        )
        .bind(&id)
        .bind(&record.process_id)
        .bind(&record.user_id)
        .bind(&record.credential_id)
        .bind(&record.template_id)
        .bind(&record.llm_provider_id)
        .bind(&record.upstream_article_id)
        .bind(&record.article_title)
        .bind(&record.article_author)
        .bind(&record.article_category)
        .bind(&record.article_url)
        .bind(record.article_edited_at.map(|t| t.to_rfc3339()))
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Query { source: e })?;

        inserted += result.rows_affected();
    }

    tx.commit().await.map_err(|e| StorageError::Query { source: e })?;
    Ok(inserted)
}

/// Read+cache step 1 (§4.8 pattern 4): snapshot every record in `status`
/// for a process, then close the session.
pub async fn get_records_by_status(
    pool: &DbPool,
    process_id: &str,
    status: WorkRecordStatus,
) -> Result<Vec<WorkRecord>, StorageError> {
    let rows = sqlx::query_as::<_, WorkRecordRow>(
        "SELECT * FROM work_records WHERE process_id = ? AND status = ? ORDER BY created_at ASC",
    )
    .bind(process_id)
    .bind(status)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(rows.into_iter().map(WorkRecord::from).collect())
}

/// Single-record update (§4.8 pattern 3): transition `discovered → prepared`.
/// The `WHERE status = 'DISCOVERED'` guard makes a second, racing writer's
/// update a no-op rather than a double-transition.
pub async fn mark_prepared(
    pool: &DbPool,
    record_id: &str,
    article_content: &str,
    article_raw_html: &str,
    article_published_at: Option<chrono::DateTime<chrono::Utc>>,
) -> Result<(), StorageError> {
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "UPDATE work_records \
         SET article_content = ?, article_raw_html = ?, article_published_at = ?, \
             article_scraped_at = ?, status = 'PREPARED', updated_at = ? \
         WHERE id = ? AND status = 'DISCOVERED'",
    )
    .bind(article_content)
    .bind(article_raw_html)
    .bind(article_published_at.map(|t| t.to_rfc3339()))
    .bind(&now)
    .bind(&now)
    .bind(record_id)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Transition `prepared → generated`.
pub async fn mark_generated(
    pool: &DbPool,
    record_id: &str,
    comment_content: &str,
    ai_model_name: &str,
    ai_vendor_tag: &str,
    generation_tokens: i64,
    generation_time_ms: i64,
) -> Result<(), StorageError> {
    sqlx::query(
        "UPDATE work_records \
         SET comment_content = ?, ai_model_name = ?, ai_vendor_tag = ?, generation_tokens = ?, \
             generation_time_ms = ?, status = 'GENERATED', updated_at = ? \
         WHERE id = ? AND status = 'PREPARED'",
    )
    .bind(comment_content)
    .bind(ai_model_name)
    .bind(ai_vendor_tag)
    .bind(generation_tokens)
    .bind(generation_time_ms)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(record_id)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Transition `generated → posted`, recording the synthesized idempotency marker.
pub async fn mark_posted(
    pool: &DbPool,
    record_id: &str,
    idempotency_marker: &str,
) -> Result<(), StorageError> {
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "UPDATE work_records \
         SET upstream_comment_id = ?, posted_at = ?, status = 'POSTED', updated_at = ? \
         WHERE id = ? AND status = 'GENERATED'",
    )
    .bind(idempotency_marker)
    .bind(&now)
    .bind(&now)
    .bind(record_id)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Transition any non-terminal state to `failed` — the one transition
/// reachable from every stage.
pub async fn mark_failed(
    pool: &DbPool,
    record_id: &str,
    error_message: &str,
) -> Result<(), StorageError> {
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "UPDATE work_records \
         SET status = 'FAILED', error_message = ?, failed_at = ?, updated_at = ? \
         WHERE id = ?",
    )
    .bind(error_message)
    .bind(&now)
    .bind(&now)
    .bind(record_id)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Transition to `failed` while also bumping `retry_count` in the same
/// statement — used by stages whose failure path doesn't separately call
/// `increment_retry_count` before deciding to fail outright.
pub async fn mark_failed_with_retry(
    pool: &DbPool,
    record_id: &str,
    error_message: &str,
) -> Result<(), StorageError> {
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "UPDATE work_records \
         SET status = 'FAILED', error_message = ?, failed_at = ?, updated_at = ?, retry_count = retry_count + 1 \
         WHERE id = ?",
    )
    .bind(error_message)
    .bind(&now)
    .bind(&now)
    .bind(record_id)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Bump `retry_count` without changing status — used by the posting
/// worker on a transient failure that has not yet exhausted `N_retry`.
pub async fn increment_retry_count(pool: &DbPool, record_id: &str) -> Result<i64, StorageError> {
    sqlx::query("UPDATE work_records SET retry_count = retry_count + 1, updated_at = ? WHERE id = ?")
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(record_id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;

    let row: (i64,) = sqlx::query_as("SELECT retry_count FROM work_records WHERE id = ?")
        .bind(record_id)
        .fetch_one(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(row.0)
}

/// Aggregate status counts for a process, for the lifecycle service's
/// `status(process_id)` operation.
pub async fn status_counts(
    pool: &DbPool,
    process_id: &str,
) -> Result<std::collections::HashMap<WorkRecordStatus, i64>, StorageError> {
    let rows: Vec<(WorkRecordStatus, i64)> = sqlx::query_as(
        "SELECT status, COUNT(*) FROM work_records WHERE process_id = ? GROUP BY status",
    )
    .bind(process_id)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(rows.into_iter().collect())
}

/// Reference used only by callers to tag a stage-level error counter
/// update alongside a record-level `mark_failed`.
pub fn stage_name(stage: Stage) -> &'static str {
    stage.queue_name()
}
