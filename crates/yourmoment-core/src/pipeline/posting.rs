//! The posting stage: submits every `GENERATED` record's comment upstream
//! and transitions it to `POSTED`, retries it on transient failure up to
//! `N_retry` times, or fails it outright on permanent rejection.
//!
//! Distinguishes a transient failure (leave for the next pass) from a
//! permanent one (stop retrying), mapped onto `ScrapeAdapter::post_comment`'s
//! `PostOutcome` rather than upstream-specific error matching.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::domain::WorkRecordStatus;
use crate::error::PipelineError;
use crate::scrape::{PostOutcome, ScrapeAdapter};
use crate::storage::processes::CounterColumn;
use crate::storage::{credentials, processes, work_records, DbPool};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingSummary {
    pub posted: u64,
    pub retried: u64,
    pub failed: u64,
}

pub struct PostingWorker {
    pool: Arc<DbPool>,
    scrape: Arc<dyn ScrapeAdapter>,
    rate_limit: Duration,
    max_retries: i64,
}

impl PostingWorker {
    pub fn new(pool: Arc<DbPool>, scrape: Arc<dyn ScrapeAdapter>, rate_limit: Duration, max_retries: i64) -> Self {
        Self {
            pool,
            scrape,
            rate_limit,
            max_retries,
        }
    }

    /// Deterministic per-post idempotency marker so a retried submission
    /// is distinguishable from a duplicate.
    fn idempotency_marker(process_id: &str, upstream_article_id: &str, work_record_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(process_id.as_bytes());
        hasher.update(b"|");
        hasher.update(upstream_article_id.as_bytes());
        hasher.update(b"|");
        hasher.update(work_record_id.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub async fn run_once(&self, process_id: &str) -> Result<PostingSummary, PipelineError> {
        let records =
            work_records::get_records_by_status(&self.pool, process_id, WorkRecordStatus::Generated).await?;

        let mut summary = PostingSummary::default();
        if records.is_empty() {
            return Ok(summary);
        }

        let credential_ids = dedup(records.iter().map(|r| r.credential_id.clone()));
        let loaded = credentials::get_credentials_by_ids(&self.pool, &credential_ids).await?;
        let known: std::collections::HashSet<String> = loaded.into_iter().map(|c| c.id).collect();

        let mut first = true;
        for record in &records {
            if !known.contains(&record.credential_id) {
                work_records::mark_failed(
                    &self.pool,
                    &record.id,
                    &format!("posting: credential {} not found", record.credential_id),
                )
                .await?;
                processes::bump_stage_error(&self.pool, process_id, "posting").await?;
                summary.failed += 1;
                continue;
            }

            if !first {
                tokio::time::sleep(self.rate_limit).await;
            }
            first = false;

            let comment = match &record.comment_content {
                Some(text) => text,
                None => {
                    work_records::mark_failed(&self.pool, &record.id, "posting: no generated comment").await?;
                    processes::bump_stage_error(&self.pool, process_id, "posting").await?;
                    summary.failed += 1;
                    continue;
                }
            };

            let outcome = self
                .scrape
                .post_comment(&record.credential_id, &record.upstream_article_id, comment)
                .await
                .unwrap_or_else(|e| PostOutcome::Transient { message: e.to_string() });

            match outcome {
                PostOutcome::Posted => {
                    let marker =
                        Self::idempotency_marker(process_id, &record.upstream_article_id, &record.id);
                    work_records::mark_posted(&self.pool, &record.id, &marker).await?;
                    processes::increment_counter(&self.pool, process_id, CounterColumn::CommentsPosted, 1)
                        .await?;
                    credentials::touch_last_used(&self.pool, &record.credential_id).await?;
                    summary.posted += 1;
                }
                PostOutcome::Transient { message } => {
                    let retry_count = work_records::increment_retry_count(&self.pool, &record.id).await?;
                    processes::bump_stage_error(&self.pool, process_id, "posting").await?;
                    if retry_count >= self.max_retries {
                        work_records::mark_failed(&self.pool, &record.id, &message).await?;
                        summary.failed += 1;
                    } else {
                        tracing::info!(process_id, record_id = %record.id, retry_count, "posting transient failure, will retry");
                        summary.retried += 1;
                    }
                }
                PostOutcome::Permanent { message } => {
                    work_records::mark_failed(&self.pool, &record.id, &message).await?;
                    processes::bump_stage_error(&self.pool, process_id, "posting").await?;
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }
}

fn dedup(iter: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    iter.filter(|id| seen.insert(id.clone())).collect()
}
