//! The preparation stage: fetches full content for every `DISCOVERED`
//! record and transitions it to `PREPARED`, or `FAILED` on fetch error.
//!
//! Grounded in `storage/tweets.rs`'s short-transaction idiom applied per
//! record rather than in bulk: the scrape call happens with no DB session
//! open, mirroring §4.8's rule against external I/O inside a transaction.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::WorkRecordStatus;
use crate::error::PipelineError;
use crate::scrape::ScrapeAdapter;
use crate::storage::processes::CounterColumn;
use crate::storage::{processes, work_records, DbPool};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparationSummary {
    pub prepared: u64,
    pub failed: u64,
}

pub struct PreparationWorker {
    pool: Arc<DbPool>,
    scrape: Arc<dyn ScrapeAdapter>,
    rate_limit: Duration,
}

impl PreparationWorker {
    pub fn new(pool: Arc<DbPool>, scrape: Arc<dyn ScrapeAdapter>, rate_limit: Duration) -> Self {
        Self {
            pool,
            scrape,
            rate_limit,
        }
    }

    pub async fn run_once(&self, process_id: &str) -> Result<PreparationSummary, PipelineError> {
        let records =
            work_records::get_records_by_status(&self.pool, process_id, WorkRecordStatus::Discovered).await?;

        let mut summary = PreparationSummary::default();
        let mut first = true;
        for record in &records {
            if !first {
                tokio::time::sleep(self.rate_limit).await;
            }
            first = false;

            match self
                .scrape
                .fetch_article_content(&record.credential_id, &record.upstream_article_id)
                .await
            {
                Ok(content) => {
                    work_records::mark_prepared(
                        &self.pool,
                        &record.id,
                        &content.content,
                        &content.raw_html,
                        content.published_at,
                    )
                    .await?;
                    processes::increment_counter(&self.pool, process_id, CounterColumn::ArticlesPrepared, 1)
                        .await?;
                    summary.prepared += 1;
                }
                Err(e) => {
                    tracing::warn!(process_id, record_id = %record.id, error = %e, "preparation fetch failed");
                    work_records::mark_failed_with_retry(&self.pool, &record.id, &e.to_string()).await?;
                    processes::bump_stage_error(&self.pool, process_id, "preparation").await?;
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LlmProviderConfig, MonitoringProcess, PromptTemplate, ProcessFilters, ProcessStatus, StageTaskIds, User};
    use crate::scrape::mock::MockScrapeAdapter;
    use crate::scrape::ArticleContent;
    use crate::storage::work_records::ProspectiveWorkRecord;
    use crate::storage::{init_test_db, llm_providers, processes as processes_storage, templates, users};

    async fn seed(pool: &DbPool) {
        let now = chrono::Utc::now();
        users::insert_user(
            pool,
            &User {
                id: "u1".to_string(),
                email: "u1@example.com".to_string(),
                password_hash: "hash".to_string(),
                created_at: now,
            },
        )
        .await
        .unwrap();
        llm_providers::insert_provider(
            pool,
            &LlmProviderConfig {
                id: "llm1".to_string(),
                user_id: "u1".to_string(),
                vendor_tag: "openai".to_string(),
                model_name: "gpt-4o-mini".to_string(),
                api_key_encrypted: vec![0u8; 32],
                temperature: 0.7,
                max_tokens: 256,
                json_mode: false,
                is_active: true,
            },
        )
        .await
        .unwrap();
        templates::insert_template(
            pool,
            &PromptTemplate {
                id: "t1".to_string(),
                owner_user_id: None,
                name: "default".to_string(),
                system_prompt: "system".to_string(),
                user_prompt_template: "{article_title}".to_string(),
                is_system: true,
            },
        )
        .await
        .unwrap();
        processes_storage::insert_process(
            pool,
            &MonitoringProcess {
                id: "p1".to_string(),
                user_id: "u1".to_string(),
                name: "test".to_string(),
                description: None,
                llm_provider_id: "llm1".to_string(),
                filters: ProcessFilters::default(),
                generate_only: false,
                max_duration_minutes: 60,
                status: ProcessStatus::Running,
                stop_reason: None,
                started_at: Some(now),
                expires_at: Some(now + chrono::Duration::minutes(60)),
                stopped_at: None,
                stage_task_ids: StageTaskIds::default(),
                counters: Default::default(),
                error_message: None,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();
    }

    async fn seed_record(pool: &DbPool, upstream_article_id: &str) {
        work_records::insert_prospective_records(
            pool,
            &[ProspectiveWorkRecord {
                process_id: "p1".to_string(),
                user_id: "u1".to_string(),
                credential_id: "c1".to_string(),
                template_id: "t1".to_string(),
                llm_provider_id: "llm1".to_string(),
                upstream_article_id: upstream_article_id.to_string(),
                article_title: "title".to_string(),
                article_author: None,
                article_category: None,
                article_url: format!("https://example.com/{upstream_article_id}"),
                article_edited_at: None,
            }],
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn successful_fetch_transitions_to_prepared() {
        let pool = Arc::new(init_test_db().await.unwrap());
        seed(&pool).await;
        seed_record(&pool, "a1").await;

        let adapter = Arc::new(MockScrapeAdapter::new().with_content(
            "a1",
            ArticleContent {
                content: "body".to_string(),
                raw_html: "<p>body</p>".to_string(),
                published_at: None,
            },
        ));
        let worker = PreparationWorker::new(pool.clone(), adapter, Duration::from_millis(0));

        let summary = worker.run_once("p1").await.unwrap();
        assert_eq!(summary.prepared, 1);
        assert_eq!(summary.failed, 0);

        let prepared = work_records::get_records_by_status(&pool, "p1", WorkRecordStatus::Prepared)
            .await
            .unwrap();
        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared[0].article_content.as_deref(), Some("body"));
    }

    #[tokio::test]
    async fn failed_fetch_transitions_to_failed() {
        let pool = Arc::new(init_test_db().await.unwrap());
        seed(&pool).await;
        seed_record(&pool, "a1").await;

        let adapter = Arc::new(MockScrapeAdapter::new().with_content_failure("a1"));
        let worker = PreparationWorker::new(pool.clone(), adapter, Duration::from_millis(0));

        let summary = worker.run_once("p1").await.unwrap();
        assert_eq!(summary.prepared, 0);
        assert_eq!(summary.failed, 1);

        let discovered = work_records::get_records_by_status(&pool, "p1", WorkRecordStatus::Discovered)
            .await
            .unwrap();
        assert!(discovered.is_empty());

        let failed = work_records::get_records_by_status(&pool, "p1", WorkRecordStatus::Failed)
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].retry_count, 1);
    }
}
