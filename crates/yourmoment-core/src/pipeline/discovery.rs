//! The discovery stage: lists upstream articles for every credential on a
//! process and inserts one prospective `WorkRecord` per (article, template)
//! pair.
//!
//! A per-credential batch pass that tolerates one credential failing
//! without aborting the others, summarized into a plain counters struct.
//! This worker never calls a generator or poster itself — it only seeds
//! `work_records` and leaves every later stage to its own worker.

use std::sync::Arc;

use crate::error::{PipelineError, StorageError};
use crate::scrape::ScrapeAdapter;
use crate::storage::processes::CounterColumn;
use crate::storage::work_records::ProspectiveWorkRecord;
use crate::storage::{action_log, processes, work_records, DbPool};

/// Outcome of one `run_once` pass, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverySummary {
    pub articles_seen: usize,
    pub records_inserted: u64,
    pub credential_errors: usize,
}

pub struct DiscoveryWorker {
    pool: Arc<DbPool>,
    scrape: Arc<dyn ScrapeAdapter>,
}

impl DiscoveryWorker {
    pub fn new(pool: Arc<DbPool>, scrape: Arc<dyn ScrapeAdapter>) -> Self {
        Self { pool, scrape }
    }

    /// Run one discovery pass for `process_id`. Per-credential scrape
    /// failures are recorded via `bump_stage_error` and do not abort the
    /// remaining credentials.
    pub async fn run_once(&self, process_id: &str) -> Result<DiscoverySummary, PipelineError> {
        let process = processes::get_process(&self.pool, process_id)
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity: "MonitoringProcess",
                id: process_id.to_string(),
            })?;
        let credential_ids = processes::get_credential_ids(&self.pool, process_id).await?;
        let template_ids = processes::get_template_ids(&self.pool, process_id).await?;

        let mut summary = DiscoverySummary::default();
        let mut prospective = Vec::new();

        for credential_id in &credential_ids {
            let articles = match self.scrape.list_articles(credential_id, &process.filters).await {
                Ok(articles) => articles,
                Err(e) => {
                    tracing::warn!(process_id, credential_id, error = %e, "discovery list_articles failed");
                    processes::bump_stage_error(&self.pool, process_id, "discovery").await?;
                    summary.credential_errors += 1;
                    continue;
                }
            };
            summary.articles_seen += articles.len();

            for article in &articles {
                for template_id in &template_ids {
                    prospective.push(ProspectiveWorkRecord {
                        process_id: process_id.to_string(),
                        user_id: process.user_id.clone(),
                        credential_id: credential_id.clone(),
                        template_id: template_id.clone(),
                        llm_provider_id: process.llm_provider_id.clone(),
                        upstream_article_id: article.upstream_article_id.clone(),
                        article_title: article.title.clone(),
                        article_author: article.author.clone(),
                        article_category: article.category.clone(),
                        article_url: article.url.clone(),
                        article_edited_at: article.edited_at,
                    });
                }
            }
        }

        summary.records_inserted = work_records::insert_prospective_records(&self.pool, &prospective).await?;
        if summary.records_inserted > 0 {
            processes::increment_counter(
                &self.pool,
                process_id,
                CounterColumn::ArticlesDiscovered,
                summary.records_inserted as i64,
            )
            .await?;
        }
        action_log::log_action(
            &self.pool,
            Some(process_id),
            Some("discovery"),
            "run_once",
            Some(&format!(
                "seen={} inserted={} credential_errors={}",
                summary.articles_seen, summary.records_inserted, summary.credential_errors
            )),
        )
        .await?;

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LlmProviderConfig, MonitoringProcess, PromptTemplate, ProcessFilters, ProcessStatus, StageTaskIds, User};
    use crate::scrape::mock::MockScrapeAdapter;
    use crate::scrape::ArticleMeta;
    use crate::storage::{init_test_db, llm_providers, processes as processes_storage, templates, users};

    async fn seed_process(pool: &DbPool, generate_only: bool) -> MonitoringProcess {
        let now = chrono::Utc::now();
        let user = User {
            id: "u1".to_string(),
            email: "u1@example.com".to_string(),
            password_hash: "hash".to_string(),
            created_at: now,
        };
        users::insert_user(pool, &user).await.unwrap();

        let provider = LlmProviderConfig {
            id: "llm1".to_string(),
            user_id: "u1".to_string(),
            vendor_tag: "openai".to_string(),
            model_name: "gpt-4o-mini".to_string(),
            api_key_encrypted: vec![0u8; 32],
            temperature: 0.7,
            max_tokens: 256,
            json_mode: false,
            is_active: true,
        };
        llm_providers::insert_provider(pool, &provider).await.unwrap();

        let template = PromptTemplate {
            id: "t1".to_string(),
            owner_user_id: None,
            name: "default".to_string(),
            system_prompt: "system".to_string(),
            user_prompt_template: "{article_title}".to_string(),
            is_system: true,
        };
        templates::insert_template(pool, &template).await.unwrap();

        let process = MonitoringProcess {
            id: "p1".to_string(),
            user_id: "u1".to_string(),
            name: "test".to_string(),
            description: None,
            llm_provider_id: "llm1".to_string(),
            filters: ProcessFilters::default(),
            generate_only,
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
        };
        processes_storage::insert_process(pool, &process).await.unwrap();
        processes_storage::set_process_credentials(pool, "p1", &["c1".to_string()])
            .await
            .unwrap();
        processes_storage::set_process_templates(pool, "p1", &["t1".to_string()])
            .await
            .unwrap();
        process
    }

    fn sample_article(id: &str) -> ArticleMeta {
        ArticleMeta {
            upstream_article_id: id.to_string(),
            title: format!("title-{id}"),
            author: None,
            category: None,
            url: format!("https://example.com/{id}"),
            edited_at: None,
        }
    }

    #[tokio::test]
    async fn inserts_one_record_per_article_template_pair() {
        let pool = Arc::new(init_test_db().await.unwrap());
        seed_process(&pool, false).await;

        let adapter = Arc::new(
            MockScrapeAdapter::new().with_articles("c1", vec![sample_article("a1"), sample_article("a2")]),
        );
        let worker = DiscoveryWorker::new(pool.clone(), adapter);

        let summary = worker.run_once("p1").await.unwrap();
        assert_eq!(summary.articles_seen, 2);
        assert_eq!(summary.records_inserted, 2);
        assert_eq!(summary.credential_errors, 0);

        let records = work_records::get_records_by_status(&pool, "p1", crate::domain::WorkRecordStatus::Discovered)
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn rerunning_discovery_does_not_duplicate_records() {
        let pool = Arc::new(init_test_db().await.unwrap());
        seed_process(&pool, false).await;

        let adapter = Arc::new(MockScrapeAdapter::new().with_articles("c1", vec![sample_article("a1")]));
        let worker = DiscoveryWorker::new(pool.clone(), adapter);

        worker.run_once("p1").await.unwrap();
        let second = worker.run_once("p1").await.unwrap();
        assert_eq!(second.records_inserted, 0);

        let records = work_records::get_records_by_status(&pool, "p1", crate::domain::WorkRecordStatus::Discovered)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn credentials_without_scripted_articles_contribute_nothing() {
        let pool = Arc::new(init_test_db().await.unwrap());
        seed_process(&pool, false).await;
        processes_storage::set_process_credentials(&pool, "p1", &["c1".to_string(), "c2".to_string()])
            .await
            .unwrap();

        let adapter = Arc::new(MockScrapeAdapter::new().with_articles("c2", vec![sample_article("a1")]));
        let worker = DiscoveryWorker::new(pool.clone(), adapter);

        let summary = worker.run_once("p1").await.unwrap();
        assert_eq!(summary.credential_errors, 0);
        assert_eq!(summary.records_inserted, 1);
    }
}
