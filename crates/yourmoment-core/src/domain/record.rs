//! The `WorkRecord` entity: one upstream article as it flows through the
//! discovery → preparation → generation → posting pipeline.

use serde::{Deserialize, Serialize};

/// Where a `WorkRecord` sits in the pipeline.
///
/// `Failed` is terminal — a failed record is never retried automatically;
/// retries are a fresh `WorkRecord` created by a later discovery pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkRecordStatus {
    Discovered,
    Prepared,
    Generated,
    Posted,
    Failed,
}

impl WorkRecordStatus {
    /// `Failed` is the only terminal-without-success status.
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkRecordStatus::Posted | WorkRecordStatus::Failed)
    }
}

/// One upstream article captured and carried through the pipeline for a
/// single `MonitoringProcess` run.
///
/// Fields populated by later stages (`article_content`, `comment_content`,
/// `ai_model_name`, ...) stay `None` until that stage's worker runs; a
/// record's `status` is the source of truth for which fields are expected
/// to be populated, not the other way around.
#[derive(Debug, Clone)]
pub struct WorkRecord {
    pub id: String,
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

    pub article_content: Option<String>,
    pub article_raw_html: Option<String>,
    pub article_published_at: Option<chrono::DateTime<chrono::Utc>>,

    pub comment_content: Option<String>,
    pub upstream_comment_id: Option<String>,

    pub ai_model_name: Option<String>,
    pub ai_vendor_tag: Option<String>,
    pub generation_tokens: Option<i64>,
    pub generation_time_ms: Option<i64>,

    pub status: WorkRecordStatus,
    pub error_message: Option<String>,
    pub retry_count: i64,

    pub article_scraped_at: Option<chrono::DateTime<chrono::Utc>>,
    pub posted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub failed_at: Option<chrono::DateTime<chrono::Utc>>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl WorkRecord {
    /// Mark this record failed, recording which stage produced the error.
    pub fn mark_failed(&mut self, stage: super::Stage, message: impl Into<String>) {
        self.status = WorkRecordStatus::Failed;
        self.error_message = Some(format!("{stage}: {}", message.into()));
        self.failed_at = Some(chrono::Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Stage;

    fn sample_record() -> WorkRecord {
        let now = chrono::Utc::now();
        WorkRecord {
            id: "w-1".to_string(),
            process_id: "p-1".to_string(),
            user_id: "u-1".to_string(),
            credential_id: "c-1".to_string(),
            template_id: "t-1".to_string(),
            llm_provider_id: "llm-1".to_string(),
            upstream_article_id: "a-1".to_string(),
            article_title: "title".to_string(),
            article_author: None,
            article_category: None,
            article_url: "https://example.com/a-1".to_string(),
            article_edited_at: None,
            article_content: None,
            article_raw_html: None,
            article_published_at: None,
            comment_content: None,
            upstream_comment_id: None,
            ai_model_name: None,
            ai_vendor_tag: None,
            generation_tokens: None,
            generation_time_ms: None,
            status: WorkRecordStatus::Discovered,
            error_message: None,
            retry_count: 0,
            article_scraped_at: None,
            posted_at: None,
            failed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn mark_failed_sets_terminal_status_and_message() {
        let mut record = sample_record();
        record.mark_failed(Stage::Generation, "model timed out");

        assert_eq!(record.status, WorkRecordStatus::Failed);
        assert!(record.error_message.unwrap().contains("model timed out"));
        assert!(record.failed_at.is_some());
        assert!(record.status.is_terminal());
    }

    #[test]
    fn posted_and_failed_are_terminal_others_are_not() {
        assert!(WorkRecordStatus::Posted.is_terminal());
        assert!(WorkRecordStatus::Failed.is_terminal());
        assert!(!WorkRecordStatus::Discovered.is_terminal());
        assert!(!WorkRecordStatus::Prepared.is_terminal());
        assert!(!WorkRecordStatus::Generated.is_terminal());
    }
}
