//! The upstream scraping/posting port.
//!
//! A small `Send + Sync` async trait the pipeline workers depend on, with
//! a concrete upstream client and a mock test double both implementing it.
//! Wire-protocol details of the upstream platform (HTML scraping,
//! session/login negotiation) are out of scope for this crate; this
//! module defines only the contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::ProcessFilters;
use crate::error::ScrapeError;

/// Metadata for one upstream article, as returned by `list_articles`.
/// No content body — the preparation worker fetches that separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleMeta {
    pub upstream_article_id: String,
    pub title: String,
    pub author: Option<String>,
    pub category: Option<String>,
    pub url: String,
    pub edited_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Full article content, as returned by `fetch_article_content`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleContent {
    pub content: String,
    pub raw_html: String,
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Outcome of `post_comment`, distinguishing transient failure (retry via
/// `retry_count`) from permanent failure (immediate `failed`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    Posted,
    Transient { message: String },
    Permanent { message: String },
}

/// Port over the upstream writing platform.
///
/// Implementations MUST NOT retain an upstream session across calls —
/// each call here opens and tears down whatever upstream connection it
/// needs internally.
#[async_trait]
pub trait ScrapeAdapter: Send + Sync {
    /// Enumerate article metadata for `credential_id` matching `filters`.
    async fn list_articles(
        &self,
        credential_id: &str,
        filters: &ProcessFilters,
    ) -> Result<Vec<ArticleMeta>, ScrapeError>;

    /// Fetch full content for a single article.
    async fn fetch_article_content(
        &self,
        credential_id: &str,
        upstream_article_id: &str,
    ) -> Result<ArticleContent, ScrapeError>;

    /// Submit a comment. The upstream never returns a stable id; callers
    /// synthesize their own idempotency marker.
    async fn post_comment(
        &self,
        credential_id: &str,
        upstream_article_id: &str,
        text: &str,
    ) -> Result<PostOutcome, ScrapeError>;
}

/// A `ScrapeAdapter` that rejects every call.
///
/// The upstream wire protocol is out of scope for this crate; this is the
/// adapter `yourmoment-cli` wires in until a real one is
/// written against an actual upstream platform, so `yourmoment run` starts
/// and ticks without a network dependency, surfacing a clear error on
/// every discovery/preparation/posting attempt instead of silently doing
/// nothing.
pub struct UnconfiguredScrapeAdapter;

#[async_trait]
impl ScrapeAdapter for UnconfiguredScrapeAdapter {
    async fn list_articles(
        &self,
        _credential_id: &str,
        _filters: &ProcessFilters,
    ) -> Result<Vec<ArticleMeta>, ScrapeError> {
        Err(ScrapeError::Upstream {
            status: 0,
            message: "no ScrapeAdapter configured for this deployment".to_string(),
        })
    }

    async fn fetch_article_content(
        &self,
        _credential_id: &str,
        _upstream_article_id: &str,
    ) -> Result<ArticleContent, ScrapeError> {
        Err(ScrapeError::Upstream {
            status: 0,
            message: "no ScrapeAdapter configured for this deployment".to_string(),
        })
    }

    async fn post_comment(
        &self,
        _credential_id: &str,
        _upstream_article_id: &str,
        _text: &str,
    ) -> Result<PostOutcome, ScrapeError> {
        Err(ScrapeError::Upstream {
            status: 0,
            message: "no ScrapeAdapter configured for this deployment".to_string(),
        })
    }
}

#[cfg(any(test, feature = "test-helpers"))]
pub mod mock {
    //! An in-memory `ScrapeAdapter` double for pipeline tests: a hand-written
    //! mock struct implementing the port trait directly.

    use super::*;
    use std::sync::Mutex;

    /// Scripted responses for a `MockScrapeAdapter`, keyed by credential id.
    #[derive(Default)]
    pub struct MockScrapeAdapter {
        pub articles: Mutex<std::collections::HashMap<String, Vec<ArticleMeta>>>,
        pub content: Mutex<std::collections::HashMap<String, ArticleContent>>,
        pub content_failures: Mutex<std::collections::HashSet<String>>,
        pub post_outcomes: Mutex<std::collections::HashMap<String, PostOutcome>>,
        pub posted: Mutex<Vec<(String, String, String)>>,
    }

    impl MockScrapeAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_articles(self, credential_id: &str, articles: Vec<ArticleMeta>) -> Self {
            self.articles
                .lock()
                .unwrap()
                .insert(credential_id.to_string(), articles);
            self
        }

        pub fn with_content(self, upstream_article_id: &str, content: ArticleContent) -> Self {
            self.content
                .lock()
                .unwrap()
                .insert(upstream_article_id.to_string(), content);
            self
        }

        pub fn with_content_failure(self, upstream_article_id: &str) -> Self {
            self.content_failures
                .lock()
                .unwrap()
                .insert(upstream_article_id.to_string());
            self
        }

        pub fn with_post_outcome(self, upstream_article_id: &str, outcome: PostOutcome) -> Self {
            self.post_outcomes
                .lock()
                .unwrap()
                .insert(upstream_article_id.to_string(), outcome);
            self
        }
    }

    #[async_trait]
    impl ScrapeAdapter for MockScrapeAdapter {
        async fn list_articles(
            &self,
            credential_id: &str,
            _filters: &ProcessFilters,
        ) -> Result<Vec<ArticleMeta>, ScrapeError> {
            Ok(self
                .articles
                .lock()
                .unwrap()
                .get(credential_id)
                .cloned()
                .unwrap_or_default())
        }

        async fn fetch_article_content(
            &self,
            _credential_id: &str,
            upstream_article_id: &str,
        ) -> Result<ArticleContent, ScrapeError> {
            if self
                .content_failures
                .lock()
                .unwrap()
                .contains(upstream_article_id)
            {
                return Err(ScrapeError::Upstream {
                    status: 0,
                    message: "mocked transient failure".to_string(),
                });
            }
            self.content
                .lock()
                .unwrap()
                .get(upstream_article_id)
                .cloned()
                .ok_or_else(|| ScrapeError::Upstream {
                    status: 404,
                    message: "no scripted content".to_string(),
                })
        }

        async fn post_comment(
            &self,
            _credential_id: &str,
            upstream_article_id: &str,
            text: &str,
        ) -> Result<PostOutcome, ScrapeError> {
            self.posted.lock().unwrap().push((
                upstream_article_id.to_string(),
                text.to_string(),
                chrono::Utc::now().to_rfc3339(),
            ));
            Ok(self
                .post_outcomes
                .lock()
                .unwrap()
                .get(upstream_article_id)
                .cloned()
                .unwrap_or(PostOutcome::Posted))
        }
    }
}
