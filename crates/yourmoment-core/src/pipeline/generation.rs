//! The generation stage: renders a comment from each `PREPARED` record's
//! template and runs it through the process's LLM provider.
//!
//! Grounded in `content/generator/mod.rs::ContentGenerator` combined with
//! `workflow::make_content_gen`'s per-run provider construction: providers
//! and templates referenced by the batch are loaded and cached once up
//! front (§4.4 step 2), so a batch of N records touches the LLM vendor N
//! times but the provider/template tables only once each.

use std::collections::HashMap;
use std::sync::Arc;

use crate::crypto::EncryptionKey;
use crate::domain::{LlmProviderConfig, PromptTemplate, WorkRecordStatus};
use crate::error::PipelineError;
use crate::llm::{factory, LlmAdapter, ModelParams};
use crate::storage::processes::CounterColumn;
use crate::storage::{llm_providers, processes, templates, work_records, DbPool};
use crate::template;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationSummary {
    pub generated: u64,
    pub failed: u64,
}

pub struct GenerationWorker {
    pool: Arc<DbPool>,
    crypto: Arc<EncryptionKey>,
    disclosure_prefix: String,
    base_url_override: Option<String>,
}

impl GenerationWorker {
    pub fn new(pool: Arc<DbPool>, crypto: Arc<EncryptionKey>, disclosure_prefix: String) -> Self {
        Self {
            pool,
            crypto,
            disclosure_prefix,
            base_url_override: None,
        }
    }

    /// Override the vendor base URL every adapter built by this worker uses —
    /// for tests and self-hosted OpenAI-compatible endpoints.
    pub fn with_base_url_override(mut self, base_url: impl Into<String>) -> Self {
        self.base_url_override = Some(base_url.into());
        self
    }

    pub async fn run_once(&self, process_id: &str) -> Result<GenerationSummary, PipelineError> {
        let records =
            work_records::get_records_by_status(&self.pool, process_id, WorkRecordStatus::Prepared).await?;
        let mut summary = GenerationSummary::default();
        if records.is_empty() {
            return Ok(summary);
        }

        let provider_ids: Vec<String> = dedup(records.iter().map(|r| r.llm_provider_id.clone()));
        let template_ids: Vec<String> = dedup(records.iter().map(|r| r.template_id.clone()));

        let providers: HashMap<String, LlmProviderConfig> = llm_providers::get_providers_by_ids(&self.pool, &provider_ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        let template_map: HashMap<String, PromptTemplate> = templates::get_templates_by_ids(&self.pool, &template_ids)
            .await?
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect();

        let mut adapters: HashMap<String, Arc<dyn LlmAdapter>> = HashMap::new();

        for record in &records {
            let provider = match providers.get(&record.llm_provider_id) {
                Some(p) => p,
                None => {
                    let err = PipelineError::DanglingReference {
                        entity: "llm_provider_config",
                        work_record_id: record.id.clone(),
                    };
                    work_records::mark_failed(&self.pool, &record.id, &err.to_string()).await?;
                    processes::bump_stage_error(&self.pool, process_id, "generation").await?;
                    summary.failed += 1;
                    continue;
                }
            };
            let prompt_template = match template_map.get(&record.template_id) {
                Some(t) => t,
                None => {
                    let err = PipelineError::DanglingReference {
                        entity: "prompt_template",
                        work_record_id: record.id.clone(),
                    };
                    work_records::mark_failed(&self.pool, &record.id, &err.to_string()).await?;
                    processes::bump_stage_error(&self.pool, process_id, "generation").await?;
                    summary.failed += 1;
                    continue;
                }
            };

            let adapter = match self.adapter_for(provider, &mut adapters) {
                Ok(adapter) => adapter,
                Err(e) => {
                    tracing::warn!(process_id, record_id = %record.id, error = %e, "generation adapter build failed");
                    work_records::mark_failed(&self.pool, &record.id, &e.to_string()).await?;
                    processes::bump_stage_error(&self.pool, process_id, "generation").await?;
                    summary.failed += 1;
                    continue;
                }
            };

            let user_prompt = template::render(&prompt_template.user_prompt_template, record, None);
            let params = ModelParams {
                model: provider.model_name.clone(),
                temperature: provider.temperature as f32,
                max_tokens: provider.max_tokens as u32,
                json_mode: provider.json_mode,
            };

            match adapter.generate(&prompt_template.system_prompt, &user_prompt, &params).await {
                Ok(outcome) => {
                    if !template::is_valid_comment_length(&outcome.text) {
                        work_records::mark_failed(
                            &self.pool,
                            &record.id,
                            "generation: model output is empty or exceeds length bounds",
                        )
                        .await?;
                        processes::bump_stage_error(&self.pool, process_id, "generation").await?;
                        summary.failed += 1;
                        continue;
                    }
                    let text = template::ensure_disclosure_prefix(&outcome.text, &self.disclosure_prefix);
                    work_records::mark_generated(
                        &self.pool,
                        &record.id,
                        &text,
                        &provider.model_name,
                        &provider.vendor_tag,
                        (outcome.prompt_tokens + outcome.completion_tokens) as i64,
                        outcome.latency_ms as i64,
                    )
                    .await?;
                    processes::increment_counter(&self.pool, process_id, CounterColumn::CommentsGenerated, 1)
                        .await?;
                    summary.generated += 1;
                }
                Err(e) => {
                    tracing::warn!(process_id, record_id = %record.id, error = %e, "generation call failed");
                    work_records::mark_failed(&self.pool, &record.id, &e.to_string()).await?;
                    processes::bump_stage_error(&self.pool, process_id, "generation").await?;
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    fn adapter_for(
        &self,
        provider: &LlmProviderConfig,
        cache: &mut HashMap<String, Arc<dyn LlmAdapter>>,
    ) -> Result<Arc<dyn LlmAdapter>, PipelineError> {
        if let Some(adapter) = cache.get(&provider.id) {
            return Ok(adapter.clone());
        }
        let decrypted = self.crypto.decrypt(&provider.api_key_encrypted)?;
        let api_key = String::from_utf8(decrypted).map_err(|_| PipelineError::InvalidProcessConfig {
            process_id: provider.id.clone(),
            reason: "stored API key is not valid UTF-8".to_string(),
        })?;
        let adapter = factory::build_adapter(&provider.vendor_tag, api_key, self.base_url_override.as_deref())?;
        cache.insert(provider.id.clone(), adapter.clone());
        Ok(adapter)
    }
}

fn dedup(iter: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    iter.filter(|id| seen.insert(id.clone())).collect()
}
