//! Constructs a concrete `LlmAdapter` for a `vendor_tag`.
//!
//! A single construction seam per stored provider config: the generation
//! worker never matches on vendor tags itself, it asks the factory once
//! per run and caches the resulting `Arc<dyn LlmAdapter>`.

use super::anthropic::AnthropicAdapter;
use super::openai_compat::OpenAiCompatAdapter;
use super::LlmAdapter;
use crate::error::LlmError;
use std::sync::Arc;

/// OpenAI-compatible vendors share one adapter with different base URLs.
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const MISTRAL_BASE_URL: &str = "https://api.mistral.ai/v1";

/// Build the adapter for a given `vendor_tag`, with a decrypted `api_key`.
///
/// `base_url_override` lets a provider config point at a self-hosted or
/// test endpoint instead of the vendor's default.
pub fn build_adapter(
    vendor_tag: &str,
    api_key: String,
    base_url_override: Option<&str>,
) -> Result<Arc<dyn LlmAdapter>, LlmError> {
    match vendor_tag {
        "openai" => Ok(Arc::new(OpenAiCompatAdapter::new(
            base_url_override.unwrap_or(OPENAI_BASE_URL).to_string(),
            api_key,
            "openai".to_string(),
        ))),
        "mistral" => Ok(Arc::new(OpenAiCompatAdapter::new(
            base_url_override.unwrap_or(MISTRAL_BASE_URL).to_string(),
            api_key,
            "mistral".to_string(),
        ))),
        "anthropic" => Ok(Arc::new(match base_url_override {
            Some(url) => AnthropicAdapter::with_base_url(api_key, url.to_string()),
            None => AnthropicAdapter::new(api_key),
        })),
        other => Err(LlmError::UnsupportedVendor {
            vendor: other.to_string(),
        }),
    }
}
