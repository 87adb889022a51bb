//! LLM provider abstraction and implementations.
//!
//! Provides a trait-based abstraction (`LlmAdapter`) over LLM vendors
//! (OpenAI-compatible and Anthropic Messages API) with a uniform
//! request/response shape: the generation worker never sees a
//! vendor-specific wire format.

pub mod anthropic;
pub mod factory;
pub mod openai_compat;

use crate::error::LlmError;

/// Parameters controlling one generation call, taken from `LLMProviderConfig`.
#[derive(Debug, Clone)]
pub struct ModelParams {
    /// Provider-specific model name.
    pub model: String,
    /// Sampling temperature, expected in `[0, 2]`.
    pub temperature: f32,
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Whether to request structured JSON output from the vendor, if supported.
    pub json_mode: bool,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.7,
            max_tokens: 512,
            json_mode: false,
        }
    }
}

/// Result of a single `generate` call.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// The generated text content.
    pub text: String,
    /// Tokens consumed by the prompt (system + user).
    pub prompt_tokens: u32,
    /// Tokens produced by the completion.
    pub completion_tokens: u32,
    /// Wall-clock time taken by the vendor call, in milliseconds.
    pub latency_ms: u64,
}

/// Trait abstracting all LLM vendor operations consumed by the generation worker.
///
/// Implementations include `OpenAiCompatAdapter` (OpenAI, Mistral, and any
/// OpenAI-compatible endpoint) and `AnthropicAdapter`. Object-safe for use
/// as `Arc<dyn LlmAdapter>`.
#[async_trait::async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Returns the vendor tag this adapter implements (e.g. "openai", "anthropic").
    fn vendor_tag(&self) -> &str;

    /// Send a completion request to the vendor and report token usage and latency.
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        params: &ModelParams,
    ) -> Result<GenerationOutcome, LlmError>;

    /// Check if the vendor endpoint is reachable and the credential is valid.
    async fn health_check(&self) -> Result<(), LlmError>;
}
