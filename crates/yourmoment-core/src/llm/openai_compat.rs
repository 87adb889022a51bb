//! OpenAI-compatible LLM adapter.
//!
//! Works with OpenAI, Mistral, and any endpoint that speaks the OpenAI
//! chat completions wire format.

use super::{GenerationOutcome, LlmAdapter, ModelParams};
use crate::error::LlmError;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// An LLM adapter using the OpenAI chat completions API format.
pub struct OpenAiCompatAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    vendor_tag: String,
}

impl OpenAiCompatAdapter {
    /// Create a new OpenAI-compatible adapter bound to a vendor tag and base URL.
    pub fn new(base_url: String, api_key: String, vendor_tag: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            vendor_tag,
        }
    }
}

#[async_trait::async_trait]
impl LlmAdapter for OpenAiCompatAdapter {
    fn vendor_tag(&self) -> &str {
        &self.vendor_tag
    }

    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        params: &ModelParams,
    ) -> Result<GenerationOutcome, LlmError> {
        tracing::debug!(
            vendor = %self.vendor_tag,
            model = %params.model,
            max_tokens = params.max_tokens,
            "LLM request",
        );

        let request = ChatCompletionRequest {
            model: &params.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            response_format: params
                .json_mode
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        let started = Instant::now();
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();

            if status == 429 {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(LlmError::RateLimited {
                    retry_after_secs: retry_after,
                });
            }

            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status,
                message: body,
            });
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("failed to parse response: {e}")))?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let text = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        let (prompt_tokens, completion_tokens) = body
            .usage
            .map(|u| (u.prompt_tokens.unwrap_or(0), u.completion_tokens.unwrap_or(0)))
            .unwrap_or((0, 0));

        tracing::debug!(
            prompt_tokens,
            completion_tokens,
            latency_ms,
            chars = text.len(),
            "LLM response",
        );

        Ok(GenerationOutcome {
            text,
            prompt_tokens,
            completion_tokens,
            latency_ms,
        })
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        self.generate(
            "You are a test assistant.",
            "Say OK",
            &ModelParams {
                model: "gpt-4o-mini".to_string(),
                max_tokens: 10,
                ..Default::default()
            },
        )
        .await?;
        Ok(())
    }
}

// --- Internal Serde types ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
}
