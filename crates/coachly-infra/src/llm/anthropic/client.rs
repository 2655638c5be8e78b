//! AnthropicProvider -- concrete [`LlmProvider`] implementation for Anthropic Claude.
//!
//! Sends requests to the Anthropic Messages API (`/v1/messages`). The API key
//! is wrapped in [`secrecy::SecretString`] and is never logged or included in
//! `Debug` output.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use coachly_core::generation::provider::LlmProvider;
use coachly_observe::genai_attrs;
use coachly_types::llm::{CompletionRequest, CompletionResponse, LlmError, StopReason, Usage};

use super::types::{AnthropicErrorResponse, AnthropicMessage, AnthropicRequest, AnthropicResponse};

/// Anthropic Claude LLM provider.
///
/// The model is chosen per request, so one provider serves both coach
/// replies and recaps.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl AnthropicProvider {
    /// The Anthropic API version header value.
    const API_VERSION: &'static str = "2023-06-01";

    pub fn new(api_key: SecretString, base_url: impl Into<String>) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn to_anthropic_request(request: &CompletionRequest) -> AnthropicRequest {
        let messages = request
            .messages
            .iter()
            .map(|m| AnthropicMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
            })
            .collect();

        AnthropicRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            messages,
            system: request.system.clone(),
            temperature: request.temperature,
        }
    }

    fn status_error(status: reqwest::StatusCode, body: &str) -> LlmError {
        let detail = serde_json::from_str::<AnthropicErrorResponse>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.to_string());

        match status.as_u16() {
            400 => LlmError::InvalidRequest(detail),
            401 => LlmError::AuthenticationFailed,
            429 => LlmError::RateLimited {
                retry_after_ms: None,
            },
            529 => LlmError::Overloaded(detail),
            _ => LlmError::Provider {
                message: format!("HTTP {status}: {detail}"),
            },
        }
    }
}

impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        genai_attrs::PROVIDER_ANTHROPIC
    }

    #[tracing::instrument(
        name = "gen_ai.complete",
        skip_all,
        fields(
            gen_ai.provider.name = genai_attrs::PROVIDER_ANTHROPIC,
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.response.id = tracing::field::Empty,
            gen_ai.response.finish_reasons = tracing::field::Empty,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
        )
    )]
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = Self::to_anthropic_request(request);

        let response = self
            .client
            .post(self.url("/v1/messages"))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", Self::API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "anthropic request failed");
            return Err(Self::status_error(status, &error_body));
        }

        let anthropic_resp: AnthropicResponse = response.json().await.map_err(|e| {
            LlmError::Deserialization(format!("failed to parse response: {e}"))
        })?;

        let stop_reason = match anthropic_resp.stop_reason.as_deref() {
            Some("max_tokens") => StopReason::MaxTokens,
            Some("stop_sequence") => StopReason::StopSequence,
            _ => StopReason::EndTurn,
        };

        let span = tracing::Span::current();
        span.record(genai_attrs::GEN_AI_RESPONSE_ID, anthropic_resp.id.as_str());
        span.record(genai_attrs::GEN_AI_RESPONSE_FINISH_REASONS, stop_reason.to_string().as_str());
        span.record(genai_attrs::GEN_AI_USAGE_INPUT_TOKENS, anthropic_resp.usage.input_tokens);
        span.record(genai_attrs::GEN_AI_USAGE_OUTPUT_TOKENS, anthropic_resp.usage.output_tokens);

        Ok(CompletionResponse {
            content: anthropic_resp.text(),
            id: anthropic_resp.id,
            model: anthropic_resp.model,
            stop_reason,
            usage: Usage {
                input_tokens: anthropic_resp.usage.input_tokens,
                output_tokens: anthropic_resp.usage.output_tokens,
            },
        })
    }
}
