//! Tavus conversational video client.
//!
//! Opens a joinable conversation with a replica via `POST /v2/conversations`.
//! Call properties come from the `[video]` section of the global config.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use coachly_core::generation::provider::VideoSessionProvider;
use coachly_types::config::VideoConfig;
use coachly_types::reply::{GenerationError, VideoConversation, VideoConversationRequest};

/// Request body for `POST /v2/conversations`.
#[derive(Debug, Clone, Serialize)]
struct TavusConversationRequest<'a> {
    replica_id: &'a str,
    conversation_name: &'a str,
    conversational_context: &'a str,
    custom_greeting: &'a str,
    properties: TavusProperties,
}

#[derive(Debug, Clone, Serialize)]
struct TavusProperties {
    max_call_duration: u32,
    participant_left_timeout: u32,
    enable_recording: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct TavusConversationResponse {
    conversation_id: String,
    conversation_url: String,
}

/// Tavus API client. Like the LLM provider, it never prints its key.
pub struct TavusClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    properties: TavusProperties,
}

impl TavusClient {
    pub fn new(api_key: SecretString, config: &VideoConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| GenerationError::Video(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            properties: TavusProperties {
                max_call_duration: config.max_call_duration,
                participant_left_timeout: config.participant_left_timeout,
                enable_recording: config.enable_recording,
            },
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request_body<'a>(&self, request: &'a VideoConversationRequest) -> TavusConversationRequest<'a> {
        TavusConversationRequest {
            replica_id: &request.persona_id,
            conversation_name: &request.conversation_name,
            conversational_context: &request.context,
            custom_greeting: &request.greeting,
            properties: self.properties.clone(),
        }
    }
}

impl VideoSessionProvider for TavusClient {
    #[tracing::instrument(skip_all, fields(replica_id = %request.persona_id))]
    async fn create_conversation(
        &self,
        request: &VideoConversationRequest,
    ) -> Result<VideoConversation, GenerationError> {
        let body = self.request_body(request);

        let response = self
            .client
            .post(self.url("/v2/conversations"))
            .header("x-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Video(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "tavus conversation request failed");
            return Err(GenerationError::Video(format!(
                "Tavus API error ({}): {error_body}",
                status.as_u16()
            )));
        }

        let created: TavusConversationResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::UnexpectedReply(format!("invalid Tavus response: {e}")))?;

        tracing::info!(conversation_id = %created.conversation_id, "video conversation ready");

        Ok(VideoConversation {
            conversation_url: created.conversation_url,
            conversation_id: created.conversation_id,
        })
    }
}
