//! Voice Client — outbound phone calls through the Vapi API.
//!
//! The lifecycle layer builds a `CallRequest` and hands it to a `CallProvider`.
//! `VapiClient` is the production provider; tests substitute a scripted one.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum CallProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types (Vapi `POST /call/phone`)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    pub phone_number_id: String,
    pub customer: Customer,
    pub assistant: AssistantConfig,
    pub metadata: CallMetadata,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Customer {
    pub number: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssistantConfig {
    pub first_message: String,
    pub model: AssistantModel,
    pub voice: VoiceConfig,
    pub recording_enabled: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssistantModel {
    pub provider: String,
    pub model: String,
    pub system_prompt: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub provider: String,
    pub voice_id: String,
}

/// Echoed back on the call-end webhook so the call can be matched to its interview.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CallMetadata {
    pub interview_id: i32,
}

/// The part of the provider's response we keep.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PlacedCall {
    #[serde(default)]
    pub id: Option<String>,
}

#[async_trait]
pub trait CallProvider: Send + Sync {
    async fn place_call(&self, request: &CallRequest) -> Result<PlacedCall, CallProviderError>;
}

#[derive(Clone)]
pub struct VapiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl VapiClient {
    pub fn new(api_key: String, base_url: String) -> Result<Self, CallProviderError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CallProvider for VapiClient {
    async fn place_call(&self, request: &CallRequest) -> Result<PlacedCall, CallProviderError> {
        let response = self
            .client
            .post(format!("{}/call/phone", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(CallProviderError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        debug!("Vapi accepted call for interview {}", request.metadata.interview_id);

        // A 2xx with an unexpected body still means the call was placed.
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }
}
