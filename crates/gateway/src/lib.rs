//! Push gateway client.
//!
//! `PushGateway` is the seam the dispatch engine fans out through;
//! `FcmClient` implements it against the FCM legacy multicast HTTP API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use herald_common::error::AppError;
use herald_common::types::{PushMessage, PushOutcome};

/// Batch push sender. Implementations must return one outcome per input
/// token, in input order.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send_multicast(
        &self,
        message: &PushMessage,
        tokens: &[String],
    ) -> Result<Vec<PushOutcome>, AppError>;
}

/// FCM legacy multicast request body.
#[derive(Debug, Serialize)]
struct FcmRequest<'a> {
    registration_ids: &'a [String],
    notification: FcmNotification<'a>,
}

#[derive(Debug, Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
}

/// FCM multicast response. `results` is positionally aligned with the
/// submitted `registration_ids`.
#[derive(Debug, Deserialize)]
struct FcmResponse {
    success: u64,
    failure: u64,
    results: Vec<FcmResult>,
}

#[derive(Debug, Deserialize)]
struct FcmResult {
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl From<FcmResult> for PushOutcome {
    fn from(result: FcmResult) -> Self {
        let success = result.message_id.is_some() && result.error.is_none();
        PushOutcome {
            success,
            error_code: result.error,
        }
    }
}

/// HTTP client for the FCM legacy `send` endpoint.
pub struct FcmClient {
    http: reqwest::Client,
    endpoint: String,
    server_key: String,
}

impl FcmClient {
    pub fn new(endpoint: String, server_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            server_key,
        }
    }
}

#[async_trait]
impl PushGateway for FcmClient {
    async fn send_multicast(
        &self,
        message: &PushMessage,
        tokens: &[String],
    ) -> Result<Vec<PushOutcome>, AppError> {
        let request = FcmRequest {
            registration_ids: tokens,
            notification: FcmNotification {
                title: &message.title,
                body: &message.body,
                image: message.image.as_deref(),
            },
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "FCM returned {}: {}",
                status, body
            )));
        }

        let parsed: FcmResponse = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Malformed FCM response: {}", e)))?;

        if parsed.results.len() != tokens.len() {
            return Err(AppError::Gateway(format!(
                "FCM returned {} results for {} tokens",
                parsed.results.len(),
                tokens.len()
            )));
        }

        tracing::debug!(
            success = parsed.success,
            failure = parsed.failure,
            tokens = tokens.len(),
            "Multicast sent"
        );

        Ok(parsed.results.into_iter().map(PushOutcome::from).collect())
    }
}
