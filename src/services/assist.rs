use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::kernel::mode::{AssistanceMode, RequestSource};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Kinds of annotation the assistant can produce. Wire names are
/// lowercase strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Correction,
    Hint,
    Encouragement,
    Step,
    Answer,
}

/// A single piece of assistant output. Ordering within a response is
/// meaningful and must be preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub content: String,
}

/// Request body for the assistance backend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistRequestBody {
    /// data:image/png;base64 payload of the visible canvas.
    pub image: String,
    pub mode: AssistanceMode,
    pub is_socratic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub source: RequestSource,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackPayload {
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Structured response from the assistance backend.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssistanceReply {
    #[serde(default)]
    pub feedback: FeedbackPayload,
    #[serde(default)]
    pub text_content: String,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum AssistError {
    #[error("assistance backend returned {0}")]
    Http(reqwest::StatusCode),
    #[error("assistance request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("assistance response could not be decoded: {0}")]
    Decode(String),
    #[error("request cancelled")]
    Cancelled,
}

/// Seam to the remote inference service. Cancellation is cooperative:
/// the caller races the returned future against a token and drops it on
/// abort, which tears down the underlying request.
#[async_trait]
pub trait AssistanceBackend: Send + Sync {
    async fn request(&self, body: AssistRequestBody) -> Result<AssistanceReply, AssistError>;
}

/// Production backend speaking the HTTP wire format.
#[derive(Clone)]
pub struct HttpAssistanceBackend {
    client: Client,
    base_url: String,
}

impl HttpAssistanceBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl AssistanceBackend for HttpAssistanceBackend {
    async fn request(&self, body: AssistRequestBody) -> Result<AssistanceReply, AssistError> {
        let response = self
            .client
            .post(format!("{}/assist", self.base_url))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AssistError::Http(response.status()));
        }

        response
            .json()
            .await
            .map_err(|err| AssistError::Decode(err.to_string()))
    }
}

/// Encode a PNG as the data-URI the backend expects.
pub fn png_data_uri(png: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    )
}
