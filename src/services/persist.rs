use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

const SAVE_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error)]
pub enum PersistError {
    /// The store did not answer in time. Treated as transient and
    /// never counted toward the failure notice.
    #[error("save timed out")]
    Timeout,
    #[error("save failed: {0}")]
    Failure(String),
}

/// Wire body for a document update.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePayload {
    pub data: Value,
    /// data:image/png;base64 thumbnail of the board.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Seam to document persistence.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn update(&self, document_id: Uuid, payload: SavePayload) -> Result<(), PersistError>;
}

/// Production store speaking the HTTP wire format.
#[derive(Clone)]
pub struct HttpDocumentStore {
    client: Client,
    base_url: String,
}

impl HttpDocumentStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(SAVE_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn update(&self, document_id: Uuid, payload: SavePayload) -> Result<(), PersistError> {
        let response = self
            .client
            .patch(format!("{}/documents/{}", self.base_url, document_id))
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    PersistError::Timeout
                } else {
                    PersistError::Failure(err.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::REQUEST_TIMEOUT
            || status == reqwest::StatusCode::GATEWAY_TIMEOUT
        {
            return Err(PersistError::Timeout);
        }
        if !status.is_success() {
            return Err(PersistError::Failure(format!("store returned {status}")));
        }
        Ok(())
    }
}
