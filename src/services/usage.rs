use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::kernel::mode::AssistanceMode;

/// One completed assistance round, reported for accounting.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_id: Option<Uuid>,
    pub mode: AssistanceMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_response: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReceipt {
    #[serde(default)]
    pub help_count: u32,
}

/// Fire-and-forget usage accounting. Reporting failures are logged
/// and never affect the round that produced them.
#[derive(Clone)]
pub struct UsageReporter {
    client: Client,
    base_url: String,
}

impl UsageReporter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn report(&self, report: UsageReport) {
        let client = self.client.clone();
        let url = format!("{}/usage", self.base_url);
        tokio::spawn(async move {
            let result = client.post(url).json(&report).send().await;
            match result {
                Ok(response) if response.status().is_success() => {
                    match response.json::<UsageReceipt>().await {
                        Ok(receipt) => {
                            debug!(help_count = receipt.help_count, "usage recorded");
                        }
                        Err(err) => debug!("usage receipt not decodable: {err}"),
                    }
                }
                Ok(response) => warn!("usage report rejected: {}", response.status()),
                Err(err) => warn!("usage report failed: {err}"),
            }
        });
    }
}
