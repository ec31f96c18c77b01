//! COMMS HTTP client: `/api/online` health, `/api/messages` fetch and `/api/send`.

use super::message::{FeedMessage, FeedStatus, OutboundMessage};
use super::{Feed, FeedError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// `GET /api/messages` answers either with a bare array or with `{ "messages": [...] }`.
/// Entries stay raw so one malformed message cannot fail the whole batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessagesResponse {
    Bare(Vec<serde_json::Value>),
    Wrapped {
        #[serde(default)]
        messages: Vec<serde_json::Value>,
    },
}

impl MessagesResponse {
    fn into_raw(self) -> Vec<serde_json::Value> {
        match self {
            MessagesResponse::Bare(m) => m,
            MessagesResponse::Wrapped { messages } => messages,
        }
    }

    /// Decode each entry on its own; entries that do not decode are logged and skipped.
    fn into_messages(self) -> Vec<FeedMessage> {
        self.into_raw()
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<FeedMessage>(raw) {
                Ok(message) => Some(message),
                Err(e) => {
                    log::warn!("comms: skipping malformed message: {}", e);
                    None
                }
            })
            .collect()
    }
}

/// COMMS API client. Every request is bounded by the client timeout.
pub struct CommsFeed {
    base_url: String,
    client: reqwest::Client,
}

impl CommsFeed {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FeedError::Unreachable(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn online(&self) -> Result<String, FeedError> {
        let url = format!("{}/api/online", self.base_url);
        let res = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(FeedError::Status {
                operation: "status check",
                status: res.status(),
            });
        }
        let body: serde_json::Value = res.json().await.unwrap_or(serde_json::Value::Null);
        let detail = match body.get("entities").and_then(|e| e.as_array()) {
            Some(entities) => format!("online ({} entities)", entities.len()),
            None => "online".to_string(),
        };
        Ok(detail)
    }
}

#[async_trait]
impl Feed for CommsFeed {
    async fn probe(&self) -> FeedStatus {
        match self.online().await {
            Ok(detail) => FeedStatus {
                reachable: true,
                detail,
            },
            Err(e) => {
                log::warn!("comms: status check failed: {}", e);
                FeedStatus {
                    reachable: false,
                    detail: e.to_string(),
                }
            }
        }
    }

    async fn fetch_recent(
        &self,
        limit: usize,
        message_type: Option<&str>,
    ) -> Result<Vec<FeedMessage>, FeedError> {
        let url = format!("{}/api/messages", self.base_url);
        let mut req = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[("limit", limit.to_string())]);
        if let Some(t) = message_type {
            req = req.query(&[("message_type", t)]);
        }
        let res = req.send().await?;
        if !res.status().is_success() {
            return Err(FeedError::Status {
                operation: "get messages",
                status: res.status(),
            });
        }
        let body = res.bytes().await?;
        let data: MessagesResponse =
            serde_json::from_slice(&body).map_err(|e| FeedError::Decode(e.to_string()))?;
        Ok(data.into_messages())
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), FeedError> {
        let url = format!("{}/api/send", self.base_url);
        let res = self.client.post(&url).json(message).send().await?;
        if !res.status().is_success() {
            return Err(FeedError::Status {
                operation: "send",
                status: res.status(),
            });
        }
        Ok(())
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }
}
