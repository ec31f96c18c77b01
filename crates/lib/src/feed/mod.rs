//! COMMS feed: the polled message channel both assistant front ends publish to.
//!
//! [`Feed`] is the seam the bridge talks through (health probe, fetch recent, send);
//! [`CommsFeed`] implements it against the COMMS HTTP API. Every call is bounded by a
//! timeout and failures come back as [`FeedError`], never as panics.

mod comms;
mod message;

pub use comms::CommsFeed;
pub use message::{FeedMessage, FeedStatus, MessageId, OutboundMessage};

use async_trait::async_trait;

/// Why a feed call did not succeed. All variants are transient from the bridge's point of view.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("comms unreachable: {0}")]
    Unreachable(String),
    #[error("comms timeout")]
    Timeout,
    #[error("{operation} failed: {status}")]
    Status {
        operation: &'static str,
        status: reqwest::StatusCode,
    },
    #[error("comms returned an unreadable body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FeedError::Timeout
        } else if e.is_decode() {
            FeedError::Decode(e.to_string())
        } else {
            FeedError::Unreachable(e.to_string())
        }
    }
}

/// Handle to the message feed.
#[async_trait]
pub trait Feed: Send + Sync {
    /// Health probe. Never fails; an unreachable feed is reported with `reachable: false`.
    async fn probe(&self) -> FeedStatus;

    /// Fetch up to `limit` recent messages, optionally filtered by message type.
    async fn fetch_recent(
        &self,
        limit: usize,
        message_type: Option<&str>,
    ) -> Result<Vec<FeedMessage>, FeedError>;

    /// Post a message to the feed.
    async fn send(&self, message: &OutboundMessage) -> Result<(), FeedError>;

    /// Endpoint shown in status output.
    fn endpoint(&self) -> &str;
}
