//! Fetch-and-wait cadence for the feed.

use super::shutdown::Shutdown;
use crate::feed::{Feed, FeedError, FeedMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};

/// Messages requested per poll.
pub const POLL_BATCH_SIZE: usize = 20;

/// Result of one fetch.
#[derive(Debug)]
pub enum PollOutcome {
    Batch(Vec<FeedMessage>),
    Offline(FeedError),
}

pub struct FeedPoller {
    feed: Arc<dyn Feed>,
    batch_size: usize,
    message_type: Option<String>,
    period: Duration,
    ticker: Option<Interval>,
}

impl FeedPoller {
    pub fn new(feed: Arc<dyn Feed>, period: Duration) -> Self {
        Self {
            feed,
            batch_size: POLL_BATCH_SIZE,
            message_type: None,
            period,
            ticker: None,
        }
    }

    /// Only fetch messages of this type.
    pub fn with_message_type(mut self, message_type: impl Into<String>) -> Self {
        self.message_type = Some(message_type.into());
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub async fn poll(&self) -> PollOutcome {
        match self
            .feed
            .fetch_recent(self.batch_size, self.message_type.as_deref())
            .await
        {
            Ok(batch) => PollOutcome::Batch(batch),
            Err(e) => PollOutcome::Offline(e),
        }
    }

    /// Wait for the next tick. Returns `false` if shutdown fired first.
    ///
    /// The interval is created on first use; a slow batch delays later ticks instead of
    /// bunching them.
    pub async fn wait_next_tick(&mut self, shutdown: &mut Shutdown) -> bool {
        if shutdown.is_triggered() {
            return false;
        }
        let period = self.period;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        tokio::select! {
            _ = ticker.tick() => true,
            _ = shutdown.wait() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::shutdown;
    use crate::feed::{FeedStatus, OutboundMessage};
    use async_trait::async_trait;

    struct DownFeed;

    #[async_trait]
    impl Feed for DownFeed {
        async fn probe(&self) -> FeedStatus {
            FeedStatus {
                reachable: false,
                detail: "down".to_string(),
            }
        }

        async fn fetch_recent(
            &self,
            _limit: usize,
            _message_type: Option<&str>,
        ) -> Result<Vec<FeedMessage>, FeedError> {
            Err(FeedError::Timeout)
        }

        async fn send(&self, _message: &OutboundMessage) -> Result<(), FeedError> {
            Err(FeedError::Timeout)
        }

        fn endpoint(&self) -> &str {
            "http://down"
        }
    }

    #[tokio::test]
    async fn failed_fetch_is_offline_not_empty() {
        let poller = FeedPoller::new(Arc::new(DownFeed), Duration::from_millis(10));
        assert!(matches!(poller.poll().await, PollOutcome::Offline(FeedError::Timeout)));
    }

    #[tokio::test]
    async fn tick_waits_one_period() {
        let (_trigger, mut token) = shutdown::channel();
        let mut poller = FeedPoller::new(Arc::new(DownFeed), Duration::from_millis(20));
        let started = tokio::time::Instant::now();
        assert!(poller.wait_next_tick(&mut token).await);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn shutdown_interrupts_tick() {
        let (trigger, mut token) = shutdown::channel();
        let mut poller = FeedPoller::new(Arc::new(DownFeed), Duration::from_secs(60));
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.trigger();
        });
        let waited =
            tokio::time::timeout(Duration::from_secs(2), poller.wait_next_tick(&mut token)).await;
        assert_eq!(waited.ok(), Some(false));
    }
}
