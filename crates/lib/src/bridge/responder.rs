//! The bridge: poll the feed, answer `@mention` commands, post the replies.

use super::command::{Command, CommandGrammar};
use super::format::{self, StatusReport};
use super::poller::{FeedPoller, PollOutcome};
use super::seen::SeenSet;
use super::shutdown::Shutdown;
use crate::config::BridgeConfig;
use crate::context::{ContextOperations, ExportFormat};
use crate::feed::{Feed, FeedError, FeedMessage, OutboundMessage};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Hits requested from search; more than are displayed so the overflow line can be shown.
const SEARCH_FETCH_LIMIT: usize = 50;

/// Chars of an incoming message echoed to the log.
const LOG_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Fatal orchestration errors. Everything else is logged or rendered into chat.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("invalid bridge configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid mention token: {0}")]
    Grammar(#[from] regex::Error),
    #[error("cannot {action} a bridge that is {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: BridgeState,
    },
}

/// Per-process bridge state. Never persisted.
#[derive(Debug)]
pub struct BridgeSession {
    pub agent_id: String,
    pub agent_name: String,
    pub feed_endpoint: String,
    pub poll_interval: Duration,
    pub state: BridgeState,
    pub started_at: Option<Instant>,
    pub seen: SeenSet,
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Duplicate,
    OwnMessage,
    NotAddressed,
    /// Addressed, but `@mention` was not followed by any text.
    Unparsed,
    Responded { command: &'static str },
    SendFailed { command: &'static str },
}

pub struct Bridge {
    session: BridgeSession,
    station: String,
    grammar: CommandGrammar,
    feed: Arc<dyn Feed>,
    context: Arc<dyn ContextOperations>,
    poller: FeedPoller,
    feed_online: bool,
}

impl Bridge {
    pub fn new(
        config: &BridgeConfig,
        feed: Arc<dyn Feed>,
        context: Arc<dyn ContextOperations>,
    ) -> Result<Self, BridgeError> {
        if config.agent_id.trim().is_empty() {
            return Err(BridgeError::InvalidConfig("agent id is empty".to_string()));
        }
        if config.mention.trim().trim_start_matches('@').is_empty() {
            return Err(BridgeError::InvalidConfig("mention token is empty".to_string()));
        }
        if config.poll_interval_ms == 0 {
            return Err(BridgeError::InvalidConfig(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        let grammar = CommandGrammar::new(&config.mention)?;
        let mut poller = FeedPoller::new(Arc::clone(&feed), config.poll_interval());
        if let Some(kind) = config.message_type.as_deref() {
            poller = poller.with_message_type(kind);
        }
        Ok(Self {
            session: BridgeSession {
                agent_id: config.agent_id.clone(),
                agent_name: config.agent_name.clone(),
                feed_endpoint: feed.endpoint().to_string(),
                poll_interval: config.poll_interval(),
                state: BridgeState::Stopped,
                started_at: None,
                seen: SeenSet::new(),
            },
            station: config.station.clone(),
            grammar,
            feed,
            context,
            poller,
            feed_online: true,
        })
    }

    pub fn state(&self) -> BridgeState {
        self.session.state
    }

    pub fn session(&self) -> &BridgeSession {
        &self.session
    }

    /// Probe the feed, announce, and enter `Running`. An unreachable feed is not fatal.
    pub async fn start(&mut self) -> Result<(), BridgeError> {
        if self.session.state != BridgeState::Stopped {
            return Err(BridgeError::InvalidTransition {
                action: "start",
                state: self.session.state,
            });
        }
        self.session.state = BridgeState::Starting;
        log::info!(
            "bridge: starting, agent={} comms={} poll={}ms",
            self.session.agent_id,
            self.session.feed_endpoint,
            self.session.poll_interval.as_millis()
        );

        let status = self.feed.probe().await;
        if status.reachable {
            log::info!("bridge: comms connected ({})", status.detail);
        } else {
            log::warn!("bridge: cannot reach comms: {}; will retry on poll", status.detail);
        }
        self.feed_online = status.reachable;

        self.session.started_at = Some(Instant::now());
        let announcement = format!(
            "{} online. Type `@{} help` for commands.",
            self.session.agent_name,
            self.grammar.mention()
        );
        let _ = self.send_response(&announcement).await;
        self.session.state = BridgeState::Running;
        Ok(())
    }

    /// Poll until the bridge leaves `Running` or `shutdown` fires. Both are checked between
    /// iterations; a batch in progress is finished first.
    pub async fn run(&mut self, shutdown: &mut Shutdown) {
        if self.session.state != BridgeState::Running {
            log::warn!("bridge: run called while {:?}", self.session.state);
            return;
        }
        while self.session.state == BridgeState::Running && !shutdown.is_triggered() {
            match self.poller.poll().await {
                PollOutcome::Batch(batch) => {
                    if !self.feed_online {
                        log::info!("bridge: comms reachable again");
                        self.feed_online = true;
                    }
                    for message in &batch {
                        self.process_message(message).await;
                    }
                }
                PollOutcome::Offline(e) => {
                    if self.feed_online {
                        log::warn!("bridge: poll failed, comms offline: {}", e);
                        self.feed_online = false;
                    } else {
                        log::debug!("bridge: poll failed: {}", e);
                    }
                }
            }
            if !self.poller.wait_next_tick(shutdown).await {
                break;
            }
        }
        log::debug!("bridge: poll loop exited");
    }

    /// Send the farewell and return to `Stopped`.
    pub async fn stop(&mut self) -> Result<(), BridgeError> {
        match self.session.state {
            BridgeState::Running | BridgeState::Starting => {}
            state => {
                return Err(BridgeError::InvalidTransition {
                    action: "stop",
                    state,
                })
            }
        }
        self.session.state = BridgeState::Stopping;
        log::info!("bridge: going offline");
        let farewell = format!("{} going offline.", self.session.agent_name);
        let _ = self.send_response(&farewell).await;
        self.session.state = BridgeState::Stopped;
        Ok(())
    }

    /// Filter, dispatch and answer one inbound message.
    pub async fn process_message(&mut self, message: &FeedMessage) -> MessageOutcome {
        if !self.session.seen.insert(message.id.clone()) {
            return MessageOutcome::Duplicate;
        }
        if message.sender_id().to_lowercase() == self.session.agent_id.to_lowercase() {
            return MessageOutcome::OwnMessage;
        }
        let content = message.content();
        if !self.grammar.is_addressed(content) {
            return MessageOutcome::NotAddressed;
        }
        let preview: String = content.chars().take(LOG_PREVIEW_CHARS).collect();
        log::info!("bridge: processing {}: {}", message.id, preview);

        let Some(parsed) = self.grammar.parse(content) else {
            return MessageOutcome::Unparsed;
        };
        let command = parsed.command.name();
        let reply = self.execute(&parsed.command).await;
        match self.send_response(&reply).await {
            Ok(()) => {
                log::info!("bridge: responded to {}", command);
                MessageOutcome::Responded { command }
            }
            Err(_) => MessageOutcome::SendFailed { command },
        }
    }

    /// Run `command` against the context operations and render the reply.
    /// Operation failures become an error reply; they never escape.
    pub async fn execute(&self, command: &Command) -> String {
        match command {
            Command::ListSessions { limit } => match self.context.list_sessions().await {
                Ok(sessions) => format::format_session_list(&sessions, *limit, Utc::now()),
                Err(e) => format::format_error(&format!("Failed to list sessions: {}", e)),
            },
            Command::SearchContext { query } => {
                match self
                    .context
                    .search_conversations(query, SEARCH_FETCH_LIMIT)
                    .await
                {
                    Ok(results) => format::format_search_results(&results, query),
                    Err(e) => format::format_error(&format!("Search failed: {}", e)),
                }
            }
            Command::ReadContext => match self.context.read_context().await {
                Ok(doc) => format::format_context(Some(&doc.content)),
                Err(e) => format::format_error(&format!("Failed to read context: {}", e)),
            },
            Command::ExportConversation { session_id } => {
                match self
                    .context
                    .export_conversation(session_id, ExportFormat::Summary)
                    .await
                {
                    Ok(summary) => format::format_export_result(Ok(&summary), session_id),
                    Err(e) => format::format_export_result(Err(e.to_string().as_str()), session_id),
                }
            }
            Command::Status => format::format_status(&self.status_report().await),
            Command::Help => format::format_help(self.grammar.mention()),
            Command::Unknown { text } => format::format_unknown(text, self.grammar.mention()),
        }
    }

    async fn status_report(&self) -> StatusReport {
        let probe = self.feed.probe().await;
        let sessions_indexed = match self.context.list_sessions().await {
            Ok(sessions) => Some(sessions.len()),
            Err(e) => {
                log::debug!("bridge: status session count unavailable: {}", e);
                None
            }
        };
        StatusReport {
            agent_id: self.session.agent_id.clone(),
            station: self.station.clone(),
            comms_connected: probe.reachable,
            comms_url: self.session.feed_endpoint.clone(),
            uptime: self
                .session
                .started_at
                .map(|t| format::format_uptime(t.elapsed()))
                .unwrap_or_else(|| "N/A".to_string()),
            sessions_indexed,
        }
    }

    /// Post `text` as this agent. Failures are logged and returned.
    pub async fn send_response(&self, text: &str) -> Result<(), FeedError> {
        let message = OutboundMessage::response(
            self.session.agent_id.as_str(),
            self.session.agent_name.as_str(),
            text,
        );
        self.feed.send(&message).await.map_err(|e| {
            log::error!("bridge: failed to send response: {}", e);
            e
        })
    }
}
