//! COMMS bridge: answers `@copilot` commands posted to the shared message feed with data from
//! the local context store and chat history.
//!
//! [`Bridge`] owns the loop. It pulls batches through [`FeedPoller`], drops messages it has
//! already seen (see [`SeenSet`]), its own messages and anything not addressed to it, parses the
//! rest with [`CommandGrammar`], runs the command against
//! [`ContextOperations`](crate::context::ContextOperations) and posts the rendered reply.

mod command;
pub mod format;
mod poller;
mod responder;
mod seen;
pub mod shutdown;

pub use command::{
    available_commands, Command, CommandGrammar, ParsedCommand, ALL_SESSIONS_LIMIT,
    DEFAULT_MENTION, DEFAULT_SESSION_LIMIT,
};
pub use poller::{FeedPoller, PollOutcome, POLL_BATCH_SIZE};
pub use responder::{Bridge, BridgeError, BridgeSession, BridgeState, MessageOutcome};
pub use seen::{SeenSet, SEEN_CEILING, SEEN_RETAIN};
pub use shutdown::{Shutdown, ShutdownTrigger};
