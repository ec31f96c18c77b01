//! Shared context core library: the COMMS `@copilot` bridge, the context.md store, the editor
//! chat-session importer, and configuration, used by the `shared-context` CLI.

pub mod bridge;
pub mod config;
pub mod context;
pub mod feed;
