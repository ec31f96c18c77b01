//! Context operations: the shared context.md store and the editor's chat session history.
//!
//! The bridge only sees the [`ContextOperations`] trait. [`LocalContext`] implements it over a
//! workspace directory (context.md) and the editor's workspaceStorage (chat session JSON).

pub mod paths;
pub mod sessions;

mod local;
mod store;

pub use local::LocalContext;
pub use sessions::{ChatRequest, ChatSession};
pub use store::{ContextStore, ContextSummary, AppendReceipt};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;

/// Errors from context operations. Rendered to the user by the bridge; never fatal.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("context.md not found at {}. Run `shared-context init` first.", .0.display())]
    NotFound(PathBuf),
    #[error("context.md already exists at {}", .0.display())]
    AlreadyExists(PathBuf),
    #[error("chat session storage not found at {}", .0.display())]
    StorageNotFound(PathBuf),
    #[error("search query cannot be empty")]
    EmptyQuery,
    #[error("content cannot be empty")]
    EmptyContent,
    #[error("no chat session matches \"{0}\"")]
    SessionNotFound(String),
    #[error("\"{0}\" matches more than one chat session; use a longer id")]
    AmbiguousSession(String),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ContextError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ContextError::Io {
            context: context.into(),
            source,
        }
    }
}

/// One chat session as listed to the user, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub date: Option<DateTime<Utc>>,
    pub message_count: usize,
}

/// A single search match.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Where the match was found (session title or "context.md").
    pub source: String,
    /// Text around the first occurrence; may be empty.
    pub preview: String,
    /// Number of occurrences in the source.
    pub relevance: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub results: Vec<SearchHit>,
    pub total_found: usize,
}

/// Metadata about the context file.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextMetadata {
    pub path: PathBuf,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub session_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextDocument {
    pub content: String,
    pub metadata: ContextMetadata,
}

/// How a chat session is written into context.md on export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    /// Title, date, message count and the user's prompts.
    #[default]
    Summary,
    /// The whole transcript.
    Full,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Summary => f.write_str("summary"),
            ExportFormat::Full => f.write_str("full"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub session_id: String,
    pub title: String,
    pub message_count: usize,
    pub format: ExportFormat,
}

/// Operations the bridge dispatches commands to.
#[async_trait]
pub trait ContextOperations: Send + Sync {
    /// All chat sessions, newest first.
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ContextError>;

    /// Case-insensitive search across sessions and context.md. Fails on an empty query.
    async fn search_conversations(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<SearchResults, ContextError>;

    /// Current context.md content.
    async fn read_context(&self) -> Result<ContextDocument, ContextError>;

    /// Append a chat session to context.md.
    async fn export_conversation(
        &self,
        session_id: &str,
        format: ExportFormat,
    ) -> Result<ExportSummary, ContextError>;
}
