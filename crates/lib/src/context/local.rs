//! [`ContextOperations`] over a local workspace (context.md) and the editor's session storage.

use super::sessions::{self, ChatSession};
use super::store::ContextStore;
use super::{
    ContextDocument, ContextError, ContextOperations, ExportFormat, ExportSummary, SearchHit,
    SearchResults, SessionSummary,
};
use crate::config::{self, Config};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Characters of context kept before the first hit in a search preview.
const PREVIEW_LEAD_CHARS: usize = 20;
/// Total characters in a raw search preview (the bridge truncates further for chat).
const PREVIEW_SPAN_CHARS: usize = 80;

const CONTEXT_SOURCE: &str = "context.md";

pub struct LocalContext {
    store: ContextStore,
    storage_root: PathBuf,
}

impl LocalContext {
    pub fn new(workspace: &Path, storage_root: PathBuf) -> Self {
        Self {
            store: ContextStore::new(workspace),
            storage_root,
        }
    }

    /// Workspace and storage from config (after env overrides).
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config::resolve_workspace_dir(config),
            config::resolve_storage_dir(config),
        )
    }

    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Scan session storage off the async runtime.
    async fn sessions(&self) -> Result<Vec<ChatSession>, ContextError> {
        let root = self.storage_root.clone();
        tokio::task::spawn_blocking(move || sessions::discover_sessions(&root))
            .await
            .map_err(|e| ContextError::io("session scan task", std::io::Error::other(e)))?
    }

    /// Exact id, else a unique id prefix.
    fn resolve<'a>(
        sessions: &'a [ChatSession],
        session_id: &str,
    ) -> Result<&'a ChatSession, ContextError> {
        let wanted = session_id.trim();
        if wanted.is_empty() {
            return Err(ContextError::SessionNotFound(session_id.to_string()));
        }
        if let Some(s) = sessions.iter().find(|s| s.id == wanted) {
            return Ok(s);
        }
        let mut matches = sessions.iter().filter(|s| s.id.starts_with(wanted));
        match (matches.next(), matches.next()) {
            (Some(s), None) => Ok(s),
            (Some(_), Some(_)) => Err(ContextError::AmbiguousSession(wanted.to_string())),
            _ => Err(ContextError::SessionNotFound(wanted.to_string())),
        }
    }
}

/// Summary block appended for [`ExportFormat::Summary`]: metadata plus the user's prompts.
fn summary_body(session: &ChatSession) -> String {
    let date = session
        .modified_at
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let mut body = format!(
        "**Source:** chat session {}\n**Date:** {}\n**Messages:** {}\n",
        session.id,
        date,
        session.message_count()
    );
    let prompts: Vec<&str> = session
        .requests
        .iter()
        .map(|r| r.user_message.trim())
        .filter(|m| !m.is_empty())
        .collect();
    if !prompts.is_empty() {
        body.push_str("\n**Prompts:**\n");
        for p in prompts {
            body.push_str(&format!("- {}\n", p.replace('\n', " ")));
        }
    }
    body
}

/// Occurrences of `needle` (already lower-case) in `text` and a preview around the first one.
fn find_hits(text: &str, needle: &str) -> Option<(usize, String)> {
    let lowered = text.to_lowercase();
    let first = lowered.find(needle)?;
    let count = lowered.matches(needle).count();
    let hit_char = lowered[..first].chars().count();
    let start = hit_char.saturating_sub(PREVIEW_LEAD_CHARS);
    let preview: String = text
        .chars()
        .skip(start)
        .take(PREVIEW_SPAN_CHARS)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    Some((count, preview.trim().to_string()))
}

#[async_trait]
impl ContextOperations for LocalContext {
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ContextError> {
        Ok(self.sessions().await?.iter().map(sessions::summarize).collect())
    }

    async fn search_conversations(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<SearchResults, ContextError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(ContextError::EmptyQuery);
        }

        let mut hits: Vec<SearchHit> = Vec::new();
        match self.sessions().await {
            Ok(found) => {
                for session in &found {
                    let mut relevance = 0;
                    let mut preview: Option<String> = None;
                    for request in &session.requests {
                        for text in [&request.user_message, &request.response] {
                            if let Some((n, p)) = find_hits(text, &needle) {
                                relevance += n;
                                preview.get_or_insert(p);
                            }
                        }
                    }
                    if relevance > 0 {
                        hits.push(SearchHit {
                            source: session.title(),
                            preview: preview.unwrap_or_default(),
                            relevance,
                        });
                    }
                }
            }
            // Search still covers context.md when no editor storage exists on this machine.
            Err(ContextError::StorageNotFound(path)) => {
                log::debug!("search: no session storage at {}", path.display());
            }
            Err(e) => return Err(e),
        }

        if let Ok(doc) = self.store.read().await {
            if let Some((relevance, preview)) = find_hits(&doc.content, &needle) {
                hits.push(SearchHit {
                    source: CONTEXT_SOURCE.to_string(),
                    preview,
                    relevance,
                });
            }
        }

        // Stable sort keeps newest-first order between equally relevant sessions.
        hits.sort_by(|a, b| b.relevance.cmp(&a.relevance));
        let total_found = hits.len();
        hits.truncate(limit);
        Ok(SearchResults {
            results: hits,
            total_found,
        })
    }

    async fn read_context(&self) -> Result<ContextDocument, ContextError> {
        self.store.read().await
    }

    async fn export_conversation(
        &self,
        session_id: &str,
        format: ExportFormat,
    ) -> Result<ExportSummary, ContextError> {
        if !self.store.exists() {
            return Err(ContextError::NotFound(self.store.path().to_path_buf()));
        }
        let all = self.sessions().await?;
        let session = Self::resolve(&all, session_id)?;
        let title = session.title();
        match format {
            ExportFormat::Full => {
                self.store
                    .append_raw(&format!("\n{}", sessions::format_for_export(session)))
                    .await?;
            }
            ExportFormat::Summary => {
                self.store
                    .append(&summary_body(session), Some(&title))
                    .await?;
            }
        }
        log::info!(
            "exported session {} ({} messages, {}) to {}",
            session.id,
            session.message_count(),
            format,
            self.store.path().display()
        );
        Ok(ExportSummary {
            session_id: session.id.clone(),
            title,
            message_count: session.message_count(),
            format,
        })
    }
}
