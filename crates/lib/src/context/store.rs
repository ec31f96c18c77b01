//! context.md store: create from template, read, append a session entry, summarize.
//!
//! The file is flat and append-only; there is a single writer and no locking.

use super::paths::{context_file_path, LINE_ENDING};
use super::{ContextDocument, ContextError, ContextMetadata};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};

/// Heading prefix that marks one appended session.
const SESSION_HEADING: &str = "## Session";

/// Template section heading; shares the prefix but is not a session.
const HISTORY_HEADING: &str = "## Session History";

/// Initial content of a new context.md. `{initialized}` is replaced with an RFC 3339 timestamp.
const TEMPLATE: &str = "# Shared Copilot Context

> This file enables context sharing between GitHub Copilot sessions in VS Code and CLI.
> AI agents should read this file at session start and append summaries at session end.

## Instructions for Agents

Read this file for prior conversation context. At the end of your session, append a summary using the format below.

## Project Overview

<!-- Add project description here -->

## Session History

<!-- Session summaries will be appended below -->

---

*Context file initialized: {initialized}*
";

/// What `append` wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendReceipt {
    pub path: PathBuf,
    pub timestamp: String,
}

/// File statistics for `shared-context summary`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSummary {
    pub path: PathBuf,
    pub sessions: usize,
    pub lines: usize,
    pub words: usize,
    pub size_bytes: usize,
}

impl ContextSummary {
    pub fn size_kb(&self) -> String {
        format!("{:.2}", self.size_bytes as f64 / 1024.0)
    }
}

/// context.md in one workspace.
#[derive(Debug, Clone)]
pub struct ContextStore {
    path: PathBuf,
}

impl ContextStore {
    pub fn new(workspace: &Path) -> Self {
        Self {
            path: context_file_path(workspace),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create context.md from the template. Refuses to overwrite an existing file.
    pub async fn init(&self) -> Result<PathBuf, ContextError> {
        if self.exists() {
            return Err(ContextError::AlreadyExists(self.path.clone()));
        }
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let content = TEMPLATE.replace("{initialized}", &now);
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| ContextError::io(format!("creating {}", self.path.display()), e))?;
        log::info!("created context.md at {}", self.path.display());
        Ok(self.path.clone())
    }

    /// Read the whole file plus metadata.
    pub async fn read(&self) -> Result<ContextDocument, ContextError> {
        let content = self.read_string().await?;
        let meta = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| ContextError::io(format!("reading {}", self.path.display()), e))?;
        let last_modified = meta.modified().ok().map(DateTime::<Utc>::from);
        let session_count = count_sessions(&content);
        Ok(ContextDocument {
            metadata: ContextMetadata {
                path: self.path.clone(),
                size: meta.len(),
                last_modified,
                session_count,
            },
            content,
        })
    }

    /// Append `content` under `## Session <title>`; the title defaults to `YYYY-MM-DD HH:MM` (UTC).
    pub async fn append(
        &self,
        content: &str,
        title: Option<&str>,
    ) -> Result<AppendReceipt, ContextError> {
        let body = content.trim();
        if body.is_empty() {
            return Err(ContextError::EmptyContent);
        }
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M").to_string();
        let heading = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(timestamp.as_str());
        let nl = LINE_ENDING;
        let entry = format!("{nl}{SESSION_HEADING} {heading}{nl}{nl}{body}{nl}{nl}---{nl}");
        self.append_raw(&entry).await?;
        Ok(AppendReceipt {
            path: self.path.clone(),
            timestamp,
        })
    }

    /// Append a pre-formatted block verbatim (used by full transcript export).
    pub async fn append_raw(&self, block: &str) -> Result<(), ContextError> {
        let mut content = self.read_string().await?;
        content.push_str(block);
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| ContextError::io(format!("appending to {}", self.path.display()), e))
    }

    pub async fn summary(&self) -> Result<ContextSummary, ContextError> {
        let content = self.read_string().await?;
        Ok(ContextSummary {
            path: self.path.clone(),
            sessions: count_sessions(&content),
            lines: content.split('\n').count(),
            words: content.split_whitespace().count(),
            size_bytes: content.len(),
        })
    }

    async fn read_string(&self) -> Result<String, ContextError> {
        if !self.exists() {
            return Err(ContextError::NotFound(self.path.clone()));
        }
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ContextError::io(format!("reading {}", self.path.display()), e))
    }
}

fn count_sessions(content: &str) -> usize {
    content
        .lines()
        .filter(|l| l.starts_with(SESSION_HEADING) && l.trim_end() != HISTORY_HEADING)
        .count()
}
