//! Editor chat session importer.
//!
//! The editor stores one JSON file per chat under
//! `workspaceStorage/<hash>/chatSessions/<id>.json`. Only the parts needed to list, search
//! and export a conversation are read; unknown fields are ignored.

use super::paths::CHAT_SESSIONS_DIR;
use super::{ContextError, SessionSummary};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Titles longer than this are cut (at a word boundary when one exists past [`TITLE_MIN_CUT`]).
const TITLE_MAX_CHARS: usize = 60;
const TITLE_MIN_CUT: usize = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSession {
    #[serde(default)]
    version: Option<u32>,
    #[serde(default)]
    responder_username: Option<String>,
    #[serde(default)]
    initial_location: Option<String>,
    #[serde(default)]
    requests: Option<Vec<Option<RawRequest>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRequest {
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    message: Option<RawMessage>,
    #[serde(default)]
    response: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    text: Option<String>,
}

/// One user prompt and the flattened assistant response.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub id: Option<String>,
    pub user_message: String,
    pub response: String,
}

/// A parsed chat session file.
#[derive(Debug, Clone)]
pub struct ChatSession {
    /// File stem; used as the session id.
    pub id: String,
    pub file_path: PathBuf,
    pub version: u32,
    pub responder_username: String,
    pub initial_location: String,
    pub modified_at: Option<DateTime<Utc>>,
    pub requests: Vec<ChatRequest>,
}

impl ChatSession {
    /// Parse session JSON. Returns `None` when the document has no `requests` array.
    pub fn from_json(
        id: impl Into<String>,
        file_path: PathBuf,
        json: &str,
        modified_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Self>, serde_json::Error> {
        let raw: RawSession = serde_json::from_str(json)?;
        let Some(requests) = raw.requests else {
            return Ok(None);
        };
        Ok(Some(Self {
            id: id.into(),
            file_path,
            version: raw.version.unwrap_or(1),
            responder_username: raw
                .responder_username
                .unwrap_or_else(|| "GitHub Copilot".to_string()),
            initial_location: raw.initial_location.unwrap_or_else(|| "panel".to_string()),
            modified_at,
            requests: requests.into_iter().flatten().filter_map(parse_request).collect(),
        }))
    }

    /// Number of user/assistant exchanges.
    pub fn message_count(&self) -> usize {
        self.requests.len()
    }

    pub fn title(&self) -> String {
        generate_title(self)
    }
}

fn parse_request(raw: RawRequest) -> Option<ChatRequest> {
    let message = raw.message?;
    Some(ChatRequest {
        id: raw.request_id,
        user_message: message.text.unwrap_or_default(),
        response: extract_response(raw.response.as_deref().unwrap_or(&[])),
    })
}

/// Flatten response parts into readable text. Reasoning blocks and unknown kinds are dropped.
fn extract_response(parts: &[serde_json::Value]) -> String {
    let mut out: Vec<String> = Vec::new();
    for part in parts {
        match part.get("kind").and_then(|k| k.as_str()) {
            Some("markdownContent") => {
                if let Some(v) = part
                    .get("content")
                    .and_then(|c| c.get("value"))
                    .and_then(|v| v.as_str())
                    .filter(|v| !v.is_empty())
                {
                    out.push(v.to_string());
                }
            }
            Some("textEditGroup") => {
                let n = part
                    .get("edits")
                    .and_then(|e| e.as_array())
                    .map(|e| e.len())
                    .unwrap_or(0);
                if n > 0 {
                    out.push(format!("[Code edits: {} changes]", n));
                }
            }
            Some("codeblockUri") => {
                let uri = part
                    .get("uri")
                    .and_then(|u| u.as_str())
                    .filter(|u| !u.is_empty())
                    .unwrap_or("unnamed");
                out.push(format!("[Code block: {}]", uri));
            }
            Some("toolInvocationSerialized") => {
                if let Some(msg) = part
                    .get("pastTenseMessage")
                    .and_then(|m| m.get("value"))
                    .and_then(|v| v.as_str())
                    .filter(|v| !v.is_empty())
                {
                    out.push(format!("[Tool: {}]", msg));
                }
            }
            _ => {}
        }
    }
    out.join("\n\n")
}

/// Title from the first user message.
pub fn generate_title(session: &ChatSession) -> String {
    let Some(first) = session.requests.first() else {
        return "Empty Conversation".to_string();
    };
    let message = first.user_message.as_str();
    if message.is_empty() {
        return "Untitled Conversation".to_string();
    }
    if message.chars().count() <= TITLE_MAX_CHARS {
        return message.replace('\n', " ").trim().to_string();
    }
    let truncated: String = message.chars().take(TITLE_MAX_CHARS).collect();
    let cut = match truncated.rfind(' ') {
        Some(i) if truncated[..i].chars().count() > TITLE_MIN_CUT => &truncated[..i],
        _ => truncated.as_str(),
    };
    format!("{}...", cut.replace('\n', " ").trim())
}

/// Markdown block appended to context.md for a full export.
pub fn format_for_export(session: &ChatSession) -> String {
    let date = session
        .modified_at
        .unwrap_or_else(Utc::now)
        .format("%Y-%m-%d");
    let mut out = format!("## Session: {}\n**Date:** {}\n\n", generate_title(session), date);
    for request in &session.requests {
        if !request.user_message.is_empty() {
            out.push_str(&format!("### User\n{}\n\n", request.user_message));
        }
        if !request.response.is_empty() {
            out.push_str(&format!("### Copilot\n{}\n\n", request.response));
        }
    }
    out.push_str("---\n\n");
    out
}

pub fn summarize(session: &ChatSession) -> SessionSummary {
    SessionSummary {
        id: session.id.clone(),
        title: generate_title(session),
        date: session.modified_at,
        message_count: session.message_count(),
    }
}

/// Read and parse one session file. Unreadable or malformed files are logged and skipped.
pub fn parse_chat_session(path: &Path) -> Option<ChatSession> {
    let json = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            log::warn!("sessions: reading {}: {}", path.display(), e);
            return None;
        }
    };
    let modified_at = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from);
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match ChatSession::from_json(id, path.to_path_buf(), &json, modified_at) {
        Ok(session) => session,
        Err(e) => {
            log::warn!("sessions: parsing {}: {}", path.display(), e);
            None
        }
    }
}

/// Every parsable session under `storage_root/*/chatSessions/*.json`, newest first.
pub fn discover_sessions(storage_root: &Path) -> Result<Vec<ChatSession>, ContextError> {
    if !storage_root.is_dir() {
        return Err(ContextError::StorageNotFound(storage_root.to_path_buf()));
    }
    let entries = std::fs::read_dir(storage_root)
        .map_err(|e| ContextError::io(format!("listing {}", storage_root.display()), e))?;
    let mut sessions = Vec::new();
    for entry in entries.flatten() {
        let dir = entry.path().join(CHAT_SESSIONS_DIR);
        let Ok(files) = std::fs::read_dir(&dir) else {
            continue;
        };
        for file in files.flatten() {
            let path = file.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(session) = parse_chat_session(&path) {
                sessions.push(session);
            }
        }
    }
    sessions.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
    log::debug!(
        "sessions: discovered {} session(s) under {}",
        sessions.len(),
        storage_root.display()
    );
    Ok(sessions)
}
