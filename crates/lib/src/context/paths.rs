//! Platform paths: the editor's user data directory, its workspaceStorage, and context.md.

use std::path::{Path, PathBuf};

/// File name of the shared context store inside a workspace.
pub const CONTEXT_FILE_NAME: &str = "context.md";

/// Directory name under each workspaceStorage entry that holds chat session JSON files.
pub const CHAT_SESSIONS_DIR: &str = "chatSessions";

#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

/// Editor user data directory: `Code/User` under the platform config dir
/// (`~/Library/Application Support` on macOS, `%APPDATA%` on Windows, `~/.config` on Linux).
pub fn vscode_user_data_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Code")
        .join("User")
}

pub fn workspace_storage_dir() -> PathBuf {
    vscode_user_data_dir().join("workspaceStorage")
}

/// context.md inside `workspace`.
pub fn context_file_path(workspace: &Path) -> PathBuf {
    workspace.join(CONTEXT_FILE_NAME)
}
