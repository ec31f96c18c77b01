//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.shared-context/config.json`) and then
//! overridden from the environment (`COMMS_URL`, `POLL_INTERVAL`, `WORKSPACE`, ...).
//! A missing file is not an error; every field has a default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// COMMS bridge settings (feed endpoint, cadence, identity).
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Where context.md and the editor's chat sessions live.
    #[serde(default)]
    pub context: ContextConfig,
}

/// Feed endpoint, poll cadence and the identity the bridge posts under.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// COMMS API base URL. Overridden by COMMS_URL.
    #[serde(default = "default_comms_url")]
    pub comms_url: String,

    /// Delay between polls in milliseconds (default 2000). Overridden by POLL_INTERVAL.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Timeout for every COMMS request in milliseconds (default 5000). Overridden by COMMS_TIMEOUT.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Sender id used for outgoing messages; incoming messages with this sender are ignored.
    #[serde(default = "default_agent_id")]
    pub agent_id: String,

    /// Display name used for outgoing messages.
    #[serde(default = "default_agent_name")]
    pub agent_name: String,

    /// Mention token without the `@` (default "copilot").
    #[serde(default = "default_mention")]
    pub mention: String,

    /// Station label reported by `@copilot status`.
    #[serde(default = "default_station")]
    pub station: String,

    /// Only poll messages of this COMMS message type. Overridden by BRIDGE_MESSAGE_TYPE.
    #[serde(default)]
    pub message_type: Option<String>,
}

/// Workspace (context.md) and chat session storage locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextConfig {
    /// Workspace root holding context.md. Overridden by WORKSPACE; falls back to the current directory.
    pub workspace: Option<PathBuf>,
    /// Root of the editor's workspaceStorage. Overridden by VSCODE_STORAGE; falls back to the platform default.
    pub storage: Option<PathBuf>,
}

fn default_comms_url() -> String {
    "http://star-force-one.local:5052".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_agent_id() -> String {
    "copilot-bridge".to_string()
}

fn default_agent_name() -> String {
    "🌐 Copilot (SharedContext)".to_string()
}

fn default_mention() -> String {
    crate::bridge::DEFAULT_MENTION.to_string()
}

fn default_station() -> String {
    "Local".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            comms_url: default_comms_url(),
            poll_interval_ms: default_poll_interval_ms(),
            timeout_ms: default_timeout_ms(),
            agent_id: default_agent_id(),
            agent_name: default_agent_name(),
            mention: default_mention(),
            station: default_station(),
            message_type: None,
        }
    }
}

impl BridgeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Apply environment overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup` (env-like: key -> value). Blank values are ignored;
    /// numeric values that do not parse (or are zero) keep the current setting.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        if let Some(url) = get("COMMS_URL") {
            self.bridge.comms_url = url;
        }
        if let Some(ms) = get("POLL_INTERVAL").and_then(|s| parse_millis(&s)) {
            self.bridge.poll_interval_ms = ms;
        }
        if let Some(ms) = get("COMMS_TIMEOUT").and_then(|s| parse_millis(&s)) {
            self.bridge.timeout_ms = ms;
        }
        if let Some(id) = get("BRIDGE_AGENT_ID") {
            self.bridge.agent_id = id;
        }
        if let Some(name) = get("BRIDGE_AGENT_NAME") {
            self.bridge.agent_name = name;
        }
        if let Some(mention) = get("BRIDGE_MENTION") {
            self.bridge.mention = mention.trim_start_matches('@').to_string();
        }
        if let Some(station) = get("BRIDGE_STATION") {
            self.bridge.station = station;
        }
        if let Some(kind) = get("BRIDGE_MESSAGE_TYPE") {
            self.bridge.message_type = Some(kind);
        }
        if let Some(ws) = get("WORKSPACE") {
            self.context.workspace = Some(PathBuf::from(ws));
        }
        if let Some(storage) = get("VSCODE_STORAGE") {
            self.context.storage = Some(PathBuf::from(storage));
        }
    }
}

fn parse_millis(s: &str) -> Option<u64> {
    s.parse::<u64>().ok().filter(|ms| *ms > 0)
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("SHARED_CONTEXT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".shared-context").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Resolve the workspace holding context.md: config (or WORKSPACE after overrides), else the current directory.
pub fn resolve_workspace_dir(config: &Config) -> PathBuf {
    config
        .context
        .workspace
        .clone()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Resolve the chat session storage root: config override, else the editor's default workspaceStorage.
pub fn resolve_storage_dir(config: &Config) -> PathBuf {
    config
        .context
        .storage
        .clone()
        .unwrap_or_else(crate::context::paths::workspace_storage_dir)
}

/// Load config from the default path (or SHARED_CONTEXT_CONFIG). Missing file => default config.
/// Environment overrides are not applied here; call [`Config::apply_env_overrides`].
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
