//! Chat renderings of context operation results.
//!
//! Every function here is pure: the same input (including `now`) always yields the same text.
//! Lengths are counted in chars so truncation never splits a code point.

use super::command::available_commands;
use crate::context::{ExportSummary, SearchResults, SessionSummary};
use chrono::{DateTime, Utc};
use std::time::Duration;

pub const TITLE_MAX_CHARS: usize = 40;
pub const PREVIEW_MAX_CHARS: usize = 60;
pub const SEARCH_DISPLAY_LIMIT: usize = 10;
pub const CONTEXT_MAX_CHARS: usize = 1500;

const ELLIPSIS: &str = "...";

/// Cut to `max` chars, replacing the tail with `...` when anything was dropped.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(ELLIPSIS.len())).collect();
    format!("{}{}", kept, ELLIPSIS)
}

/// `Today`, `Yesterday`, `Nd ago` within a week, otherwise `Mon D`.
fn relative_date(date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(date) = date else {
        return "Unknown".to_string();
    };
    match now.signed_duration_since(date).num_days() {
        d if d <= 0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        d if d < 7 => format!("{}d ago", d),
        _ => date.format("%b %-d").to_string(),
    }
}

pub fn format_session_list(
    sessions: &[SessionSummary],
    limit: usize,
    now: DateTime<Utc>,
) -> String {
    if sessions.is_empty() {
        return "📋 No chat sessions found.".to_string();
    }
    let shown = &sessions[..sessions.len().min(limit)];
    let mut lines = vec![format!("📋 **Last {} Chat Sessions**\n", shown.len())];
    for (i, s) in shown.iter().enumerate() {
        let title = if s.title.is_empty() { "Untitled" } else { s.title.as_str() };
        let count = match s.message_count {
            0 => "?".to_string(),
            n => n.to_string(),
        };
        lines.push(format!(
            "{:>2}. {} ({}, {} msgs)",
            i + 1,
            truncate(title, TITLE_MAX_CHARS),
            relative_date(s.date, now),
            count
        ));
    }
    if sessions.len() > shown.len() {
        lines.push(format!("\n_+{} more sessions_", sessions.len() - shown.len()));
    }
    lines.join("\n")
}

/// Header counts `total_found`, which may exceed the hits actually returned.
pub fn format_search_results(results: &SearchResults, query: &str) -> String {
    if results.results.is_empty() {
        return format!("🔍 No results found for \"{}\"", query);
    }
    let total = results.total_found.max(results.results.len());
    let mut lines = vec![format!("🔍 **Found {} matches for \"{}\"**\n", total, query)];
    for (i, hit) in results.results.iter().take(SEARCH_DISPLAY_LIMIT).enumerate() {
        let source = if hit.source.is_empty() { "Unknown" } else { hit.source.as_str() };
        lines.push(format!("{:>2}. {}", i + 1, source));
        if !hit.preview.is_empty() {
            lines.push(format!("    _\"{}\"_", truncate(&hit.preview, PREVIEW_MAX_CHARS)));
        }
    }
    let shown = results.results.len().min(SEARCH_DISPLAY_LIMIT);
    if total > shown {
        lines.push(format!("\n_+{} more results_", total - shown));
    }
    lines.join("\n")
}

pub fn format_context(content: Option<&str>) -> String {
    let content = match content {
        Some(c) if !c.is_empty() => c,
        _ => return "📄 No context.md found in workspace.".to_string(),
    };
    let total = content.chars().count();
    if total <= CONTEXT_MAX_CHARS {
        return format!("📄 **context.md**\n\n{}", content);
    }
    let prefix: String = content.chars().take(CONTEXT_MAX_CHARS).collect();
    let cut = match prefix.rfind('\n') {
        Some(i) if i > 0 => &prefix[..i],
        _ => prefix.as_str(),
    };
    format!(
        "📄 **context.md** (truncated)\n\n{}\n\n_...content truncated ({} chars total)_",
        cut, total
    )
}

pub fn format_export_result(result: Result<&ExportSummary, &str>, session_id: &str) -> String {
    match result {
        Ok(summary) => {
            let count = match summary.message_count {
                0 => "?".to_string(),
                n => n.to_string(),
            };
            format!(
                "✅ **Session Exported**\n\nSession \"{}\" has been appended to context.md.\n\nMessages: {}\nFormat: {}",
                session_id, count, summary.format
            )
        }
        Err(e) => {
            let e = if e.trim().is_empty() { "Unknown error" } else { e };
            format!("❌ Failed to export session: {}", e)
        }
    }
}

/// Inputs for `@copilot status`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub agent_id: String,
    pub station: String,
    pub comms_connected: bool,
    pub comms_url: String,
    pub uptime: String,
    pub sessions_indexed: Option<usize>,
}

pub fn format_status(status: &StatusReport) -> String {
    let mut lines = vec![
        "✅ **Copilot Bridge Status**\n".to_string(),
        format!("Agent ID: {}", status.agent_id),
        format!("Station: {}", status.station),
        format!(
            "COMMS: {} ({})",
            if status.comms_connected { "Connected" } else { "Disconnected" },
            status.comms_url
        ),
        format!("Uptime: {}", status.uptime),
    ];
    if let Some(n) = status.sessions_indexed {
        lines.push(format!("Sessions indexed: {}", n));
    }
    lines.join("\n")
}

pub fn format_help(mention: &str) -> String {
    let mut lines = vec!["🌐 **Copilot Bridge Commands**\n".to_string()];
    for (usage, description) in available_commands() {
        lines.push(format!("• `@{} {}` - {}", mention, usage, description));
    }
    lines.push("\n**Examples:**".to_string());
    lines.push(format!("• `@{} recent 10` - Show last 10 sessions", mention));
    lines.push(format!("• `@{} search MCP` - Find sessions mentioning MCP", mention));
    lines.push(format!("• `@{} context` - Show current context", mention));
    lines.join("\n")
}

pub fn format_unknown(text: &str, mention: &str) -> String {
    format!(
        "❓ Unknown command: \"{}\"\n\nType `@{} help` to see available commands.",
        text, mention
    )
}

pub fn format_error(message: &str) -> String {
    format!("❌ Error: {}", message)
}

/// `Hh Mm`, `Mm Ss` or `Ss`.
pub fn format_uptime(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    let minutes = seconds / 60;
    let hours = minutes / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ExportFormat, SearchHit};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn session(title: &str, days_ago: Option<i64>, count: usize) -> SessionSummary {
        SessionSummary {
            id: format!("id-{}", title),
            title: title.to_string(),
            date: days_ago.map(|d| now() - chrono::Duration::days(d)),
            message_count: count,
        }
    }

    #[test]
    fn empty_session_list() {
        assert_eq!(format_session_list(&[], 30, now()), "📋 No chat sessions found.");
    }

    #[test]
    fn session_rows_with_relative_dates() {
        let sessions = vec![
            session("Fix build", Some(0), 4),
            session("Add auth", Some(1), 2),
            session("", Some(3), 0),
            session("Old work", Some(30), 7),
            session("No date", None, 1),
        ];
        let out = format_session_list(&sessions, 30, now());
        let expected = "📋 **Last 5 Chat Sessions**\n\n \
            1. Fix build (Today, 4 msgs)\n \
            2. Add auth (Yesterday, 2 msgs)\n \
            3. Untitled (3d ago, ? msgs)\n \
            4. Old work (May 16, 7 msgs)\n \
            5. No date (Unknown, 1 msgs)";
        assert_eq!(out, expected);
    }

    #[test]
    fn future_dates_read_as_today() {
        let s = session("Clock skew", Some(-2), 1);
        assert!(format_session_list(&[s], 30, now()).contains("(Today, 1 msgs)"));
    }

    #[test]
    fn session_list_limit_and_overflow_line() {
        let sessions: Vec<_> = (0..12).map(|i| session(&format!("s{}", i), Some(0), 1)).collect();
        let out = format_session_list(&sessions, 10, now());
        assert!(out.starts_with("📋 **Last 10 Chat Sessions**"));
        assert!(out.contains("10. s9 (Today, 1 msgs)"));
        assert!(!out.contains("s10"));
        assert!(out.ends_with("\n\n_+2 more sessions_"));
    }

    #[test]
    fn long_titles_truncate_to_forty_chars() {
        let title = "x".repeat(50);
        let out = format_session_list(&[session(&title, Some(0), 1)], 30, now());
        let expected = format!(" 1. {}... (Today, 1 msgs)", "x".repeat(37));
        assert!(out.contains(&expected), "{}", out);
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let title = "é".repeat(45);
        let out = truncate(&title, TITLE_MAX_CHARS);
        assert_eq!(out.chars().count(), TITLE_MAX_CHARS);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn empty_search_results() {
        let out = format_search_results(&SearchResults::default(), "MCP");
        assert_eq!(out, "🔍 No results found for \"MCP\"");
    }

    #[test]
    fn search_rows_and_previews() {
        let results = SearchResults {
            results: vec![
                SearchHit {
                    source: "Set up MCP".to_string(),
                    preview: "p".repeat(70),
                    relevance: 3,
                },
                SearchHit {
                    source: "context.md".to_string(),
                    preview: String::new(),
                    relevance: 1,
                },
            ],
            total_found: 2,
        };
        let out = format_search_results(&results, "MCP");
        let expected = format!(
            "🔍 **Found 2 matches for \"MCP\"**\n\n 1. Set up MCP\n    _\"{}...\"_\n 2. context.md",
            "p".repeat(57)
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn search_overflow_uses_total_found() {
        let hits: Vec<_> = (0..12)
            .map(|i| SearchHit {
                source: format!("s{}", i),
                preview: String::new(),
                relevance: 1,
            })
            .collect();
        let out = format_search_results(&SearchResults { results: hits, total_found: 15 }, "q");
        assert!(out.starts_with("🔍 **Found 15 matches for \"q\"**"));
        assert!(out.contains("10. s9"));
        assert!(!out.contains("s10"));
        assert!(out.ends_with("_+5 more results_"));
    }

    #[test]
    fn context_missing_or_short() {
        assert_eq!(format_context(None), "📄 No context.md found in workspace.");
        assert_eq!(format_context(Some("")), "📄 No context.md found in workspace.");
        assert_eq!(format_context(Some("# Ctx")), "📄 **context.md**\n\n# Ctx");
    }

    #[test]
    fn long_context_cuts_at_last_newline() {
        let content = format!("{}\n{}", "a".repeat(1000), "b".repeat(1000));
        let out = format_context(Some(&content));
        assert_eq!(
            out,
            format!(
                "📄 **context.md** (truncated)\n\n{}\n\n_...content truncated (2001 chars total)_",
                "a".repeat(1000)
            )
        );
    }

    #[test]
    fn long_context_without_newline_hard_cuts() {
        let content = "z".repeat(2000);
        let out = format_context(Some(&content));
        assert!(out.contains(&"z".repeat(CONTEXT_MAX_CHARS)));
        assert!(!out.contains(&"z".repeat(CONTEXT_MAX_CHARS + 1)));
        assert!(out.ends_with("(2000 chars total)_"));
    }

    #[test]
    fn export_success_and_failure() {
        let summary = ExportSummary {
            session_id: "abc123".to_string(),
            title: "t".to_string(),
            message_count: 5,
            format: ExportFormat::Summary,
        };
        assert_eq!(
            format_export_result(Ok(&summary), "abc"),
            "✅ **Session Exported**\n\nSession \"abc\" has been appended to context.md.\n\nMessages: 5\nFormat: summary"
        );
        assert_eq!(
            format_export_result(Err("no chat session matches \"zzz\""), "zzz"),
            "❌ Failed to export session: no chat session matches \"zzz\""
        );
        assert_eq!(
            format_export_result(Err(""), "zzz"),
            "❌ Failed to export session: Unknown error"
        );
    }

    #[test]
    fn status_with_and_without_session_count() {
        let mut report = StatusReport {
            agent_id: "copilot-bridge".to_string(),
            station: "Local".to_string(),
            comms_connected: true,
            comms_url: "http://comms:5052".to_string(),
            uptime: "3m 2s".to_string(),
            sessions_indexed: Some(12),
        };
        assert_eq!(
            format_status(&report),
            "✅ **Copilot Bridge Status**\n\nAgent ID: copilot-bridge\nStation: Local\nCOMMS: Connected (http://comms:5052)\nUptime: 3m 2s\nSessions indexed: 12"
        );
        report.comms_connected = false;
        report.sessions_indexed = None;
        let out = format_status(&report);
        assert!(out.contains("COMMS: Disconnected (http://comms:5052)"));
        assert!(!out.contains("Sessions indexed"));
    }

    #[test]
    fn help_lists_commands_with_mention() {
        let out = format_help("copilot");
        assert!(out.starts_with("🌐 **Copilot Bridge Commands**\n"));
        assert!(out.contains("• `@copilot recent [N]` - List last N chat sessions (default: 30)"));
        assert!(out.contains("• `@copilot search MCP` - Find sessions mentioning MCP"));
    }

    #[test]
    fn unknown_echoes_text_verbatim() {
        assert_eq!(
            format_unknown("do *stuff*", "copilot"),
            "❓ Unknown command: \"do *stuff*\"\n\nType `@copilot help` to see available commands."
        );
    }

    #[test]
    fn error_prefix() {
        assert_eq!(format_error("Search failed: boom"), "❌ Error: Search failed: boom");
    }

    #[test]
    fn uptime_units() {
        assert_eq!(format_uptime(Duration::from_secs(42)), "42s");
        assert_eq!(format_uptime(Duration::from_secs(185)), "3m 5s");
        assert_eq!(format_uptime(Duration::from_secs(3 * 3600 + 25 * 60 + 9)), "3h 25m");
    }
}
