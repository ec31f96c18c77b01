//! `@copilot` command grammar.
//!
//! A message is *addressed* when it contains the mention token as a whole word. The text after
//! `@mention ` is matched against [`RULES`] in order; the first rule that matches wins. Order
//! matters: `recent`/`sessions` and `all` would otherwise overlap.

use regex::{Captures, Regex};

/// Mention token (without `@`) the bridge answers to by default.
pub const DEFAULT_MENTION: &str = "copilot";
/// `recent` / `sessions` without a (valid, non-zero) count.
pub const DEFAULT_SESSION_LIMIT: usize = 30;
/// `all`.
pub const ALL_SESSIONS_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ListSessions { limit: usize },
    SearchContext { query: String },
    ReadContext,
    ExportConversation { session_id: String },
    Status,
    Help,
    /// Addressed, but no rule matched. Not an error.
    Unknown { text: String },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::ListSessions { .. } => "list_sessions",
            Command::SearchContext { .. } => "search_context",
            Command::ReadContext => "read_context",
            Command::ExportConversation { .. } => "export_conversation",
            Command::Status => "status",
            Command::Help => "help",
            Command::Unknown { .. } => "unknown",
        }
    }
}

/// A command plus the (trimmed) text it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: Command,
    pub raw: String,
}

struct Rule {
    name: &'static str,
    pattern: &'static str,
    build: fn(&Captures<'_>) -> Command,
}

/// Ordered rule table. Patterns are anchored and matched case-insensitively.
const RULES: &[Rule] = &[
    Rule {
        name: "recent",
        pattern: r"^(?:recent|chats?|sessions?)(?:\s+(\d+))?$",
        build: build_recent,
    },
    Rule {
        name: "all",
        pattern: r"^all(?:\s+chats?|\s+sessions?)?$",
        build: build_all,
    },
    Rule {
        name: "search",
        pattern: r"^search\s+(.+)$",
        build: build_search,
    },
    Rule {
        name: "find",
        pattern: r"^find\s+(.+)$",
        build: build_search,
    },
    Rule {
        name: "context",
        pattern: r"^context$",
        build: build_context,
    },
    Rule {
        name: "export",
        pattern: r"^export\s+(.+)$",
        build: build_export,
    },
    Rule {
        name: "status",
        pattern: r"^status$",
        build: build_status,
    },
    Rule {
        name: "help",
        pattern: r"^help$",
        build: build_help,
    },
];

fn capture(caps: &Captures<'_>, i: usize) -> String {
    caps.get(i)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn build_recent(caps: &Captures<'_>) -> Command {
    let limit = caps
        .get(1)
        .and_then(|m| m.as_str().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_SESSION_LIMIT);
    Command::ListSessions { limit }
}

fn build_all(_: &Captures<'_>) -> Command {
    Command::ListSessions {
        limit: ALL_SESSIONS_LIMIT,
    }
}

fn build_search(caps: &Captures<'_>) -> Command {
    Command::SearchContext {
        query: capture(caps, 1),
    }
}

fn build_context(_: &Captures<'_>) -> Command {
    Command::ReadContext
}

fn build_export(caps: &Captures<'_>) -> Command {
    Command::ExportConversation {
        session_id: capture(caps, 1),
    }
}

fn build_status(_: &Captures<'_>) -> Command {
    Command::Status
}

fn build_help(_: &Captures<'_>) -> Command {
    Command::Help
}

/// Usage and description for each command, in help order.
pub fn available_commands() -> &'static [(&'static str, &'static str)] {
    &[
        ("recent [N]", "List last N chat sessions (default: 30)"),
        ("all", "List all available sessions"),
        ("search <query>", "Search sessions for a keyword"),
        ("context", "Show current context.md content"),
        ("export <id>", "Export a specific session"),
        ("status", "Show bridge status"),
        ("help", "Show this help message"),
    ]
}

/// Compiled grammar for one mention token.
pub struct CommandGrammar {
    mention: String,
    addressed: Regex,
    invocation: Regex,
    rules: Vec<(&'static Rule, Regex)>,
}

impl CommandGrammar {
    /// Compile the grammar for `mention` (with or without a leading `@`).
    pub fn new(mention: &str) -> Result<Self, regex::Error> {
        let mention = mention.trim().trim_start_matches('@').to_string();
        let escaped = regex::escape(&mention);
        let addressed = Regex::new(&format!(r"(?i)@{}\b", escaped))?;
        let invocation = Regex::new(&format!(r"(?i)@{}\s+(.+)", escaped))?;
        let rules = RULES
            .iter()
            .map(|rule| Ok((rule, Regex::new(&format!("(?i){}", rule.pattern))?)))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self {
            mention,
            addressed,
            invocation,
            rules,
        })
    }

    pub fn mention(&self) -> &str {
        &self.mention
    }

    /// True iff `content` contains `@mention` as a whole word (case-insensitive).
    pub fn is_addressed(&self, content: &str) -> bool {
        self.addressed.is_match(content)
    }

    /// Parse the command following `@mention`. `None` when the message does not invoke the bridge.
    pub fn parse(&self, content: &str) -> Option<ParsedCommand> {
        let caps = self.invocation.captures(content)?;
        let raw = caps.get(1)?.as_str().trim().to_string();
        if raw.is_empty() {
            return None;
        }
        let command = self
            .rules
            .iter()
            .find_map(|(rule, re)| re.captures(&raw).map(|c| (rule.build)(&c)))
            .unwrap_or_else(|| Command::Unknown { text: raw.clone() });
        Some(ParsedCommand { command, raw })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar() -> CommandGrammar {
        CommandGrammar::new(DEFAULT_MENTION).unwrap()
    }

    fn parse(s: &str) -> Option<Command> {
        grammar().parse(s).map(|p| p.command)
    }

    #[test]
    fn rule_order_is_fixed() {
        let names: Vec<&str> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            ["recent", "all", "search", "find", "context", "export", "status", "help"]
        );
    }

    #[test]
    fn every_rule_pattern_compiles() {
        assert_eq!(grammar().rules.len(), RULES.len());
    }

    #[test]
    fn recent_with_and_without_count() {
        assert_eq!(parse("@copilot recent 5"), Some(Command::ListSessions { limit: 5 }));
        assert_eq!(parse("@copilot recent"), Some(Command::ListSessions { limit: 30 }));
        assert_eq!(parse("@copilot chats 12"), Some(Command::ListSessions { limit: 12 }));
        assert_eq!(parse("@copilot sessions"), Some(Command::ListSessions { limit: 30 }));
        assert_eq!(parse("@copilot chat"), Some(Command::ListSessions { limit: 30 }));
    }

    #[test]
    fn recent_zero_or_overflow_falls_back_to_default() {
        assert_eq!(parse("@copilot recent 0"), Some(Command::ListSessions { limit: 30 }));
        assert_eq!(
            parse("@copilot recent 99999999999999999999999"),
            Some(Command::ListSessions { limit: 30 })
        );
    }

    #[test]
    fn all_variants() {
        for s in ["@copilot all", "@copilot all chats", "@copilot ALL Sessions"] {
            assert_eq!(parse(s), Some(Command::ListSessions { limit: 100 }), "{}", s);
        }
    }

    #[test]
    fn search_and_find_trim_query() {
        assert_eq!(
            parse("@copilot search foo bar"),
            Some(Command::SearchContext { query: "foo bar".to_string() })
        );
        assert_eq!(
            parse("@copilot find   MCP  "),
            Some(Command::SearchContext { query: "MCP".to_string() })
        );
    }

    #[test]
    fn simple_keywords() {
        assert_eq!(parse("@copilot context"), Some(Command::ReadContext));
        assert_eq!(parse("@copilot Status"), Some(Command::Status));
        assert_eq!(parse("@copilot HELP"), Some(Command::Help));
        assert_eq!(
            parse("@copilot export 3f2a-b1"),
            Some(Command::ExportConversation { session_id: "3f2a-b1".to_string() })
        );
    }

    #[test]
    fn unmatched_text_is_unknown_with_remainder() {
        assert_eq!(
            parse("@copilot banana"),
            Some(Command::Unknown { text: "banana".to_string() })
        );
        assert_eq!(
            parse("@copilot recent five"),
            Some(Command::Unknown { text: "recent five".to_string() })
        );
        assert_eq!(
            parse("@copilot search"),
            Some(Command::Unknown { text: "search".to_string() })
        );
    }

    #[test]
    fn text_before_mention_is_dropped() {
        let parsed = grammar().parse("hey team, @Copilot status").unwrap();
        assert_eq!(parsed.command, Command::Status);
        assert_eq!(parsed.raw, "status");
    }

    #[test]
    fn addressed_requires_whole_word() {
        let g = grammar();
        assert!(g.is_addressed("hey @COPILOT status"));
        assert!(g.is_addressed("@copilot"));
        assert!(g.is_addressed("ping @copilot, please"));
        assert!(!g.is_addressed("@copilots status"));
        assert!(!g.is_addressed("copilot status"));
        assert!(!g.is_addressed("email me@copilotx.dev"));
    }

    #[test]
    fn not_addressed_parses_to_none() {
        let g = grammar();
        for s in ["hello", "copilot help", "@copilots help", ""] {
            assert!(g.parse(s).is_none(), "{}", s);
        }
    }

    #[test]
    fn bare_mention_is_addressed_but_not_parsed() {
        let g = grammar();
        assert!(g.is_addressed("@copilot"));
        assert!(g.parse("@copilot").is_none());
        assert!(g.parse("@copilot   ").is_none());
    }

    #[test]
    fn custom_mention_token() {
        let g = CommandGrammar::new("@helper").unwrap();
        assert_eq!(g.mention(), "helper");
        assert!(g.is_addressed("@helper status"));
        assert!(!g.is_addressed("@copilot status"));
        assert_eq!(g.parse("@helper status").map(|p| p.command), Some(Command::Status));
    }

    #[test]
    fn help_lists_every_command() {
        let usages: Vec<&str> = available_commands().iter().map(|(u, _)| *u).collect();
        for word in ["recent", "all", "search", "context", "export", "status", "help"] {
            assert!(usages.iter().any(|u| u.starts_with(word)), "{}", word);
        }
    }
}
