//! Engine configuration and defaults.
//!
//! Everything here has a working default; [`EngineConfig::from_env`]
//! overlays the process environment.  The hedging phrase list and the alias
//! table are data, not behavior -- deployments override them wholesale when
//! a model family develops new refusal tics.

use std::collections::{HashMap, HashSet};

use chrono::Local;

use sotto_tools::default_aliases;

/// Substrings that indicate the model is refusing or disclaiming real-time
/// capability.  Matched case-insensitively against the whole reply.
pub const DEFAULT_HEDGING_PHRASES: &[&str] = &[
    "don't have access",
    "don't have real-time",
    "don't have current",
    "don't have the ability",
    "don't have live",
    "do not have access",
    "do not have real-time",
    "do not have current",
    "do not have the ability",
    "can't browse",
    "can't access the internet",
    "can't access the web",
    "can't search",
    "cannot browse",
    "cannot access the internet",
    "cannot access the web",
    "cannot search",
    "not able to browse",
    "not able to access",
    "not able to search",
    "unable to browse",
    "unable to access real",
    "unable to search",
    "my knowledge cutoff",
    "my training data",
    "information is outdated",
    "data is outdated",
    "may be outdated",
    "might be outdated",
    "as an ai",
    "as a language model",
    "as a large language model",
    "lack access",
    "beyond my capabilities",
    "outside my capabilities",
    "not available to me",
    "can't actually browse",
    "can't actually access",
    "can't actually search",
    "cannot actually browse",
    "cannot actually access",
    "cannot actually search",
    "don't actually have access",
    "still under development",
    "not accessible in real-time",
    "not accessible in real time",
    "isn't accessible",
    "is not accessible",
    "can't provide real-time",
    "cannot provide real-time",
    "can't provide you with real-time",
    "i can't answer that",
    "check yahoo finance",
    "check a financial",
    "visit a financial",
    "recommend checking",
];

/// Fixed prompt for extracting a clean search query from a user message
/// during the safety-net path.
pub const SEARCH_CLASSIFIER_PROMPT: &str =
    "Extract a clean web search query from this user message. \
     Strip conversational filler and keep only the factual question.\n\n\
     Reply with ONLY the search query, nothing else.\n\n\
     Examples:\n\
     User: 'What is the weather today in Austin?' → weather in Austin today\n\
     User: 'Yes, look that up, what's the S&P 500?' → S&P 500 current price\n\
     User: 'Can you tell me who won the Super Bowl?' → who won the Super Bowl";

/// Build the default system prompt with today's date, so the model knows
/// what "today" means and puts the year into search queries.
pub fn default_system_prompt() -> String {
    let today = Local::now().format("%B %d, %Y");
    format!(
        "You are a helpful voice assistant. Today is {today}. \
         Keep responses concise — one to three sentences. \
         Speak naturally as in a conversation. \
         When searching the web, always include the current year in queries \
         to get fresh results."
    )
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Configuration for the orchestrator and workflow runner.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// System prompt override.  Empty means [`default_system_prompt`] is
    /// rebuilt per turn (the date must stay current).
    pub system_prompt: String,

    /// Upper bound on chat-loop iterations.
    pub max_iterations: usize,

    /// Maximum retained history messages (tool-group aware trimming).
    pub max_history: usize,

    /// Whether the hedging safety-net search runs at all.
    pub enable_hedging_safety_net: bool,

    /// Substring set used by the hedging detector.
    pub hedging_phrases: Vec<String>,

    /// Model-emitted name to canonical tool name, consulted by the
    /// text-fallback parser.
    pub tool_aliases: HashMap<String, String>,

    /// Tools disabled at the deployment level.
    pub disabled_tools_admin: HashSet<String>,

    /// Tools disabled by this user.
    pub disabled_tools_user: HashSet<String>,

    /// Delay between successive loop-step searches, in milliseconds
    /// (rate-limit defense).  Tests set this to zero.
    pub loop_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            max_iterations: 5,
            max_history: 20,
            enable_hedging_safety_net: true,
            hedging_phrases: DEFAULT_HEDGING_PHRASES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            tool_aliases: default_aliases(),
            disabled_tools_admin: HashSet::new(),
            disabled_tools_user: HashSet::new(),
            loop_delay_ms: 1_500,
        }
    }
}

impl EngineConfig {
    /// Build a configuration from the process environment
    /// (`MAX_TOOL_CALLS_PER_TURN`, `MAX_HISTORY_MESSAGES`,
    /// `SOTTO_SYSTEM_PROMPT`, `SOTTO_DISABLE_SAFETY_NET`).
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(n) = env_parse("MAX_TOOL_CALLS_PER_TURN") {
            config.max_iterations = n;
        }
        if let Some(n) = env_parse("MAX_HISTORY_MESSAGES") {
            config.max_history = n;
        }
        if let Ok(p) = std::env::var("SOTTO_SYSTEM_PROMPT") {
            config.system_prompt = p;
        }
        if let Ok(v) = std::env::var("SOTTO_DISABLE_SAFETY_NET") {
            if matches!(v.as_str(), "1" | "true") {
                config.enable_hedging_safety_net = false;
            }
        }

        config
    }

    /// The effective system prompt for this turn.
    pub fn effective_system_prompt(&self) -> String {
        if self.system_prompt.is_empty() {
            default_system_prompt()
        } else {
            self.system_prompt.clone()
        }
    }
}

fn env_parse(name: &str) -> Option<usize> {
    std::env::var(name).ok()?.parse().ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_limits() {
        let config = EngineConfig::default();
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.max_history, 20);
        assert!(config.enable_hedging_safety_net);
        assert_eq!(config.loop_delay_ms, 1_500);
        assert!(config.hedging_phrases.iter().any(|p| p == "as an ai"));
        assert_eq!(
            config.tool_aliases.get("gc_search").map(String::as_str),
            Some("web_search")
        );
    }

    #[test]
    fn default_system_prompt_carries_todays_date() {
        let prompt = default_system_prompt();
        let year = Local::now().format("%Y").to_string();
        assert!(prompt.contains(&year));
        assert!(prompt.contains("voice assistant"));
    }

    #[test]
    fn explicit_system_prompt_wins() {
        let config = EngineConfig {
            system_prompt: "Be terse.".into(),
            ..Default::default()
        };
        assert_eq!(config.effective_system_prompt(), "Be terse.");
    }
}
