//! Tool invocation layer shared by the sub-agents.
//!
//! Tools are the only way a sub-agent mutates session state. Every dispatch
//! returns a status string for the calling agent; failures (including a
//! broken search provider) are converted to descriptive text here and never
//! propagate to the router.

use anyhow::{Result, anyhow};
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::core::state::SessionState;
use crate::io::model::ToolSpec;
use crate::io::search::{SearchHit, SearchProvider};

pub const WEB_SEARCH: &str = "web_search";
pub const SAVE_OPTIONS: &str = "save_options";

/// A tool call parsed from a model function-call request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    WebSearch { query: String },
    SaveOptions { options_text: String },
}

impl ToolCall {
    /// Parse a named call with JSON arguments as produced by the model.
    pub fn parse(name: &str, args: &Value) -> Result<Self> {
        match name {
            WEB_SEARCH => {
                let query = required_str(args, "query")?;
                Ok(ToolCall::WebSearch { query })
            }
            SAVE_OPTIONS => {
                let options_text = required_str(args, "options_text")?;
                Ok(ToolCall::SaveOptions { options_text })
            }
            other => Err(anyhow!("unknown tool '{other}'")),
        }
    }
}

fn required_str(args: &Value, field: &str) -> Result<String> {
    args.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("missing string argument '{field}'"))
}

/// Declaration for the researcher's search tool.
pub fn web_search_spec() -> ToolSpec {
    ToolSpec {
        name: WEB_SEARCH.to_string(),
        description: "Search the web and save the results to the shared session research."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query derived from the user's concern."
                }
            },
            "required": ["query"]
        }),
    }
}

/// Declaration for the clarifier's save tool.
pub fn save_options_spec() -> ToolSpec {
    ToolSpec {
        name: SAVE_OPTIONS.to_string(),
        description: "Save actionable options to the shared session, one option per line."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "options_text": {
                    "type": "string",
                    "description": "Options separated by newlines."
                }
            },
            "required": ["options_text"]
        }),
    }
}

/// Run one tool call against session state.
///
/// Always returns a status string; tool-level failures become text for the
/// calling agent rather than errors for the router.
#[instrument(skip(state, search))]
pub fn dispatch<S: SearchProvider + ?Sized>(
    call: &ToolCall,
    state: &mut SessionState,
    search: &S,
    result_count: usize,
) -> String {
    match call {
        ToolCall::WebSearch { query } => run_web_search(query, state, search, result_count),
        ToolCall::SaveOptions { options_text } => {
            let options = parse_options(options_text);
            debug!(count = options.len(), "saving options");
            state.replace_options(options);
            "Options saved to session state.".to_string()
        }
    }
}

fn run_web_search<S: SearchProvider + ?Sized>(
    query: &str,
    state: &mut SessionState,
    search: &S,
    result_count: usize,
) -> String {
    let hits = match search.search(query, result_count) {
        Ok(hits) => hits,
        Err(err) => {
            warn!(error = %err, "search provider failed");
            return format!("Search failed: {err:#}");
        }
    };

    let count = hits.len();
    state.append_research(format_hits(&hits));
    format!("Context updated with {count} search results.")
}

/// Format hits into one research block: title/description/url per hit,
/// hits separated by `---` lines.
fn format_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| {
            format!(
                "Title: {}\nDescription: {}\nURL: {}",
                hit.title, hit.description, hit.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

/// Split free text into trimmed, non-empty option lines.
pub fn parse_options(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
