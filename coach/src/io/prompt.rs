//! Instruction rendering for sub-agent invocations.
//!
//! Each agent role has a minijinja template rendered against a snapshot of
//! session state plus an optional per-turn override directive. Rendering is a
//! pure formatting step performed before the model-call boundary. The
//! rendered output is split into marked sections and trimmed to a byte
//! budget, dropping the least critical sections first.

use anyhow::Result;
use minijinja::{Environment, context};
use tracing::debug;

use crate::core::event::Author;
use crate::core::state::SessionState;

const RESEARCHER_TEMPLATE: &str = include_str!("prompts/researcher.md");
const CLARIFIER_TEMPLATE: &str = include_str!("prompts/clarifier.md");
const ASKER_TEMPLATE: &str = include_str!("prompts/asker.md");

/// Snapshot of everything an instruction render can reference.
#[derive(Debug, Clone, Default)]
pub struct PromptInputs {
    /// Per-turn override directive set by the router (asker only).
    pub directive: Option<String>,
    /// Research blocks accumulated so far.
    pub research: Vec<String>,
    /// Current options list.
    pub options: Vec<String>,
}

impl PromptInputs {
    /// Snapshot the fields an instruction may reference from session state.
    pub fn snapshot(state: &SessionState, directive: Option<&str>) -> Self {
        Self {
            directive: directive.map(str::to_string),
            research: state.research.clone(),
            options: state.options.clone(),
        }
    }
}

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("researcher", RESEARCHER_TEMPLATE)
            .expect("researcher template should be valid");
        env.add_template("clarifier", CLARIFIER_TEMPLATE)
            .expect("clarifier template should be valid");
        env.add_template("asker", ASKER_TEMPLATE)
            .expect("asker template should be valid");
        Self { env }
    }

    fn render(&self, author: Author, input: &PromptInputs) -> Result<String> {
        let name = template_for(author);
        let template = self.env.get_template(name)?;
        let rendered = template.render(context! {
            directive => input.directive.as_deref().map(str::trim).filter(|s| !s.is_empty()),
            research => input.research,
            options => input.options,
        })?;
        Ok(rendered)
    }
}

fn template_for(author: Author) -> &'static str {
    match author {
        Author::Researcher => "researcher",
        Author::Clarifier => "clarifier",
        // The router's own events never go through a template; fall back to
        // the asker so the mapping stays total.
        Author::Asker | Author::Router => "asker",
    }
}

/// A parsed section from rendered template output.
#[derive(Debug, Clone)]
struct ParsedSection {
    /// Section identifier (e.g., "contract", "research").
    key: String,
    /// Whether this section is required (cannot be dropped).
    required: bool,
    /// Full section content including header.
    content: String,
}

/// Parse sections from rendered template output using HTML comment markers.
///
/// Markers follow format: `<!-- section:KEY required|droppable -->`
fn parse_sections(rendered: &str) -> Vec<ParsedSection> {
    use std::sync::LazyLock;
    static SECTION_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
        regex::Regex::new(r"<!--\s*section:(\w+)\s+(required|droppable)\s*-->").unwrap()
    });

    let mut sections = Vec::new();
    let matches: Vec<_> = SECTION_RE.captures_iter(rendered).collect();

    for (i, caps) in matches.iter().enumerate() {
        let key = caps.get(1).unwrap().as_str().to_string();
        let required = caps.get(2).unwrap().as_str() == "required";
        let start = caps.get(0).unwrap().end();
        let end = matches
            .get(i + 1)
            .map(|m| m.get(0).unwrap().start())
            .unwrap_or(rendered.len());

        let content = rendered[start..end].trim().to_string();
        if !content.is_empty() || required {
            sections.push(ParsedSection {
                key,
                required,
                content,
            });
        }
    }

    sections
}

/// Apply budget to parsed sections, dropping droppable sections as needed.
///
/// Drop order: research -> options
fn apply_budget_to_sections(sections: &mut Vec<ParsedSection>, budget: usize) {
    let total_len =
        |secs: &[ParsedSection]| -> usize { secs.iter().map(|s| s.content.len()).sum() };

    if total_len(sections) <= budget {
        return;
    }

    let drop_order = ["research", "options"];
    for key in drop_order {
        if total_len(sections) <= budget {
            break;
        }
        if let Some(idx) = sections.iter().position(|s| s.key == key && !s.required) {
            let dropped_len = sections[idx].content.len();
            debug!(
                section = key,
                bytes_dropped = dropped_len,
                "dropped section for budget"
            );
            sections.remove(idx);
        }
    }

    // If still over budget, truncate the last section
    if total_len(sections) > budget && !sections.is_empty() {
        let other_len: usize = sections
            .iter()
            .take(sections.len() - 1)
            .map(|s| s.content.len())
            .sum();
        let allowed = budget.saturating_sub(other_len);
        let last = sections.last_mut().unwrap();
        if last.content.len() > allowed {
            if allowed > 12 {
                truncate_to_boundary(&mut last.content, allowed - 12);
                last.content.push_str("\n[truncated]");
            } else {
                truncate_to_boundary(&mut last.content, allowed);
            }
        }
    }
}

/// Truncate to at most `max` bytes, backing up so the cut never lands inside
/// a multibyte character.
fn truncate_to_boundary(s: &mut String, mut max: usize) {
    if max >= s.len() {
        return;
    }
    while !s.is_char_boundary(max) {
        max -= 1;
    }
    s.truncate(max);
}

/// Render sections back to a single string.
fn render_sections(sections: &[ParsedSection]) -> String {
    sections
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Builds an instruction within a byte budget, dropping state sections first.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    budget_bytes: usize,
}

impl PromptBuilder {
    /// Create a builder with the given byte budget.
    pub fn new(budget_bytes: usize) -> Self {
        Self { budget_bytes }
    }

    /// Build the instruction for one agent role.
    pub fn build(&self, author: Author, input: &PromptInputs) -> Result<String> {
        let engine = PromptEngine::new();
        let rendered = engine.render(author, input)?;

        let mut sections = parse_sections(&rendered);
        apply_budget_to_sections(&mut sections, self.budget_bytes);

        Ok(render_sections(&sections))
    }
}
