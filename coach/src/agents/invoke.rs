//! Single sub-agent invocation: prompt, model call, tool resolution.

use anyhow::{Context, Result};
use tracing::{debug, instrument, warn};

use crate::agents::AgentProfile;
use crate::core::event::Event;
use crate::core::state::SessionState;
use crate::io::model::{GenerateRequest, ModelClient, ReplyPart, TranscriptEntry};
use crate::io::prompt::{PromptBuilder, PromptInputs};
use crate::io::search::SearchProvider;
use crate::tools::{self, ToolCall};

/// Limits applied to every invocation.
#[derive(Debug, Clone)]
pub struct InvokeConfig {
    pub prompt_budget_bytes: usize,
    pub max_tool_rounds: u32,
    pub search_result_count: usize,
}

impl Default for InvokeConfig {
    fn default() -> Self {
        Self {
            prompt_budget_bytes: 16_000,
            max_tool_rounds: 4,
            search_result_count: 3,
        }
    }
}

/// Run one sub-agent to completion and return its event sequence.
///
/// The agent's instruction is re-rendered from a fresh state snapshot on each
/// tool round, so tool writes become visible to the model within the same
/// invocation. Tool round-trips extend only the local transcript; the caller
/// keeps its history unchanged.
#[instrument(skip_all, fields(agent = profile.author.as_str()))]
pub fn run_agent<M, S>(
    profile: &AgentProfile,
    directive: Option<&str>,
    model: &M,
    search: &S,
    state: &mut SessionState,
    history: &[TranscriptEntry],
    config: &InvokeConfig,
) -> Result<Vec<Event>>
where
    M: ModelClient + ?Sized,
    S: SearchProvider + ?Sized,
{
    let mut events = Vec::new();
    let mut transcript = history.to_vec();

    for round in 0..=config.max_tool_rounds {
        let inputs = PromptInputs::snapshot(state, directive);
        let instruction = PromptBuilder::new(config.prompt_budget_bytes)
            .build(profile.author, &inputs)
            .context("render instruction")?;

        let request = GenerateRequest {
            instruction,
            transcript: transcript.clone(),
            tools: profile.tools.clone(),
        };
        let reply = model
            .generate(&request)
            .with_context(|| format!("{} generation failed", profile.author.as_str()))?;

        let mut calls = Vec::new();
        for part in reply.parts {
            match part {
                ReplyPart::Text(text) => {
                    transcript.push(TranscriptEntry::Agent {
                        author: profile.author,
                        text: text.clone(),
                    });
                    events.push(Event::text(profile.author, text));
                }
                ReplyPart::ToolCall { name, args } => calls.push((name, args)),
            }
        }

        if calls.is_empty() {
            break;
        }
        if round == config.max_tool_rounds {
            warn!(
                rounds = config.max_tool_rounds,
                "tool round limit reached, ending invocation"
            );
            break;
        }

        for (name, args) in calls {
            let result = match ToolCall::parse(&name, &args) {
                Ok(call) => tools::dispatch(&call, state, search, config.search_result_count),
                // Malformed requests are answered like any other tool result
                // so the model can correct itself on the next round.
                Err(err) => format!("Tool request rejected: {err:#}"),
            };
            debug!(tool = %name, result = %result, "tool resolved");
            transcript.push(TranscriptEntry::ToolCall {
                name: name.clone(),
                args,
            });
            transcript.push(TranscriptEntry::ToolResult { name, result });
        }
    }

    Ok(events)
}
