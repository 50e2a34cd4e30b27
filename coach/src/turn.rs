//! Orchestration for a single router turn — the step-sequencing core.
//!
//! The router keeps no state of its own: it derives the current phase from
//! session state, drives the phase's sub-agent(s) in order, concatenates
//! their event sequences, and flips the phase flag. Because the phase is
//! recomputed from durable fields, a session can resume after a restart and
//! every routing decision is a pure function of state.

use anyhow::Result;
use tracing::{debug, info, instrument};

use crate::agents::AgentSet;
use crate::agents::invoke::{InvokeConfig, run_agent};
use crate::core::event::{Author, Event};
use crate::core::phase::{Phase, phase_for};
use crate::io::config::CoachConfig;
use crate::io::model::ModelClient;
use crate::io::search::SearchProvider;
use crate::session::Session;

/// Closing message emitted once both phase flags are set.
pub const CLOSING_MESSAGE: &str =
    "Thank you. You seem calm and detached now. The session is complete.";

/// Override directive for the reassurance turn.
pub const REASSURANCE_DIRECTIVE: &str =
    "Explain to the user that their fear is actually a sign of desire. Make them feel better.";

/// Configuration for a single router turn.
#[derive(Debug, Clone)]
pub struct TurnConfig {
    pub invoke: InvokeConfig,
    /// When true (the default), phase flags flip even if the delegated
    /// sub-agent produced no observable progress. Set false to require
    /// progress before advancing.
    pub advance_without_progress: bool,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            invoke: InvokeConfig::default(),
            advance_without_progress: true,
        }
    }
}

impl From<&CoachConfig> for TurnConfig {
    fn from(cfg: &CoachConfig) -> Self {
        Self {
            invoke: InvokeConfig {
                prompt_budget_bytes: cfg.prompt_budget_bytes,
                max_tool_rounds: cfg.max_tool_rounds,
                search_result_count: cfg.search_result_count,
            },
            advance_without_progress: cfg.advance_without_progress,
        }
    }
}

/// Override directive for the options turn, rendered against current options.
fn options_directive(options: &[String]) -> String {
    let listed = if options.is_empty() {
        "(none were saved)".to_string()
    } else {
        options.join("; ")
    };
    format!(
        "Ask the user if they can see the action separately from the emotion. \
         Present the options: {listed}"
    )
}

/// Execute one router turn for `user_text`.
///
/// Phase contract, in fixed order:
/// - research empty: run researcher, then asker, with no state re-check in
///   between; advancement happens only once research lands.
/// - reassurance: run asker with [`REASSURANCE_DIRECTIVE`], then set
///   `user_understood_fear`.
/// - options: run clarifier, then asker with the options directive, then set
///   `user_detached`.
/// - done: emit exactly one router-authored [`CLOSING_MESSAGE`] event;
///   repeated turns repeat the same event and invoke no sub-agent.
///
/// Sub-agent semantic failure never faults the router; only transport-level
/// errors (model call failed) propagate, leaving state already mutated by
/// earlier invocations in place.
#[instrument(skip_all, fields(session = %session.id))]
pub fn run_turn<M, S>(
    session: &mut Session,
    user_text: &str,
    agents: &AgentSet,
    model: &M,
    search: &S,
    config: &TurnConfig,
) -> Result<Vec<Event>>
where
    M: ModelClient + ?Sized,
    S: SearchProvider + ?Sized,
{
    session.record_user(user_text);
    let phase = phase_for(&session.state);
    debug!(?phase, "routing turn");

    let events = match phase {
        Phase::NeedsResearch => {
            let mut events = run_agent(
                &agents.researcher,
                None,
                model,
                search,
                &mut session.state,
                &session.history,
                &config.invoke,
            )?;
            // Hand off to the asker immediately; whether research actually
            // landed is not verified here.
            events.extend(run_agent(
                &agents.asker,
                None,
                model,
                search,
                &mut session.state,
                &session.history,
                &config.invoke,
            )?);
            events
        }
        Phase::NeedsReassurance => {
            let events = run_agent(
                &agents.asker,
                Some(REASSURANCE_DIRECTIVE),
                model,
                search,
                &mut session.state,
                &session.history,
                &config.invoke,
            )?;
            let spoke = events.iter().any(|e| e.text.is_some());
            if config.advance_without_progress || spoke {
                session.state.mark_understood();
            }
            events
        }
        Phase::NeedsOptions => {
            let mut events = run_agent(
                &agents.clarifier,
                None,
                model,
                search,
                &mut session.state,
                &session.history,
                &config.invoke,
            )?;
            let directive = options_directive(&session.state.options);
            events.extend(run_agent(
                &agents.asker,
                Some(&directive),
                model,
                search,
                &mut session.state,
                &session.history,
                &config.invoke,
            )?);
            if config.advance_without_progress || !session.state.options.is_empty() {
                session.state.mark_detached();
            }
            events
        }
        Phase::Done => {
            info!("session complete");
            vec![Event::text(Author::Router, CLOSING_MESSAGE)]
        }
    };

    session.record_events(&events);
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        ScriptedModel, ScriptedSearch, empty_reply, sample_hits, text_reply, tool_call_reply,
    };
    use crate::tools;
    use serde_json::json;

    fn run(
        session: &mut Session,
        model: &ScriptedModel,
        search: &ScriptedSearch,
        config: &TurnConfig,
    ) -> Vec<Event> {
        run_turn(
            session,
            "I'm scared of the interview",
            &AgentSet::standard(),
            model,
            search,
            config,
        )
        .expect("turn")
    }

    #[test]
    fn research_turn_runs_researcher_then_asker() {
        let model = ScriptedModel::new(vec![
            tool_call_reply(tools::WEB_SEARCH, json!({"query": "interview fear"})),
            text_reply("research noted"),
            text_reply("take a breath"),
        ]);
        let search = ScriptedSearch::with_hits(sample_hits(2));
        let mut session = Session::new();

        let events = run(&mut session, &model, &search, &TurnConfig::default());

        assert_eq!(
            events,
            vec![
                Event::text(Author::Researcher, "research noted"),
                Event::text(Author::Asker, "take a breath"),
            ]
        );
        assert_eq!(session.state.research.len(), 1);
        assert!(!session.state.user_understood_fear);

        // Researcher requests (with its tool) come strictly before the
        // asker's tool-less request.
        let requests = model.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].tools.len(), 1);
        assert_eq!(requests[1].tools.len(), 1);
        assert!(requests[2].tools.is_empty());
    }

    #[test]
    fn reassurance_turn_sets_flag_and_uses_directive() {
        let model = ScriptedModel::new(vec![text_reply("fear means you care")]);
        let search = ScriptedSearch::with_hits(Vec::new());
        let mut session = Session::new();
        session.state.append_research("prior block");

        let events = run(&mut session, &model, &search, &TurnConfig::default());

        assert_eq!(events.len(), 1);
        assert!(session.state.user_understood_fear);
        let requests = model.requests();
        assert!(requests[0].instruction.contains("sign of desire"));
    }

    #[test]
    fn reassurance_flag_is_set_regardless_of_detached() {
        let model = ScriptedModel::new(vec![text_reply("ok")]);
        let search = ScriptedSearch::with_hits(Vec::new());
        let mut session = Session::new();
        session.state.append_research("block");
        session.state.user_detached = true;

        run(&mut session, &model, &search, &TurnConfig::default());
        assert!(session.state.user_understood_fear);
        assert!(session.state.user_detached);
    }

    #[test]
    fn options_turn_replaces_options_and_sets_detached() {
        let model = ScriptedModel::new(vec![
            tool_call_reply(tools::SAVE_OPTIONS, json!({"options_text": "Breathe\nPrepare"})),
            text_reply("two options saved"),
            text_reply("can you see the action apart from the feeling?"),
        ]);
        let search = ScriptedSearch::with_hits(Vec::new());
        let mut session = Session::new();
        session.state.append_research("block");
        session.state.mark_understood();
        session.state.replace_options(vec!["old".to_string()]);

        let events = run(&mut session, &model, &search, &TurnConfig::default());

        assert_eq!(session.state.options, vec!["Breathe", "Prepare"]);
        assert!(session.state.user_detached);
        assert_eq!(events.len(), 2);

        // Asker directive references the freshly saved options.
        let requests = model.requests();
        let asker_request = requests.last().expect("asker request");
        assert!(asker_request.instruction.contains("Breathe; Prepare"));
    }

    #[test]
    fn done_turn_emits_single_router_event_idempotently() {
        let model = ScriptedModel::new(Vec::new());
        let search = ScriptedSearch::with_hits(Vec::new());
        let mut session = Session::new();
        session.state.append_research("block");
        session.state.mark_understood();
        session.state.mark_detached();

        for _ in 0..3 {
            let events = run(&mut session, &model, &search, &TurnConfig::default());
            assert_eq!(events, vec![Event::text(Author::Router, CLOSING_MESSAGE)]);
        }
        // No sub-agent was ever invoked.
        assert!(model.requests().is_empty());
    }

    #[test]
    fn strict_policy_blocks_advance_when_asker_stays_silent() {
        let model = ScriptedModel::new(vec![empty_reply()]);
        let search = ScriptedSearch::with_hits(Vec::new());
        let mut session = Session::new();
        session.state.append_research("block");
        let config = TurnConfig {
            advance_without_progress: false,
            ..TurnConfig::default()
        };

        let events = run(&mut session, &model, &search, &config);
        assert!(events.is_empty());
        assert!(
            !session.state.user_understood_fear,
            "strict policy must not advance on a silent reassurance turn"
        );
    }

    #[test]
    fn default_policy_advances_even_when_asker_stays_silent() {
        let model = ScriptedModel::new(vec![empty_reply()]);
        let search = ScriptedSearch::with_hits(Vec::new());
        let mut session = Session::new();
        session.state.append_research("block");

        run(&mut session, &model, &search, &TurnConfig::default());
        assert!(session.state.user_understood_fear);
    }

    #[test]
    fn strict_policy_blocks_advance_without_options() {
        let model = ScriptedModel::new(vec![
            text_reply("no tool call made"),
            text_reply("here are your options"),
        ]);
        let search = ScriptedSearch::with_hits(Vec::new());
        let mut session = Session::new();
        session.state.append_research("block");
        session.state.mark_understood();
        let config = TurnConfig {
            advance_without_progress: false,
            ..TurnConfig::default()
        };

        run(&mut session, &model, &search, &config);
        assert!(
            !session.state.user_detached,
            "strict policy must not advance without saved options"
        );
    }

    #[test]
    fn default_policy_advances_even_without_options() {
        let model = ScriptedModel::new(vec![
            text_reply("no tool call made"),
            text_reply("here are your options"),
        ]);
        let search = ScriptedSearch::with_hits(Vec::new());
        let mut session = Session::new();
        session.state.append_research("block");
        session.state.mark_understood();

        run(&mut session, &model, &search, &TurnConfig::default());
        assert!(session.state.user_detached);
    }

    #[test]
    fn options_directive_mentions_missing_options() {
        let directive = options_directive(&[]);
        assert!(directive.contains("(none were saved)"));
    }
}
