//! Test-only scripted collaborators.
//!
//! Scripted fakes stand in for the model and search backends so router and
//! agent behavior can be exercised without network access.

use std::cell::RefCell;
use std::collections::VecDeque;

use anyhow::{Result, anyhow};
use serde_json::Value;

use crate::io::model::{GenerateRequest, ModelClient, ModelReply, ReplyPart};
use crate::io::search::{SearchHit, SearchProvider};

/// Model client that returns a fixed sequence of replies and records every
/// request it receives.
pub struct ScriptedModel {
    replies: RefCell<VecDeque<ModelReply>>,
    requests: RefCell<Vec<GenerateRequest>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<ModelReply>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// All requests seen so far, in call order.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.borrow().clone()
    }
}

impl ModelClient for ScriptedModel {
    fn generate(&self, request: &GenerateRequest) -> Result<ModelReply> {
        self.requests.borrow_mut().push(request.clone());
        self.replies
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted model exhausted"))
    }
}

/// Reply containing a single text part.
pub fn text_reply(text: &str) -> ModelReply {
    ModelReply {
        parts: vec![ReplyPart::Text(text.to_string())],
    }
}

/// Reply with no parts at all, as a model may legally return.
pub fn empty_reply() -> ModelReply {
    ModelReply { parts: Vec::new() }
}

/// Reply containing a single tool call.
pub fn tool_call_reply(name: &str, args: Value) -> ModelReply {
    ModelReply {
        parts: vec![ReplyPart::ToolCall {
            name: name.to_string(),
            args,
        }],
    }
}

/// Search provider that returns the same hits for every query.
pub struct ScriptedSearch {
    hits: Vec<SearchHit>,
}

impl ScriptedSearch {
    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self { hits }
    }
}

impl SearchProvider for ScriptedSearch {
    fn search(&self, _query: &str, result_count: usize) -> Result<Vec<SearchHit>> {
        Ok(self.hits.iter().take(result_count).cloned().collect())
    }
}

/// Search provider that always fails, for degraded-path tests.
pub struct FailingSearch;

impl SearchProvider for FailingSearch {
    fn search(&self, _query: &str, _result_count: usize) -> Result<Vec<SearchHit>> {
        Err(anyhow!("search provider unavailable"))
    }
}

/// Deterministic hits for seeding scripted searches.
pub fn sample_hits(count: usize) -> Vec<SearchHit> {
    (0..count)
        .map(|i| SearchHit {
            title: format!("result {i}"),
            description: format!("description {i}"),
            url: format!("https://example.org/{i}"),
        })
        .collect()
}
