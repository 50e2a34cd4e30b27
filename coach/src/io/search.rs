//! Search-provider seam for the web-search tool.
//!
//! [`SearchProvider`] isolates the tool layer from the concrete search
//! backend. The shipped implementation asks Gemini to ground a query with its
//! `google_search` tool and extracts the grounding references.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, instrument};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// One search result surfaced to the tool layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub description: String,
    pub url: String,
}

/// Abstraction over web-search backends.
///
/// Implementations may fail; the tool layer converts failures to a textual
/// result and never lets them reach the router.
pub trait SearchProvider {
    fn search(&self, query: &str, result_count: usize) -> Result<Vec<SearchHit>>;
}

/// Search backed by Gemini grounding metadata.
pub struct GroundedSearch {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
}

impl GroundedSearch {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

impl SearchProvider for GroundedSearch {
    #[instrument(skip_all, fields(model = %self.model, result_count))]
    fn search(&self, query: &str, result_count: usize) -> Result<Vec<SearchHit>> {
        if self.api_key.trim().is_empty() {
            bail!("no API key configured (set GEMINI_API_KEY)");
        }
        let url = format!(
            "{BASE_URL}/{model}:generateContent?key={key}",
            model = self.model,
            key = self.api_key
        );
        let body = GroundedRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: query }],
            }],
            tools: vec![GroundingTool::default()],
        };

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .context("send grounded search request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "failed to read error body".to_string());
            bail!("grounded search returned {status}: {body}");
        }

        let payload: Value = response.json().context("parse grounded search response")?;
        let hits = extract_hits(&payload, result_count);
        debug!(hits = hits.len(), "grounded search completed");
        Ok(hits)
    }
}

/// Walk grounding chunks out of a `generateContent` response.
///
/// References are deduplicated by url and capped at `result_count`.
fn extract_hits(root: &Value, result_count: usize) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    let mut hits = Vec::new();

    let candidates = match root.get("candidates").and_then(Value::as_array) {
        Some(list) => list,
        None => return hits,
    };

    for candidate in candidates {
        let chunks = match candidate
            .get("groundingMetadata")
            .and_then(|meta| meta.get("groundingChunks"))
            .and_then(Value::as_array)
        {
            Some(list) => list,
            None => continue,
        };

        for chunk in chunks {
            let Some(web) = chunk.get("web") else {
                continue;
            };
            let Some(url) = web
                .get("uri")
                .or_else(|| web.get("url"))
                .and_then(Value::as_str)
            else {
                continue;
            };
            if !seen.insert(url.to_string()) {
                continue;
            }

            let title = web
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or(url)
                .to_string();
            let description = web
                .get("snippet")
                .or_else(|| web.get("text"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            hits.push(SearchHit {
                title,
                description,
                url: url.to_string(),
            });
            if hits.len() >= result_count {
                return hits;
            }
        }
    }

    hits
}

#[derive(Debug, Serialize)]
struct GroundedRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    tools: Vec<GroundingTool>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Serialize)]
struct GroundingTool {
    google_search: GoogleSearchConfig,
}

#[derive(Debug, Default, Serialize)]
struct GoogleSearchConfig {}
