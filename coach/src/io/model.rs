//! Model-generation seam for sub-agent invocation.
//!
//! The [`ModelClient`] trait decouples sub-agent orchestration from the
//! actual completion backend (currently the Gemini REST API). Tests use
//! scripted clients that return predetermined replies without network calls.

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::core::event::Author;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// One entry of the conversation transcript sent to the model.
///
/// Tool round-trips appear only in the transcript of the invocation that
/// made them; persistent session history holds `User` and `Agent` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranscriptEntry {
    User { text: String },
    Agent { author: Author, text: String },
    ToolCall { name: String, args: Value },
    ToolResult { name: String, result: String },
}

/// Declaration of a tool the model may request, in JSON-schema form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Parameters for one model generation call.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// System instruction, fully rendered before the call boundary.
    pub instruction: String,
    /// Conversation transcript, oldest first.
    pub transcript: Vec<TranscriptEntry>,
    /// Tools the model is allowed to request.
    pub tools: Vec<ToolSpec>,
}

/// One ordered part of a model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyPart {
    Text(String),
    ToolCall { name: String, args: Value },
}

/// Full reply for one generation call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub parts: Vec<ReplyPart>,
}

impl ModelReply {
    pub fn tool_calls(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.parts.iter().filter_map(|part| match part {
            ReplyPart::ToolCall { name, args } => Some((name.as_str(), args)),
            ReplyPart::Text(_) => None,
        })
    }
}

/// Abstraction over model-generation backends.
pub trait ModelClient {
    /// Run one generation call. A reply may interleave text and tool calls.
    fn generate(&self, request: &GenerateRequest) -> Result<ModelReply>;
}

/// Client for the Gemini `generateContent` REST API.
pub struct GeminiClient {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a client with the given key and model name.
    ///
    /// `timeout` bounds each HTTP request; a hung call fails the turn rather
    /// than blocking the process forever.
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

impl ModelClient for GeminiClient {
    #[instrument(skip_all, fields(model = %self.model, transcript_len = request.transcript.len()))]
    fn generate(&self, request: &GenerateRequest) -> Result<ModelReply> {
        if self.api_key.trim().is_empty() {
            bail!("no API key configured (set GEMINI_API_KEY)");
        }
        let url = format!(
            "{BASE_URL}/{model}:generateContent?key={key}",
            model = self.model,
            key = self.api_key
        );
        let body = build_request_body(request);

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .context("send generateContent request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "failed to read error body".to_string());
            warn!(status = status.as_u16(), "generateContent failed");
            bail!(
                "generateContent returned {}: {}",
                status,
                api_error_message(&body)
            );
        }

        let parsed: GenerateContentResponse =
            response.json().context("parse generateContent response")?;
        let reply = reply_from_response(parsed)?;
        debug!(parts = reply.parts.len(), "parsed model reply");
        Ok(reply)
    }
}

fn build_request_body(request: &GenerateRequest) -> GenerateContentRequest {
    let contents = request
        .transcript
        .iter()
        .map(|entry| match entry {
            TranscriptEntry::User { text } => Content::text("user", text),
            TranscriptEntry::Agent { text, .. } => Content::text("model", text),
            TranscriptEntry::ToolCall { name, args } => Content {
                role: "model".to_string(),
                parts: vec![Part {
                    function_call: Some(FunctionCall {
                        name: name.clone(),
                        args: args.clone(),
                    }),
                    ..Part::default()
                }],
            },
            TranscriptEntry::ToolResult { name, result } => Content {
                role: "user".to_string(),
                parts: vec![Part {
                    function_response: Some(FunctionResponse {
                        name: name.clone(),
                        response: serde_json::json!({ "result": result }),
                    }),
                    ..Part::default()
                }],
            },
        })
        .collect();

    let tools = if request.tools.is_empty() {
        Vec::new()
    } else {
        vec![ToolDeclarations {
            function_declarations: request.tools.clone(),
        }]
    };

    GenerateContentRequest {
        system_instruction: Some(Content::text("system", &request.instruction)),
        contents,
        tools,
    }
}

fn reply_from_response(response: GenerateContentResponse) -> Result<ModelReply> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("generateContent returned no candidates"))?;
    let parts = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default();

    let mut reply = ModelReply::default();
    for part in parts {
        if let Some(text) = part.text {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                reply.parts.push(ReplyPart::Text(trimmed.to_string()));
            }
        }
        if let Some(call) = part.function_call {
            reply.parts.push(ReplyPart::ToolCall {
                name: call.name,
                args: call.args,
            });
        }
    }
    Ok(reply)
}

/// Pull the human-readable message out of a Gemini error body, if present.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.get("error")
                .and_then(|err| err.get("message"))
                .and_then(|msg| msg.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDeclarations>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolDeclarations {
    function_declarations: Vec<ToolSpec>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part {
                text: Some(text.to_string()),
                ..Part::default()
            }],
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(
        default,
        rename = "functionCall",
        skip_serializing_if = "Option::is_none"
    )]
    function_call: Option<FunctionCall>,
    #[serde(
        default,
        rename = "functionResponse",
        skip_serializing_if = "Option::is_none"
    )]
    function_response: Option<FunctionResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}
