// src/llm/mod.rs
//! LLM oracle: a narrow request/response capability behind a trait, so the
//! pipeline can run against Claude or a deterministic stub.

pub mod prompts;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::OracleError;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// What the oracle is asked to produce; each task has its own JSON shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OracleTask {
    ScorePosting,
    TailorCv,
    CompanyResearch,
    CoverLetter,
    InterviewPrep,
}

#[derive(Debug, Clone)]
pub struct OracleRequest {
    pub task: OracleTask,
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
}

#[async_trait]
pub trait Oracle: Send + Sync {
    /// Returns the raw text of the answer. Exactly one upstream call per invocation.
    async fn complete(&self, req: &OracleRequest) -> Result<String, OracleError>;
    fn provider_name(&self) -> &'static str;
}

pub type DynOracle = Arc<dyn Oracle>;

/// Provider factory.
///
/// * `JOBHUNTER_ORACLE=stub` gives the deterministic stub.
/// * No API key gives a disabled oracle (every call fails, scoring fails closed).
/// * Otherwise Claude.
pub fn build_oracle(settings: &Settings) -> DynOracle {
    if std::env::var("JOBHUNTER_ORACLE")
        .map(|v| v.eq_ignore_ascii_case("stub"))
        .unwrap_or(false)
    {
        return Arc::new(StubOracle::neutral());
    }
    if settings.oracle.api_key.trim().is_empty() {
        tracing::warn!("ANTHROPIC_API_KEY not set; oracle disabled");
        return Arc::new(DisabledOracle);
    }
    Arc::new(ClaudeOracle::new(
        settings.oracle.api_key.clone(),
        settings.oracle.model.clone(),
        settings.oracle_timeout(),
    ))
}

// ------------------------------------------------------------
// Claude
// ------------------------------------------------------------

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Anthropic Messages API. One attempt per call: no retry, for cost control.
pub struct ClaudeOracle {
    http: reqwest::Client,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl ClaudeOracle {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            api_key,
            model,
            timeout,
        }
    }

    async fn call(&self, req: &OracleRequest) -> Result<String, OracleError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: req.max_tokens,
            system: &req.system,
            messages: vec![Message {
                role: "user",
                content: &req.prompt,
            }],
        };

        let resp = self
            .http
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout(self.timeout)
                } else {
                    OracleError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(OracleError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        if let Some(u) = &parsed.usage {
            tracing::debug!(
                task = ?req.task,
                input_tokens = u.input_tokens,
                output_tokens = u.output_tokens,
                "oracle call succeeded"
            );
        }
        parsed
            .content
            .into_iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or(OracleError::EmptyContent)
    }
}

#[async_trait]
impl Oracle for ClaudeOracle {
    async fn complete(&self, req: &OracleRequest) -> Result<String, OracleError> {
        match tokio::time::timeout(self.timeout, self.call(req)).await {
            Ok(res) => res,
            Err(_) => Err(OracleError::Timeout(self.timeout)),
        }
    }

    fn provider_name(&self) -> &'static str {
        "claude"
    }
}

// ------------------------------------------------------------
// Disabled + stub
// ------------------------------------------------------------

pub struct DisabledOracle;

#[async_trait]
impl Oracle for DisabledOracle {
    async fn complete(&self, _req: &OracleRequest) -> Result<String, OracleError> {
        Err(OracleError::Disabled("no API key configured".to_string()))
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

type Responder = dyn Fn(&OracleRequest) -> Result<String, OracleError> + Send + Sync;

/// Deterministic oracle for tests and dry runs. Records every request.
pub struct StubOracle {
    responder: Box<Responder>,
    calls: Mutex<Vec<OracleRequest>>,
}

impl StubOracle {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&OracleRequest) -> Result<String, OracleError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(f),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// One canned answer per task; unknown tasks get `EmptyContent`.
    pub fn fixed(answers: HashMap<OracleTask, String>) -> Self {
        Self::new(move |req| {
            answers
                .get(&req.task)
                .cloned()
                .ok_or(OracleError::EmptyContent)
        })
    }

    /// Valid, mid-range answers for every task.
    pub fn neutral() -> Self {
        let answers: HashMap<OracleTask, String> = [
            (
                OracleTask::ScorePosting,
                serde_json::json!({
                    "scores": {"location": 15, "role": 15, "industry": 9,
                               "seniority": 6, "skills": 9, "impact": 6},
                    "rationale": "Neutral stub assessment.",
                    "key_requirements": [],
                    "potential_concerns": []
                })
                .to_string(),
            ),
            (
                OracleTask::TailorCv,
                serde_json::json!({
                    "profile": "Stub profile.",
                    "experience": [],
                    "skills_to_highlight": [],
                    "keywords_incorporated": []
                })
                .to_string(),
            ),
            (
                OracleTask::CompanyResearch,
                serde_json::json!({"summary": "Stub company research."}).to_string(),
            ),
            (
                OracleTask::CoverLetter,
                serde_json::json!({"cover_letter": "Dear hiring team,\n\nStub letter."}).to_string(),
            ),
            (
                OracleTask::InterviewPrep,
                serde_json::json!({
                    "company_research": "Stub research.",
                    "likely_questions": ["Why us?"],
                    "talking_points": ["Impact"],
                    "questions_to_ask": ["Team size?"]
                })
                .to_string(),
            ),
        ]
        .into_iter()
        .collect();
        Self::fixed(answers)
    }

    pub fn calls(&self) -> Vec<OracleRequest> {
        self.calls.lock().expect("stub mutex poisoned").clone()
    }

    pub fn call_count(&self, task: OracleTask) -> usize {
        self.calls
            .lock()
            .expect("stub mutex poisoned")
            .iter()
            .filter(|r| r.task == task)
            .count()
    }
}

#[async_trait]
impl Oracle for StubOracle {
    async fn complete(&self, req: &OracleRequest) -> Result<String, OracleError> {
        self.calls
            .lock()
            .expect("stub mutex poisoned")
            .push(req.clone());
        (self.responder)(req)
    }

    fn provider_name(&self) -> &'static str {
        "stub"
    }
}

// ------------------------------------------------------------
// JSON extraction
// ------------------------------------------------------------

static RE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").unwrap());

/// Parse a JSON answer, tolerating a markdown code fence or prose around the object.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, String> {
    let trimmed = text.trim();
    let first_err = match serde_json::from_str::<T>(trimmed) {
        Ok(v) => return Ok(v),
        Err(e) => e.to_string(),
    };
    if let Some(c) = RE_FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        if let Ok(v) = serde_json::from_str::<T>(c.as_str().trim()) {
            return Ok(v);
        }
    }
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(v) = serde_json::from_str::<T>(&trimmed[start..=end]) {
                return Ok(v);
            }
        }
    }
    Err(first_err)
}
