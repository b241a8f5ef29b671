//! LangGraph API server client.
//!
//! Runs the research graph through the server's stateless `POST /runs/wait`
//! endpoint, which blocks until the run finishes and returns the final graph
//! state.

use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

use super::{AgentError, ResearchAgent};
use crate::config::AgentConfig;
use crate::models::{AgentInputState, AgentOutput, RunConfiguration};
use crate::utils::blocking_client;

/// Error kinds reported by a failed run that come from the Google provider client
pub const PROVIDER_ERROR_KINDS: &[&str] = &[
    "GoogleAPIError",
    "GoogleAPICallError",
    "ClientError",
    "ServerError",
    "APIError",
    "ResourceExhausted",
    "PermissionDenied",
    "InvalidArgument",
    "Unauthenticated",
    "ServiceUnavailable",
    "DeadlineExceeded",
];

/// Longest error body kept in an [`AgentError::Http`]
const MAX_ERROR_BODY: usize = 2048;

#[derive(Serialize)]
struct RunRequest<'a> {
    assistant_id: &'a str,
    input: &'a AgentInputState,
    config: Value,
}

/// Research agent backed by a LangGraph API server
#[derive(Debug)]
pub struct LangGraphAgent {
    runs_url: Url,
    assistant_id: String,
    timeout: Option<Duration>,
    // Built on first use: the blocking client cannot be created on the executor.
    client: OnceLock<reqwest::blocking::Client>,
}

impl LangGraphAgent {
    /// Create a client for the server described by `config`
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        let base = Url::parse(&base)
            .map_err(|e| AgentError::Config(format!("Invalid agent base_url '{}': {}", base, e)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(AgentError::Config(format!(
                "Unsupported agent base_url scheme '{}'",
                base.scheme()
            )));
        }

        let runs_url = base
            .join("runs/wait")
            .map_err(|e| AgentError::Config(e.to_string()))?;

        if config.assistant_id.trim().is_empty() {
            return Err(AgentError::Config("assistant_id must not be empty".to_string()));
        }

        Ok(Self {
            runs_url,
            assistant_id: config.assistant_id.clone(),
            timeout: config.request_timeout(),
            client: OnceLock::new(),
        })
    }

    /// Endpoint runs are submitted to
    pub fn runs_url(&self) -> &Url {
        &self.runs_url
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, AgentError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = blocking_client(self.timeout)?;
        Ok(self.client.get_or_init(|| client))
    }
}

impl ResearchAgent for LangGraphAgent {
    fn name(&self) -> &str {
        "langgraph"
    }

    fn invoke(
        &self,
        input: AgentInputState,
        config: &RunConfiguration,
    ) -> Result<AgentOutput, AgentError> {
        let body = RunRequest {
            assistant_id: &self.assistant_id,
            input: &input,
            config: config.to_runnable_config(),
        };

        tracing::debug!(
            url = %self.runs_url,
            assistant_id = %self.assistant_id,
            "Submitting run to LangGraph server"
        );

        let response = self.client()?.post(self.runs_url.clone()).json(&body).send()?;
        let status = response.status();
        let text = response.text()?;

        if !status.is_success() {
            return Err(AgentError::Http {
                status: status.as_u16(),
                body: truncate(&text, MAX_ERROR_BODY),
            });
        }

        parse_run_output(&text)
    }
}

/// Decode a `/runs/wait` body into the final state or the run's error
fn parse_run_output(body: &str) -> Result<AgentOutput, AgentError> {
    let value: Value = serde_json::from_str(body)?;

    if let Some(error) = value.get("__error__") {
        return Err(classify_run_error(error));
    }

    if !value.is_object() {
        return Err(AgentError::Parse(format!(
            "expected final state object, got {}",
            truncate(&value.to_string(), 200)
        )));
    }

    Ok(serde_json::from_value(value)?)
}

fn classify_run_error(error: &Value) -> AgentError {
    let kind = error
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("Error")
        .to_string();
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());

    if PROVIDER_ERROR_KINDS.contains(&kind.as_str()) {
        AgentError::Provider { kind, message }
    } else {
        AgentError::Run { kind, message }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
