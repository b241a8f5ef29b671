//! Agent graph state: what goes in and what comes back out.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::effort::EffortSettings;

/// Placeholder answer used when the agent returns no messages
pub const NO_ANSWER: &str = "No answer generated.";

/// A chat message in the agent's wire format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message role as the agent graph names it ("human", "ai", ...)
    #[serde(rename = "type")]
    pub kind: String,

    /// Message content
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            kind: "human".to_string(),
            content: content.into(),
        }
    }
}

/// Initial state handed to the research agent graph
///
/// Built once per request and moved into the agent. The accumulator
/// fields start empty; the graph fills them while it runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentInputState {
    pub messages: Vec<Message>,
    pub search_query: Vec<Value>,
    pub web_research_result: Vec<Value>,
    pub sources_gathered: Vec<Value>,
    pub initial_search_query_count: u32,
    pub max_research_loops: u32,
    pub reasoning_model: String,
}

impl AgentInputState {
    /// Build the input state for a single query
    pub fn new(query: impl Into<String>, settings: &EffortSettings) -> Self {
        Self {
            messages: vec![Message::human(query)],
            search_query: Vec::new(),
            web_research_result: Vec::new(),
            sources_gathered: Vec::new(),
            initial_search_query_count: settings.initial_search_query_count,
            max_research_loops: settings.max_research_loops,
            reasoning_model: settings.reasoning_model.to_string(),
        }
    }

    /// The user query carried by this state
    pub fn query(&self) -> &str {
        self.messages
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

/// Models the agent uses for each of its phases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfiguration {
    pub query_generator_model: String,
    pub reflection_model: String,
    pub answer_model: String,
}

impl RunConfiguration {
    /// Wrap as a LangGraph runnable config (`{"configurable": {...}}`)
    pub fn to_runnable_config(&self) -> Value {
        serde_json::json!({ "configurable": self })
    }
}

/// A message in the agent's final state
///
/// Only `content` is used; everything else the graph attaches
/// (ids, tool calls, metadata) is ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OutputMessage {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub content: Value,
}

impl OutputMessage {
    /// Create a plain-text AI message
    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            kind: "ai".to_string(),
            content: Value::String(content.into()),
        }
    }

    /// Flatten the message content to text
    ///
    /// Content is either a string or a list of parts; text parts are
    /// concatenated and bare string parts are taken as-is.
    pub fn text(&self) -> String {
        match &self.content {
            Value::String(s) => s.clone(),
            Value::Array(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    Value::String(s) => Some(s.as_str()),
                    Value::Object(obj) => obj.get("text").and_then(|t| t.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(""),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Final state returned by the research agent graph
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AgentOutput {
    #[serde(default)]
    pub messages: Vec<OutputMessage>,

    #[serde(default)]
    pub sources_gathered: Vec<Value>,
}

impl AgentOutput {
    /// Text of the last message, or the placeholder if there are none
    pub fn answer(&self) -> String {
        self.messages
            .last()
            .map(OutputMessage::text)
            .unwrap_or_else(|| NO_ANSWER.to_string())
    }
}
