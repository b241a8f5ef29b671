//! Mock agent for testing purposes.

use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;

use super::{AgentError, ResearchAgent};
use crate::models::{AgentInputState, AgentOutput, OutputMessage, RunConfiguration};

/// A mock agent that returns a predefined response and records its inputs.
#[derive(Debug, Default)]
pub struct MockAgent {
    response: Mutex<Option<Result<AgentOutput, AgentError>>>,
    panic_message: Mutex<Option<String>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<(AgentInputState, RunConfiguration)>>,
}

impl MockAgent {
    /// Create a new mock agent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock agent that answers with one message and the given sources.
    pub fn answering(answer: &str, sources: Vec<Value>) -> Self {
        let agent = Self::new();
        agent.set_output(AgentOutput {
            messages: vec![OutputMessage::ai(answer)],
            sources_gathered: sources,
        });
        agent
    }

    /// Create a mock agent that fails with the given error.
    pub fn failing(error: AgentError) -> Self {
        let agent = Self::new();
        agent.set_error(error);
        agent
    }

    /// Set the final state to return.
    pub fn set_output(&self, output: AgentOutput) {
        *self.response.lock().unwrap() = Some(Ok(output));
    }

    /// Set the error to return.
    pub fn set_error(&self, error: AgentError) {
        *self.response.lock().unwrap() = Some(Err(error));
    }

    /// Panic inside `invoke` with the given message.
    pub fn set_panic(&self, message: &str) {
        *self.panic_message.lock().unwrap() = Some(message.to_string());
    }

    /// Sleep this long before responding.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Inputs received so far, oldest first.
    pub fn calls(&self) -> Vec<(AgentInputState, RunConfiguration)> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of times `invoke` was called.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ResearchAgent for MockAgent {
    fn name(&self) -> &str {
        "mock"
    }

    fn invoke(
        &self,
        input: AgentInputState,
        config: &RunConfiguration,
    ) -> Result<AgentOutput, AgentError> {
        self.calls.lock().unwrap().push((input, config.clone()));

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        let panic_message = self.panic_message.lock().unwrap().clone();
        if let Some(message) = panic_message {
            panic!("{}", message);
        }

        match &*self.response.lock().unwrap() {
            Some(response) => response.clone(),
            None => Ok(AgentOutput::default()),
        }
    }
}
