//! Running the research agent and normalizing its outcome.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::Semaphore;
use tokio::task::JoinError;

use super::prepare_input_state;
use crate::agent::{AgentError, ResearchAgent};
use crate::config::InvocationConfig;
use crate::models::{AgentInputState, AgentOutput, Effort, RunConfiguration, ToolResponse};

/// Bounded blocking-pool execution for agent runs
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    timeout: Duration,
}

impl WorkerPool {
    /// Create a pool running at most `max_concurrent` agent runs, each limited to `timeout`
    pub fn new(max_concurrent: usize, timeout: Duration) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            timeout,
        }
    }

    pub fn from_config(config: &InvocationConfig) -> Self {
        Self::new(config.max_concurrent_runs, config.timeout())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Runs currently holding a permit
    pub fn active(&self) -> usize {
        self.max_concurrent - self.permits.available_permits()
    }
}

/// Where the blocking agent call runs
#[derive(Debug, Clone)]
pub enum ExecutionMode {
    /// On the calling worker thread (stdio: one request at a time)
    ///
    /// On a current-thread runtime the run goes to the blocking pool instead.
    Inline,
    /// On the blocking pool, bounded and timed out (HTTP)
    Worker(WorkerPool),
}

/// Runs the research agent and maps every outcome to a [`ToolResponse`]
///
/// Never returns an error: provider errors, other failures, panics and
/// timeouts are logged and turned into a failure response with no sources.
#[derive(Debug, Clone)]
pub struct AgentInvoker {
    agent: Arc<dyn ResearchAgent>,
    run_config: Arc<RunConfiguration>,
    mode: ExecutionMode,
}

enum RunFailure {
    Agent(AgentError),
    Panicked(String),
    TimedOut(Duration),
}

impl AgentInvoker {
    pub fn new(
        agent: Arc<dyn ResearchAgent>,
        run_config: RunConfiguration,
        mode: ExecutionMode,
    ) -> Self {
        Self {
            agent,
            run_config: Arc::new(run_config),
            mode,
        }
    }

    /// Invoker for the stdio transport
    pub fn inline(agent: Arc<dyn ResearchAgent>, run_config: RunConfiguration) -> Self {
        Self::new(agent, run_config, ExecutionMode::Inline)
    }

    /// Invoker for the HTTP transport
    pub fn worker(
        agent: Arc<dyn ResearchAgent>,
        run_config: RunConfiguration,
        limits: &InvocationConfig,
    ) -> Self {
        Self::new(
            agent,
            run_config,
            ExecutionMode::Worker(WorkerPool::from_config(limits)),
        )
    }

    pub fn mode(&self) -> &ExecutionMode {
        &self.mode
    }

    pub fn run_config(&self) -> &RunConfiguration {
        &self.run_config
    }

    /// Resolve `effort`, build the input state, and run the agent
    pub async fn deep_search(&self, query: &str, effort: Effort) -> ToolResponse {
        let settings = effort.settings();
        tracing::info!(
            agent = self.agent.name(),
            effort = %effort,
            initial_search_query_count = settings.initial_search_query_count,
            max_research_loops = settings.max_research_loops,
            reasoning_model = settings.reasoning_model,
            "Starting deep search"
        );

        let input = prepare_input_state(query, &settings);
        self.invoke(input).await
    }

    /// Run the agent on a prepared input state
    pub async fn invoke(&self, input: AgentInputState) -> ToolResponse {
        let result = match &self.mode {
            ExecutionMode::Inline => self.run_inline(input).await,
            ExecutionMode::Worker(pool) => self.run_on_worker(pool, input).await,
        };

        match result {
            Ok(output) => {
                tracing::info!(
                    messages = output.messages.len(),
                    sources = output.sources_gathered.len(),
                    "Deep search finished"
                );
                ToolResponse::from(output)
            }
            Err(RunFailure::Agent(AgentError::Provider { kind, message })) => {
                tracing::error!(
                    agent = self.agent.name(),
                    kind = %kind,
                    "Google API error during deep search: {}",
                    message
                );
                ToolResponse::provider_error(&message)
            }
            Err(RunFailure::Agent(e)) => {
                tracing::error!(
                    agent = self.agent.name(),
                    error = ?e,
                    "Unexpected error during deep search: {}",
                    e
                );
                ToolResponse::unexpected_error()
            }
            Err(RunFailure::Panicked(message)) => {
                tracing::error!(
                    agent = self.agent.name(),
                    "Unexpected error during deep search: agent panicked: {}",
                    message
                );
                ToolResponse::unexpected_error()
            }
            Err(RunFailure::TimedOut(limit)) => {
                tracing::error!(
                    agent = self.agent.name(),
                    timeout_secs = limit.as_secs(),
                    "Deep search timed out; the agent run keeps its worker until it returns"
                );
                ToolResponse::timed_out(limit.as_secs())
            }
        }
    }

    async fn run_inline(&self, input: AgentInputState) -> Result<AgentOutput, RunFailure> {
        // block_in_place panics on a current-thread runtime; hand the run
        // to the blocking pool there instead.
        if Handle::current().runtime_flavor() == RuntimeFlavor::CurrentThread {
            let agent = Arc::clone(&self.agent);
            let config = Arc::clone(&self.run_config);
            return joined(tokio::task::spawn_blocking(move || agent.invoke(input, &config)).await);
        }

        let agent = &self.agent;
        let config = &self.run_config;

        tokio::task::block_in_place(|| {
            std::panic::catch_unwind(AssertUnwindSafe(|| agent.invoke(input, config)))
        })
        .map_err(|payload| RunFailure::Panicked(panic_message(payload.as_ref())))?
        .map_err(RunFailure::Agent)
    }

    async fn run_on_worker(
        &self,
        pool: &WorkerPool,
        input: AgentInputState,
    ) -> Result<AgentOutput, RunFailure> {
        let agent = Arc::clone(&self.agent);
        let config = Arc::clone(&self.run_config);
        let permits = Arc::clone(&pool.permits);

        let run = async move {
            let permit = permits
                .acquire_owned()
                .await
                .map_err(|e| RunFailure::Agent(AgentError::Other(e.to_string())))?;

            tracing::debug!("Dispatching agent run to worker thread");

            // The permit moves into the worker so it is held until the run
            // really ends, even if the caller stops waiting.
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                agent.invoke(input, &config)
            });

            joined(handle.await)
        };

        match tokio::time::timeout(pool.timeout, run).await {
            Ok(result) => result,
            Err(_) => Err(RunFailure::TimedOut(pool.timeout)),
        }
    }
}

fn joined(
    result: Result<Result<AgentOutput, AgentError>, JoinError>,
) -> Result<AgentOutput, RunFailure> {
    match result {
        Ok(result) => result.map_err(RunFailure::Agent),
        Err(e) if e.is_panic() => Err(RunFailure::Panicked(panic_message(e.into_panic().as_ref()))),
        Err(e) => Err(RunFailure::Agent(AgentError::Other(e.to_string()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
