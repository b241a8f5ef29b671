use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gemini_deepsearch_mcp::agent::{LangGraphAgent, LangGraphProcess, ResearchAgent};
use gemini_deepsearch_mcp::config::{
    find_config_file, load_config, Config, LogFormat, LoggingConfig, ENV_PREFIX, LOCAL_CONFIG_FILE,
};
use gemini_deepsearch_mcp::mcp::{McpServer, ToolRegistry, WebApp, MCP_ROUTE};
use gemini_deepsearch_mcp::models::Effort;
use gemini_deepsearch_mcp::research::AgentInvoker;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Gemini DeepSearch MCP - Deep web research as an MCP tool
#[derive(Parser, Debug)]
#[command(name = "gemini-deepsearch-mcp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server exposing a LangGraph deep research agent as the deep_search tool", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show all environment variables
    #[arg(long, global = true)]
    env: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Search effort level
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum EffortArg {
    Low,
    Medium,
    High,
}

impl From<EffortArg> for Effort {
    fn from(effort: EffortArg) -> Self {
        match effort {
            EffortArg::Low => Effort::Low,
            EffortArg::Medium => Effort::Medium,
            EffortArg::High => Effort::High,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server (stdio by default)
    Serve {
        /// Serve over HTTP with the MCP endpoint mounted at /mcp-server/mcp
        #[arg(long)]
        http: bool,

        /// Host to bind to in HTTP mode (default: from config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to in HTTP mode (default: from config)
        #[arg(long, short)]
        port: Option<u16>,

        /// Start the LangGraph dev server as a child process before serving
        #[arg(long)]
        spawn_langgraph: bool,
    },

    /// Run one deep search and print the result as JSON
    #[command(alias = "s")]
    Search {
        /// Search query string
        query: String,

        /// Search effort
        #[arg(long, short, value_enum, default_value_t = EffortArg::Low)]
        effort: EffortArg,
    },

    /// Inspect or create configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// List effort levels and their settings
    Efforts,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,

    /// Write the default configuration to a file
    Init {
        /// Destination path
        #[arg(default_value = LOCAL_CONFIG_FILE)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

/// Print all available environment variables
fn print_env_vars() {
    println!("Gemini DeepSearch MCP - Environment Variables");
    println!();
    println!("Agent:");
    println!("  GEMINI_API_KEY              API key used by the research agent's Gemini client");
    println!();
    println!("Models:");
    println!("  QUERY_GENERATOR_MODEL       Model for search query generation");
    println!("  REFLECTION_MODEL            Model for reflection between research loops");
    println!("  ANSWER_MODEL                Model for the final answer");
    println!();
    println!("Configuration overrides ({}_<SECTION>__<KEY>):", ENV_PREFIX);
    println!("  {}_AGENT__BASE_URL                 LangGraph API base URL (default: http://127.0.0.1:2024)", ENV_PREFIX);
    println!("  {}_AGENT__ASSISTANT_ID             Graph to run (default: agent)", ENV_PREFIX);
    println!("  {}_AGENT__REQUEST_TIMEOUT_SECS     Per-request timeout for agent runs", ENV_PREFIX);
    println!("  {}_AGENT__SPAWN_SERVER             Start the LangGraph dev server (default: false)", ENV_PREFIX);
    println!("  {}_AGENT__SPAWN_COMMAND            Space-separated dev server command", ENV_PREFIX);
    println!("  {}_AGENT__STARTUP_DELAY_SECS       Wait after spawning the dev server (default: 3)", ENV_PREFIX);
    println!("  {}_INVOCATION__TIMEOUT_SECS        HTTP worker timeout per run (default: 600)", ENV_PREFIX);
    println!("  {}_INVOCATION__MAX_CONCURRENT_RUNS Concurrent HTTP agent runs (default: 8)", ENV_PREFIX);
    println!("  {}_HTTP__HOST                      HTTP bind host (default: 127.0.0.1)", ENV_PREFIX);
    println!("  {}_HTTP__PORT                      HTTP bind port (default: 8000)", ENV_PREFIX);
    println!("  {}_LOGGING__LEVEL                  Log level (default: info)", ENV_PREFIX);
    println!("  {}_LOGGING__FORMAT                 text or json (default: text)", ENV_PREFIX);
    println!();
    println!("Other Settings:");
    println!("  RUST_LOG                    Rust logging level (e.g., debug, info, warn, error)");
    println!();
    println!("Example:");
    println!("  export GEMINI_API_KEY=\"your-key-here\"");
    println!("  export {}_AGENT__BASE_URL=\"http://127.0.0.1:2024\"", ENV_PREFIX);
    std::process::exit(0);
}

/// Initialize tracing; logs always go to stderr, stdout carries MCP stdio traffic
fn init_tracing(verbose: u8, quiet: bool, logging: &LoggingConfig) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "gemini_deepsearch_mcp={level},tower_http={level},pmcp=warn"
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

fn build_agent(config: &Config) -> Result<Arc<dyn ResearchAgent>> {
    let agent = LangGraphAgent::new(&config.agent).context("Invalid agent configuration")?;
    tracing::debug!(runs_url = %agent.runs_url(), "Using LangGraph agent");
    Ok(Arc::new(agent))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Show environment variables and exit if requested
    if cli.env {
        print_env_vars();
    }

    // Load configuration from file if specified or found in default locations
    let config_path = cli.config.clone().or_else(find_config_file);
    let config = load_config(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("Failed to load config file {}", path.display()),
        None => "Failed to load configuration from environment".to_string(),
    })?;

    init_tracing(cli.verbose, cli.quiet, &config.logging);

    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }

    match cli.command {
        None => serve_stdio(&config, config.agent.spawn_server).await?,

        Some(Commands::Serve {
            http,
            host,
            port,
            spawn_langgraph,
        }) => {
            let spawn = spawn_langgraph || config.agent.spawn_server;
            if http {
                let mut bind = config.http.clone();
                if let Some(host) = host {
                    bind.host = host;
                }
                if let Some(port) = port {
                    bind.port = port;
                }
                serve_http(&config, &bind.addr(), spawn).await?;
            } else {
                serve_stdio(&config, spawn).await?;
            }
        }

        Some(Commands::Search { query, effort }) => {
            let invoker = AgentInvoker::worker(
                build_agent(&config)?,
                config.models.run_configuration(),
                &config.invocation,
            );
            let response = invoker.deep_search(&query, effort.into()).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => {
                print!("{}", config.to_toml()?);
            }
            ConfigCommands::Init { path, force } => {
                if path.exists() && !force {
                    anyhow::bail!(
                        "{} already exists (use --force to overwrite)",
                        path.display()
                    );
                }
                std::fs::write(&path, Config::default().to_toml()?)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                if !cli.quiet {
                    println!("Wrote default configuration to {}", path.display());
                }
            }
        },

        Some(Commands::Efforts) => {
            println!(
                "{:<8} {:>16} {:>14}  {}",
                "EFFORT", "INITIAL QUERIES", "RESEARCH LOOPS", "REASONING MODEL"
            );
            for effort in Effort::ALL {
                let settings = effort.settings();
                println!(
                    "{:<8} {:>16} {:>14}  {}",
                    effort,
                    settings.initial_search_query_count,
                    settings.max_research_loops,
                    settings.reasoning_model
                );
            }
        }
    }

    Ok(())
}

async fn start_langgraph(config: &Config, spawn: bool) -> Option<LangGraphProcess> {
    if !spawn {
        return None;
    }
    LangGraphProcess::start(&config.agent.spawn_command, config.agent.startup_delay()).await
}

async fn serve_stdio(config: &Config, spawn: bool) -> Result<()> {
    let mut langgraph = start_langgraph(config, spawn).await;

    let invoker = AgentInvoker::inline(build_agent(config)?, config.models.run_configuration());
    let server = McpServer::new(ToolRegistry::deep_search(invoker))?;

    eprintln!("Starting MCP stdio server...");
    tracing::info!("Running MCP server in stdio mode");

    let result = tokio::select! {
        result = server.run() => result.map_err(anyhow::Error::from),
        _ = shutdown_signal() => Ok(()),
    };

    if let Some(process) = langgraph.as_mut() {
        process.stop();
    }
    result
}

async fn serve_http(config: &Config, addr: &str, spawn: bool) -> Result<()> {
    let mut langgraph = start_langgraph(config, spawn).await;

    let invoker = AgentInvoker::worker(
        build_agent(config)?,
        config.models.run_configuration(),
        &config.invocation,
    );
    let server = McpServer::new(ToolRegistry::deep_search(invoker))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let app = WebApp::start(server).await?;

    tracing::info!("Running MCP server in HTTP mode on {}{}", addr, MCP_ROUTE);
    let result = app.serve(listener, shutdown_signal()).await;

    if let Some(process) = langgraph.as_mut() {
        process.stop();
    }
    result.map_err(anyhow::Error::from)
}
