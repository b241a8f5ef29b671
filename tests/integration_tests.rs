//! Integration tests for Gemini DeepSearch MCP
//!
//! These tests drive the `deep_search` tool through the same registry the
//! servers are built from, with a mock agent standing in for the LangGraph
//! graph, and exercise the HTTP mount end to end.

use gemini_deepsearch_mcp::agent::{AgentError, MockAgent};
use gemini_deepsearch_mcp::config::{InvocationConfig, ModelConfig};
use gemini_deepsearch_mcp::mcp::{
    McpServer, ToolError, ToolRegistry, WebApp, DEEP_SEARCH_TOOL, MCP_ROUTE,
};
use gemini_deepsearch_mcp::models::{
    AgentOutput, Effort, OutputMessage, RunConfiguration, ToolResponse, UNEXPECTED_ERROR_ANSWER,
};
use gemini_deepsearch_mcp::research::AgentInvoker;
use gemini_deepsearch_mcp::utils::HttpClient;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

fn run_config() -> RunConfiguration {
    ModelConfig::default().run_configuration()
}

fn inline_registry(agent: Arc<MockAgent>) -> ToolRegistry {
    ToolRegistry::deep_search(AgentInvoker::inline(agent, run_config()))
}

fn worker_registry(agent: Arc<MockAgent>) -> ToolRegistry {
    ToolRegistry::deep_search(AgentInvoker::worker(
        agent,
        run_config(),
        &InvocationConfig::default(),
    ))
}

async fn call(registry: &ToolRegistry, args: Value) -> ToolResponse {
    let value = registry
        .execute(DEEP_SEARCH_TOOL, args)
        .await
        .expect("deep_search should not fail for valid arguments");
    serde_json::from_value(value).expect("result should be a ToolResponse")
}

#[test]
fn test_server_creation() {
    let agent = Arc::new(MockAgent::new());
    let server = McpServer::new(inline_registry(agent));
    assert!(server.is_ok());
    assert_eq!(server.unwrap().tool_names(), [DEEP_SEARCH_TOOL.to_string()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scenario_answer_and_sources() {
    let agent = Arc::new(MockAgent::answering("AI is ...", vec![json!("s1")]));
    let registry = inline_registry(Arc::clone(&agent));

    let value = registry
        .execute(
            DEEP_SEARCH_TOOL,
            json!({"query": "What is AI?", "effort": "low"}),
        )
        .await
        .unwrap();
    assert_eq!(value, json!({"answer": "AI is ...", "sources": ["s1"]}));

    let calls = agent.calls();
    assert_eq!(calls.len(), 1);
    let (input, config) = &calls[0];
    assert_eq!(input.query(), "What is AI?");
    assert_eq!(input.initial_search_query_count, 1);
    assert_eq!(input.max_research_loops, 1);
    assert_eq!(input.reasoning_model, Effort::Low.settings().reasoning_model);
    assert_eq!(config, &run_config());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scenario_effort_defaults_to_low() {
    let agent = Arc::new(MockAgent::answering("ok", vec![]));
    let registry = inline_registry(Arc::clone(&agent));

    call(&registry, json!({"query": "X"})).await;

    let calls = agent.calls();
    let low = Effort::Low.settings();
    assert_eq!(calls[0].0.initial_search_query_count, low.initial_search_query_count);
    assert_eq!(calls[0].0.max_research_loops, low.max_research_loops);
    assert_eq!(calls[0].0.reasoning_model, low.reasoning_model);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scenario_provider_error() {
    let agent = Arc::new(MockAgent::failing(AgentError::provider(
        "ResourceExhausted",
        "quota exceeded",
    )));
    let registry = inline_registry(agent);

    let response = call(&registry, json!({"query": "X", "effort": "medium"})).await;
    assert!(response.answer.contains("quota exceeded"));
    assert!(response.answer.starts_with("A Google API error occurred:"));
    assert!(response.sources.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unexpected_error_gives_generic_answer() {
    let agent = Arc::new(MockAgent::failing(AgentError::Network(
        "connection reset".to_string(),
    )));
    let response = call(&inline_registry(agent), json!({"query": "X"})).await;
    assert_eq!(response, ToolResponse::failure(UNEXPECTED_ERROR_ANSWER));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_agent_panic_is_contained() {
    let agent = Arc::new(MockAgent::new());
    agent.set_panic("graph exploded");
    let response = call(&inline_registry(agent), json!({"query": "X"})).await;
    assert_eq!(response.answer, UNEXPECTED_ERROR_ANSWER);
    assert!(response.sources.is_empty());
}

#[tokio::test]
async fn test_worker_mode_runs_every_effort() {
    let agent = Arc::new(MockAgent::new());
    agent.set_output(AgentOutput {
        messages: vec![OutputMessage::ai("first"), OutputMessage::ai("final")],
        sources_gathered: vec![json!({"url": "https://example.com"})],
    });
    let registry = worker_registry(Arc::clone(&agent));

    for effort in Effort::ALL {
        let response = call(&registry, json!({"query": "X", "effort": effort.as_str()})).await;
        assert_eq!(response.answer, "final");
        assert_eq!(response.sources, vec![json!({"url": "https://example.com"})]);
    }

    let counts: Vec<u32> = agent
        .calls()
        .iter()
        .map(|(input, _)| input.initial_search_query_count)
        .collect();
    assert_eq!(counts, vec![1, 3, 5]);
}

#[tokio::test]
async fn test_worker_mode_error_mapping_matches_inline() {
    let agent = Arc::new(MockAgent::failing(AgentError::provider(
        "GoogleAPIError",
        "quota exceeded",
    )));
    let response = call(&worker_registry(agent), json!({"query": "X"})).await;
    assert_eq!(response, ToolResponse::provider_error("quota exceeded"));
}

#[tokio::test]
async fn test_invalid_arguments_never_reach_agent() {
    let agent = Arc::new(MockAgent::new());
    let registry = worker_registry(Arc::clone(&agent));

    for args in [
        json!({}),
        json!({"query": ""}),
        json!({"query": "X", "effort": "extreme"}),
        json!({"effort": "low"}),
    ] {
        let err = registry.execute(DEEP_SEARCH_TOOL, args).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }
    assert_eq!(agent.call_count(), 0);
}

#[tokio::test]
async fn test_whitespace_query_reaches_agent_verbatim() {
    let agent = Arc::new(MockAgent::answering("ok", vec![]));
    let registry = worker_registry(Arc::clone(&agent));

    let response = call(&registry, json!({"query": "   "})).await;
    assert_eq!(response.answer, "ok");

    let calls = agent.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0.query(), "   ");
}

async fn serve_router(router: axum::Router) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_http_mount_forwards_session_headers() {
    let mut upstream = mockito::Server::new_async().await;
    let mock = upstream
        .mock("POST", "/")
        .match_header("mcp-session-id", "session-1")
        .match_header("content-type", "application/json")
        .match_body(mockito::Matcher::PartialJson(json!({"method": "tools/list"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("mcp-session-id", "session-1")
        .with_body(r#"{"jsonrpc":"2.0","id":1,"result":{"tools":[]}}"#)
        .create_async()
        .await;

    let router = WebApp::router(
        format!("{}/", upstream.url()),
        HttpClient::new().unwrap(),
        &[DEEP_SEARCH_TOOL.to_string()],
    );
    let addr = serve_router(router).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}{}", addr, MCP_ROUTE))
        .header("content-type", "application/json")
        .header("mcp-session-id", "session-1")
        .body(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["mcp-session-id"], "session-1");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["result"]["tools"], json!([]));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_mount_passes_through_status_and_methods() {
    let mut upstream = mockito::Server::new_async().await;
    let mock = upstream
        .mock("DELETE", "/")
        .with_status(404)
        .create_async()
        .await;

    let router = WebApp::router(format!("{}/", upstream.url()), HttpClient::new().unwrap(), &[]);
    let addr = serve_router(router).await;

    let response = reqwest::Client::new()
        .delete(format!("http://{}{}", addr, MCP_ROUTE))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_mount_reports_unreachable_mcp_app() {
    let router = WebApp::router(
        "http://127.0.0.1:9/".to_string(),
        HttpClient::new().unwrap(),
        &[],
    );
    let addr = serve_router(router).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}{}", addr, MCP_ROUTE))
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["error"]["code"], -32603);
}

#[tokio::test]
async fn test_http_mount_only_serves_mount_path() {
    let router = WebApp::router(
        "http://127.0.0.1:9/".to_string(),
        HttpClient::new().unwrap(),
        &[],
    );
    let addr = serve_router(router).await;

    let response = reqwest::get(format!("http://{}/mcp", addr)).await.unwrap();
    assert_eq!(response.status(), 404);
}

/// POST one JSON-RPC message to the mounted endpoint
///
/// Returns the session id header (if any) and the raw body, which is either
/// plain JSON or an SSE stream depending on the server's choice.
async fn post_mcp(
    client: &reqwest::Client,
    url: &str,
    session: Option<&str>,
    message: Value,
) -> (u16, Option<String>, String) {
    let mut request = client
        .post(url)
        .header("content-type", "application/json")
        .header("accept", "application/json, text/event-stream")
        .body(message.to_string());
    if let Some(session) = session {
        request = request.header("mcp-session-id", session);
    }

    tokio::time::timeout(std::time::Duration::from_secs(30), async {
        let response = request.send().await.unwrap();
        let status = response.status().as_u16();
        let session = response
            .headers()
            .get("mcp-session-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        (status, session, response.text().await.unwrap())
    })
    .await
    .expect("MCP request should complete")
}

#[tokio::test]
async fn test_web_app_lifecycle() {
    let agent = Arc::new(MockAgent::failing(AgentError::provider(
        "ResourceExhausted",
        "quota exceeded",
    )));
    let server = McpServer::new(worker_registry(Arc::clone(&agent))).unwrap();

    let app = WebApp::start(server).await.unwrap();
    assert!(app.upstream_addr().ip().is_loopback());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let served = tokio::spawn(app.serve(listener, async {
        let _ = stop_rx.await;
    }));

    let health: Value = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health, json!({"status": "ok"}));

    let info: Value = reqwest::get(format!("http://{}/", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(info["mcp_endpoint"], MCP_ROUTE);
    assert_eq!(info["tools"], json!([DEEP_SEARCH_TOOL]));

    let client = reqwest::Client::new();
    let endpoint = format!("http://{}{}", addr, MCP_ROUTE);

    let (status, session, body) = post_mcp(
        &client,
        &endpoint,
        None,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "integration-test", "version": "0.0.0"}
            }
        }),
    )
    .await;
    assert_eq!(status, 200, "initialize failed: {}", body);
    assert!(body.contains("capabilities"));

    let (status, _, _) = post_mcp(
        &client,
        &endpoint,
        session.as_deref(),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
    )
    .await;
    assert!(status < 300, "initialized notification rejected: {}", status);

    let (status, _, body) = post_mcp(
        &client,
        &endpoint,
        session.as_deref(),
        json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": {
                "name": DEEP_SEARCH_TOOL,
                "arguments": {"query": "What is AI?", "effort": "medium"}
            }
        }),
    )
    .await;
    assert_eq!(status, 200, "tools/call failed: {}", body);
    assert!(
        body.contains("A Google API error occurred: quota exceeded"),
        "unexpected tool result: {}",
        body
    );
    assert!(body.contains("sources"));

    let calls = agent.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0.query(), "What is AI?");
    assert_eq!(calls[0].0.initial_search_query_count, 3);

    stop_tx.send(()).unwrap();
    let result = tokio::time::timeout(std::time::Duration::from_secs(10), served)
        .await
        .expect("web app should stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}
