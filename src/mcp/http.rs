//! Web application hosting the MCP endpoint under a sub-path.
//!
//! The pmcp streamable HTTP server owns its own listener and routes, so it is
//! started on a private loopback port when the web application starts and
//! every request to [`MCP_ROUTE`] is forwarded to it. Session headers and
//! streamed (SSE) bodies pass through untouched. When the web application
//! stops, the MCP application is stopped with it.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use super::server::{McpServer, SERVER_NAME};
use crate::utils::HttpClient;

/// Prefix the MCP application is mounted at
pub const MCP_MOUNT_PATH: &str = "/mcp-server";

/// Path of the MCP endpoint inside the mounted application
pub const MCP_ENDPOINT_PATH: &str = "/mcp";

/// Full path clients use for MCP requests
pub const MCP_ROUTE: &str = "/mcp-server/mcp";

/// Errors from the HTTP transport
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("MCP application error: {0}")]
    Mcp(#[from] pmcp::Error),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
struct MountState {
    upstream: String,
    client: HttpClient,
}

/// A web application with the MCP application mounted at [`MCP_ROUTE`]
#[derive(Debug)]
pub struct WebApp {
    router: Router,
    upstream: SocketAddr,
    mcp_task: JoinHandle<()>,
}

impl WebApp {
    /// Start the MCP application on a loopback port and mount it
    pub async fn start(server: McpServer) -> Result<Self, HttpError> {
        let (upstream, mcp_task) = server.run_http("127.0.0.1:0").await?;
        tracing::info!("MCP application started on {}", upstream);

        let router = Self::router(
            format!("http://{}/", upstream),
            HttpClient::new()?,
            server.tool_names(),
        );

        Ok(Self {
            router,
            upstream,
            mcp_task,
        })
    }

    /// Build the web application forwarding MCP traffic to `upstream`
    pub fn router(upstream: String, client: HttpClient, tools: &[String]) -> Router {
        let mount = Arc::new(MountState { upstream, client });
        let info = serde_json::json!({
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "mcp_endpoint": MCP_ROUTE,
            "tools": tools,
        });

        let mcp_app = Router::new()
            .route(MCP_ENDPOINT_PATH, any(forward_to_mcp))
            .with_state(mount);

        Router::new()
            .route("/", get(move || async move { Json(info) }))
            .route("/health", get(health))
            .nest(MCP_MOUNT_PATH, mcp_app)
            .layer(TraceLayer::new_for_http())
    }

    /// Address of the private MCP listener
    pub fn upstream_addr(&self) -> SocketAddr {
        self.upstream
    }

    /// Serve on `listener` until `shutdown` resolves, then stop the MCP application
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), HttpError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("Web application listening on http://{}{}", addr, MCP_ROUTE);
        }

        let result = axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await;

        tracing::info!("Web application stopped, shutting down MCP application");
        self.mcp_task.abort();
        let _ = self.mcp_task.await;

        result.map_err(HttpError::from)
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Headers that describe a single connection and must not be forwarded
fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    ) || name == header::HOST
        || name == header::CONTENT_LENGTH
}

fn forwardable(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !is_hop_by_hop(name) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

async fn forward_to_mcp(
    State(mount): State<Arc<MountState>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let upstream = mount
        .client
        .client()
        .request(method.clone(), &mount.upstream)
        .headers(forwardable(&headers))
        .body(body)
        .send()
        .await;

    let upstream = match upstream {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(%method, "MCP application unreachable: {}", e);
            return bad_gateway("MCP application unavailable");
        }
    };

    let status = upstream.status();
    let response_headers = forwardable(upstream.headers());

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    response
}

fn bad_gateway(message: &str) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(serde_json::json!({
            "jsonrpc": "2.0",
            "error": { "code": -32603, "message": message },
            "id": null
        })),
    )
        .into_response()
}
