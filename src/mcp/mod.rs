//! MCP (Model Context Protocol) implementation.
//!
//! - [`tools`]: the `deep_search` tool and the registry servers are built from
//! - [`server`]: the pmcp server, run over stdio or streamable HTTP
//! - [`http`]: web application mounting the MCP endpoint at `/mcp-server/mcp`

pub mod http;
pub mod server;
mod tools;

pub use http::{HttpError, WebApp, MCP_ENDPOINT_PATH, MCP_MOUNT_PATH, MCP_ROUTE};
pub use server::{McpServer, SERVER_NAME};
pub use tools::{
    deep_search_tool, DeepSearchArgs, DeepSearchHandler, Tool, ToolError, ToolHandler,
    ToolRegistry, DEEP_SEARCH_TOOL,
};
