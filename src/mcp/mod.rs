//! MCP (Model Context Protocol) server exposing Things to agents.

#[cfg(feature = "mcp")]
pub mod things_server;

#[cfg(feature = "mcp")]
pub use things_server::ThingsServer;
