//! MCP server binary for Things.
//!
//! This binary runs an MCP server that exposes the Things bridge through
//! stdio transport.

use rmcp::ServiceExt;
use things_bridge::config::BridgeConfig;
use things_bridge::mcp::ThingsServer;
use things_bridge::{logging, paths, templates};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging first (writes to ~/.things-bridge/things-mcp.log)
    if let Some(path) = paths::log_path() {
        if let Err(e) = logging::init(&path) {
            eprintln!("Warning: MCP logging init failed: {e}");
        }
    }
    logging::install_panic_hook();

    let config = BridgeConfig::load()?;
    if config.token().is_none() {
        logging::log_warning("no authorization token configured; updates and deletes will fail");
    }
    if let Err(e) = templates::init_templates(None) {
        logging::log_warning(&format!("failed to load templates: {e}"));
    }

    let server = ThingsServer::new(config);
    logging::log_event("MCP server created, starting stdio transport");
    let service = server.serve(rmcp::transport::stdio()).await?;
    logging::log_event("MCP server running");
    service.waiting().await?;

    logging::log_shutdown(None);
    Ok(())
}
