use std::sync::Arc;

use swapi_mcp_sse::{
    build_app, config::Config, http::handlers::SSE_PATH, logging, mcp::session::SessionRegistry,
    swapi_client::SwapiClient, AppState,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let lookup = Arc::new(SwapiClient::new(config.swapi_base_url.clone())?);
    let bind_socket = config.bind_socket()?;
    let state = AppState::new(config.api_key.clone(), lookup);
    let sessions = state.sessions.clone();
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        upstream = %config.swapi_base_url,
        api_key_required = config.api_key.is_some(),
        "server starting"
    );
    info!(
        sse_url = %format!("http://{bind_socket}{SSE_PATH}"),
        "connect to the SSE stream to open an MCP session; press Ctrl+C to stop"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(sessions))
        .await?;
    Ok(())
}

/// Resolves on Ctrl+C after closing every session so open SSE streams end
/// and graceful shutdown can finish.
async fn shutdown_signal(sessions: SessionRegistry) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }

    info!(active_sessions = sessions.len(), "shutdown requested");
    sessions.close_all();
}
