use std::net::SocketAddr;
use tracing::info;
use wfmetrics_core::Instrumentation;

use crate::app::create_router;

/// Serves the demo app until Ctrl-C, then flushes the metrics sink.
pub async fn setup_http_server(
    instrumentation: Instrumentation,
    bind_address: &str,
) -> anyhow::Result<()> {
    let app = create_router(instrumentation.clone())
        .into_make_service_with_connect_info::<SocketAddr>();

    println!("🚀 Server starting at {}", &bind_address);
    let listener = tokio::net::TcpListener::bind(bind_address).await?;

    info!("Starting HTTP server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server is down");

    instrumentation.shutdown().await;
    info!("Metrics flushed");

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C, shutting down gracefully"),
        Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
    }
}
