use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

mod api;
mod config;
mod error;
mod extraction;

use crate::config::load_static_config;
use crate::extraction::ClaimExtractor;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_logging();

    info!(
        "Starting claimsift service v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = load_static_config()?;

    info!(
        host = %config.server.host,
        port = config.server.port,
        document = %config.document.pdf_path.display(),
        "Configuration loaded"
    );

    if !config.document.pdf_path.exists() {
        tracing::warn!(
            path = %config.document.pdf_path.display(),
            "Configured claim document does not exist yet"
        );
    }

    let extractor = Arc::new(ClaimExtractor::new(&config));
    let app = api::router(extractor);

    // Start the server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("claimsift_service=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
