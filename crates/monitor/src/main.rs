use std::future::IntoFuture;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use sentinel_api::routes::create_router;
use sentinel_api::state::AppState;
use sentinel_common::config::AppConfig;
use sentinel_engine::book::CollateralBook;
use sentinel_monitor::assets::load_assets;
use sentinel_monitor::poller::RefreshPoller;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("sentinel_monitor=info,sentinel_engine=info,sentinel_api=info,tower_http=info")
        }))
        .json()
        .init();

    tracing::info!("Peg Sentinel starting...");

    // Load configuration
    let config = AppConfig::from_env()?;
    let rpc_timeout = Duration::from_millis(config.rpc_timeout_ms);

    // Register monitored collateral
    let mut book = CollateralBook::new();
    let mut sources = Vec::new();
    for spec in load_assets(&config.assets_path)? {
        let (collateral, source) = spec.into_parts(rpc_timeout)?;
        book.register(collateral)?;
        sources.push(source);
    }
    let book = book.into_shared();

    let mut poller = RefreshPoller::new(
        config.rpc_url.clone(),
        config.poll_interval_ms,
        sources,
        book.clone(),
    );

    // Build router
    let app = create_router(AppState::new(book))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.api_bind_addr).await?;
    tracing::info!(addr = %config.api_bind_addr, "API server listening");

    // Run with graceful shutdown on Ctrl+C
    tokio::select! {
        result = poller.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Refresh poller exited with error");
                return Err(e);
            }
        }
        result = axum::serve(listener, app).into_future() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "API server exited with error");
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping gracefully...");
        }
    }

    tracing::info!("Peg Sentinel stopped.");
    Ok(())
}
