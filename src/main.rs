use clap::Parser;
use loan_ledger::config::Config;
use loan_ledger::domain::ports::BalanceCacheRef;
use loan_ledger::infrastructure::in_memory::InMemoryBalanceCache;
use loan_ledger::interfaces::http::{self, AppState};
use miette::{IntoDiagnostic, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loan_ledger=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::parse();

    // Store and cache are opened here and handed to every component.
    let store = config.open_store().into_diagnostic()?;
    let cache: BalanceCacheRef = Arc::new(InMemoryBalanceCache::new());
    let app = http::router(AppState::new(store, cache, config.cache_ttl()));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .into_diagnostic()?;
    info!("loan ledger listening on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()?;

    info!("loan ledger stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
