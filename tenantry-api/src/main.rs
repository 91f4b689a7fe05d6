//! # Tenantry API Server
//!
//! Multi-tenant backend: accounts, companies, role-scoped memberships and
//! e-mail invites, served over a JSON API.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://... JWT_SECRET=... cargo run -p tenantry-api
//! ```

use std::sync::Arc;

use tenantry_api::{
    app::{build_router, AppState},
    config::Config,
};
use tenantry_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool, DatabaseConfig},
};
use tenantry_shared::notify::{
    resend::{ResendConfig, ResendNotifier},
    InviteNotifier, LogNotifier,
};
use tenantry_shared::store::postgres::PgStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    init_tracing(config.api.production);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        production = config.api.production,
        "Tenantry API Server starting"
    );

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&pool).await?;

    let notifier: Arc<dyn InviteNotifier> = match &config.email.resend_api_key {
        Some(api_key) => Arc::new(ResendNotifier::new(ResendConfig {
            api_key: api_key.clone(),
            from: config.email.from.clone(),
            frontend_url: config.email.frontend_url.clone(),
        })?),
        None => {
            tracing::warn!("RESEND_API_KEY not set, invite e-mails will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let addr = config.bind_address();
    let state = AppState::new(Arc::new(PgStore::new(pool.clone())), notifier, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

/// JSON logs in production, human-readable otherwise
fn init_tracing(production: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tenantry_api=debug,tenantry_shared=debug,tower_http=debug".into());

    let (json, pretty) = if production {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        _ = terminate => tracing::info!("Received terminate signal"),
    }

    tracing::info!("Shutting down gracefully");
}
