use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use bridger::app::{build_router, AppState};
use bridger::auth::TokenService;
use bridger::config::AppConfig;
use bridger::error;
use bridger::observability::{self, ObservabilityConfig, SecurityEvent};
use bridger::store::{ChatRoomStore, MemoryStore, UserStore};
use bridger::{security_event, SecureRouter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init(ObservabilityConfig::from_env())?;

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };
    error::init(config.errors.clone());

    let (users, rooms) = open_stores(&config).await?;
    let tokens = TokenService::new(&config.signing_secret, config.token_ttl);
    let state = AppState::new(tokens, config.password_hasher.clone(), users, rooms)
        .context("failed to initialize authenticator")?;

    let app = build_router(state).with_security(config.security.clone());

    let addr = SocketAddr::new(config.bind_addr, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    security_event!(
        SecurityEvent::SystemStartup,
        address = %addr,
        environment = %config.environment,
        token_ttl_secs = config.token_ttl.as_secs(),
        "Server listening"
    );

    // peer addresses feed the per-IP rate limiter and the audit log
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    security_event!(SecurityEvent::SystemShutdown, "Server stopped");
    Ok(())
}

#[cfg(feature = "postgres")]
async fn open_stores(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn UserStore>, Arc<dyn ChatRoomStore>)> {
    use bridger::database::{create_pool, DatabaseConfig};
    use bridger::store::PgStore;

    let Some(url) = &config.database_url else {
        info!("DATABASE_URL not set, using in-memory stores");
        return Ok(memory_stores());
    };

    let db_config = DatabaseConfig::from_env_with_url(url.clone());
    let pool = create_pool(&db_config)
        .await
        .context("failed to connect to PostgreSQL")?;

    security_event!(
        SecurityEvent::DatabaseConnected,
        ssl_mode = ?db_config.ssl_mode,
        "Database connected"
    );

    let store = PgStore::new(pool);
    Ok((Arc::new(store.clone()), Arc::new(store)))
}

#[cfg(not(feature = "postgres"))]
async fn open_stores(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn UserStore>, Arc<dyn ChatRoomStore>)> {
    if config.database_url.is_some() {
        warn!("DATABASE_URL is set but this build lacks the `postgres` feature; using in-memory stores");
    } else {
        info!("Using in-memory stores");
    }
    Ok(memory_stores())
}

fn memory_stores() -> (Arc<dyn UserStore>, Arc<dyn ChatRoomStore>) {
    let store = MemoryStore::new();
    (Arc::new(store.clone()), Arc::new(store))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
