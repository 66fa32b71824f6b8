//! Azora quota service binary.
//!
//! Loads configuration, wires the selected ledger backend into the
//! enforcer, and serves the HTTP API.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use azora_quota::adapters::http::{router, AppState};
use azora_quota::adapters::memory::InMemoryUsageLedger;
use azora_quota::adapters::postgres::PostgresUsageLedger;
use azora_quota::adapters::redis::RedisUsageLedger;
use azora_quota::config::{AppConfig, LedgerBackend};
use azora_quota::ports::UsageLedger;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.server.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let ledger = build_ledger(&config).await?;

    let app = router(AppState::new(ledger))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr = config.server.socket_addr();
    tracing::info!(%addr, backend = ?config.ledger.backend, "quota service listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_ledger(
    config: &AppConfig,
) -> Result<Arc<dyn UsageLedger>, Box<dyn std::error::Error>> {
    match config.ledger.backend {
        LedgerBackend::Memory => {
            tracing::warn!("using in-memory ledger; counters reset on restart");
            Ok(Arc::new(InMemoryUsageLedger::new()))
        }
        LedgerBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .min_connections(config.database.min_connections)
                .max_connections(config.database.max_connections)
                .acquire_timeout(config.database.acquire_timeout())
                .connect(&config.database.url)
                .await?;

            if config.database.run_migrations {
                sqlx::migrate!("./migrations").run(&pool).await?;
            }

            Ok(Arc::new(PostgresUsageLedger::new(pool)))
        }
        LedgerBackend::Redis => {
            let client = redis::Client::open(config.redis.url.as_str())?;
            let conn = tokio::time::timeout(
                config.redis.timeout(),
                client.get_multiplexed_tokio_connection(),
            )
            .await??;

            Ok(Arc::new(RedisUsageLedger::new(conn)))
        }
    }
}
