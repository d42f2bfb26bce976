//! Storyfill API server entry point.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use storyfill_api::config::AppConfig;
use storyfill_api::error::AppError;
use storyfill_api::outbox::RenderOutbox;
use storyfill_api::routes;
use storyfill_api::state::AppState;
use storyfill_core::clock::SystemClock;
use storyfill_core::rng::{DeterministicRng, StdDeterministicRng};
use storyfill_game::application::command_handlers;
use storyfill_game::application::services::GameServices;
use storyfill_store::pg_session_repository::PgSessionRepository;

/// How often idle sessions are looked for.
const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    info!("Starting Storyfill API server");

    let config = AppConfig::from_env()?;

    // Create database connection pool and bring the schema up to date.
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    storyfill_store::run_migrations(&pool).await?;

    let rng: Arc<Mutex<dyn DeterministicRng + Send>> = match config.rng_seed {
        Some(seed) => {
            info!(seed, "using seeded RNG");
            Arc::new(Mutex::new(StdDeterministicRng::seeded(seed)))
        }
        None => Arc::new(Mutex::new(StdDeterministicRng::from_entropy())),
    };
    let outbox = Arc::new(RenderOutbox::new());
    let services = Arc::new(GameServices::new(
        Arc::new(PgSessionRepository::new(pool)),
        outbox.clone(),
        rng,
        Arc::new(SystemClock),
        config.game_settings(),
    ));

    command_handlers::resume_countdowns(&services).await?;
    tokio::spawn(sweep_stale_sessions(Arc::clone(&services)));

    // TODO: Replace CorsLayer::permissive() with the gateway's origin once it is deployed separately.
    let app = routes::build_router(AppState::new(services, outbox))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    info!(addr = %config.bind_addr, "listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically deletes sessions nobody touched for the configured age.
async fn sweep_stale_sessions(services: Arc<GameServices>) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        if let Err(e) = command_handlers::handle_sweep_stale_sessions(&services).await {
            warn!(error = %e, "stale session sweep failed");
        }
    }
}
