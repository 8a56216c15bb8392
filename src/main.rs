//! ByTechs Accounts Server
//!
//! Serves the account API with every endpoint group enabled. The store
//! backend and mail transport are picked from the environment, so the same
//! binary runs against PostgreSQL and SMTP in production and fully in
//! memory for local development.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use dotenv::dotenv;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use axum::http::HeaderValue;
use axum::middleware::from_fn;
use bytechs_accounts::{
    api::{security_headers_middleware, AppState, RouterBuilder},
    config::{AppConfig, ServerConfig, StoreBackend},
    database::{run_migrations, DatabaseConfig},
    service::{EmailService, InterestService, JwtService},
    store::{AccountStore, MemoryStore, PgStore},
    DEFAULT_INTERESTS,
};

const CLEANUP_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    log::info!("Starting ByTechs accounts service v{}", bytechs_accounts::VERSION);

    let config = AppConfig::from_env().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    match config.store.backend {
        StoreBackend::Postgres => {
            let db_config = DatabaseConfig::from_store_config(&config.store)
                .context("DATABASE_URL is required for the postgres backend")?;
            let pool = db_config.create_pool().await?;

            log::info!("Running database migrations...");
            run_migrations(&pool).await?;

            serve(Arc::new(PgStore::new(pool)), config).await
        }
        StoreBackend::Memory => {
            log::warn!("Using the in-memory store; all data is lost on shutdown");
            serve(Arc::new(MemoryStore::new()), config).await
        }
    }
}

async fn serve<S>(store: Arc<S>, config: AppConfig) -> anyhow::Result<()>
where
    S: AccountStore + 'static,
{
    let seeded = InterestService::new(store.clone())
        .seed_defaults(DEFAULT_INTERESTS)
        .await?;
    if !seeded.is_empty() {
        log::info!("Seeded {} default interests", seeded.len());
    }

    if config.email.smtp_host.is_none() {
        log::warn!("SMTP_HOST is not set; outgoing mail is kept in memory only");
    }
    let email = EmailService::from_config(config.email.clone())?;
    let jwt = JwtService::with_lifetimes(
        store.clone(),
        config.jwt.access_secret.clone(),
        config.jwt.refresh_secret.clone(),
        config.jwt.lifetimes(),
    );

    let state = AppState::new(store, jwt, email, config.policy.clone());
    spawn_cleanup(state.clone());

    let app = RouterBuilder::with_all_routes().build(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&config.server))
            .layer(from_fn(security_headers_middleware))
            .into_inner(),
    );

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    log::info!("Listening on {}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if server.cors_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Removes expired sessions, reset codes, reset grants and verification
/// links in the background
fn spawn_cleanup(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            match state.jwt_service.cleanup_expired_sessions().await {
                Ok(0) => {}
                Ok(removed) => log::info!("Removed {} expired sessions", removed),
                Err(e) => log::warn!("Session cleanup failed: {}", e),
            }
            if let Err(e) = state.password_resets.purge_expired_codes().await {
                log::warn!("Reset code cleanup failed: {}", e);
            }
            if let Err(e) = state.password_resets.purge_expired_grants().await {
                log::warn!("Reset grant cleanup failed: {}", e);
            }
            if let Err(e) = state.accounts.purge_expired_verifications().await {
                log::warn!("Verification link cleanup failed: {}", e);
            }
        }
    });
}
