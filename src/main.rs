//! Gwalk - community events platform access gate

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gwalk::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{
            SqlxBanRepository, SqlxDailyActiveRepository, SqlxSessionRepository,
            SqlxUserRepository,
        },
    },
    services::{
        activity::ActivityService,
        auth::AuthService,
        ban::BanService,
        identity::HttpIdentityProvider,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gwalk=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Gwalk access gate...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let ban_repo = SqlxBanRepository::boxed(pool.clone());
    let daily_repo = SqlxDailyActiveRepository::boxed(pool.clone());

    // Initialize services
    let ban_service = Arc::new(BanService::new(ban_repo));
    let activity_service = Arc::new(ActivityService::new(daily_repo));
    let auth_service = Arc::new(AuthService::with_session_days(
        user_repo.clone(),
        session_repo,
        ban_service.clone(),
        activity_service.clone(),
        config.auth.session_days,
    ));
    let identity_provider = Arc::new(HttpIdentityProvider::new(config.auth.provider.clone()));

    // Periodic expired-session cleanup (runs every hour)
    {
        let auth = auth_service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(3600));
            loop {
                interval.tick().await;
                match auth.cleanup_expired_sessions().await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!(count = n, "Expired sessions removed"),
                    Err(e) => tracing::warn!(error = %e, "Expired-session cleanup failed"),
                }
            }
        });
    }

    // Build application state
    let state = AppState {
        pool: pool.clone(),
        auth_service,
        user_repo,
        ban_service,
        activity_service,
        identity_provider,
        guard: Arc::new(config.guard.clone()),
        secure_cookies: config.auth.secure_cookies,
    };

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
