//! Quillpress - a markdown blogging server with OAuth sign-in

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quillpress::{
    api::{self, middleware::CookieSettings, AppState},
    cache::create_cache,
    config::Config,
    db::{
        self,
        repositories::{
            SqlxCategoryRepository, SqlxCommentRepository, SqlxPostRepository,
            SqlxSessionRepository, SqlxUserRepository,
        },
    },
    services::{CommentService, GoogleIdentityProvider, PostService, SessionService},
};

/// How often the expired-session sweeper runs
const SESSION_SWEEP_INTERVAL_SECS: u64 = 3600;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quillpress=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Quillpress blog server...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Initialize cache
    let cache = create_cache(&config.cache);

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let post_repo = SqlxPostRepository::boxed(pool.clone());
    let comment_repo = SqlxCommentRepository::boxed(pool.clone());
    let category_repo = SqlxCategoryRepository::boxed(pool.clone());

    // Initialize services
    let session_service = Arc::new(SessionService::new(
        session_repo.clone(),
        user_repo.clone(),
        config.session.lifetime_days,
    ));
    let post_service = Arc::new(PostService::new(post_repo.clone(), cache));
    let comment_service = Arc::new(CommentService::new(comment_repo, post_repo));

    // Identity provider
    let identity_provider = Arc::new(GoogleIdentityProvider::new(
        &config.oauth,
        &config.server.public_url,
    )?);
    tracing::info!("Identity provider configured");

    // Build application state
    let state = AppState {
        session_service,
        post_service,
        comment_service,
        category_repo,
        user_repo,
        identity_provider,
        cookies: CookieSettings {
            secure: config.session.cookie_secure,
            session_max_age_secs: config.session.lifetime_days * 24 * 60 * 60,
        },
    };

    // Sweep expired sessions in the background; an abandoned session is
    // observed as absent on its next resolve either way, the sweeper just
    // keeps the table from growing without bound.
    {
        let sessions = session_repo.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(
                SESSION_SWEEP_INTERVAL_SECS,
            ));
            loop {
                interval.tick().await;
                match sessions.delete_expired().await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!("Swept {} expired session(s)", n),
                    Err(e) => tracing::warn!("Session sweep failed: {:#}", e),
                }
            }
        });
    }

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
