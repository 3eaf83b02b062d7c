//! Association site server.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use amicale::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{
            SqlxAlbumRepository, SqlxContactRepository, SqlxNewsRepository, SqlxPhotoRepository,
            SqlxSessionRepository, SqlxUserRepository,
        },
    },
    services::{
        ContactService, DonationService, EmailService, GalleryService, MediaService, NewsService,
        UserService,
    },
    view::ViewEngine,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "amicale=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting the association site v{}...", env!("CARGO_PKG_VERSION"));

    // Load configuration; the path may be overridden on the command line
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yml".to_string());
    let config = Config::load_with_env(Path::new(&config_path))?;
    tracing::info!("Configuration loaded from {}", config_path);

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let album_repo = SqlxAlbumRepository::boxed(pool.clone());
    let photo_repo = SqlxPhotoRepository::boxed(pool.clone());
    let news_repo = SqlxNewsRepository::boxed(pool.clone());
    let contact_repo = SqlxContactRepository::boxed(pool.clone());

    // Initialize services
    let media = Arc::new(MediaService::new(
        config.uploads.clone(),
        config.media_host.clone(),
    ));
    let email = Arc::new(EmailService::new(config.email.clone()));
    let user_service = Arc::new(UserService::new(user_repo, session_repo));
    let gallery_service = Arc::new(GalleryService::new(album_repo, photo_repo, media.clone()));
    let news_service = Arc::new(NewsService::new(news_repo, media.clone()));
    let contact_service = Arc::new(ContactService::new(contact_repo, email));
    let donation_service = Arc::new(DonationService::new(
        config.donations.clone(),
        config.site.name.clone(),
        config.server.base_url.clone(),
    ));

    // Seed the initial admin account when configured
    if let Some(admin) = user_service.bootstrap_admin(&config.bootstrap).await? {
        tracing::info!(username = %admin.username, "Bootstrap admin created");
    }

    // Initialize the view engine
    let views = Arc::new(ViewEngine::new()?);
    tracing::info!("View engine initialized");

    // Build application state
    let state = AppState {
        config: Arc::new(config.clone()),
        views,
        user_service,
        gallery_service,
        news_service,
        contact_service,
        donation_service,
    };

    // Build router
    let app = api::build_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        "Server listening on http://{} ({})",
        addr,
        config.server.base_url
    );

    axum::serve(listener, app).await?;

    Ok(())
}
