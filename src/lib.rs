//! JackeMate - A citizen-reporting backend
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Reports / votes / comments endpoints                     │
//! │  - Auth endpoints                                           │
//! │  - Admin / stats / metrics endpoints                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Report lifecycle rules                                   │
//! │  - Vote threshold / moderation rules                        │
//! │  - Points ledger                                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx)                                            │
//! │  - R2 photo storage                                         │
//! │  - Transactional email API                                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers for reports, comments, votes, admin, stats
//! - `service`: Business logic layer
//! - `data`: Database layer
//! - `storage`: Cloudflare R2 photo storage
//! - `notify`: Fire-and-forget email notifications
//! - `auth`: Sessions and password auth
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod notify;
pub mod service;
pub mod storage;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like the database pool, photo storage,
/// and the mailer.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Photo storage (Cloudflare R2)
    pub storage: Arc<storage::MediaStorage>,

    /// Transactional email client
    pub mailer: Arc<notify::Mailer>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database
    /// 2. Connect to R2 storage
    /// 3. Initialize the mailer
    /// 4. Ensure the admin profile exists
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        use std::path::Path;

        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db_path = Path::new(&config.database.path);
        let db = data::Database::connect(db_path).await?;
        tracing::info!("Database connected");

        // 2. Connect to R2 storage
        let storage = storage::MediaStorage::new(&config.storage.media, &config.cloudflare);
        tracing::info!("Photo storage initialized");

        // 3. Initialize the mailer
        let mailer = notify::Mailer::new(config.email.clone());
        tracing::info!(enabled = mailer.is_enabled(), "Mailer initialized");

        // 4. Ensure the admin profile exists
        Self::ensure_admin_user(&db, &config).await?;

        // 5. Seed the domain gauges
        metrics::USERS_TOTAL.set(db.count_users().await?);
        metrics::REPORTS_TOTAL.set(db.count_visible_reports().await?);

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            storage: Arc::new(storage),
            mailer: Arc::new(mailer),
        })
    }

    /// Ensure the admin profile exists with the configured role
    ///
    /// Creates the admin account on first startup; on later startups
    /// only repairs the role flag if it was changed.
    async fn ensure_admin_user(
        db: &data::Database,
        config: &config::AppConfig,
    ) -> Result<(), error::AppError> {
        if let Some(account) = db.get_user_by_username(&config.admin.username).await? {
            if data::Role::parse(&account.role).is_err()
                || account.role != data::Role::Admin.as_str()
            {
                db.set_user_role(&account.id, data::Role::Admin).await?;
                tracing::info!(username = %account.username, "Admin role restored");
            } else {
                tracing::info!(username = %account.username, "Admin account exists");
            }
            return Ok(());
        }

        tracing::info!("Creating admin account...");

        let email = config
            .admin
            .email
            .clone()
            .unwrap_or_else(|| config.instance.contact_email.clone());

        let account = data::UserProfile {
            id: data::EntityId::new().0,
            username: config.admin.username.clone(),
            email,
            password_hash: auth::hash_password(&config.admin.password)?,
            role: data::Role::Admin.as_str().to_string(),
            points: 0,
            created_at: chrono::Utc::now(),
        };

        if !db.insert_user(&account).await? {
            return Err(error::AppError::Config(format!(
                "admin email {} is already registered to another account",
                account.email
            )));
        }

        tracing::info!(username = %account.username, "Admin account created");

        Ok(())
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/auth", auth::auth_router())
        .merge(api::reports_router())
        .merge(api::stats_router())
        .nest("/admin", api::admin_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
        .merge(api::metrics_router())
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
