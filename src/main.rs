//! Portfolio Content Backend
//!
//! Serves the portfolio site's content from an in-memory sync store backed by a
//! hosted REST database, a local SQLite file, or nothing at all.

mod api;
mod auth;
mod backend;
mod cache;
mod config;
mod errors;
mod models;
mod store;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::AdminAuth;
use backend::BlobStore;
use cache::LocalCache;
use config::Config;
use models::{Certificate, Experience, Footer, Profile, Project};
use store::{ChangeOrigin, ContentStore, StoreEvent, WritePolicy};

/// Largest accepted image upload.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ContentStore>,
    pub blobs: Arc<BlobStore>,
    pub cache: Arc<LocalCache>,
    pub auth: Arc<AdminAuth>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Portfolio Content Backend");
    tracing::info!("Cache path: {:?}", config.cache_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.admin.is_none() {
        tracing::warn!(
            "No admin credentials configured (PORTFOLIO_ADMIN_USERNAME/PASSWORD). Editing is disabled!"
        );
    }

    let backend = backend::connect(&config).await;
    let policy = WritePolicy {
        max_attempts: config.write_max_attempts,
        ..WritePolicy::default()
    };

    let store = ContentStore::new(backend.clone(), policy);
    tokio::spawn(log_store_events(store.subscribe_events()));
    store.load().await;

    let cache = Arc::new(LocalCache::open(&config.cache_path).await);
    let state = AppState {
        store: store.clone(),
        blobs: Arc::new(BlobStore::new(backend)),
        auth: Arc::new(AdminAuth::new(config.admin.clone(), cache.clone())),
        cache,
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Give queued writes a chance to reach the backend.
    if tokio::time::timeout(Duration::from_secs(10), store.flush())
        .await
        .is_err()
    {
        tracing::warn!("Shutting down with writes still pending");
    }
    store.close().await;

    Ok(())
}

/// Surface remote edits and failed saves in the log.
async fn log_store_events(mut events: broadcast::Receiver<StoreEvent>) {
    loop {
        match events.recv().await {
            Ok(StoreEvent::ContentChanged {
                kind,
                origin: ChangeOrigin::Remote,
            }) => tracing::info!("{} changed in another session", kind),
            Ok(StoreEvent::PersistFailed { kind, .. }) => {
                tracing::warn!("Latest {} changes are only held in memory", kind)
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::debug!("Store event log skipped {} events", missed)
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth = state.auth.clone();

    // Mutations, gated by the admin session
    let admin_routes = Router::new()
        .route("/profile", put(api::update_singleton::<Profile>))
        .route("/footer", put(api::update_singleton::<Footer>))
        .route("/projects", post(api::create_item::<Project>))
        .route(
            "/projects/{id}",
            put(api::update_item::<Project>).delete(api::delete_item::<Project>),
        )
        .route("/certificates", post(api::create_item::<Certificate>))
        .route(
            "/certificates/{id}",
            put(api::update_item::<Certificate>).delete(api::delete_item::<Certificate>),
        )
        .route("/experiences", post(api::create_item::<Experience>))
        .route(
            "/experiences/{id}",
            put(api::update_item::<Experience>).delete(api::delete_item::<Experience>),
        )
        .route("/uploads", post(api::upload_image))
        .route("/auth/logout", post(api::logout))
        .route("/sync/reload", post(api::reload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn(move |req, next| {
            auth::admin_auth_layer(auth.clone(), req, next)
        }));

    // Public reads
    let public_routes = Router::new()
        // Content
        .route("/content", get(api::get_content))
        .route("/content/{kind}", get(api::get_content_kind))
        .route("/profile", get(api::get_singleton::<Profile>))
        .route("/footer", get(api::get_singleton::<Footer>))
        // Collections
        .route("/projects", get(api::list_projects))
        .route("/projects/{id}", get(api::get_item::<Project>))
        .route("/certificates", get(api::list_items::<Certificate>))
        .route("/certificates/{id}", get(api::get_item::<Certificate>))
        .route("/experiences", get(api::list_items::<Experience>))
        .route("/experiences/{id}", get(api::get_item::<Experience>))
        // Blobs
        .route("/blobs/{id}", get(api::get_blob))
        .route("/blobs/local/{id}", get(api::get_local_blob))
        // Preferences
        .route("/preferences/theme", get(api::get_theme).put(api::set_theme))
        // Session
        .route("/auth/login", post(api::login))
        .route("/auth/session", get(api::get_session))
        // Sync
        .route("/sync/status", get(api::sync_status));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", public_routes.merge(admin_routes))
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
