pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;
use crate::error::ApiError;
use crate::services::google::GoogleCalendarClient;
use crate::services::llm::{LanguageModel, OpenAiCompatibleClient};
use crate::services::storage::{PhotoStore, StorageService};

/// Multipart bodies may carry up to ten full-size photos.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

const GOOGLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub storage: Arc<dyn PhotoStore>,
    pub llm: Arc<dyn LanguageModel>,
    pub google: Option<Arc<GoogleCalendarClient>>,
    pub frontend_url: Option<String>,
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url, config.database_max_connections).await?;

    tracing::info!("Running migrations...");
    db.run_migrations().await?;

    tracing::info!("Initializing S3 storage...");
    let storage = StorageService::new(&config.storage);

    let llm = OpenAiCompatibleClient::new(&config.llm)?;
    tracing::info!(model = llm.model(), "Language model client ready");

    let google = match config.google.clone() {
        Some(google) => Some(Arc::new(GoogleCalendarClient::new(
            google,
            config.calendar_timezone.clone(),
            GOOGLE_TIMEOUT,
        )?)),
        None => {
            tracing::warn!("Google OAuth not configured; calendar fetch is disabled");
            None
        }
    };

    let state = AppState {
        db: Arc::new(db),
        storage: Arc::new(storage),
        llm: Arc::new(llm),
        google,
        frontend_url: config.frontend_url.clone(),
    };

    let app = build_router(state);
    let addr = config.bind_addr();

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the full router. Shared by `run` and the integration tests.
pub fn build_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        // User routes
        .route(
            "/api/user",
            get(routes::user::get_profile).post(routes::user::update_profile),
        )
        .route(
            "/api/settings",
            get(routes::settings::get_settings).post(routes::settings::save_settings),
        )
        // Google OAuth routes
        .route("/api/auth/google/login", get(routes::google::login))
        .route("/api/auth/google/status", get(routes::google::status))
        .route("/api/auth/google", delete(routes::google::disconnect))
        // Diary routes
        .route("/api/diary/save", post(routes::diary::save))
        .route("/api/diary/generate", post(routes::diary::generate))
        .route("/api/diary/thumb", post(routes::diary::thumb))
        .route("/api/diary/history", get(routes::diary::history))
        .route("/api/diary/draft", get(routes::diary::draft))
        .route(
            "/api/diary/{id}",
            get(routes::diary::get).delete(routes::diary::delete),
        )
        // Timeline routes
        .route("/api/timeline", get(routes::timeline::list))
        .route("/api/timeline/add", post(routes::timeline::add))
        .route("/api/timeline/spending", put(routes::timeline::update_spending))
        .route(
            "/api/timeline/{id}",
            get(routes::timeline::get).delete(routes::timeline::delete),
        )
        .route("/api/timeline/{id}/restore", post(routes::timeline::restore))
        // Calendar routes
        .route(
            "/api/calendar/events",
            post(routes::calendar::save)
                .get(routes::calendar::list)
                .delete(routes::calendar::delete),
        )
        .route("/api/calendar/fetch", get(routes::calendar::fetch))
        // Photo routes
        .route(
            "/api/photos/upload",
            post(routes::photos::upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/photos/analyze",
            post(routes::photos::analyze).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/photos/save", post(routes::photos::save))
        .route("/api/photos/{diary_id}", get(routes::photos::list))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            routes::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/google/callback", get(routes::google::callback))
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(CatchPanicLayer::custom(handle_panic)),
        )
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}
