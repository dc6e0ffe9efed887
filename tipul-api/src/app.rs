/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use tipul_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config)?;
/// let app = tipul_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tipul_shared::auth::middleware::{jwt_auth_middleware, AuthError};
use tipul_shared::scheduling::LocalClock;
use tipul_shared::storage::UploadStore;
use tipul_worker::ai::{Analyzer, ClaudeAnalyzer, GeminiTranscriber, Transcriber};
use tipul_worker::mail::{Mailer, ResendMailer};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Largest accepted request body: base64 recordings and document uploads
pub const MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every
/// field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Upload files on disk
    pub storage: UploadStore,

    pub transcriber: Arc<dyn Transcriber>,
    pub analyzer: Arc<dyn Analyzer>,
    pub mailer: Arc<dyn Mailer>,

    /// Calendar of the practice's local time
    pub clock: LocalClock,
}

impl AppState {
    /// Creates state with the Gemini, Claude and Resend clients
    pub fn new(db: PgPool, config: Config) -> anyhow::Result<Self> {
        let transcriber = GeminiTranscriber::from_config(&config.integrations)?;
        let analyzer = ClaudeAnalyzer::from_config(&config.integrations)?;
        let mailer = ResendMailer::from_config(&config.integrations)?;

        Ok(Self::with_integrations(
            db,
            config,
            Arc::new(transcriber),
            Arc::new(analyzer),
            Arc::new(mailer),
        ))
    }

    /// Creates state with the given integrations, e.g. mocks in tests
    pub fn with_integrations(
        db: PgPool,
        config: Config,
        transcriber: Arc<dyn Transcriber>,
        analyzer: Arc<dyn Analyzer>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            db,
            storage: UploadStore::new(&config.uploads_dir),
            clock: config.clock(),
            config: Arc::new(config),
            transcriber,
            analyzer,
            mailer,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// └── /v1/
///     ├── /auth/{register,login,refresh}  # public
///     ├── /cron/{notifications,daily-summary,reminders}  # CRON_SECRET
///     └── everything else              # Bearer access token
///         ├── /user/profile, /user/notification-settings
///         ├── /clients, /sessions (+ /:id/note), /payments
///         ├── /recordings, /transcribe, /analyze, /analyze/summary
///         ├── /documents, /uploads/*path
///         ├── /tasks, /notifications
///         ├── /recurring-patterns (+ /apply)
///         ├── /email/send, /intake-templates
///         └── /dashboard, /reports
/// ```
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, compression, tracing, body
/// limit, then the per-group authentication layers.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let cron_routes = Router::new()
        .route("/notifications", get(routes::cron::notifications))
        .route("/daily-summary", get(routes::cron::daily_summary))
        .route("/reminders", get(routes::cron::reminders))
        .route_layer(from_fn_with_state(
            state.clone(),
            crate::middleware::cron::cron_auth_layer,
        ));

    let protected_routes = Router::new()
        .route(
            "/user/profile",
            get(routes::user::get_profile).put(routes::user::update_profile),
        )
        .route(
            "/user/notification-settings",
            get(routes::user::get_notification_settings)
                .put(routes::user::update_notification_settings),
        )
        .route(
            "/clients",
            get(routes::clients::list_clients).post(routes::clients::create_client),
        )
        .route(
            "/clients/:id",
            get(routes::clients::get_client)
                .put(routes::clients::update_client)
                .delete(routes::clients::delete_client),
        )
        .route(
            "/sessions",
            get(routes::sessions::list_sessions).post(routes::sessions::create_session),
        )
        .route(
            "/sessions/:id",
            get(routes::sessions::get_session)
                .put(routes::sessions::update_session)
                .delete(routes::sessions::delete_session),
        )
        .route(
            "/sessions/:id/note",
            post(routes::sessions::create_note).put(routes::sessions::update_note),
        )
        .route(
            "/payments",
            get(routes::payments::list_payments).post(routes::payments::create_payment),
        )
        .route(
            "/payments/:id",
            get(routes::payments::get_payment).put(routes::payments::update_payment),
        )
        .route(
            "/recordings",
            get(routes::recordings::list_recordings).post(routes::recordings::create_recording),
        )
        .route(
            "/recordings/:id",
            get(routes::recordings::get_recording).delete(routes::recordings::delete_recording),
        )
        .route("/transcribe", post(routes::ai::transcribe))
        .route("/analyze", post(routes::ai::analyze))
        .route("/analyze/summary", post(routes::ai::summarize))
        .route(
            "/documents",
            get(routes::documents::list_documents).post(routes::documents::upload_document),
        )
        .route(
            "/documents/:id",
            get(routes::documents::get_document)
                .put(routes::documents::update_document)
                .delete(routes::documents::delete_document),
        )
        .route("/uploads/*path", get(routes::uploads::serve_upload))
        .route("/tasks", get(routes::tasks::list_tasks))
        .route("/tasks/:id", put(routes::tasks::update_task))
        .route(
            "/notifications",
            get(routes::notifications::list_notifications)
                .put(routes::notifications::update_notifications),
        )
        .route(
            "/recurring-patterns",
            get(routes::recurring::list_patterns).post(routes::recurring::create_pattern),
        )
        .route("/recurring-patterns/apply", post(routes::recurring::apply_patterns))
        .route(
            "/recurring-patterns/:id",
            put(routes::recurring::update_pattern).delete(routes::recurring::delete_pattern),
        )
        .route("/email/send", post(routes::email::send_email))
        .route(
            "/intake-templates",
            get(routes::intake_templates::list_templates)
                .post(routes::intake_templates::create_template),
        )
        .route("/dashboard", get(routes::dashboard::dashboard))
        .route("/reports", get(routes::dashboard::reports))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_layer));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/cron", cron_routes)
        .merge(protected_routes);

    let cors = cors_layer(&state.config.api.cors_origins);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// JWT authentication layer
///
/// Validates the bearer access token and injects an `AuthContext` into
/// the request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    jwt_auth_middleware(state.config.jwt.secret.clone(), req, next).await
}
