/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_api::{app::AppState, config::Config};
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use taskboard_shared::repository::postgres::PgStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig {
///     url: config.database.url.clone(),
///     ..Default::default()
/// })
/// .await?;
/// let state = AppState::new(Arc::new(PgStore::new(pool)), config);
/// let app = taskboard_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{auth::require_auth, security::SecurityHeadersLayer},
    routes,
};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use taskboard_shared::{auth::tokens::TokenConfig, repository::Store};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend (PostgreSQL in production, in-memory in tests)
    pub store: Arc<dyn Store>,

    pub config: Arc<Config>,

    /// Secret and lifetimes derived from `config.jwt`
    pub tokens: Arc<TokenConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let tokens = Arc::new(config.token_config());
        Self {
            store,
            config: Arc::new(config),
            tokens,
        }
    }

    /// Whether cookies are marked `Secure`
    pub fn secure_cookies(&self) -> bool {
        self.config.api.production
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health
/// └── /api/
///     ├── /auth/                       (public)
///     │   ├── POST   /login
///     │   ├── POST   /refresh
///     │   ├── DELETE /logout
///     │   └── POST   /signup
///     ├── /project/                    (authenticated)
///     │   ├── POST   /
///     │   ├── GET    /all/
///     │   ├── GET|PATCH|DELETE /:id
///     │   └── GET|POST|DELETE  /:id/users
///     ├── /sections/:project_id/section
///     │   ├── POST|GET /
///     │   └── GET|PATCH|DELETE /:section_id
///     ├── /task/
///     │   ├── POST   /
///     │   ├── GET    /all/?project_id=
///     │   ├── GET|PATCH|DELETE /:id
///     │   ├── POST   /:id/start_counter
///     │   └── PUT    /:id/stop_counter
///     └── /user/users/me               GET|PATCH
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Authentication (protected routes only)
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Logout needs no valid access token: an expired one still ends the session
    let auth_routes = Router::new()
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/refresh", post(routes::auth::refresh))
        .route("/api/auth/logout", delete(routes::auth::logout))
        .route("/api/auth/signup", post(routes::auth::signup));

    // Full paths: the trailing slashes are part of the public contract
    let protected_routes = Router::new()
        .route("/api/project/", post(routes::project::create_project))
        .route("/api/project/all/", get(routes::project::list_projects))
        .route(
            "/api/project/:id",
            get(routes::project::get_project)
                .patch(routes::project::update_project)
                .delete(routes::project::delete_project),
        )
        .route(
            "/api/project/:id/users",
            get(routes::project::list_members)
                .post(routes::project::add_members)
                .delete(routes::project::remove_members),
        )
        .route(
            "/api/sections/:project_id/section",
            post(routes::section::create_section).get(routes::section::list_sections),
        )
        .route(
            "/api/sections/:project_id/section/:section_id",
            get(routes::section::get_section)
                .patch(routes::section::update_section)
                .delete(routes::section::delete_section),
        )
        .route("/api/task/", post(routes::task::create_task))
        .route("/api/task/all/", get(routes::task::list_tasks))
        .route(
            "/api/task/:id",
            get(routes::task::get_task)
                .patch(routes::task::update_task)
                .delete(routes::task::delete_task),
        )
        .route("/api/task/:id/start_counter", post(routes::task::start_counter))
        .route("/api/task/:id/stop_counter", put(routes::task::stop_counter))
        .route(
            "/api/user/users/me",
            get(routes::user::get_me).patch(routes::user::update_me),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(health_routes)
        .merge(auth_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
