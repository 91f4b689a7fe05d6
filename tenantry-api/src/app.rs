/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tenantry_api::{app::AppState, config::Config};
/// use tenantry_shared::notify::LogNotifier;
/// use tenantry_shared::store::postgres::PgStore;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(Arc::new(PgStore::new(pool)), Arc::new(LogNotifier), config);
/// let app = tenantry_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::session::require_session, routes};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tenantry_shared::auth::jwt::SessionKeys;
use tenantry_shared::notify::InviteNotifier;
use tenantry_shared::services::{
    AuthGateway, CompanyAuthority, InviteAuthority, MembershipAuthority, TenantResolver,
};
use tenantry_shared::store::Store;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor. Every field
/// is reference-counted, so clones are cheap.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,

    pub auth: AuthGateway,
    pub tenants: TenantResolver,
    pub companies: CompanyAuthority,
    pub members: MembershipAuthority,
    pub invites: InviteAuthority,
}

impl AppState {
    /// Wires every authority to the same store
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn InviteNotifier>, config: Config) -> Self {
        let keys = SessionKeys::new(config.jwt.secret.clone(), config.session_ttl());

        Self {
            auth: AuthGateway::new(store.clone(), keys),
            tenants: TenantResolver::new(store.clone()),
            companies: CompanyAuthority::new(store.clone()),
            members: MembershipAuthority::new(store.clone()),
            invites: InviteAuthority::new(store.clone(), notifier),
            config: Arc::new(config),
            store,
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health                                   # public
/// └── /v1/
///     ├── /auth/
///     │   ├── POST /signup                          # public
///     │   ├── POST /login                           # public
///     │   ├── POST /accept-invite                   # public
///     │   └── GET  /me
///     ├── /companies/
///     │   ├── POST, GET /
///     │   ├── GET, PATCH, DELETE /:id
///     │   ├── POST /:id/select
///     │   ├── GET /:id/members
///     │   ├── PATCH, DELETE /:id/members/:user_id
///     │   └── POST, GET /:id/invites
///     └── /invites/
///         ├── GET /my-pending
///         ├── DELETE /:id
///         ├── GET /token/:token                     # public
///         └── POST /token/:token/reject             # public
/// ```
///
/// Routes not marked public sit behind the session layer.
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/me", get(routes::auth::me))
        .route_layer(from_fn_with_state(state.clone(), require_session))
        .route("/signup", post(routes::auth::signup))
        .route("/login", post(routes::auth::login))
        .route("/accept-invite", post(routes::auth::accept_invite));

    let company_routes = Router::new()
        .route(
            "/",
            post(routes::companies::create_company).get(routes::companies::list_companies),
        )
        .route(
            "/:id",
            get(routes::companies::get_company)
                .patch(routes::companies::update_company)
                .delete(routes::companies::delete_company),
        )
        .route("/:id/select", post(routes::companies::select_company))
        .route("/:id/members", get(routes::members::list_members))
        .route(
            "/:id/members/:user_id",
            patch(routes::members::update_member_role).delete(routes::members::remove_member),
        )
        .route(
            "/:id/invites",
            post(routes::invites::create_invite).get(routes::invites::list_invites),
        )
        .route_layer(from_fn_with_state(state.clone(), require_session));

    let invite_routes = Router::new()
        .route("/my-pending", get(routes::invites::my_pending_invites))
        .route("/:id", delete(routes::invites::cancel_invite))
        .route_layer(from_fn_with_state(state.clone(), require_session))
        .route("/token/:token", get(routes::invites::get_invite_by_token))
        .route("/token/:token/reject", post(routes::invites::reject_invite));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/companies", company_routes)
        .nest("/invites", invite_routes);

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
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
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}
