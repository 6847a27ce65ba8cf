use std::sync::Arc;

use axum::handler::Handler;
use axum::http::{HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::resolver::{JwtVerifier, StoreCredentials};
use crate::auth::PrincipalResolver;
use crate::config::AppConfig;
use crate::database::{MemoryStore, Store};
use crate::handlers;
use crate::middleware::permissions::{ADMIN, LOGIN};
use crate::middleware::{authentication, enforce};

/// Shared per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub resolver: Arc<PrincipalResolver>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Self {
        let resolver = PrincipalResolver::new(
            Arc::new(StoreCredentials::new(store.clone())),
            Arc::new(JwtVerifier::new(config.security.access_key.clone())),
        );
        Self {
            config: Arc::new(config),
            store,
            resolver: Arc::new(resolver),
        }
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(config, Arc::new(MemoryStore::new()))
    }
}

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(handlers::home::root))
        .route("/health", get(handlers::home::health))
        .merge(auth_routes())
        .merge(user_routes())
        .merge(category_routes())
        .merge(blog_routes())
        .merge(comment_routes())
        .layer(from_fn_with_state(state.clone(), authentication))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", get(auth::logout).post(auth::logout))
}

fn user_routes() -> Router<AppState> {
    use handlers::user;

    Router::new()
        .route(
            "/users",
            get(user::list.layer(from_fn_with_state(ADMIN, enforce))).post(user::create),
        )
        .route(
            "/users/:id",
            get(user::read)
                .put(user::update)
                .patch(user::update)
                .delete(user::delete)
                .route_layer(from_fn_with_state(LOGIN, enforce)),
        )
}

fn category_routes() -> Router<AppState> {
    use handlers::category;

    Router::new()
        .route(
            "/categories",
            get(category::list).post(category::create.layer(from_fn_with_state(ADMIN, enforce))),
        )
        .route(
            "/categories/:id",
            get(category::read)
                .put(category::update.layer(from_fn_with_state(ADMIN, enforce)))
                .patch(category::update.layer(from_fn_with_state(ADMIN, enforce)))
                .delete(category::delete.layer(from_fn_with_state(ADMIN, enforce))),
        )
}

fn blog_routes() -> Router<AppState> {
    use handlers::blog;

    Router::new()
        .route(
            "/blogs",
            get(blog::list).post(blog::create.layer(from_fn_with_state(LOGIN, enforce))),
        )
        .route("/blogs/category/:categoryId", get(blog::list_category_posts))
        .route(
            "/blogs/:id",
            get(blog::read)
                .put(blog::update.layer(from_fn_with_state(LOGIN, enforce)))
                .patch(blog::update.layer(from_fn_with_state(LOGIN, enforce)))
                .delete(blog::delete.layer(from_fn_with_state(LOGIN, enforce))),
        )
        .route(
            "/blogs/:id/getLike",
            get(blog::get_like).route_layer(from_fn_with_state(LOGIN, enforce)),
        )
        .route(
            "/blogs/:id/postLike",
            post(blog::post_like).route_layer(from_fn_with_state(LOGIN, enforce)),
        )
}

fn comment_routes() -> Router<AppState> {
    use handlers::comment;

    Router::new()
        .route(
            "/comments",
            get(comment::list).post(comment::create.layer(from_fn_with_state(LOGIN, enforce))),
        )
        .route(
            "/comments/:id",
            get(comment::read)
                .put(comment::update.layer(from_fn_with_state(LOGIN, enforce)))
                .patch(comment::update.layer(from_fn_with_state(LOGIN, enforce)))
                .delete(comment::delete.layer(from_fn_with_state(LOGIN, enforce))),
        )
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let security = &config.security;
    if !security.enable_cors {
        return CorsLayer::new();
    }
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers(Any);
    if security.cors_origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    base.allow_origin(AllowOrigin::list(origins))
}
