//! Cat store point-of-sale backend
//!
//! Cats and their breeds, merchandise, sales and purchase orders, customer appointments and staff
//! accounts, served as a JSON API behind cookie sessions.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod logging;
pub mod middleware_helpers;
pub mod seed;
pub mod services;
pub mod tracing;
pub mod validation;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    Extension, Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer};

use crate::auth::{AuthConfig, AuthRouterExt, AuthService, IdentityStore};
use crate::validation::display::ADMIN_ROLE;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// Wires the services and the session issuer over one connection pool.
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let identity = IdentityStore::new(db.clone());
        let auth = Arc::new(AuthService::new(AuthConfig::from(&config), identity.clone()));
        let services = handlers::AppServices::new(db.clone(), identity);
        Self {
            db,
            config,
            services,
            auth,
        }
    }
}

/// JSON API; every route needs a session and `/users` additionally the admin role.
pub fn api_routes() -> Router<AppState> {
    let users = handlers::users::user_routes().with_role(ADMIN_ROLE);

    let catalog = Router::new()
        .nest("/breeds", handlers::breeds::breed_routes())
        .nest("/cats", handlers::cats::cat_routes())
        .nest("/cat-orders", handlers::cat_orders::cat_order_routes())
        .nest("/commodities", handlers::commodities::commodity_routes())
        .nest(
            "/commodity-orders",
            handlers::commodity_orders::commodity_order_routes(),
        )
        .nest(
            "/purchase-orders",
            handlers::purchase_orders::purchase_order_routes(),
        )
        .nest("/appointments", handlers::appointments::appointment_routes())
        .with_auth();

    Router::new().merge(catalog).nest("/users", users)
}

/// The whole application with its middleware stack.
pub fn build_router(state: AppState, access_logger: slog::Logger) -> Router {
    let cors = cors_layer(&state.config);
    let auth = state.auth.clone();

    Router::new()
        .nest("/Account", auth::account::routes())
        .nest("/api", api_routes())
        .nest("/health", handlers::health::health_routes())
        .with_state(state)
        // Session middleware reads the AuthService from request extensions
        .layer(Extension(auth))
        .layer(CookieManagerLayer::new())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(cors)
        .layer(axum::middleware::from_fn_with_state(
            logging::AccessLog::new(access_logger),
            logging::access_log_middleware,
        ))
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
}

/// Explicit origins get credentialed CORS. Without any, development is permissive and other
/// environments allow no cross-origin callers.
fn cors_layer(config: &config::AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([
                header::CONTENT_TYPE,
                HeaderName::from_static(middleware_helpers::REQUEST_ID_HEADER),
            ])
            .allow_credentials(true)
    } else if config.is_development() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    }
}
