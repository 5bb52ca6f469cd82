#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use catstore::{config::AppConfig, db, seed, AppState};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tower::ServiceExt;

pub const ADMIN: (&str, &str) = ("xiaohe", "Aa.123456");
pub const SALESMAN: (&str, &str) = ("xiaoshi", "Aa.123456");

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        host: "127.0.0.1".to_string(),
        port: 18_080,
        environment: "test".to_string(),
        log_level: "debug".to_string(),
        log_json: false,
        auto_migrate: true,
        seed_on_startup: true,
        session_secret: "test_session_secret_for_integration_runs_only".to_string(),
        session_ttl_secs: 3600,
        session_cookie_name: "catstore_session".to_string(),
        cookie_secure: false,
        cors_allowed_origins: None,
        db_max_connections: 1,
        db_min_connections: 1,
        db_connect_timeout_secs: 5,
        db_idle_timeout_secs: 600,
        db_acquire_timeout_secs: 5,
    }
}

/// Fresh in-memory database with every migration applied.
pub async fn migrated_db() -> DatabaseConnection {
    let pool = db::establish_connection("sqlite::memory:")
        .await
        .expect("in-memory database");
    db::run_migrations(&pool).await.expect("migrations apply");
    pool
}

/// The full router over an in-memory database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Migrated and seeded: two accounts, six breeds, five cats, ten commodities.
    pub async fn new() -> Self {
        let app = Self::empty().await;
        seed::ensure_business_data_seeded(&app.state.db)
            .await
            .expect("business seed");
        seed::ensure_identity_seeded(app.state.auth.identity())
            .await
            .expect("identity seed");
        app
    }

    /// Migrated but without any rows.
    pub async fn empty() -> Self {
        let db = Arc::new(migrated_db().await);
        let state = AppState::new(db, test_config());
        let router = catstore::build_router(state.clone(), catstore::logging::discard_logger());
        Self { router, state }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        session: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = session {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request builds");

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router answers")
    }

    /// Signs in with JSON credentials and returns the `Cookie` header value for the session.
    pub async fn login(&self, (user_name, password): (&str, &str)) -> String {
        let response = self
            .request(
                Method::POST,
                "/Account/Login",
                Some(serde_json::json!({ "user_name": user_name, "password": password })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "login as {user_name}");
        session_cookie(&response).expect("session cookie set")
    }
}

/// `name=value` of the session cookie set by a response, if any.
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("catstore_session="))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
