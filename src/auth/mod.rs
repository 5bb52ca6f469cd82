/*!
 * # Authentication and Authorization Module
 *
 * Staff accounts sign in with a user name and password and receive a signed session token
 * (HS256 JWT) in an HttpOnly cookie. Route groups are gated with [`AuthRouterExt`]:
 *
 * - `with_auth` requires a valid session
 * - `with_role` additionally requires a role (`admin`, `salesman`)
 *
 * Signing out revokes the token id until the token would have expired anyway.
 */

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tower_cookies::{cookie::SameSite, Cookie, Cookies};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::validation::display::ADMIN_ROLE;

// Entity modules
pub mod role;
pub mod user;
pub mod user_role;

pub mod account;
pub mod identity;
pub mod password;
pub mod password_policy;
mod types;

pub use identity::{IdentityOutcome, IdentityStore};
pub use password_policy::PasswordPolicy;
pub use types::*;

// jsonwebtoken's default `exp` leeway; revoked ids must outlive it.
const VALIDATION_LEEWAY_SECS: i64 = 60;

/// Claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,              // User id
    pub name: String,             // User name
    pub nickname: Option<String>, // Display name
    pub roles: Vec<String>,
    pub jti: String, // Token id, the unit of revocation
    pub iat: i64,
    pub exp: i64,
}

/// Signed-in staff member, inserted into request extensions by [`session_middleware`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub user_name: String,
    pub nickname: Option<String>,
    pub roles: Vec<String>,
    #[serde(skip)]
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthUser {
    /// Check if the user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(AuthError::InvalidToken)?;
        Ok(Self {
            user_id,
            user_name: claims.name,
            nickname: claims.nickname,
            roles: claims.roles,
            token_id: claims.jti,
            expires_at,
        })
    }
}

/// Session settings
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub secret: String,
    pub session_ttl: Duration,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            secret: cfg.session_secret.clone(),
            session_ttl: cfg.session_ttl(),
            cookie_name: cfg.session_cookie_name.clone(),
            cookie_secure: cfg.cookie_secure,
        }
    }
}

/// Issues, validates and revokes session tokens
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    identity: IdentityStore,
    revoked_tokens: Arc<RwLock<Vec<RevokedToken>>>,
}

/// Deny-list entry, dropped once the token has expired
#[derive(Clone, Debug)]
struct RevokedToken {
    jti: String,
    expiry: DateTime<Utc>,
}

impl AuthService {
    pub fn new(config: AuthConfig, identity: IdentityStore) -> Self {
        Self {
            config,
            identity,
            revoked_tokens: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn identity(&self) -> &IdentityStore {
        &self.identity
    }

    /// Checks the credentials and issues a session token for the account.
    pub async fn login(&self, user_name: &str, password: &str) -> Result<(AuthUser, String), AuthError> {
        let user = match self.identity.check_password(user_name, password).await? {
            Some(user) => user,
            None => {
                warn!(user_name, "login rejected");
                return Err(AuthError::InvalidCredentials);
            }
        };
        let roles = self.identity.roles_for(&user).await?;
        let session = self.issue_token(&user, roles)?;
        info!(user_name, "signed in");
        Ok(session)
    }

    /// Signs a token for an account with the given roles.
    pub fn issue_token(
        &self,
        user: &user::Model,
        roles: Vec<String>,
    ) -> Result<(AuthUser, String), AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.session_ttl)
                .map_err(|_| AuthError::Internal("Invalid session duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            name: user.user_name.clone(),
            nickname: user.nickname.clone(),
            roles,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok((AuthUser::try_from(claims)?, token))
    }

    /// Validate a session token and extract the signed-in user
    pub async fn validate_token(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        if self.is_token_revoked(&claims.jti).await {
            return Err(AuthError::RevokedToken);
        }

        AuthUser::try_from(claims)
    }

    /// Revokes the session until its natural expiry.
    pub async fn revoke(&self, user: &AuthUser) {
        let mut revoked = self.revoked_tokens.write().await;
        revoked.push(RevokedToken {
            jti: user.token_id.clone(),
            expiry: user.expires_at + ChronoDuration::seconds(VALIDATION_LEEWAY_SECS),
        });
        Self::clean_revoked(&mut revoked);
        debug!(jti = %user.token_id, "session revoked");
    }

    async fn is_token_revoked(&self, token_id: &str) -> bool {
        let revoked = self.revoked_tokens.read().await;
        revoked.iter().any(|t| t.jti == token_id)
    }

    fn clean_revoked(revoked: &mut Vec<RevokedToken>) {
        let now = Utc::now();
        revoked.retain(|t| t.expiry > now);
    }

    /// Cookie carrying a freshly issued token.
    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.config.cookie_name.clone(), token);
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_secure(self.config.cookie_secure);
        cookie
    }

    /// Matches the session cookie's name and path so the jar can emit a removal for it.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.config.cookie_name.clone(), String::new());
        cookie.set_path("/");
        cookie
    }

    /// The user behind the request's session cookie, if any.
    pub async fn session_user(&self, cookies: &Cookies) -> Result<AuthUser, AuthError> {
        let cookie = cookies
            .get(&self.config.cookie_name)
            .ok_or(AuthError::MissingSession)?;
        self.validate_token(cookie.value()).await
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing session")]
    MissingSession,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Malformed credentials: {0}")]
    MalformedCredentials(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    RevokedToken,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AuthError {
    fn from(err: ServiceError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message): (StatusCode, &str, String) = match &self {
            Self::MissingSession => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING_SESSION",
                "Sign in required".to_string(),
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_CREDENTIALS",
                "Invalid user name or password".to_string(),
            ),
            Self::MalformedCredentials(msg) => (
                StatusCode::BAD_REQUEST,
                "AUTH_MALFORMED_CREDENTIALS",
                msg.clone(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid session".to_string(),
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Session has expired".to_string(),
            ),
            Self::RevokedToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REVOKED_TOKEN",
                "Session has been signed out".to_string(),
            ),
            Self::TokenCreation(msg) => {
                error!("session token creation failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "AUTH_TOKEN_CREATION_FAILED",
                    "Could not start a session".to_string(),
                )
            }
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::Internal(msg) => {
                error!("authentication failed internally: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "AUTH_INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

/// Role middleware to check if a user has the required role
pub async fn role_middleware(
    State(required_role): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingSession)?;

    if !user.has_role(&required_role) {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Validates the session cookie and exposes the user to handlers as `Extension<AuthUser>`.
pub async fn session_middleware(cookies: Cookies, mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            error!("session middleware installed without an AuthService extension");
            return AuthError::Internal("Authentication service not available".to_string())
                .into_response();
        }
    };

    match auth_service.session_user(&cookies).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_role(self, role: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(session_middleware))
    }

    fn with_role(self, role: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            role.to_string(),
            role_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    async fn service(secret: &str) -> AuthService {
        let db = crate::db::establish_connection("sqlite::memory:").await.unwrap();
        AuthService::new(
            AuthConfig {
                secret: secret.to_string(),
                session_ttl: Duration::from_secs(3600),
                cookie_name: "catstore_session".to_string(),
                cookie_secure: false,
            },
            IdentityStore::new(Arc::new(db)),
        )
    }

    fn account() -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            user_name: "xiaohe".to_string(),
            nickname: Some("小何".to_string()),
            phone_number: Some("13423232323".to_string()),
            phone_number_confirmed: true,
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn issued_tokens_validate_back_to_the_user() {
        let auth = service("a-test-secret-that-is-long-enough-for-hs256").await;
        let account = account();
        let (issued, token) = auth
            .issue_token(&account, vec![ADMIN_ROLE.to_string()])
            .unwrap();

        let user = auth.validate_token(&token).await.unwrap();
        assert_eq!(user.user_id, account.id);
        assert_eq!(user.token_id, issued.token_id);
        assert_eq!(user.nickname.as_deref(), Some("小何"));
        assert!(user.is_admin());
    }

    #[tokio::test]
    async fn revoked_tokens_are_refused() {
        let auth = service("a-test-secret-that-is-long-enough-for-hs256").await;
        let (user, token) = auth.issue_token(&account(), vec![]).unwrap();

        auth.revoke(&user).await;
        assert_matches!(auth.validate_token(&token).await, Err(AuthError::RevokedToken));
    }

    #[tokio::test]
    async fn tokens_from_another_secret_are_invalid() {
        let issuer = service("first-secret-first-secret-first-secret").await;
        let verifier = service("second-secret-second-secret-second-secret").await;
        let (_, token) = issuer.issue_token(&account(), vec![]).unwrap();

        assert_matches!(verifier.validate_token(&token).await, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn expired_tokens_are_reported_as_expired() {
        let secret = "a-test-secret-that-is-long-enough-for-hs256";
        let auth = service(secret).await;
        let past = Utc::now() - ChronoDuration::hours(2);
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            name: "xiaoshi".to_string(),
            nickname: None,
            roles: vec![],
            jti: Uuid::new_v4().to_string(),
            iat: past.timestamp(),
            exp: (past + ChronoDuration::minutes(5)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        assert_matches!(auth.validate_token(&token).await, Err(AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn session_cookie_is_http_only_and_lax() {
        let auth = service("a-test-secret-that-is-long-enough-for-hs256").await;
        let cookie = auth.session_cookie("token".to_string());
        assert_eq!(cookie.name(), "catstore_session");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }
}
