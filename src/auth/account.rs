//! `/Account` routes: sign-in, sign-out and the current session.

use std::sync::Arc;

use axum::{
    extract::{FromRequest, Query, Request},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_cookies::Cookies;
use tracing::{debug, info};

use super::{AuthError, AuthRouterExt, AuthService, AuthUser, LoginCredentials};

pub const LOGIN_PATH: &str = "/Account/Login";

pub fn routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let session = Router::new().route("/Me", get(me)).with_auth();

    Router::new()
        .route("/Login", get(login_prompt).post(login))
        .route("/Logout", post(logout))
        .merge(session)
}

#[derive(Debug, Deserialize)]
struct LoginPromptQuery {
    #[serde(default, alias = "ReturnUrl", alias = "returnUrl")]
    return_url: Option<String>,
}

async fn login_prompt(Query(query): Query<LoginPromptQuery>) -> Json<serde_json::Value> {
    Json(json!({
        "action": LOGIN_PATH,
        "method": "POST",
        "fields": ["user_name", "password", "return_url"],
        "return_url": local_return_url(query.return_url.as_deref()),
    }))
}

/// Accepts JSON or form credentials. Form posts are redirected like a browser sign-in.
async fn login(
    Extension(auth): Extension<Arc<AuthService>>,
    cookies: Cookies,
    request: Request,
) -> Result<Response, AuthError> {
    let is_form = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

    let credentials = if is_form {
        Form::<LoginCredentials>::from_request(request, &())
            .await
            .map_err(|e| AuthError::MalformedCredentials(e.body_text()))?
            .0
    } else {
        Json::<LoginCredentials>::from_request(request, &())
            .await
            .map_err(|e| AuthError::MalformedCredentials(e.body_text()))?
            .0
    };

    let (user, token) = auth
        .login(&credentials.user_name, &credentials.password)
        .await?;
    cookies.add(auth.session_cookie(token));

    if is_form {
        let target = local_return_url(credentials.return_url.as_deref());
        return Ok(Redirect::to(target).into_response());
    }
    Ok(Json(json!({ "user": user })).into_response())
}

/// Ends the session if there is one and always sends the browser back to the login page.
async fn logout(Extension(auth): Extension<Arc<AuthService>>, cookies: Cookies) -> Redirect {
    match auth.session_user(&cookies).await {
        Ok(user) => {
            auth.revoke(&user).await;
            info!(user_name = %user.user_name, "signed out");
        }
        Err(e) => debug!(error = %e, "logout without a valid session"),
    }
    cookies.remove(auth.removal_cookie());
    Redirect::to(LOGIN_PATH)
}

async fn me(Extension(user): Extension<AuthUser>) -> Json<AuthUser> {
    Json(user)
}

/// Only same-site absolute paths are followed after sign-in.
fn local_return_url(candidate: Option<&str>) -> &str {
    match candidate {
        Some(url) if url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\") => {
            url
        }
        _ => "/",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, "/")]
    #[case(Some("/api/cats"), "/api/cats")]
    #[case(Some("https://example.com/"), "/")]
    #[case(Some("//example.com"), "/")]
    #[case(Some("/\\example.com"), "/")]
    #[case(Some("api/cats"), "/")]
    fn return_urls_stay_on_site(#[case] candidate: Option<&str>, #[case] expected: &str) {
        assert_eq!(local_return_url(candidate), expected);
    }
}
