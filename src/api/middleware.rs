//! Session middleware and the login gate.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::routes;
use super::AppState;
use crate::models::User;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "sessionid";

/// The requesting user, if the session cookie resolved to one.
///
/// Inserted into request extensions for every route by [`load_session`].
#[derive(Clone, Debug, Default)]
pub struct CurrentUser {
    pub user: Option<User>,
    pub token: Option<String>,
}

/// Extract the session token from the `Cookie` headers.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// `Set-Cookie` value that starts a session.
pub fn session_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie.
pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Max-Age=0; HttpOnly; SameSite=Lax; Path=/")
}

/// Resolve the session cookie into a [`CurrentUser`] extension.
///
/// Unknown or stale tokens resolve to an anonymous user.
pub async fn load_session(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = session_token(request.headers());

    let user = match &token {
        Some(token) => state.db.get_session_user(token).map_err(|e| {
            tracing::error!("Failed to load session: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?,
        None => None,
    };

    let current = CurrentUser {
        token: user.as_ref().and(token),
        user,
    };
    request.extensions_mut().insert(current);

    Ok(next.run(request).await)
}

/// Redirect anonymous requests to the login page.
///
/// Authenticated requests continue with the [`User`] itself inserted as an
/// extension, so protected handlers can extract it directly.
pub async fn require_login(mut request: Request<Body>, next: Next) -> Response {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .and_then(|current| current.user.clone());

    match user {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => {
            let target = request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| request.uri().path().to_string());
            tracing::debug!("Anonymous request to {}, redirecting to login", target);
            redirect(&routes::login_with_next(&target))
        }
    }
}

/// A `302 Found` redirect.
pub fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
