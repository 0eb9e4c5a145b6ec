use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Form, Json,
};
use serde::{Deserialize, Serialize};

use super::{internal_error, HandlerError};
use crate::api::middleware::{expired_session_cookie, redirect, session_cookie, CurrentUser};
use crate::api::{routes, AppState};
use crate::auth;
use crate::db::DuplicateUsername;
use crate::forms::{LoginForm, SignupForm, DUPLICATE_USERNAME};
use crate::models::*;

#[derive(Debug, Serialize)]
pub struct LoginPage {
    pub form: LoginForm,
}

#[derive(Debug, Serialize)]
pub struct SignupPage {
    pub form: SignupForm,
}

#[derive(Debug, Serialize)]
pub struct LoggedOutPage {
    pub message: &'static str,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

// ============================================================
// Login
// ============================================================

pub async fn login_form(Query(query): Query<LoginQuery>) -> Json<LoginPage> {
    Json(LoginPage {
        form: LoginForm::empty(query.next.filter(|n| !n.is_empty())),
    })
}

pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
    Form(input): Form<LoginInput>,
) -> Result<Response, HandlerError> {
    let mut form = LoginForm::bind(input);
    if form.next.is_none() {
        form.next = query.next.filter(|n| !n.is_empty());
    }

    let Some(user) = form.clean(&state.db).map_err(internal_error)? else {
        tracing::warn!("Failed login attempt for {:?}", form.username);
        return Ok(Json(LoginPage { form }).into_response());
    };

    let session = state.db.create_session(user.id).map_err(internal_error)?;
    tracing::info!("{} logged in", user.username);

    let target = form
        .next
        .as_deref()
        .filter(|next| routes::is_safe_next(next))
        .unwrap_or(routes::HOME);

    let mut response = redirect(target);
    let cookie = session_cookie(&session.token, state.config.secure_cookies);
    response.headers_mut().insert(
        header::SET_COOKIE,
        cookie.parse().map_err(internal_error)?,
    );
    Ok(response)
}

// ============================================================
// Logout
// ============================================================

pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Response, HandlerError> {
    if let Some(token) = &current.token {
        state.db.delete_session(token).map_err(internal_error)?;
    }
    if let Some(user) = &current.user {
        tracing::info!("{} logged out", user.username);
    }

    Ok((
        [(header::SET_COOKIE, expired_session_cookie())],
        Json(LoggedOutPage {
            message: "Вы вышли из своей учётной записи.",
        }),
    )
        .into_response())
}

// ============================================================
// Signup
// ============================================================

pub async fn signup_form() -> Json<SignupPage> {
    Json(SignupPage {
        form: SignupForm::empty(),
    })
}

pub async fn signup(
    State(state): State<AppState>,
    Form(input): Form<SignupInput>,
) -> Result<Response, HandlerError> {
    let mut form = SignupForm::bind(input);
    let Some(account) = form.clean(&state.db).map_err(internal_error)? else {
        return Ok(Json(SignupPage { form }).into_response());
    };

    let password_hash = auth::hash_password(&account.password).map_err(internal_error)?;
    let created = state.db.create_user(CreateUserInput {
        username: account.username,
        password_hash: Some(password_hash),
    });

    match created {
        Ok(user) => {
            tracing::info!("Registered user {}", user.username);
            Ok(redirect(routes::HOME))
        }
        Err(e) if e.downcast_ref::<DuplicateUsername>().is_some() => {
            form.errors.add("username", DUPLICATE_USERNAME);
            Ok(Json(SignupPage { form }).into_response())
        }
        Err(e) => Err(internal_error(e)),
    }
}
