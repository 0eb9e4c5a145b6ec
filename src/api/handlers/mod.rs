mod notes;
mod users;

pub use notes::*;
pub use users::*;

use axum::{http::StatusCode, response::IntoResponse, Extension, Json};
use serde::Serialize;

use super::middleware::CurrentUser;

pub(crate) type HandlerError = (StatusCode, String);

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
/// The full error is logged server-side, clients only see a generic message.
fn internal_error(e: impl std::fmt::Display) -> HandlerError {
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

/// The response for both missing notes and notes owned by someone else.
fn not_found() -> HandlerError {
    (
        StatusCode::NOT_FOUND,
        "No note found matching the query".to_string(),
    )
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Home
// ============================================================

#[derive(Debug, Serialize)]
pub struct HomePage {
    pub user: Option<String>,
}

pub async fn home(Extension(current): Extension<CurrentUser>) -> Json<HomePage> {
    Json(HomePage {
        user: current.user.map(|u| u.username),
    })
}
