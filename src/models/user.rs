use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of a username, in characters.
pub const USERNAME_MAX_LENGTH: usize = 150;

/// A registered account.
///
/// The password hash never leaves the store layer except through
/// [`crate::db::Database::get_password_hash`], and is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a user.
///
/// A `None` hash marks the password as unusable: the account exists but can
/// only be signed in by issuing a session directly.
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub username: String,
    pub password_hash: Option<String>,
}

/// A login session bound to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Opaque value carried by the `sessionid` cookie.
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Fields submitted by the signup form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignupInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

/// Fields submitted by the login form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Where to go after a successful login.
    #[serde(default)]
    pub next: Option<String>,
}
