//! Form binding and validation.
//!
//! A form is bound to submitted input, then `clean`ed against the store.
//! Cleaning returns `Ok(Some(..))` with validated values, or `Ok(None)` after
//! recording field errors on the form so it can be rendered again. Store
//! failures are the only `Err`.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;
use uuid::Uuid;

use crate::auth;
use crate::db::Database;
use crate::models::*;
use crate::slug::{is_valid_slug, slugify, truncate_chars};

/// Appended to a conflicting slug to build its uniqueness error.
pub const WARNING: &str = " - такой slug уже существует, придумайте уникальное значение!";

/// Key for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "__all__";

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_SLUG: &str =
    "Enter a valid “slug” consisting of letters, numbers, underscores or hyphens.";
pub const INVALID_USERNAME: &str =
    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
pub const DUPLICATE_USERNAME: &str = "A user with that username already exists.";
pub const PASSWORD_MISMATCH: &str = "The two password fields didn’t match.";
pub const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

pub const PASSWORD_MIN_LENGTH: usize = 8;

/// Field name to messages, keyed alphabetically by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        !self.get(field).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn max_length_error(max: usize, actual: usize) -> String {
    format!("Ensure this value has at most {max} characters (it has {actual}).")
}

/// Applies the shared required/max-length rules to a trimmed value.
fn clean_char_field(
    errors: &mut FormErrors,
    field: &str,
    value: &str,
    required: bool,
    max: Option<usize>,
) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        if required {
            errors.add(field, REQUIRED);
            return None;
        }
        return Some(String::new());
    }
    if let Some(max) = max {
        let len = value.chars().count();
        if len > max {
            errors.add(field, max_length_error(max, len));
            return None;
        }
    }
    Some(value.to_string())
}

// ============================================================
// Notes
// ============================================================

/// The add/edit form for a note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NoteForm {
    pub title: String,
    pub text: String,
    pub slug: String,
    pub errors: FormErrors,
}

impl NoteForm {
    /// An unbound form with blank fields.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A form pre-filled with an existing note's values.
    pub fn for_note(note: &Note) -> Self {
        Self::bind(NoteInput::from(note))
    }

    pub fn bind(input: NoteInput) -> Self {
        Self {
            title: input.title,
            text: input.text,
            slug: input.slug,
            errors: FormErrors::default(),
        }
    }

    /// Validates the bound values.
    ///
    /// `instance` is the note being edited; it is excluded from the slug
    /// uniqueness check so a note can keep its own slug.
    pub fn clean(&mut self, db: &Database, instance: Option<Uuid>) -> Result<Option<NoteFields>> {
        let errors = &mut self.errors;
        let title = clean_char_field(errors, "title", &self.title, true, Some(TITLE_MAX_LENGTH));
        let text = clean_char_field(errors, "text", &self.text, true, None);
        let supplied = clean_char_field(errors, "slug", &self.slug, false, Some(SLUG_MAX_LENGTH));

        let slug = match (supplied, &title) {
            (Some(slug), _) if !slug.is_empty() => {
                if is_valid_slug(&slug) {
                    Some(slug)
                } else {
                    errors.add("slug", INVALID_SLUG);
                    None
                }
            }
            (Some(_), Some(title)) => {
                let derived = truncate_chars(&slugify(title), SLUG_MAX_LENGTH);
                if derived.is_empty() {
                    errors.add("slug", INVALID_SLUG);
                    None
                } else {
                    Some(derived)
                }
            }
            _ => None,
        };

        if let Some(slug) = &slug {
            if db.slug_taken(slug, instance)? {
                errors.add("slug", format!("{slug}{WARNING}"));
            }
        }

        match (title, text, slug) {
            (Some(title), Some(text), Some(slug)) if self.errors.is_empty() => {
                Ok(Some(NoteFields { title, text, slug }))
            }
            _ => Ok(None),
        }
    }
}

// ============================================================
// Users
// ============================================================

/// The signup form. Passwords are never echoed back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SignupForm {
    pub username: String,
    pub errors: FormErrors,
    #[serde(skip)]
    password1: String,
    #[serde(skip)]
    password2: String,
}

/// Credentials accepted by [`SignupForm::clean`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
}

fn is_valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

impl SignupForm {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bind(input: SignupInput) -> Self {
        Self {
            username: input.username,
            errors: FormErrors::default(),
            password1: input.password1,
            password2: input.password2,
        }
    }

    pub fn clean(&mut self, db: &Database) -> Result<Option<NewAccount>> {
        let errors = &mut self.errors;
        let mut username = clean_char_field(
            errors,
            "username",
            &self.username,
            true,
            Some(USERNAME_MAX_LENGTH),
        );

        if let Some(name) = username.take() {
            if !is_valid_username(&name) {
                errors.add("username", INVALID_USERNAME);
            } else if db.get_user_by_username(&name)?.is_some() {
                errors.add("username", DUPLICATE_USERNAME);
            } else {
                username = Some(name);
            }
        }

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if !self.password1.is_empty() {
            if self.password1 != self.password2 {
                errors.add("password2", PASSWORD_MISMATCH);
            } else if self.password2.chars().count() < PASSWORD_MIN_LENGTH {
                errors.add(
                    "password2",
                    format!(
                        "This password is too short. It must contain at least {PASSWORD_MIN_LENGTH} characters."
                    ),
                );
            }
        }

        match username {
            Some(username) if self.errors.is_empty() => Ok(Some(NewAccount {
                username,
                password: std::mem::take(&mut self.password1),
            })),
            _ => Ok(None),
        }
    }
}

/// The login form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoginForm {
    pub username: String,
    pub next: Option<String>,
    pub errors: FormErrors,
    #[serde(skip)]
    password: String,
}

impl LoginForm {
    pub fn empty(next: Option<String>) -> Self {
        Self {
            next,
            ..Self::default()
        }
    }

    pub fn bind(input: LoginInput) -> Self {
        Self {
            username: input.username,
            next: input.next.filter(|n| !n.is_empty()),
            errors: FormErrors::default(),
            password: input.password,
        }
    }

    /// Authenticates the submitted credentials.
    ///
    /// Unknown users, wrong passwords and unusable passwords all produce the
    /// same form-wide error.
    pub fn clean(&mut self, db: &Database) -> Result<Option<User>> {
        let username = self.username.trim().to_string();
        if username.is_empty() {
            self.errors.add("username", REQUIRED);
        }
        if self.password.is_empty() {
            self.errors.add("password", REQUIRED);
        }
        if !self.errors.is_empty() {
            return Ok(None);
        }

        let Some(user) = db.get_user_by_username(&username)? else {
            self.errors.add(NON_FIELD_ERRORS, INVALID_LOGIN);
            return Ok(None);
        };

        let verified = match db.get_password_hash(user.id)? {
            Some(hash) => auth::verify_password(&self.password, &hash)?,
            None => false,
        };

        if verified {
            Ok(Some(user))
        } else {
            self.errors.add(NON_FIELD_ERRORS, INVALID_LOGIN);
            Ok(None)
        }
    }
}
