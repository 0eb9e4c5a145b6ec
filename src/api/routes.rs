//! URL table. Handlers and tests build paths through these helpers so that
//! redirects and links always agree with the router.

pub const HOME: &str = "/";
pub const LIST: &str = "/notes/";
pub const ADD: &str = "/add/";
pub const SUCCESS: &str = "/done/";
pub const HEALTH: &str = "/health";

pub const LOGIN: &str = "/auth/login/";
pub const LOGOUT: &str = "/auth/logout/";
pub const SIGNUP: &str = "/auth/signup/";

pub(crate) const DETAIL_PATTERN: &str = "/note/{slug}/";
pub(crate) const EDIT_PATTERN: &str = "/edit/{slug}/";
pub(crate) const DELETE_PATTERN: &str = "/delete/{slug}/";

pub fn detail(slug: &str) -> String {
    format!("/note/{slug}/")
}

pub fn edit(slug: &str) -> String {
    format!("/edit/{slug}/")
}

pub fn delete(slug: &str) -> String {
    format!("/delete/{slug}/")
}

/// Login URL that returns to `next` afterwards.
///
/// `/` stays literal so the target remains readable; everything else
/// outside the unreserved set is percent-encoded.
pub fn login_with_next(next: &str) -> String {
    let encoded = urlencoding::encode(next).replace("%2F", "/");
    format!("{LOGIN}?next={encoded}")
}

/// Whether `next` points inside this site.
///
/// Only absolute paths are accepted; scheme-relative `//host`, anything with
/// a scheme, and anything that cannot go into a `Location` header are rejected.
pub fn is_safe_next(next: &str) -> bool {
    next.starts_with('/')
        && !next.starts_with("//")
        && !next.starts_with("/\\")
        && !next.chars().any(char::is_control)
}
