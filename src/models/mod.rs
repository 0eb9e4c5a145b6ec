//! Domain models for notekeeper.
//!
//! # Core Concepts
//!
//! - [`Note`]: A short text owned by exactly one [`User`] and addressed by a
//!   globally unique slug. Ownership never transfers.
//! - [`User`]: An account that can log in and author notes.
//! - [`AuthSession`]: A login session, identified by the token stored in the
//!   `sessionid` cookie.

mod note;
mod user;

pub use note::*;
pub use user::*;
