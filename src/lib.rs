//! Notekeeper: a personal notes server.
//!
//! Every note belongs to the user who wrote it. Only that user can see it in
//! their list, open it, edit it or delete it; for everyone else it does not
//! exist.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod forms;
pub mod models;
pub mod slug;
