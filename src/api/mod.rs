mod handlers;
pub mod middleware;
pub mod routes;

use axum::{
    http::{HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use crate::config::ServerConfig;
use crate::db::Database;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
}

pub fn create_router(db: Database) -> Router {
    create_router_with_config(db, ServerConfig::default())
}

pub fn create_router_with_config(db: Database, config: ServerConfig) -> Router {
    let cors = config.cors_origins.as_ref().map(|origins| cors_layer(origins));
    let state = AppState { db, config };

    let protected = Router::new()
        .route(routes::LIST, get(handlers::list_notes))
        .route(routes::ADD, get(handlers::add_note_form).post(handlers::add_note))
        .route(routes::SUCCESS, get(handlers::success))
        .route(routes::DETAIL_PATTERN, get(handlers::note_detail))
        .route(
            routes::EDIT_PATTERN,
            get(handlers::edit_note_form).post(handlers::edit_note),
        )
        .route(
            routes::DELETE_PATTERN,
            get(handlers::delete_note_confirm)
                .post(handlers::delete_note)
                .delete(handlers::delete_note),
        )
        .route_layer(from_fn(middleware::require_login));

    let public = Router::new()
        .route(routes::HOME, get(handlers::home))
        .route(routes::HEALTH, get(handlers::health))
        .route(routes::LOGIN, get(handlers::login_form).post(handlers::login))
        .route(routes::LOGOUT, get(handlers::logout).post(handlers::logout))
        .route(routes::SIGNUP, get(handlers::signup_form).post(handlers::signup));

    let router = Router::new()
        .merge(public)
        .merge(protected)
        .layer(from_fn_with_state(state.clone(), middleware::load_session))
        .layer(TraceLayer::new_for_http());

    let router = match cors {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_credentials(true)
}
