use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

pub const LOGIN_ENDPOINT: &str = "/api/auth/login";
pub const SESSION_ENDPOINT: &str = "/api/auth/session";
pub const LOGOUT_ENDPOINT: &str = "/api/auth/logout";

/// Public Router Module
///
/// Endpoints reachable without a session. Every path here must stay under a
/// `public_routes` prefix, or the edge gate will redirect anonymous callers away from them.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /api/auth/login
        // Credential exchange; issues the session cookie on success.
        .route(LOGIN_ENDPOINT, post(handlers::login))
        // GET /api/auth/session
        // Session state for the client store. Answers for anonymous callers too.
        .route(SESSION_ENDPOINT, get(handlers::session))
        // POST /api/auth/logout
        .route(LOGOUT_ENDPOINT, post(handlers::logout))
}
