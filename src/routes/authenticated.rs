use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes that require a valid session. The edge gate redirects anonymous callers
/// before they get here, and handlers still take the `CurrentSession` extractor so a
/// misconfigured route table cannot expose them.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /api/me
        // The signed-in principal.
        .route("/api/me", get(handlers::get_me))
}
