use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Paths served by the client-rendered dashboard shell.
pub const PAGE_PATHS: &[&str] = &[
    "/",
    "/dashboard",
    "/login",
    "/register",
    "/forgot-password",
    "/reset-password",
];

pub fn page_routes() -> Router<AppState> {
    PAGE_PATHS.iter().fold(Router::new(), |router, path| {
        router.route(path, get(handlers::page_shell))
    })
}
