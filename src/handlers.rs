use crate::{
    AppState,
    auth::{CurrentSession, cleared_session_cookie},
    error::LoginError,
    models::{ErrorBody, LoginRequest, LoginResponse, SessionUser, SessionView},
};
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse},
};
use axum_extra::extract::cookie::CookieJar;

// --- Session Lifecycle Handlers ---

/// login
///
/// [Public Route] Exchanges a username/password with the credential provider and, on
/// success, issues the session cookie (`iat = now`, `exp = now + ttl`).
///
/// *Failure*: a rejection is a `401` with a form-level message; nothing is issued.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 503, description = "Provider unavailable", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), LoginError> {
    let principal = state
        .credentials
        .exchange(&payload.username, &payload.password)
        .await?;

    let (token, session) =
        state
            .sessions
            .issue(principal.id, &principal.username, state.clock.now())?;

    tracing::info!(subject = %session.subject, expires_at = %session.expires_at, "session issued");

    let redirect_to = state
        .config
        .routes
        .post_login_target(payload.callback_url.as_deref());
    let jar = jar.add(
        state
            .sessions
            .session_cookie(token, state.config.secure_cookies()),
    );

    Ok((
        jar,
        Json(LoginResponse {
            user: SessionUser {
                id: session.subject,
                username: session.username,
            },
            issued_at: session.issued_at,
            expires_at: session.expires_at,
            redirect_to,
        }),
    ))
}

/// session
///
/// [Public Route] Reports the caller's current session. This is the endpoint the
/// client-side session store settles its `Loading` state against.
#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses((status = 200, description = "Current session", body = SessionView))
)]
pub async fn session(State(state): State<AppState>, headers: HeaderMap) -> Json<SessionView> {
    let resolved = state.sessions.resolve(&headers, state.clock.now());
    Json(SessionView::from_state(&resolved))
}

/// logout
///
/// [Public Route] Clears the session cookie. Safe to call without a session.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 204, description = "Session cleared"))
)]
pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    tracing::info!("session cleared");
    (jar.remove(cleared_session_cookie()), StatusCode::NO_CONTENT)
}

// --- Protected Handlers ---

/// get_me
///
/// [Authenticated Route] Returns the signed-in principal.
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current user", body = SessionUser),
        (status = 401, description = "No valid session")
    )
)]
pub async fn get_me(CurrentSession(session): CurrentSession) -> Json<SessionUser> {
    Json(SessionUser {
        id: session.subject,
        username: session.username,
    })
}

// --- Page Shells ---

/// The dashboard is rendered client-side; every page route serves the same shell.
pub async fn page_shell() -> Html<&'static str> {
    Html(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>Dashboard</title>\
         </head><body><div id=\"app\"></div></body></html>",
    )
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "not found".to_string(),
        }),
    )
}
