use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{AppState, rules::RouteRules, session::SessionState};

/// Verdict
///
/// The authorization decision for one request or one render. Computed fresh every
/// time and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    /// Send the caller to the login route, remembering where they were headed.
    RedirectToLogin(String),
    /// Send an already-authenticated caller away from an auth-only screen.
    RedirectToHome,
}

/// evaluate
///
/// The edge decision: allow when the caller is authenticated or the path is public,
/// otherwise redirect to login with `callback` preserved. `state` is a server-side
/// resolution, so `Loading` never reaches here; if it did it would not count as authenticated.
///
/// Pure: the same rules, path and state always give the same verdict.
pub fn evaluate(rules: &RouteRules, path: &str, callback: &str, state: &SessionState) -> Verdict {
    let is_public = rules.classify(path).is_public();
    let is_authenticated = matches!(state, SessionState::Authenticated(_));

    if is_authenticated || is_public {
        Verdict::Allow
    } else {
        Verdict::RedirectToLogin(callback.to_string())
    }
}

/// edge_gate
///
/// Middleware wrapping the whole router. Runs before routing for every path the edge
/// matcher intercepts (`RouteRules::intercepts`).
///
/// *Allowed*: the request continues untouched; a resolved session is attached to the
/// request extensions for the `CurrentSession` extractor.
/// *Redirected*: a `307 Temporary Redirect` to the login route carrying the original
/// path and query as the callback. Token decoding problems never surface as errors.
pub async fn edge_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let rules = &state.config.routes;
    let path = request.uri().path().to_string();

    // 1. Matcher: asset and static-file requests never reach the resolver.
    if !rules.intercepts(&path) {
        return next.run(request).await;
    }

    // 2. Resolution: cookie first, then Bearer. Always settles, never errors.
    let session = state.sessions.resolve(request.headers(), state.clock.now());

    // Callback is the path plus query string.
    let callback = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());

    // 3. Decision
    match evaluate(rules, &path, &callback, &session) {
        Verdict::Allow => {
            // Read back by the `CurrentSession` extractor.
            if let SessionState::Authenticated(session) = session {
                request.extensions_mut().insert(session);
            }
            next.run(request).await
        }
        Verdict::RedirectToLogin(callback) => {
            tracing::debug!(path = %path, "no valid session, redirecting to login");
            Redirect::temporary(&rules.login_url(&callback)).into_response()
        }
        // Only client guards produce this; the edge never narrows public access.
        Verdict::RedirectToHome => Redirect::temporary(&rules.home_route).into_response(),
    }
}
