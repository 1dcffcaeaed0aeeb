use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use dashboard_gate::{
    AppConfig, AppState, Clock, ClockState, ManualClock, RouteRules, Session, SessionState,
    auth::SESSION_COOKIE,
    create_router,
    gate::{Verdict, evaluate},
};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

// --- Helper Functions ---

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

struct TestApp {
    router: Router,
    state: AppState,
    clock: Arc<ManualClock>,
}

impl TestApp {
    fn new(rules: RouteRules) -> Self {
        let config = AppConfig {
            routes: Arc::new(rules),
            ..AppConfig::default()
        };
        let clock = Arc::new(ManualClock::new(t0()));
        let mut state = AppState::from_config(config);
        state.clock = clock.clone() as ClockState;

        Self {
            router: create_router(state.clone()),
            state,
            clock,
        }
    }

    fn token(&self) -> String {
        let (token, _) = self
            .state
            .sessions
            .issue(Uuid::from_u128(7), "admin", self.clock.now())
            .unwrap();
        token
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("{SESSION_COOKIE}={token}"));
        }
        self.router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

fn session_at(now: DateTime<Utc>) -> SessionState {
    SessionState::Authenticated(Session {
        subject: Uuid::from_u128(7),
        username: "admin".to_string(),
        issued_at: now,
        expires_at: now + Duration::hours(12),
    })
}

// --- Pure Verdict Tests ---

#[test]
fn test_evaluate_public_without_session() {
    let rules = RouteRules::default();
    assert_eq!(
        evaluate(&rules, "/login", "/login", &SessionState::Unauthenticated),
        Verdict::Allow
    );
}

#[test]
fn test_evaluate_protected_without_session() {
    let rules = RouteRules::default();
    assert_eq!(
        evaluate(&rules, "/dashboard", "/dashboard?tab=1", &SessionState::Unauthenticated),
        Verdict::RedirectToLogin("/dashboard?tab=1".to_string())
    );
}

#[test]
fn test_evaluate_protected_with_session() {
    let rules = RouteRules::default();
    assert_eq!(
        evaluate(&rules, "/dashboard", "/dashboard", &session_at(t0())),
        Verdict::Allow
    );
}

#[test]
fn test_evaluate_is_idempotent() {
    let rules = RouteRules::default();
    for state in [SessionState::Unauthenticated, session_at(t0())] {
        for path in ["/", "/login", "/dashboard", "/api/me", "/login-help"] {
            assert_eq!(
                evaluate(&rules, path, path, &state),
                evaluate(&rules, path, path, &state)
            );
        }
    }
}

#[test]
fn test_evaluate_never_treats_loading_as_authenticated() {
    let rules = RouteRules::default();
    assert!(matches!(
        evaluate(&rules, "/dashboard", "/dashboard", &SessionState::Loading),
        Verdict::RedirectToLogin(_)
    ));
}

// --- Router Tests ---

#[tokio::test]
async fn test_login_without_session_is_allowed() {
    let app = TestApp::new(RouteRules::default());
    let response = app.get("/login", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_dashboard_without_session_redirects_to_login() {
    let app = TestApp::new(RouteRules::default());
    let response = app.get("/dashboard", None).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/login?callbackUrl=%2Fdashboard");

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_redirect_preserves_query_in_callback() {
    let app = TestApp::new(RouteRules::default());
    let response = app.get("/users?page=2", None).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/login?callbackUrl=%2Fusers%3Fpage%3D2");
}

#[tokio::test]
async fn test_dashboard_with_session_is_allowed() {
    let app = TestApp::new(RouteRules::default());
    let token = app.token();
    let response = app.get("/dashboard", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_with_session_is_still_allowed_at_the_edge() {
    let app = TestApp::new(RouteRules::default());
    let token = app.token();
    let response = app.get("/login", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_expired_session_redirects_with_same_token() {
    let app = TestApp::new(RouteRules::default());
    let token = app.token();

    assert_eq!(app.get("/dashboard", Some(&token)).await.status(), StatusCode::OK);

    app.clock.advance(Duration::hours(12) + Duration::seconds(1));
    let response = app.get("/dashboard", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
}

#[tokio::test]
async fn test_corrupt_session_fails_closed_not_500() {
    let app = TestApp::new(RouteRules::default());
    let response = app.get("/dashboard", Some("not-a-token")).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
}

#[tokio::test]
async fn test_api_paths_share_the_policy() {
    let app = TestApp::new(RouteRules::default());

    let response = app.get("/api/me", None).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/login?callbackUrl=%2Fapi%2Fme");

    let token = app.token();
    let response = app.get("/api/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["username"], "admin");
}

#[tokio::test]
async fn test_bearer_token_is_accepted_for_api() {
    let app = TestApp::new(RouteRules::default());
    let token = app.token();
    let request = Request::builder()
        .uri("/api/me")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_static_assets_bypass_the_gate() {
    let app = TestApp::new(RouteRules::default());
    // Not gated, so the fallback answers instead of a redirect.
    for uri in ["/assets/app.js", "/favicon.ico", "/images/logo.png"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn test_unknown_paths_are_gated() {
    let app = TestApp::new(RouteRules::default());
    assert_eq!(
        app.get("/no/such/page", None).await.status(),
        StatusCode::TEMPORARY_REDIRECT
    );

    let token = app.token();
    assert_eq!(
        app.get("/no/such/page", Some(&token)).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_sibling_of_public_prefix_is_protected() {
    let app = TestApp::new(RouteRules::default());
    let response = app.get("/login-help", None).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
}

#[tokio::test]
async fn test_protected_sub_route_override_at_the_edge() {
    let open = TestApp::new(RouteRules::default());
    // Public under "/profile": allowed through, the fallback answers.
    assert_eq!(
        open.get("/profile/profile-info", None).await.status(),
        StatusCode::NOT_FOUND
    );

    let overridden = TestApp::new(RouteRules {
        protected_sub_routes: vec!["profile-info".to_string()],
        ..RouteRules::default()
    });
    let response = overridden.get("/profile/profile-info", None).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response),
        "/login?callbackUrl=%2Fprofile%2Fprofile-info"
    );
}

#[tokio::test]
async fn test_same_request_twice_gets_same_verdict() {
    let app = TestApp::new(RouteRules::default());
    let first = app.get("/dashboard", None).await;
    let second = app.get("/dashboard", None).await;

    assert_eq!(first.status(), second.status());
    assert_eq!(location(&first), location(&second));
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = TestApp::new(RouteRules::default());
    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}
