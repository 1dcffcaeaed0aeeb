use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Authorization core.
pub mod auth;
pub mod gate;
pub mod rules;
pub mod session;

// Session lifecycle and the HTTP surface around it.
pub mod config;
pub mod credentials;
pub mod error;
pub mod handlers;
pub mod models;

// Client-side store and guards.
pub mod client;

// Module for routing segregation (Public, Authenticated, Pages).
pub mod routes;
use routes::{authenticated, pages, public};

// --- Public Re-exports ---

pub use auth::SessionCodec;
pub use config::AppConfig;
pub use credentials::{CredentialState, HttpCredentialProvider, StaticCredentialProvider};
pub use rules::{RouteClass, RouteRules};
pub use session::{Clock, ClockState, ManualClock, Session, SessionState, SystemClock};

/// ApiDoc
///
/// OpenAPI document for the session endpoints, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::login, handlers::session, handlers::logout, handlers::get_me),
    components(schemas(
        models::LoginRequest,
        models::LoginResponse,
        models::SessionView,
        models::SessionUser,
        models::ErrorBody,
    )),
    tags((name = "dashboard-gate", description = "Dashboard session and authorization API"))
)]
struct ApiDoc;

/// AppState
///
/// The single shared state container. Everything in it is either immutable after
/// startup (configuration, route table, signing keys) or an `Arc` to a service.
#[derive(Clone)]
pub struct AppState {
    /// Configuration, including the `Arc<RouteRules>` route table.
    pub config: AppConfig,
    /// Session token issuance and verification.
    pub sessions: SessionCodec,
    /// The credential exchange provider.
    pub credentials: CredentialState,
    /// Source of "now" for expiry decisions.
    pub clock: ClockState,
}

impl AppState {
    /// Wires the state from configuration: the HTTP provider when `auth_provider_url`
    /// is set, the static user table otherwise.
    pub fn from_config(config: AppConfig) -> Self {
        let credentials: CredentialState = match &config.auth_provider_url {
            Some(url) => Arc::new(HttpCredentialProvider::new(url.clone())),
            None => Arc::new(StaticCredentialProvider::from_pairs(&config.local_users)),
        };
        let sessions = SessionCodec::new(&config.session_secret, config.session_ttl());

        Self {
            config,
            sessions,
            credentials,
            clock: Arc::new(SystemClock),
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for SessionCodec {
    fn from_ref(app_state: &AppState) -> SessionCodec {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for CredentialState {
    fn from_ref(app_state: &AppState) -> CredentialState {
        app_state.credentials.clone()
    }
}

impl FromRef<AppState> for ClockState {
    fn from_ref(app_state: &AppState) -> ClockState {
        app_state.clock.clone()
    }
}

/// create_router
///
/// Assembles the routes, wraps all of them (fallback included) in the edge gate, then
/// adds the request-id and tracing layers outermost.
pub fn create_router(state: AppState) -> Router {
    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 1. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: login, session check, logout and health.
        .merge(public::public_routes())
        // Authenticated Routes: handlers also take `CurrentSession` as a second check.
        .merge(authenticated::authenticated_routes())
        // Page Shells: public or protected according to the route rules.
        .merge(pages::page_routes())
        // Unknown paths answer with a JSON 404, once the gate has let them through.
        .fallback(handlers::not_found)
        // 2. Edge Gate: a plain `layer` (not `route_layer`) so the fallback is gated too.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::edge_gate,
        ))
        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (Applied outermost/first)
    base_router.layer(
        ServiceBuilder::new()
            // 3a. Request ID Generation: a UUID for every incoming request.
            .layer(SetRequestIdLayer::new(
                x_request_id.clone(),
                MakeRequestUuid,
            ))
            // 3b. Request Tracing: one span per request, carrying the request ID.
            // Redirects issued by the gate are logged here with their 307 status.
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            // 3c. Request ID Propagation: echo x-request-id back to the client.
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}

/// trace_span_logger
///
/// Span for one request, correlated by `x-request-id`. Only the path is recorded:
/// query strings may carry callback URLs and are left out of the logs.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        path = %request.uri().path(),
        req_id = %request_id,
    )
}
