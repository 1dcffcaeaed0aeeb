use std::env;
use std::sync::Arc;

use crate::rules::RouteRules;

/// Default session lifetime: 12 hours.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 12 * 60 * 60;

/// Longest accepted session lifetime: one year.
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;

const LOCAL_SESSION_SECRET: &str = "local-dashboard-session-secret-change-me";

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// immutable afterwards; the route table inside it is shared behind an `Arc` by the
/// edge gate and every client guard.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls logging format, cookie security and provider choice.
    pub env: Env,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Secret used to sign and verify session tokens.
    pub session_secret: String,
    // Fixed session lifetime in seconds. Sessions are never renewed.
    pub session_ttl_secs: u64,
    // Remote credential exchange endpoint. When unset, the static provider is used.
    pub auth_provider_url: Option<String>,
    // `username:password` pairs for the static provider (local only).
    pub local_users: Vec<(String, String)>,
    // The static route table.
    pub routes: Arc<RouteRules>,
}

/// Env
///
/// Defines the runtime context.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// Safe, non-panicking configuration for tests and scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: "127.0.0.1:3000".to_string(),
            session_secret: LOCAL_SESSION_SECRET.to_string(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            auth_provider_url: None,
            local_users: vec![("admin".to_string(), "admin".to_string())],
            routes: Arc::new(RouteRules::default()),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics in `Env::Production` when `SESSION_SECRET` or `AUTH_PROVIDER_URL` is missing,
    /// and in any environment when `SESSION_TTL_SECS` is not an integer between one second
    /// and `MAX_SESSION_TTL_SECS`. The server must not start with a guessable signing key
    /// or a session lifetime it cannot represent.
    pub fn load() -> Self {
        // 1. Determine Environment
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        // 2. Session Signing Secret (Fail-Fast in Production)
        // Local runs fall back to a fixed development secret.
        let session_secret = match env {
            Env::Production => env::var("SESSION_SECRET")
                .expect("FATAL: SESSION_SECRET must be set in production."),
            Env::Local => {
                env::var("SESSION_SECRET").unwrap_or_else(|_| LOCAL_SESSION_SECRET.to_string())
            }
        };

        // 3. Credential Provider (Fail-Fast in Production)
        let auth_provider_url = match env {
            Env::Production => Some(
                env::var("AUTH_PROVIDER_URL")
                    .expect("FATAL: AUTH_PROVIDER_URL must be set in production."),
            ),
            Env::Local => env::var("AUTH_PROVIDER_URL").ok(),
        };

        // 4. Session Lifetime
        // Checked in every environment, bounded by MAX_SESSION_TTL_SECS.
        let session_ttl_secs = match env::var("SESSION_TTL_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|ttl| (1..=MAX_SESSION_TTL_SECS).contains(ttl))
                .expect("FATAL: SESSION_TTL_SECS must be between 1 and 31536000 (one year)."),
            Err(_) => DEFAULT_SESSION_TTL_SECS,
        };

        // 5. Static User Table (Local only)
        let local_users = match env {
            Env::Local => parse_users(
                &env::var("LOCAL_USERS").unwrap_or_else(|_| "admin:admin".to_string()),
            ),
            Env::Production => Vec::new(),
        };

        // 6. Assemble, with the route table built from defaults plus overrides.
        Self {
            env,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            session_secret,
            session_ttl_secs,
            auth_provider_url,
            local_users,
            routes: Arc::new(load_route_rules()),
        }
    }

    pub fn secure_cookies(&self) -> bool {
        self.env == Env::Production
    }

    /// The session lifetime as a `chrono::Duration`, capped at `MAX_SESSION_TTL_SECS`.
    pub fn session_ttl(&self) -> chrono::Duration {
        let secs = self.session_ttl_secs.min(MAX_SESSION_TTL_SECS);
        chrono::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
    }
}

/// load_route_rules
///
/// Starts from `RouteRules::default()` and replaces each list or route that has an
/// environment override.
fn load_route_rules() -> RouteRules {
    let mut rules = RouteRules::default();

    if let Some(list) = list_var("PUBLIC_ROUTES") {
        rules.public_routes = list;
    }
    if let Some(list) = list_var("PROTECTED_SUB_ROUTES") {
        rules.protected_sub_routes = list;
    }
    if let Some(list) = list_var("GATE_EXCLUDED_PREFIXES") {
        rules.excluded_prefixes = list;
    }
    if let Ok(root) = env::var("ROOT_ROUTE") {
        rules.root_route = root;
    }
    if let Ok(login) = env::var("LOGIN_ROUTE") {
        rules.login_route = login;
    }
    if let Ok(home) = env::var("HOME_ROUTE") {
        rules.home_route = home;
    }
    if let Ok(prefix) = env::var("API_PREFIX") {
        rules.api_prefix = prefix;
    }

    rules
}

/// Comma-separated list; an empty (but set) variable means an empty list.
fn list_var(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
}

fn parse_users(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| pair.trim().split_once(':'))
        .filter(|(user, _)| !user.is_empty())
        .map(|(user, pass)| (user.to_string(), pass.to_string()))
        .collect()
}
