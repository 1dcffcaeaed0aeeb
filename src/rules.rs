use url::{Url, form_urlencoded};

/// Query parameter carrying the originally requested path across a login redirect.
pub const CALLBACK_PARAM: &str = "callbackUrl";

/// RouteClass
///
/// Outcome of classifying a request path against the `RouteRules`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Reachable without a session (root or a public prefix).
    Public,
    /// No public rule matched. Unknown paths always land here.
    Protected,
    /// A public rule matched, but a protected sub-route fragment forced protection.
    Overridden,
}

impl RouteClass {
    pub fn is_public(self) -> bool {
        matches!(self, RouteClass::Public)
    }
}

/// RouteRules
///
/// The static route table shared by the edge gate and the client guards.
/// Built once at startup (see `AppConfig::load`) and only ever read afterwards,
/// so it is shared behind an `Arc` without any locking.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRules {
    /// Path treated as public by identity match.
    pub root_route: String,
    /// Ordered, segment-aware prefixes reachable without a session.
    pub public_routes: Vec<String>,
    /// Fragments that force protection when found anywhere in a path.
    pub protected_sub_routes: Vec<String>,
    /// Where unauthenticated callers are sent.
    pub login_route: String,
    /// Where authenticated callers are sent away from auth-only screens.
    pub home_route: String,
    /// API paths under this prefix are always intercepted by the gate.
    pub api_prefix: String,
    /// Internal asset prefixes the gate never intercepts.
    pub excluded_prefixes: Vec<String>,
    /// File extensions of already-resolved static files the gate never intercepts.
    pub static_extensions: Vec<String>,
}

impl Default for RouteRules {
    fn default() -> Self {
        Self {
            root_route: "/".to_string(),
            public_routes: to_owned_list(&[
                "/login",
                "/register",
                "/forgot-password",
                "/reset-password",
                "/profile",
                "/health",
                "/api/auth",
                "/swagger-ui",
                "/api-docs",
            ]),
            protected_sub_routes: Vec::new(),
            login_route: "/login".to_string(),
            home_route: "/".to_string(),
            api_prefix: "/api".to_string(),
            excluded_prefixes: to_owned_list(&["/assets", "/static", "/favicon.ico"]),
            static_extensions: to_owned_list(&[
                "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "css", "js", "map", "woff",
                "woff2", "txt",
            ]),
        }
    }
}

impl RouteRules {
    /// classify
    ///
    /// Maps a normalized path (no query string) to its `RouteClass`.
    ///
    /// A path is public iff it equals the root route or sits under a public prefix,
    /// AND it contains none of the protected sub-route fragments (substring match).
    /// Anything unmatched is protected.
    pub fn classify(&self, path: &str) -> RouteClass {
        let candidate_public = path == self.root_route
            || self
                .public_routes
                .iter()
                .any(|prefix| matches_segment_prefix(path, prefix));

        let overridden = self
            .protected_sub_routes
            .iter()
            .any(|fragment| !fragment.is_empty() && path.contains(fragment.as_str()));

        match (candidate_public, overridden) {
            (true, false) => RouteClass::Public,
            (true, true) => RouteClass::Overridden,
            (false, _) => RouteClass::Protected,
        }
    }

    /// intercepts
    ///
    /// The edge request matcher: whether the gate runs for this path at all.
    /// API paths are always intercepted so page and API requests share one policy.
    pub fn intercepts(&self, path: &str) -> bool {
        if matches_segment_prefix(path, &self.api_prefix) {
            return true;
        }
        if self
            .excluded_prefixes
            .iter()
            .any(|prefix| matches_segment_prefix(path, prefix))
        {
            return false;
        }
        !self.is_static_file(path)
    }

    /// Builds the login redirect target, carrying `callback` as the callback parameter.
    pub fn login_url(&self, callback: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair(CALLBACK_PARAM, callback)
            .finish();
        format!("{}?{}", self.login_route, query)
    }

    /// Picks the post-login destination: the callback when it is a same-origin
    /// relative path, the home route otherwise.
    pub fn post_login_target(&self, callback: Option<&str>) -> String {
        callback
            .filter(|target| is_same_origin_path(target))
            .map(str::to_string)
            .unwrap_or_else(|| self.home_route.clone())
    }

    fn is_static_file(&self, path: &str) -> bool {
        let last_segment = path.rsplit('/').next().unwrap_or_default();
        match last_segment.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => self
                .static_extensions
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext)),
            _ => false,
        }
    }
}

/// Segment-aware prefix test: `/login` matches `/login`, `/login/` and `/login/reset`,
/// never `/login-help`.
fn matches_segment_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        // A bare "/" prefix would make every path public; only identity counts.
        return path == "/";
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Whether `target` stays on this origin once a browser resolves it.
///
/// Browsers read `//host` and `/\host` as scheme-relative, and strip tabs and newlines
/// before resolving, so backslashes and control characters are refused outright.
fn is_same_origin_path(target: &str) -> bool {
    if !target.starts_with('/') || target.starts_with("//") {
        return false;
    }
    if target.chars().any(|c| c == '\\' || c.is_control()) {
        return false;
    }

    let Ok(base) = Url::parse("http://dashboard.invalid/") else {
        return false;
    };
    match base.join(target) {
        Ok(resolved) => resolved.origin() == base.origin(),
        Err(_) => false,
    }
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}
