//! Static route table and navigation targets.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every route declares whether it needs an authenticated session. The route
//! guard consults this table before any transition; the session layer only
//! ever targets the login entry point.

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;

use std::fmt;

use url::form_urlencoded;

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const HOME_PATH: &str = "/";

/// Query parameter carrying the post-login redirect target.
pub const REDIRECT_PARAM: &str = "redirect";

/// Entry points reachable without a session.
pub const PUBLIC_ROUTE_PATHS: [&str; 3] = [LOGIN_PATH, REGISTER_PATH, HOME_PATH];

// =============================================================================
// ROUTE TABLE
// =============================================================================

/// A statically declared route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDef {
    pub name: &'static str,
    /// Path pattern; `:name` segments match any single segment.
    pub pattern: &'static str,
    pub requires_auth: bool,
}

pub const ROUTES: &[RouteDef] = &[
    RouteDef { name: "Home", pattern: HOME_PATH, requires_auth: false },
    RouteDef { name: "Dashboard", pattern: "/dashboard", requires_auth: true },
    RouteDef { name: "Documents", pattern: "/documents", requires_auth: true },
    RouteDef { name: "DocumentDetail", pattern: "/documents/:id", requires_auth: true },
    RouteDef { name: "Upload", pattern: "/upload", requires_auth: true },
    RouteDef { name: "Search", pattern: "/search", requires_auth: false },
    RouteDef { name: "Login", pattern: LOGIN_PATH, requires_auth: false },
    RouteDef { name: "Register", pattern: REGISTER_PATH, requires_auth: false },
];

/// Resolve `path` against the route table.
#[must_use]
pub fn resolve(path: &str) -> Option<&'static RouteDef> {
    let path = normalize_path(path);
    ROUTES.iter().find(|route| pattern_matches(route.pattern, path))
}

/// Whether navigating to `path` requires a valid session. Unknown paths are
/// unprotected.
#[must_use]
pub fn requires_auth(path: &str) -> bool {
    resolve(path).is_some_and(|route| route.requires_auth)
}

fn normalize_path(path: &str) -> &str {
    if path.len() > 1 { path.trim_end_matches('/') } else { path }
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    let mut pattern_segments = pattern.split('/');
    let mut path_segments = path.split('/');
    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some(p), Some(s)) if p.starts_with(':') && !s.is_empty() => {}
            (Some(p), Some(s)) if p == s => {}
            _ => return false,
        }
    }
}

// =============================================================================
// LOCATION
// =============================================================================

/// A navigation target: path plus ordered query pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Location {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), query: Vec::new() }
    }

    /// Parse a `path?query` string. Query values are percent-decoded.
    #[must_use]
    pub fn parse(full_path: &str) -> Self {
        let (path, query) = full_path.split_once('?').unwrap_or((full_path, ""));
        let path = if path.is_empty() { HOME_PATH } else { path };
        let query = form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { path: path.to_owned(), query }
    }

    /// The login entry point without a redirect target.
    #[must_use]
    pub fn login() -> Self {
        Self::new(LOGIN_PATH)
    }

    /// The login entry point carrying `target` as the redirect parameter.
    #[must_use]
    pub fn login_with_redirect(target: &str) -> Self {
        Self::login().with_query(REDIRECT_PARAM, target)
    }

    #[must_use]
    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_owned(), value.to_owned()));
        self
    }

    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn is_login(&self) -> bool {
        normalize_path(&self.path) == LOGIN_PATH
    }

    /// Path with percent-encoded query string.
    #[must_use]
    pub fn full_path(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}?{query}", self.path)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_path())
    }
}
