//! Route gating from the session's point of view.
//!
//! This is a UX-only guard: it decides whether a screen should be shown, it
//! does not protect anything. Real access control lives on the API.

use crate::navigation::Redirect;
use crate::session::SessionStore;
use std::collections::BTreeSet;

pub const ADMIN_ROLE: &str = "ROLE_ADMIN";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Allow,
    Redirect(Redirect),
}

/// Decides access from session facts alone.
#[must_use]
pub fn decide(
    is_authenticated: bool,
    roles: &BTreeSet<String>,
    required_role: Option<&str>,
) -> Access {
    if !is_authenticated {
        return Access::Redirect(Redirect::Login);
    }

    match required_role {
        Some(role) if !roles.contains(role) => Access::Redirect(Redirect::Unauthorized),
        _ => Access::Allow,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Requirement {
    Public,
    Authenticated,
    Role(String),
}

#[derive(Clone, Debug)]
pub struct RouteRule {
    pub path: String,
    pub requirement: Requirement,
}

impl RouteRule {
    pub fn new(path: impl Into<String>, requirement: Requirement) -> Self {
        Self {
            path: path.into(),
            requirement,
        }
    }

    /// Matches whole segments: `/admin` covers `/admin/users` but not
    /// `/administrator`.
    fn matches(&self, route: &str) -> bool {
        let prefix = self.path.trim_end_matches('/');
        if prefix.is_empty() {
            return route == "/";
        }
        route == prefix
            || route
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

#[derive(Clone, Debug)]
pub struct AccessGuard {
    rules: Vec<RouteRule>,
}

impl Default for AccessGuard {
    fn default() -> Self {
        let public = [
            "/",
            "/login",
            "/signup",
            "/verify-otp",
            "/forgot-password",
            "/reset-password",
            "/unauthorized",
        ];

        let mut rules: Vec<RouteRule> = public
            .into_iter()
            .map(|path| RouteRule::new(path, Requirement::Public))
            .collect();
        rules.push(RouteRule::new("/dashboard", Requirement::Authenticated));
        rules.push(RouteRule::new(
            "/admin",
            Requirement::Role(ADMIN_ROLE.to_string()),
        ));

        Self { rules }
    }
}

impl AccessGuard {
    #[must_use]
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    /// Resolves the requirement for a route. The longest matching rule wins;
    /// unknown routes require an authenticated session.
    #[must_use]
    pub fn requirement(&self, route: &str) -> Requirement {
        let route = normalize_route(route);
        self.rules
            .iter()
            .filter(|rule| rule.matches(&route))
            .max_by_key(|rule| rule.path.trim_end_matches('/').len())
            .map_or(Requirement::Authenticated, |rule| rule.requirement.clone())
    }

    #[must_use]
    pub fn check(&self, route: &str, session: &SessionStore) -> Access {
        match self.requirement(route) {
            Requirement::Public => Access::Allow,
            Requirement::Authenticated => decide(session.is_authenticated(), &session.roles(), None),
            Requirement::Role(role) => {
                decide(session.is_authenticated(), &session.roles(), Some(role.as_str()))
            }
        }
    }
}

/// Drops query and fragment, ensures a leading slash and no trailing slash.
fn normalize_route(route: &str) -> String {
    let route = route
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim();
    let route = route.trim_end_matches('/');

    if route.is_empty() {
        "/".to_string()
    } else if route.starts_with('/') {
        route.to_string()
    } else {
        format!("/{route}")
    }
}
