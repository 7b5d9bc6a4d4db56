//! Local-only actions: nothing here talks to the API.

use crate::auth::{Access, AccessGuard};
use crate::cli::actions::{print_json, Context};
use crate::session::SessionStore;
use anyhow::Result;
use serde_json::{json, Value};

fn describe_session(session: &SessionStore) -> Value {
    let user = session.current_user();
    json!({
        "authenticated": user.is_some(),
        "hasAccessToken": session.current_access_token().is_some(),
        "hasRefreshToken": session.current_refresh_token().is_some(),
        "user": user,
    })
}

fn describe_access(route: &str, access: &Access) -> Value {
    match access {
        Access::Allow => json!({ "route": route, "access": "allow" }),
        Access::Redirect(target) => json!({
            "route": route,
            "access": "redirect",
            "target": target.path(),
        }),
    }
}

/// # Errors
/// Returns an error if the output cannot be written.
pub fn whoami(context: &Context) -> Result<()> {
    print_json(&describe_session(context.session()))
}

/// # Errors
/// Returns an error if the output cannot be written.
pub fn check_access(context: &Context, route: &str) -> Result<()> {
    let access = AccessGuard::default().check(route, context.session());
    print_json(&describe_access(route, &access))
}
