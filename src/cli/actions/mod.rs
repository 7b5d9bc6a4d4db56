pub mod account;
pub mod session;

// Internal "interpreter" for `Action`.
// The match lives in `run` so this module stays a plain list of actions.
mod run;

use crate::auth::{
    types::{
        ForgotPasswordRequest, LoginRequest, OtpVerificationRequest, ResetPasswordRequest,
        SignupRequest,
    },
    AuthFacade,
};
use crate::cli::globals::GlobalArgs;
use crate::http::ApiClient;
use crate::navigation::{NavigationEvents, Navigator};
use crate::session::{storage::FileStorage, SessionStore};
use anyhow::{Context as _, Result};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug)]
pub enum Action {
    Signup(SignupRequest),
    Login(LoginRequest),
    VerifyOtp(OtpVerificationRequest),
    ResendOtp { email: String },
    ForgotPassword(ForgotPasswordRequest),
    ResetPassword(ResetPasswordRequest),
    Logout,
    Profile,
    AdminDashboard,
    Whoami,
    CheckAccess { route: String },
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self, globals: &GlobalArgs) -> Result<()> {
        run::execute(self, globals).await
    }
}

/// Everything an action needs: the facade over a file-backed session and the
/// receiving end of navigation signals.
pub struct Context {
    pub facade: AuthFacade,
    pub events: NavigationEvents,
}

impl Context {
    /// # Errors
    /// Returns an error if the client configuration is invalid.
    pub fn new(globals: &GlobalArgs) -> Result<Self> {
        let storage = FileStorage::new(globals.store_path.clone());
        let session = Arc::new(SessionStore::new(storage));
        let (navigator, events) = Navigator::channel();

        let client = ApiClient::new(&globals.client_config(), session, navigator)
            .context("failed to build API client")?;

        Ok(Self {
            facade: AuthFacade::new(Arc::new(client)),
            events,
        })
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        self.facade.client().session()
    }
}

/// Writes a value to stdout as pretty JSON.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
