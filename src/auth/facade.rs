//! Thin wrappers over the auth API endpoints. Only `login` and `logout` touch
//! the session; every other call is a pass-through whose errors reach the
//! caller unchanged.

use crate::auth::types::{
    ApiMessage, ForgotPasswordRequest, LoginRequest, LoginResponse, OtpVerificationRequest,
    ResetPasswordRequest, SignupRequest,
};
use crate::error::Result;
use crate::http::ApiClient;
use crate::session::UserRecord;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use url::form_urlencoded;

pub const SIGNUP_PATH: &str = "/auth/signup";
pub const LOGIN_PATH: &str = "/auth/login";
pub const VERIFY_OTP_PATH: &str = "/auth/verify-otp";
pub const RESEND_OTP_PATH: &str = "/auth/resend-otp";
pub const FORGOT_PASSWORD_PATH: &str = "/auth/forgot-password";
pub const RESET_PASSWORD_PATH: &str = "/auth/reset-password";
pub const PROFILE_PATH: &str = "/user/profile";
pub const ADMIN_DASHBOARD_PATH: &str = "/admin/dashboard";

#[derive(Clone)]
pub struct AuthFacade {
    client: Arc<ApiClient>,
}

impl AuthFacade {
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Creates an account; the server then sends a one-time code by email.
    /// # Errors
    /// Propagates transport and HTTP errors.
    #[instrument(skip_all)]
    pub async fn signup(&self, request: &SignupRequest) -> Result<ApiMessage> {
        self.client.post_json(SIGNUP_PATH, request).await
    }

    /// Logs in and commits the returned user and tokens to the session.
    /// The session is left untouched unless both tokens are present, and no
    /// token is committed unless the user record was written first.
    /// # Errors
    /// Returns `Error::Validation` when a token is missing, `Error::Storage`
    /// when the session cannot be persisted, or the transport/HTTP error.
    #[instrument(skip_all)]
    pub async fn login(&self, request: &LoginRequest) -> Result<Option<UserRecord>> {
        let response: LoginResponse = self.client.post_json(LOGIN_PATH, request).await?;
        let (access_token, refresh_token) = response.tokens()?;

        let session = self.client.session();
        match &response.user {
            Some(user) => session.set_user(user)?,
            None => {
                warn!("login response carried no user record");
                session.clear_user()?;
            }
        }

        if let Err(err) = session.set_session(Some(access_token), Some(refresh_token)) {
            warn!("failed to persist login session: {}", err);
            if let Err(cleanup) = session.clear_session() {
                warn!("failed to clear partial session: {}", cleanup);
            }
            return Err(err);
        }

        info!("login succeeded");

        Ok(response.user)
    }

    /// # Errors
    /// Propagates transport and HTTP errors.
    #[instrument(skip_all)]
    pub async fn verify_otp(&self, request: &OtpVerificationRequest) -> Result<ApiMessage> {
        self.client.post_json(VERIFY_OTP_PATH, request).await
    }

    /// # Errors
    /// Propagates transport and HTTP errors.
    #[instrument(skip_all)]
    pub async fn resend_otp(&self, email: &str) -> Result<ApiMessage> {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("email", email)
            .finish();
        self.client
            .post_empty(&format!("{RESEND_OTP_PATH}?{query}"))
            .await
    }

    /// # Errors
    /// Propagates transport and HTTP errors.
    #[instrument(skip_all)]
    pub async fn forgot_password(&self, request: &ForgotPasswordRequest) -> Result<ApiMessage> {
        self.client.post_json(FORGOT_PASSWORD_PATH, request).await
    }

    /// # Errors
    /// Propagates transport and HTTP errors.
    #[instrument(skip_all)]
    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<ApiMessage> {
        self.client.post_json(RESET_PASSWORD_PATH, request).await
    }

    /// Clears the local session. No server call is made.
    /// # Errors
    /// Returns `Error::Storage` if durable keys cannot be removed.
    pub fn logout(&self) -> Result<()> {
        self.client.session().clear_session()?;
        info!("logged out");
        Ok(())
    }

    /// # Errors
    /// Propagates transport and HTTP errors after the refresh cycle, if any.
    pub async fn profile(&self) -> Result<ApiMessage> {
        self.client.get_json(PROFILE_PATH).await
    }

    /// # Errors
    /// Propagates transport and HTTP errors after the refresh cycle, if any.
    pub async fn admin_dashboard(&self) -> Result<Value> {
        self.client.get_json(ADMIN_DASHBOARD_PATH).await
    }
}
