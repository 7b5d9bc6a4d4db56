use crate::auth::types::{
    ForgotPasswordRequest, LoginRequest, OtpVerificationRequest, ResetPasswordRequest,
    SignupRequest,
};
use crate::cli::actions::{print_json, Context};
use anyhow::Result;
use serde_json::json;

/// # Errors
/// Returns an error if the API call fails.
pub async fn signup(context: &Context, request: &SignupRequest) -> Result<()> {
    print_json(&context.facade.signup(request).await?)
}

/// # Errors
/// Returns an error if the API call fails or the session cannot be stored.
pub async fn login(context: &Context, request: &LoginRequest) -> Result<()> {
    let user = context.facade.login(request).await?;
    print_json(&json!({ "authenticated": true, "user": user }))
}

/// # Errors
/// Returns an error if the API call fails.
pub async fn verify_otp(context: &Context, request: &OtpVerificationRequest) -> Result<()> {
    print_json(&context.facade.verify_otp(request).await?)
}

/// # Errors
/// Returns an error if the API call fails.
pub async fn resend_otp(context: &Context, email: &str) -> Result<()> {
    print_json(&context.facade.resend_otp(email).await?)
}

/// # Errors
/// Returns an error if the API call fails.
pub async fn forgot_password(context: &Context, request: &ForgotPasswordRequest) -> Result<()> {
    print_json(&context.facade.forgot_password(request).await?)
}

/// # Errors
/// Returns an error if the API call fails.
pub async fn reset_password(context: &Context, request: &ResetPasswordRequest) -> Result<()> {
    print_json(&context.facade.reset_password(request).await?)
}

/// # Errors
/// Returns an error if the session file cannot be updated.
pub fn logout(context: &Context) -> Result<()> {
    context.facade.logout()?;
    print_json(&json!({ "authenticated": false }))
}

/// # Errors
/// Returns an error if the API call fails after the refresh cycle.
pub async fn profile(context: &Context) -> Result<()> {
    print_json(&context.facade.profile().await?)
}

/// # Errors
/// Returns an error if the API call fails after the refresh cycle.
pub async fn admin_dashboard(context: &Context) -> Result<()> {
    print_json(&context.facade.admin_dashboard().await?)
}
