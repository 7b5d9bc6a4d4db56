use crate::cli::{
    actions::{account, session, Action, Context},
    globals::GlobalArgs,
};
use anyhow::Result;

/// Execute the provided action.
// Single dispatch point for all CLI actions. Navigation signals raised while
// the action ran are reported even when the action itself failed.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action, globals: &GlobalArgs) -> Result<()> {
    let mut context = Context::new(globals)?;

    let result = match action {
        Action::Signup(request) => account::signup(&context, &request).await,
        Action::Login(request) => account::login(&context, &request).await,
        Action::VerifyOtp(request) => account::verify_otp(&context, &request).await,
        Action::ResendOtp { email } => account::resend_otp(&context, &email).await,
        Action::ForgotPassword(request) => account::forgot_password(&context, &request).await,
        Action::ResetPassword(request) => account::reset_password(&context, &request).await,
        Action::Logout => account::logout(&context),
        Action::Profile => account::profile(&context).await,
        Action::AdminDashboard => account::admin_dashboard(&context).await,
        Action::Whoami => session::whoami(&context),
        Action::CheckAccess { route } => session::check_access(&context, &route),
    };

    for target in context.events.drain() {
        eprintln!("session ended, {target}");
    }

    result
}
