use crate::auth::types::{
    ForgotPasswordRequest, LoginRequest, OtpVerificationRequest, ResetPasswordRequest,
    SignupRequest,
};
use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::{anyhow, Context, Result};

fn required(matches: &clap::ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing required argument: --{name}"))
}

/// # Errors
/// Returns an error if the subcommand is unknown or required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<(Action, GlobalArgs)> {
    let globals = GlobalArgs::from_matches(matches);

    let Some((name, sub_m)) = matches.subcommand() else {
        return Err(anyhow!("missing command"));
    };

    let action = match name {
        "signup" => Action::Signup(SignupRequest {
            email: required(sub_m, "email")?,
            password: required(sub_m, "password")?,
            first_name: required(sub_m, "first-name")?,
            last_name: required(sub_m, "last-name")?,
        }),
        "login" => Action::Login(LoginRequest {
            email: required(sub_m, "email")?,
            password: required(sub_m, "password")?,
        }),
        "verify-otp" => Action::VerifyOtp(OtpVerificationRequest {
            email: required(sub_m, "email")?,
            otp: required(sub_m, "otp")?,
        }),
        "resend-otp" => Action::ResendOtp {
            email: required(sub_m, "email")?,
        },
        "forgot-password" => Action::ForgotPassword(ForgotPasswordRequest {
            email: required(sub_m, "email")?,
        }),
        "reset-password" => Action::ResetPassword(ResetPasswordRequest {
            email: required(sub_m, "email")?,
            otp: required(sub_m, "otp")?,
            new_password: required(sub_m, "new-password")?,
        }),
        "logout" => Action::Logout,
        "profile" => Action::Profile,
        "admin-dashboard" => Action::AdminDashboard,
        "whoami" => Action::Whoami,
        "check-access" => Action::CheckAccess {
            route: required(sub_m, "route")?,
        },
        other => return Err(anyhow!("unknown command: {other}")),
    };

    Ok((action, globals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    fn dispatch(args: &[&str]) -> Action {
        temp_env::with_vars(
            [
                ("AUTHKEEPER_PASSWORD", None::<&str>),
                ("AUTHKEEPER_API_URL", None),
            ],
            || {
                let matches = commands::new().get_matches_from(args.to_vec());
                handler(&matches).unwrap().0
            },
        )
    }

    #[test]
    fn test_dispatch_reset_password() {
        let action = dispatch(&[
            "authkeeper",
            "reset-password",
            "--email",
            "ada@example.com",
            "--otp",
            "123456",
            "--new-password",
            "Better@1234",
        ]);
        let Action::ResetPassword(request) = action else {
            panic!("unexpected action: {action:?}");
        };
        assert_eq!(request.email, "ada@example.com");
        assert_eq!(request.otp, "123456");
        assert_eq!(request.new_password, "Better@1234");
    }

    #[test]
    fn test_dispatch_check_access() {
        let action = dispatch(&["authkeeper", "check-access", "--route", "/admin"]);
        assert!(matches!(action, Action::CheckAccess { route } if route == "/admin"));
    }

    #[test]
    fn test_dispatch_simple_commands() {
        assert!(matches!(dispatch(&["authkeeper", "logout"]), Action::Logout));
        assert!(matches!(dispatch(&["authkeeper", "profile"]), Action::Profile));
        assert!(matches!(
            dispatch(&["authkeeper", "admin-dashboard"]),
            Action::AdminDashboard
        ));
        assert!(matches!(
            dispatch(&["authkeeper", "resend-otp", "-e", "ada@example.com"]),
            Action::ResendOtp { email } if email == "ada@example.com"
        ));
    }
}
