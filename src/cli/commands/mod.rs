use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

pub const DEFAULT_STORE_PATH: &str = ".authkeeper/session.json";

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

fn email_arg() -> Arg {
    Arg::new("email")
        .short('e')
        .long("email")
        .help("Account email address")
        .required(true)
}

fn password_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .help(help)
        .env("AUTHKEEPER_PASSWORD")
        .hide_env_values(true)
        .required(true)
}

fn otp_arg() -> Arg {
    Arg::new("otp")
        .long("otp")
        .help("One-time code received by email")
        .required(true)
}

fn subcommands() -> Vec<Command> {
    vec![
        Command::new("signup")
            .about("Create an account")
            .arg(email_arg())
            .arg(password_arg("password", "Account password"))
            .arg(
                Arg::new("first-name")
                    .long("first-name")
                    .help("First name")
                    .required(true),
            )
            .arg(
                Arg::new("last-name")
                    .long("last-name")
                    .help("Last name")
                    .required(true),
            ),
        Command::new("login")
            .about("Log in and store the session")
            .arg(email_arg())
            .arg(password_arg("password", "Account password")),
        Command::new("verify-otp")
            .about("Confirm the one-time code sent after signup")
            .arg(email_arg())
            .arg(otp_arg()),
        Command::new("resend-otp")
            .about("Send a new one-time code")
            .arg(email_arg()),
        Command::new("forgot-password")
            .about("Start a password reset")
            .arg(email_arg()),
        Command::new("reset-password")
            .about("Complete a password reset")
            .arg(email_arg())
            .arg(otp_arg())
            .arg(password_arg("new-password", "New account password")),
        Command::new("logout").about("Forget the stored session"),
        Command::new("profile").about("Fetch the user profile"),
        Command::new("admin-dashboard").about("Fetch the admin dashboard"),
        Command::new("whoami").about("Show the stored session state"),
        Command::new("check-access")
            .about("Decide whether a route is reachable with the stored session")
            .arg(
                Arg::new("route")
                    .short('r')
                    .long("route")
                    .help("Application route, example: /admin")
                    .required(true),
            ),
    ]
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    Command::new("authkeeper")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("api-url")
                .short('u')
                .long("api-url")
                .help("Auth API base URL, example: https://auth.tld/api (default: http://localhost:8080/api)")
                .env("AUTHKEEPER_API_URL")
                .global(true),
        )
        .arg(
            Arg::new("store")
                .short('s')
                .long("store")
                .help("Session file holding the refresh token and user record")
                .default_value(DEFAULT_STORE_PATH)
                .env("AUTHKEEPER_STORE")
                .global(true),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .help("Request timeout in seconds (default: 10)")
                .env("AUTHKEEPER_TIMEOUT")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("public-endpoint")
                .long("public-endpoint")
                .help("Extra path pattern sent without a bearer token, may be repeated")
                .global(true)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("AUTHKEEPER_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .subcommands(subcommands())
}
