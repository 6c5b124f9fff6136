use clap::{Arg, ArgAction, Command};

pub const CMD_STATUS: &str = "status";
pub const CMD_LOGIN: &str = "login";
pub const CMD_SIGNUP: &str = "signup";
pub const CMD_RESET_PASSWORD: &str = "reset-password";
pub const CMD_UPDATE_PASSWORD: &str = "update-password";

pub const ARG_EMAIL: &str = "email";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_NAME: &str = "name";
pub const ARG_REDIRECT_TO: &str = "redirect-to";
pub const ARG_ACCESS_TOKEN: &str = "access-token";
pub const ARG_SIGN_OUT: &str = "sign-out";

fn email(required: bool) -> Arg {
    Arg::new(ARG_EMAIL)
        .short('e')
        .long(ARG_EMAIL)
        .help("Account email")
        .required(required)
}

fn password() -> Arg {
    Arg::new(ARG_PASSWORD)
        .short('p')
        .long(ARG_PASSWORD)
        .help("Account password")
        .env("AFFILIATE_PASSWORD")
        .hide_env_values(true)
        .required(true)
}

#[must_use]
pub fn with_subcommands(command: Command) -> Command {
    command
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new(CMD_STATUS)
                .about("Probe the login status of an email and show the warning banner")
                .arg(email(false).help("Account email (default: last signed-in email)")),
        )
        .subcommand(
            Command::new(CMD_LOGIN)
                .about("Sign in, honouring CAPTCHA, lockout and block decisions")
                .arg(email(false).help("Account email (default: last signed-in email)"))
                .arg(password())
                .arg(
                    Arg::new(ARG_SIGN_OUT)
                        .long(ARG_SIGN_OUT)
                        .help("Revoke the session right after signing in")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new(CMD_SIGNUP)
                .about("Create an account")
                .arg(
                    Arg::new(ARG_NAME)
                        .short('n')
                        .long(ARG_NAME)
                        .help("Full name")
                        .required(true),
                )
                .arg(email(true))
                .arg(password()),
        )
        .subcommand(
            Command::new(CMD_RESET_PASSWORD)
                .about("Send a password recovery email")
                .arg(email(true))
                .arg(
                    Arg::new(ARG_REDIRECT_TO)
                        .long(ARG_REDIRECT_TO)
                        .help("URL the recovery link returns to")
                        .env("AFFILIATE_RECOVERY_REDIRECT"),
                ),
        )
        .subcommand(
            Command::new(CMD_UPDATE_PASSWORD)
                .about("Set a new password using the access token from a recovery link")
                .arg(
                    Arg::new(ARG_ACCESS_TOKEN)
                        .long(ARG_ACCESS_TOKEN)
                        .help("Access token from the recovery link")
                        .env("AFFILIATE_ACCESS_TOKEN")
                        .hide_env_values(true)
                        .required(true),
                )
                .arg(password().help("New password")),
        )
}
