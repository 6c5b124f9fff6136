//! Maps validated CLI matches to an [`Action`].

use crate::cli::actions::{login, password, signup, status, Action};
use crate::cli::commands::{account, backend};
use crate::cli::globals::GlobalArgs;
use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;

fn required(matches: &ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .with_context(|| format!("missing required argument: --{id}"))
}

fn secret(matches: &ArgMatches, id: &str) -> Result<SecretString> {
    required(matches, id).map(SecretString::from)
}

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let globals = GlobalArgs::new(backend::Options::parse(matches)?);

    let Some((name, sub)) = matches.subcommand() else {
        bail!("missing subcommand");
    };

    let action = match name {
        account::CMD_STATUS => Action::Status(status::Args {
            globals,
            email: sub.get_one::<String>(account::ARG_EMAIL).cloned(),
        }),
        account::CMD_LOGIN => Action::Login(login::Args {
            globals,
            email: sub.get_one::<String>(account::ARG_EMAIL).cloned(),
            password: secret(sub, account::ARG_PASSWORD)?,
            sign_out: sub.get_flag(account::ARG_SIGN_OUT),
        }),
        account::CMD_SIGNUP => Action::Signup(signup::Args {
            globals,
            name: required(sub, account::ARG_NAME)?,
            email: required(sub, account::ARG_EMAIL)?,
            password: secret(sub, account::ARG_PASSWORD)?,
        }),
        account::CMD_RESET_PASSWORD => Action::ResetPassword(password::ResetArgs {
            globals,
            email: required(sub, account::ARG_EMAIL)?,
            redirect_to: sub.get_one::<String>(account::ARG_REDIRECT_TO).cloned(),
        }),
        account::CMD_UPDATE_PASSWORD => Action::UpdatePassword(password::UpdateArgs {
            globals,
            access_token: secret(sub, account::ARG_ACCESS_TOKEN)?,
            password: secret(sub, account::ARG_PASSWORD)?,
        }),
        other => bail!("unknown subcommand: {other}"),
    };

    Ok(action)
}
