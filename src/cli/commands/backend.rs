use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};

pub const ARG_BACKEND_URL: &str = "backend-url";
pub const ARG_ANON_KEY: &str = "anon-key";
pub const ARG_TIMEOUT_SECONDS: &str = "timeout-seconds";
pub const ARG_CAPTCHA_TOKEN: &str = "captcha-token";
pub const ARG_CLIENT_IP: &str = "client-ip";
pub const ARG_STATE_DIR: &str = "state-dir";
pub const ARG_NO_REMEMBER: &str = "no-remember";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BACKEND_URL)
                .long(ARG_BACKEND_URL)
                .help("Backend base URL, example: https://project.example.co")
                .env("AFFILIATE_BACKEND_URL")
                .global(true),
        )
        .arg(
            Arg::new(ARG_ANON_KEY)
                .long(ARG_ANON_KEY)
                .help("Public (anonymous) API key sent with every backend call")
                .env("AFFILIATE_ANON_KEY")
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            Arg::new(ARG_TIMEOUT_SECONDS)
                .long(ARG_TIMEOUT_SECONDS)
                .help("Backend request timeout in seconds")
                .env("AFFILIATE_TIMEOUT_SECONDS")
                .default_value("10")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..=300)),
        )
        .arg(
            Arg::new(ARG_CAPTCHA_TOKEN)
                .long(ARG_CAPTCHA_TOKEN)
                .help("Token from a solved CAPTCHA, used when the backend asks for one")
                .env("AFFILIATE_CAPTCHA_TOKEN")
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            Arg::new(ARG_CLIENT_IP)
                .long(ARG_CLIENT_IP)
                .help("Client IP address reported with failed attempts")
                .env("AFFILIATE_CLIENT_IP")
                .global(true),
        )
        .arg(
            Arg::new(ARG_STATE_DIR)
                .long(ARG_STATE_DIR)
                .help("Directory holding the remembered email (default: user config dir)")
                .env("AFFILIATE_STATE_DIR")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_NO_REMEMBER)
                .long(ARG_NO_REMEMBER)
                .help("Do not read or store the last signed-in email")
                .global(true)
                .action(ArgAction::SetTrue),
        )
}

#[derive(Debug)]
pub struct Options {
    pub url: String,
    pub anon_key: SecretString,
    pub timeout: Duration,
    pub captcha_token: Option<SecretString>,
    pub client_ip: Option<String>,
    pub state_dir: Option<PathBuf>,
    pub remember_email: bool,
}

impl Options {
    /// # Errors
    /// Returns an error if the backend URL or API key is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let url = matches
            .get_one::<String>(ARG_BACKEND_URL)
            .cloned()
            .context("missing required argument: --backend-url")?;
        let anon_key = matches
            .get_one::<String>(ARG_ANON_KEY)
            .cloned()
            .map(SecretString::from)
            .context("missing required argument: --anon-key")?;
        let timeout = matches
            .get_one::<u64>(ARG_TIMEOUT_SECONDS)
            .copied()
            .map_or(crate::backend::DEFAULT_TIMEOUT, Duration::from_secs);

        Ok(Self {
            url,
            anon_key,
            timeout,
            captcha_token: matches
                .get_one::<String>(ARG_CAPTCHA_TOKEN)
                .filter(|token| !token.trim().is_empty())
                .cloned()
                .map(SecretString::from),
            client_ip: matches.get_one::<String>(ARG_CLIENT_IP).cloned(),
            state_dir: matches.get_one::<PathBuf>(ARG_STATE_DIR).cloned(),
            remember_email: !matches.get_flag(ARG_NO_REMEMBER),
        })
    }
}
