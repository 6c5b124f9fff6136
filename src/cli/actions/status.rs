use crate::cli::globals::GlobalArgs;
use crate::guard::{Banner, LoginForm, LoginState};
use anyhow::{bail, Result};
use chrono::Utc;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub email: Option<String>,
}

/// Probe once and print what the form would show.
/// # Errors
/// Returns an error if no email is available or the backend is misconfigured.
pub async fn execute(args: Args) -> Result<()> {
    let services = args.globals.services()?;
    let mut form = LoginForm::new(services, args.globals.form_options(None));

    if let Some(email) = &args.email {
        form.set_email(email);
    }
    if form.email().trim().is_empty() {
        bail!("no email given and none remembered; pass --email");
    }

    form.probe_now().await;

    let Some(status) = form.status() else {
        bail!("could not read the login status for {}", form.email());
    };
    debug!(?status, "probed login status");

    let now = Utc::now();
    let state = match LoginState::resolve(&status, now) {
        LoginState::Allowed => "allowed".to_string(),
        LoginState::CaptchaRequired => "captcha required".to_string(),
        LoginState::TemporarilyLocked { until } => format!("locked until {}", until.to_rfc3339()),
        LoginState::PermanentlyBlocked { .. } => "blocked".to_string(),
    };

    println!("email:     {}", form.email());
    println!("state:     {state}");
    println!("failures:  {}", status.failed_count);
    println!("remaining: {}", status.remaining_attempts.max(0));
    print_banner(&form.banner(now));

    Ok(())
}

pub(crate) fn print_banner(banner: &Banner) {
    if let Some(message) = banner.message(Utc::now()) {
        println!("{} {message}", banner.icon().glyph());
    }
}
