use crate::cli::{actions::status::print_banner, globals::GlobalArgs};
use crate::guard::{FormError, LoginForm, Outcome};
use anyhow::Result;
use chrono::Utc;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub email: Option<String>,
    pub password: SecretString,
    pub sign_out: bool,
}

/// Run the guarded sign-in once.
/// # Errors
/// Returns the form error (validation, policy denial, CAPTCHA, or provider
/// failure) so the process exits non-zero.
pub async fn execute(args: Args) -> Result<()> {
    let services = args.globals.services()?;
    let auth = Arc::clone(&services.auth);
    let mut sessions = auth.sessions();
    let mut form = LoginForm::new(services, args.globals.form_options(None));

    if let Some(email) = &args.email {
        form.set_email(email);
    }

    form.probe_now().await;
    print_banner(&form.banner(Utc::now()));
    if form.captcha_visible() {
        info!("backend requires a CAPTCHA token for this email");
    }

    let result = form.sign_in(&args.password).await;
    // The runtime shuts down once this returns; alerts must leave before.
    form.flush_alerts().await;

    match result {
        Ok(Outcome::Redirect { path }) => {
            if sessions.has_changed().unwrap_or(false) {
                if let Some(session) = sessions.borrow_and_update().as_ref() {
                    info!(
                        user = %session.user.id,
                        expires_in = session.expires_in,
                        "session established"
                    );
                }
            }
            println!("Login realizado. Redirecionando para {path}");

            if args.sign_out {
                auth.sign_out().await?;
                println!("Sessão encerrada.");
            }
            Ok(())
        }
        Ok(other) => {
            warn!(?other, "unexpected sign-in outcome");
            Ok(())
        }
        Err(err) => {
            if matches!(err, FormError::ChallengeRequired) {
                eprintln!("Use --captcha-token or AFFILIATE_CAPTCHA_TOKEN.");
            }
            print_banner(&form.banner(Utc::now()));
            Err(err.into())
        }
    }
}
