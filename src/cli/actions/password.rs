use crate::cli::globals::GlobalArgs;
use crate::guard::{LoginForm, Mode};
use anyhow::Result;
use secrecy::SecretString;

#[derive(Debug)]
pub struct ResetArgs {
    pub globals: GlobalArgs,
    pub email: String,
    pub redirect_to: Option<String>,
}

#[derive(Debug)]
pub struct UpdateArgs {
    pub globals: GlobalArgs,
    pub access_token: SecretString,
    pub password: SecretString,
}

/// Send the recovery email.
/// # Errors
/// Returns validation or provider errors.
pub async fn reset(args: ResetArgs) -> Result<()> {
    let services = args.globals.services()?;
    let mut form = LoginForm::new(services, args.globals.form_options(args.redirect_to));
    form.set_mode(Mode::ForgotPassword);
    form.set_email(&args.email);

    form.request_password_reset().await?;
    println!("Enviamos um link de recuperação para {}", form.email().trim());

    Ok(())
}

/// Set a new password from a recovery session.
/// # Errors
/// Returns validation or provider errors.
pub async fn update(args: UpdateArgs) -> Result<()> {
    let services = args.globals.services()?;
    let form = LoginForm::new(services, args.globals.form_options(None));

    form.update_password(&args.access_token, &args.password)
        .await?;
    println!("Senha atualizada.");

    Ok(())
}
