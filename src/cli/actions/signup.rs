use crate::cli::globals::GlobalArgs;
use crate::guard::{LoginForm, Mode, Outcome};
use anyhow::Result;
use secrecy::SecretString;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub name: String,
    pub email: String,
    pub password: SecretString,
}

/// # Errors
/// Returns validation or provider errors.
pub async fn execute(args: Args) -> Result<()> {
    let services = args.globals.services()?;
    let mut form = LoginForm::new(services, args.globals.form_options(None));
    form.set_mode(Mode::Signup);
    form.set_email(&args.email);

    match form.submit(&args.password, &args.name).await? {
        Outcome::ConfirmEmail => {
            println!("Conta criada. Verifique seu email para confirmar o cadastro.");
        }
        Outcome::Redirect { path } => {
            println!("Conta criada. Redirecionando para {path}");
        }
        Outcome::ResetEmailSent | Outcome::PasswordUpdated => {}
    }

    Ok(())
}
