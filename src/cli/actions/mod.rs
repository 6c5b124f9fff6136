pub mod login;
pub mod password;
pub mod signup;
pub mod status;

// Internal "interpreter" for `Action`.
mod run;

#[derive(Debug)]
pub enum Action {
    Status(status::Args),
    Login(login::Args),
    Signup(signup::Args),
    ResetPassword(password::ResetArgs),
    UpdatePassword(password::UpdateArgs),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
