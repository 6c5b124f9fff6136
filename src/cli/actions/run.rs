use crate::cli::actions::{login, password, signup, status, Action};
use anyhow::Result;

/// Execute the provided action.
// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Status(args) => status::execute(args).await,
        Action::Login(args) => login::execute(args).await,
        Action::Signup(args) => signup::execute(args).await,
        Action::ResetPassword(args) => password::reset(args).await,
        Action::UpdatePassword(args) => password::update(args).await,
    }
}
