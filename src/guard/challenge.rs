//! CAPTCHA challenge gate. Runs once per submit when the policy engine asks
//! for it; without a token the credentials are never sent.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

/// Bot-mitigation widget producing an opaque verification token.
#[async_trait]
pub trait ChallengeWidget: Send + Sync {
    /// Runs the challenge; `None` when it failed or was dismissed.
    async fn execute(&self) -> Option<String>;
}

/// Widget backed by a token solved out of band (e.g. passed on the command line).
#[derive(Clone, Debug, Default)]
pub struct StaticChallenge {
    token: Option<SecretString>,
}

impl StaticChallenge {
    #[must_use]
    pub fn new(token: Option<SecretString>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl ChallengeWidget for StaticChallenge {
    async fn execute(&self) -> Option<String> {
        self.token
            .as_ref()
            .map(|token| token.expose_secret().to_string())
    }
}

/// Executes the widget and keeps the token only if it is non-blank.
pub async fn pass_gate(widget: &dyn ChallengeWidget) -> Option<String> {
    let token = widget
        .execute()
        .await
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    debug!(solved = token.is_some(), "challenge executed");

    token
}
