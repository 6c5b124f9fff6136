use crate::backend::{
    BackendClient, BackendConfig, Error, HttpAuthProvider, HttpNotifier, RpcPolicyEngine,
};
use crate::cli::commands::backend::Options;
use crate::guard::{
    default_state_dir, AuthServices, EmailStore, FileEmailStore, FormOptions, MemoryEmailStore,
    StaticChallenge,
};
use secrecy::SecretString;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::debug;

/// Settings shared by every subcommand.
#[derive(Clone)]
pub struct GlobalArgs {
    pub backend_url: String,
    pub anon_key: SecretString,
    pub timeout: Duration,
    pub captcha_token: Option<SecretString>,
    pub client_ip: Option<String>,
    pub state_dir: Option<PathBuf>,
    pub remember_email: bool,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self {
            backend_url: options.url,
            anon_key: options.anon_key,
            timeout: options.timeout,
            captcha_token: options.captcha_token,
            client_ip: options.client_ip,
            state_dir: options.state_dir.or_else(default_state_dir),
            remember_email: options.remember_email,
        }
    }

    /// Wires the HTTP implementations of every collaborator the form needs.
    ///
    /// # Errors
    /// Returns an error if the backend URL is invalid or the HTTP client
    /// cannot be built.
    pub fn services(&self) -> Result<AuthServices, Error> {
        let config = BackendConfig::new(&self.backend_url, self.anon_key.clone())?
            .with_timeout(self.timeout);
        let client = BackendClient::new(config)?;

        Ok(AuthServices {
            policy: Arc::new(RpcPolicyEngine::new(client.clone())),
            auth: Arc::new(HttpAuthProvider::new(client.clone())),
            challenge: Arc::new(StaticChallenge::new(self.captcha_token.clone())),
            notifier: Arc::new(HttpNotifier::new(client)),
            emails: self.email_store(),
        })
    }

    #[must_use]
    pub fn form_options(&self, recovery_redirect: Option<String>) -> FormOptions {
        FormOptions {
            client_ip: self.client_ip.clone(),
            recovery_redirect,
            ..FormOptions::default()
        }
    }

    fn email_store(&self) -> Arc<dyn EmailStore> {
        match (&self.state_dir, self.remember_email) {
            (Some(dir), true) => {
                let store = FileEmailStore::in_dir(dir);
                debug!(path = %store.path().display(), "remembering last email");
                Arc::new(store)
            }
            _ => Arc::new(MemoryEmailStore::default()),
        }
    }
}

impl std::fmt::Debug for GlobalArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalArgs")
            .field("backend_url", &self.backend_url)
            .field("anon_key", &"***")
            .field("timeout", &self.timeout)
            .field(
                "captcha_token",
                &self.captcha_token.as_ref().map(|_| "***"),
            )
            .field("client_ip", &self.client_ip)
            .field("state_dir", &self.state_dir)
            .field("remember_email", &self.remember_email)
            .finish()
    }
}
