//! Explicitly constructed collaborators for the login form. Built once at
//! start-up and handed down; nothing here is a module-level singleton.

use super::{challenge::ChallengeWidget, prober::DEFAULT_DEBOUNCE, storage::EmailStore};
use crate::backend::{AuthProvider, Notifier, PolicyEngine};
use std::{sync::Arc, time::Duration};

#[derive(Clone)]
pub struct AuthServices {
    pub policy: Arc<dyn PolicyEngine>,
    pub auth: Arc<dyn AuthProvider>,
    pub challenge: Arc<dyn ChallengeWidget>,
    pub notifier: Arc<dyn Notifier>,
    pub emails: Arc<dyn EmailStore>,
}

#[derive(Clone, Debug)]
pub struct FormOptions {
    pub debounce: Duration,
    /// Client address forwarded to `record_failed_login`, when known.
    pub client_ip: Option<String>,
    /// Where recovery emails should send the user back to.
    pub recovery_redirect: Option<String>,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            client_ip: None,
            recovery_redirect: None,
        }
    }
}
