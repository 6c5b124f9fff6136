//! Failed-login alerts sent through a backend edge function. Delivery is best
//! effort: callers spawn it and only log failures.

use super::{BackendClient, Error};
use async_trait::async_trait;
use serde::Serialize;
use tracing::instrument;

const LOGIN_ALERT_FUNCTION: &str = "/functions/v1/login-attempt-alert";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoginAlert {
    pub email: String,
    pub failed_count: u32,
    pub is_blocked: bool,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &LoginAlert) -> Result<(), Error>;
}

#[derive(Clone, Debug)]
pub struct HttpNotifier {
    client: BackendClient,
}

impl HttpNotifier {
    #[must_use]
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    #[instrument(skip_all, fields(failed_count = alert.failed_count, is_blocked = alert.is_blocked))]
    async fn notify(&self, alert: &LoginAlert) -> Result<(), Error> {
        self.client.post_json_empty(LOGIN_ALERT_FUNCTION, alert).await
    }
}
