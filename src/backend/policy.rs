//! Client for the login policy engine: database RPCs that own attempt
//! counting, CAPTCHA escalation, and lockouts. The client only relays what the
//! engine decides; thresholds are never computed here.

use super::{BackendClient, Error};
use crate::guard::LoginStatus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const CHECK_LOGIN_ALLOWED: &str = "/rest/v1/rpc/check_login_allowed";
const RECORD_FAILED_LOGIN: &str = "/rest/v1/rpc/record_failed_login";
const RESET_LOGIN_ATTEMPTS: &str = "/rest/v1/rpc/reset_login_attempts";

/// What the engine answers after a failed attempt has been recorded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedLoginRecord {
    #[serde(default)]
    pub failed_count: u32,
    #[serde(default)]
    pub is_blocked: bool,
    #[serde(default)]
    pub locked_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub should_notify: bool,
    #[serde(default)]
    pub requires_captcha: bool,
}

/// Login policy operations, keyed by email.
#[async_trait]
pub trait PolicyEngine: Send + Sync {
    /// Read-only status check used by the probe.
    async fn check_login_allowed(&self, email: &str) -> Result<LoginStatus, Error>;

    /// Counts one failed attempt and returns the updated decision.
    async fn record_failed_login(
        &self,
        email: &str,
        ip_address: Option<&str>,
    ) -> Result<FailedLoginRecord, Error>;

    /// Clears the failure counter after a successful sign-in.
    async fn reset_login_attempts(&self, email: &str) -> Result<(), Error>;
}

#[derive(Serialize)]
struct EmailParams<'a> {
    p_email: &'a str,
}

#[derive(Serialize)]
struct FailedLoginParams<'a> {
    p_email: &'a str,
    p_ip_address: Option<&'a str>,
}

/// RPCs that return `TABLE (...)` come back as a one-row array, scalar
/// composites as a plain object.
#[derive(Deserialize)]
#[serde(untagged)]
enum Rows<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Rows<T> {
    fn into_first(self, rpc: &str) -> Result<T, Error> {
        match self {
            Self::One(row) => Ok(row),
            Self::Many(rows) => rows
                .into_iter()
                .next()
                .ok_or_else(|| Error::Parse(format!("{rpc} returned no rows"))),
        }
    }
}

/// Policy engine reached through the backend's RPC endpoint.
#[derive(Clone, Debug)]
pub struct RpcPolicyEngine {
    client: BackendClient,
}

impl RpcPolicyEngine {
    #[must_use]
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PolicyEngine for RpcPolicyEngine {
    #[instrument(skip_all)]
    async fn check_login_allowed(&self, email: &str) -> Result<LoginStatus, Error> {
        let rows: Rows<LoginStatus> = self
            .client
            .post_json(CHECK_LOGIN_ALLOWED, &EmailParams { p_email: email })
            .await?;
        let status = rows.into_first("check_login_allowed")?;

        debug!(
            allowed = status.allowed,
            failed_count = status.failed_count,
            requires_captcha = status.requires_captcha,
            "login status probed"
        );

        Ok(status)
    }

    #[instrument(skip_all)]
    async fn record_failed_login(
        &self,
        email: &str,
        ip_address: Option<&str>,
    ) -> Result<FailedLoginRecord, Error> {
        let params = FailedLoginParams {
            p_email: email,
            p_ip_address: ip_address,
        };
        let rows: Rows<FailedLoginRecord> = self.client.post_json(RECORD_FAILED_LOGIN, &params).await?;
        let record = rows.into_first("record_failed_login")?;

        debug!(
            failed_count = record.failed_count,
            is_blocked = record.is_blocked,
            "failed login recorded"
        );

        Ok(record)
    }

    #[instrument(skip_all)]
    async fn reset_login_attempts(&self, email: &str) -> Result<(), Error> {
        self.client
            .post_json_empty(RESET_LOGIN_ATTEMPTS, &EmailParams { p_email: email })
            .await
    }
}
