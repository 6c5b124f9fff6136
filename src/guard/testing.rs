//! In-memory fakes for the backend services, shared by the guard tests.
//!
//! `FakePolicy` behaves like a small policy engine: five attempts per email,
//! CAPTCHA from the third failure, a 15 minute lock from the fourth.

use crate::backend::{
    AuthError, AuthProvider, AuthUser, Error, FailedLoginRecord, LoginAlert, Notifier,
    PolicyEngine, Session, SignUpOutcome,
};
use crate::guard::LoginStatus;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;

pub(crate) const MAX_ATTEMPTS: u32 = 5;
const CAPTCHA_AFTER: u32 = 3;
const LOCK_AFTER: u32 = 4;

#[derive(Default)]
struct Account {
    failed: u32,
    blocked: bool,
    lock_minutes: Option<i64>,
}

#[derive(Default)]
pub(crate) struct FakePolicy {
    accounts: Mutex<HashMap<String, Account>>,
    delays: Mutex<HashMap<String, Duration>>,
    probes: Mutex<Vec<String>>,
    records: Mutex<Vec<String>>,
    resets: Mutex<Vec<String>>,
    probe_failure: Mutex<bool>,
    record_failure: Mutex<bool>,
    notify_from: Mutex<Option<u32>>,
    lock_disabled: Mutex<bool>,
}

impl FakePolicy {
    pub(crate) fn probes(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }

    pub(crate) fn records(&self) -> Vec<String> {
        self.records.lock().unwrap().clone()
    }

    pub(crate) fn resets(&self) -> Vec<String> {
        self.resets.lock().unwrap().clone()
    }

    pub(crate) fn set_delay(&self, email: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(email.to_string(), delay);
    }

    pub(crate) fn fail_times(&self, email: &str, times: u32) {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.entry(email.to_string()).or_default();
        let lock = !*self.lock_disabled.lock().unwrap();
        for _ in 0..times {
            Self::fail(account, lock);
        }
    }

    pub(crate) fn block(&self, email: &str) {
        self.accounts
            .lock()
            .unwrap()
            .entry(email.to_string())
            .or_default()
            .blocked = true;
    }

    pub(crate) fn set_probe_failure(&self, fail: bool) {
        *self.probe_failure.lock().unwrap() = fail;
    }

    pub(crate) fn set_record_failure(&self, fail: bool) {
        *self.record_failure.lock().unwrap() = fail;
    }

    pub(crate) fn notify_from(&self, failed_count: u32) {
        *self.notify_from.lock().unwrap() = Some(failed_count);
    }

    /// Keeps counting failures without ever locking the account.
    pub(crate) fn disable_lock(&self) {
        *self.lock_disabled.lock().unwrap() = true;
    }

    fn fail(account: &mut Account, lock: bool) {
        account.failed += 1;
        if lock && account.failed >= LOCK_AFTER {
            account.lock_minutes = Some(15);
        }
    }

    fn status(account: &Account) -> LoginStatus {
        let locked_until = account
            .lock_minutes
            .map(|minutes| Utc::now() + ChronoDuration::minutes(minutes));
        LoginStatus {
            allowed: !account.blocked && locked_until.is_none(),
            failed_count: account.failed,
            remaining_attempts: MAX_ATTEMPTS as i32 - account.failed as i32,
            requires_captcha: account.failed >= CAPTCHA_AFTER,
            is_blocked: account.blocked,
            locked_until,
            block_reason: account.blocked.then(|| "suspeita de fraude".to_string()),
        }
    }
}

fn unavailable() -> Error {
    Error::Http {
        status: 503,
        message: "unavailable".to_string(),
    }
}

#[async_trait]
impl PolicyEngine for FakePolicy {
    async fn check_login_allowed(&self, email: &str) -> Result<LoginStatus, Error> {
        self.probes.lock().unwrap().push(email.to_string());

        let delay = self.delays.lock().unwrap().get(email).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.probe_failure.lock().unwrap() {
            return Err(unavailable());
        }

        let accounts = self.accounts.lock().unwrap();
        Ok(accounts
            .get(email)
            .map_or_else(|| LoginStatus::fresh(MAX_ATTEMPTS as i32), Self::status))
    }

    async fn record_failed_login(
        &self,
        email: &str,
        _ip_address: Option<&str>,
    ) -> Result<FailedLoginRecord, Error> {
        self.records.lock().unwrap().push(email.to_string());
        if *self.record_failure.lock().unwrap() {
            return Err(unavailable());
        }

        let notify_from = *self.notify_from.lock().unwrap();
        let lock = !*self.lock_disabled.lock().unwrap();
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.entry(email.to_string()).or_default();
        Self::fail(account, lock);
        let status = Self::status(account);

        Ok(FailedLoginRecord {
            failed_count: status.failed_count,
            is_blocked: status.is_blocked,
            locked_until: status.locked_until,
            should_notify: notify_from.is_some_and(|from| status.failed_count >= from),
            requires_captcha: status.requires_captcha,
        })
    }

    async fn reset_login_attempts(&self, email: &str) -> Result<(), Error> {
        self.resets.lock().unwrap().push(email.to_string());
        if let Some(account) = self.accounts.lock().unwrap().get_mut(email) {
            account.failed = 0;
            account.lock_minutes = None;
        }
        Ok(())
    }
}

pub(crate) struct FakeAuth {
    passwords: Mutex<HashMap<String, String>>,
    sign_ins: Mutex<Vec<(String, Option<String>)>>,
    sessions: watch::Sender<Option<Session>>,
}

impl FakeAuth {
    pub(crate) fn with_account(email: &str, password: &str) -> Self {
        let (sessions, _) = watch::channel(None);
        let mut passwords = HashMap::new();
        passwords.insert(email.to_string(), password.to_string());
        Self {
            passwords: Mutex::new(passwords),
            sign_ins: Mutex::new(Vec::new()),
            sessions,
        }
    }

    /// Every sign-in attempt that reached the provider, with its CAPTCHA token.
    pub(crate) fn sign_ins(&self) -> Vec<(String, Option<String>)> {
        self.sign_ins.lock().unwrap().clone()
    }

    fn session_for(email: &str) -> Session {
        Session {
            access_token: SecretString::from(format!("access-{email}")),
            refresh_token: SecretString::from(format!("refresh-{email}")),
            expires_in: 3600,
            user: AuthUser {
                id: format!("id-{email}"),
                email: Some(email.to_string()),
            },
        }
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
        captcha_token: Option<&str>,
    ) -> Result<Session, AuthError> {
        self.sign_ins
            .lock()
            .unwrap()
            .push((email.to_string(), captcha_token.map(str::to_string)));

        let matches = self
            .passwords
            .lock()
            .unwrap()
            .get(email)
            .is_some_and(|stored| stored == password.expose_secret());
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        let session = Self::session_for(email);
        self.sessions.send_replace(Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        _full_name: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<SignUpOutcome, AuthError> {
        let mut passwords = self.passwords.lock().unwrap();
        if passwords.contains_key(email) {
            return Err(AuthError::Rejected("User already registered".to_string()));
        }
        passwords.insert(email.to_string(), password.expose_secret().to_string());
        Ok(SignUpOutcome::ConfirmationRequired(AuthUser {
            id: format!("id-{email}"),
            email: Some(email.to_string()),
        }))
    }

    async fn reset_password_for_email(
        &self,
        _email: &str,
        _redirect_to: Option<&str>,
    ) -> Result<(), AuthError> {
        Ok(())
    }

    async fn update_password(
        &self,
        access_token: &SecretString,
        password: &SecretString,
    ) -> Result<(), AuthError> {
        let Some(email) = access_token.expose_secret().strip_prefix("access-") else {
            return Err(AuthError::Rejected("invalid token".to_string()));
        };
        self.passwords
            .lock()
            .unwrap()
            .insert(email.to_string(), password.expose_secret().to_string());
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.sessions.send_replace(None);
        Ok(())
    }

    fn sessions(&self) -> watch::Receiver<Option<Session>> {
        self.sessions.subscribe()
    }
}

#[derive(Default)]
pub(crate) struct FakeNotifier {
    alerts: Mutex<Vec<LoginAlert>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeNotifier {
    pub(crate) fn alerts(&self) -> Vec<LoginAlert> {
        self.alerts.lock().unwrap().clone()
    }

    /// Alerts are stored only after this delay.
    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify(&self, alert: &LoginAlert) -> Result<(), Error> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}
