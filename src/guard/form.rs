//! Credential form controller.
//!
//! `LoginForm` owns the probed status for one visit and orchestrates the
//! submit flow: local validation, the policy short-circuit, the CAPTCHA gate,
//! the auth provider call, and failure reporting. Messages are ready for
//! display; transport problems with the probe, reset, and alert calls are only
//! logged.

use super::{
    challenge::pass_gate,
    context::{AuthServices, FormOptions},
    prober::{ProbeSnapshot, StatusProber},
    status::{LoginState, LoginStatus},
    validation::{validate_email, validate_name, validate_password, ValidationError},
    warning::{blocked_message, locked_message, Banner},
};
use crate::backend::{AuthError, FailedLoginRecord, LoginAlert, SignUpOutcome};
use crate::DASHBOARD_PATH;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::{sync::watch, task::JoinSet};
use tracing::{error, info, instrument, warn};

/// Remaining attempts (as probed before the failed one) that trigger the
/// low-attempts message after a provider failure.
const LOW_ATTEMPTS_THRESHOLD: i32 = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Login,
    Signup,
    ForgotPassword,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Redirect { path: String },
    ConfirmEmail,
    ResetEmailSent,
    PasswordUpdated,
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{message}")]
    Blocked {
        reason: Option<String>,
        message: String,
    },
    #[error("{message}")]
    Locked {
        until: DateTime<Utc>,
        message: String,
    },
    #[error("Senha incorreta. Você tem mais {remaining} tentativa(s) antes do bloqueio temporário.")]
    LowAttempts { remaining: i32 },
    #[error("Complete a verificação de segurança para continuar.")]
    ChallengeRequired,
    #[error("Aguarde a conclusão da solicitação em andamento.")]
    Busy,
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl FormError {
    fn blocked(reason: Option<String>) -> Self {
        let message = blocked_message(reason.as_deref());
        Self::Blocked { reason, message }
    }

    fn locked(until: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self::Locked {
            until,
            message: locked_message(until, now),
        }
    }
}

/// Resets the loading flag when a submit ends, however it ends.
struct Loading<'a>(&'a AtomicBool);

impl<'a> Loading<'a> {
    fn begin(flag: &'a AtomicBool) -> Result<Self, FormError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| FormError::Busy)
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct LoginForm {
    services: AuthServices,
    options: FormOptions,
    mode: Mode,
    email: String,
    prober: StatusProber,
    loading: AtomicBool,
    alerts: Mutex<JoinSet<()>>,
}

impl LoginForm {
    /// Builds the form with the last stored email pre-filled. No probe is
    /// scheduled until the email is edited or [`LoginForm::probe_now`] runs.
    #[must_use]
    pub fn new(services: AuthServices, options: FormOptions) -> Self {
        let email = services.emails.load().unwrap_or_default();
        let prober = StatusProber::new(Arc::clone(&services.policy), options.debounce);

        Self {
            services,
            options,
            mode: Mode::Login,
            email,
            prober,
            loading: AtomicBool::new(false),
            alerts: Mutex::new(JoinSet::new()),
        }
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Leaving login mode drops the status and hides the challenge.
    /// Returning to it schedules a probe as [`LoginForm::set_email`] does.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        if mode == Mode::Login {
            self.prober.email_changed(&self.email);
        } else {
            self.prober.clear();
        }
    }

    /// Schedules a debounced probe in login mode. Without a Tokio runtime no
    /// probe is scheduled; call [`LoginForm::probe_now`] once one is available.
    pub fn set_email(&mut self, email: &str) {
        self.email = email.to_string();
        if self.mode == Mode::Login {
            self.prober.email_changed(email);
        }
    }

    /// Probes the current email right away, skipping the debounce.
    pub async fn probe_now(&self) {
        if self.mode == Mode::Login {
            self.prober.refresh(&self.email).await;
        }
    }

    /// Status probed for the email currently in the form.
    #[must_use]
    pub fn status(&self) -> Option<LoginStatus> {
        self.prober.status_for(&self.email)
    }

    #[must_use]
    pub fn captcha_visible(&self) -> bool {
        self.status().is_some_and(|status| status.requires_captcha)
    }

    #[must_use]
    pub fn banner(&self, now: DateTime<Utc>) -> Banner {
        self.status()
            .map_or(Banner::None, |status| Banner::from_status(&status, now))
    }

    pub fn subscribe(&self) -> watch::Receiver<ProbeSnapshot> {
        self.prober.subscribe()
    }

    /// Submits according to the current mode. `full_name` is only read when
    /// signing up and `password` is ignored for password recovery.
    ///
    /// # Errors
    /// See [`LoginForm::sign_in`], [`LoginForm::sign_up`], and
    /// [`LoginForm::request_password_reset`].
    pub async fn submit(
        &self,
        password: &SecretString,
        full_name: &str,
    ) -> Result<Outcome, FormError> {
        match self.mode {
            Mode::Login => self.sign_in(password).await,
            Mode::Signup => self.sign_up(full_name, password).await,
            Mode::ForgotPassword => self.request_password_reset().await,
        }
    }

    /// Signs in with the current email.
    ///
    /// # Errors
    /// Validation errors, a local policy denial, a missing CAPTCHA token, or
    /// the provider failure refined by the policy engine's answer.
    #[instrument(skip_all)]
    pub async fn sign_in(&self, password: &SecretString) -> Result<Outcome, FormError> {
        let _loading = Loading::begin(&self.loading)?;

        let email = validate_email(&self.email)?;
        validate_password(password)?;

        let prior = self.prober.status_for(&email);
        let state = prior
            .as_ref()
            .map_or(LoginState::Allowed, |status| LoginState::resolve(status, Utc::now()));

        let captcha_token = match state {
            LoginState::PermanentlyBlocked { reason } => return Err(FormError::blocked(reason)),
            LoginState::TemporarilyLocked { until } => {
                return Err(FormError::locked(until, Utc::now()))
            }
            LoginState::CaptchaRequired => Some(
                pass_gate(self.services.challenge.as_ref())
                    .await
                    .ok_or(FormError::ChallengeRequired)?,
            ),
            LoginState::Allowed => None,
        };

        match self
            .services
            .auth
            .sign_in_with_password(&email, password, captcha_token.as_deref())
            .await
        {
            Ok(_) => {
                self.after_success(&email).await;
                Ok(Outcome::Redirect {
                    path: DASHBOARD_PATH.to_string(),
                })
            }
            // Transport failures never reached the provider's credential check.
            Err(err @ AuthError::Backend(_)) => Err(FormError::Auth(err)),
            Err(err) => Err(self.after_failure(&email, prior.as_ref(), err).await),
        }
    }

    /// # Errors
    /// Validation errors or the provider's rejection.
    #[instrument(skip_all)]
    pub async fn sign_up(
        &self,
        full_name: &str,
        password: &SecretString,
    ) -> Result<Outcome, FormError> {
        let _loading = Loading::begin(&self.loading)?;

        let full_name = validate_name(full_name)?;
        let email = validate_email(&self.email)?;
        validate_password(password)?;

        let outcome = self
            .services
            .auth
            .sign_up(&full_name, &email, password)
            .await?;

        Ok(match outcome {
            SignUpOutcome::SignedIn(_) => Outcome::Redirect {
                path: DASHBOARD_PATH.to_string(),
            },
            SignUpOutcome::ConfirmationRequired(_) => Outcome::ConfirmEmail,
        })
    }

    /// # Errors
    /// Validation errors or the provider's rejection.
    #[instrument(skip_all)]
    pub async fn request_password_reset(&self) -> Result<Outcome, FormError> {
        let _loading = Loading::begin(&self.loading)?;

        let email = validate_email(&self.email)?;
        self.services
            .auth
            .reset_password_for_email(&email, self.options.recovery_redirect.as_deref())
            .await?;

        Ok(Outcome::ResetEmailSent)
    }

    /// Sets a new password using the access token from a recovery link.
    ///
    /// # Errors
    /// Validation errors or the provider's rejection.
    #[instrument(skip_all)]
    pub async fn update_password(
        &self,
        access_token: &SecretString,
        password: &SecretString,
    ) -> Result<Outcome, FormError> {
        let _loading = Loading::begin(&self.loading)?;

        validate_password(password)?;
        self.services
            .auth
            .update_password(access_token, password)
            .await?;

        Ok(Outcome::PasswordUpdated)
    }

    async fn after_success(&self, email: &str) {
        if let Err(err) = self.services.policy.reset_login_attempts(email).await {
            warn!("failed to reset login attempts: {err}");
        }

        if let Err(err) = self.services.emails.save(email) {
            warn!("failed to remember email: {err}");
        }

        info!("login succeeded, redirecting to {DASHBOARD_PATH}");
    }

    async fn after_failure(
        &self,
        email: &str,
        prior: Option<&LoginStatus>,
        err: AuthError,
    ) -> FormError {
        let record = match self
            .services
            .policy
            .record_failed_login(email, self.options.client_ip.as_deref())
            .await
        {
            Ok(record) => record,
            Err(record_err) => {
                warn!("failed to record login failure: {record_err}");
                return FormError::Auth(err);
            }
        };

        if record.should_notify {
            self.spawn_alert(email, &record);
        }

        self.prober.apply_record(email, &record);
        self.prober.refresh(email).await;

        if record.is_blocked {
            let reason = self
                .prober
                .status_for(email)
                .and_then(|status| status.block_reason);
            return FormError::blocked(reason);
        }

        if let Some(until) = record.locked_until {
            return FormError::locked(until, Utc::now());
        }

        match prior.map(|status| status.remaining_attempts) {
            Some(remaining) if remaining <= LOW_ATTEMPTS_THRESHOLD => FormError::LowAttempts {
                remaining: (remaining - 1).max(0),
            },
            _ => FormError::Auth(err),
        }
    }

    fn spawn_alert(&self, email: &str, record: &FailedLoginRecord) {
        let notifier = Arc::clone(&self.services.notifier);
        let alert = LoginAlert {
            email: email.to_string(),
            failed_count: record.failed_count,
            is_blocked: record.is_blocked,
        };

        let task = async move {
            if let Err(err) = notifier.notify(&alert).await {
                error!("failed to send login alert: {err}");
            }
        };
        match self.alerts.lock() {
            Ok(mut alerts) => {
                // Reap finished alerts so a long-lived form does not accumulate them.
                while alerts.try_join_next().is_some() {}
                alerts.spawn(task);
            }
            Err(_) => error!("alert queue poisoned, login alert dropped"),
        }
    }

    /// Waits for every alert sent so far. Alerts still running when the form
    /// is dropped are aborted, so callers about to exit should await this.
    pub async fn flush_alerts(&self) {
        let mut pending = match self.alerts.lock() {
            Ok(mut alerts) => std::mem::take(&mut *alerts),
            Err(_) => return,
        };

        while let Some(joined) = pending.join_next().await {
            if let Err(err) = joined {
                error!("login alert task failed: {err}");
            }
        }
    }
}
