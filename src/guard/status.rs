//! Login status as reported by the policy engine and its interpretation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot returned by `check_login_allowed`. Never persisted; re-fetched on
/// every email change or failed attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginStatus {
    pub allowed: bool,
    #[serde(default)]
    pub failed_count: u32,
    #[serde(default)]
    pub remaining_attempts: i32,
    #[serde(default)]
    pub requires_captcha: bool,
    #[serde(default)]
    pub is_blocked: bool,
    #[serde(default)]
    pub locked_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl LoginStatus {
    /// Status of an email the engine has never seen fail.
    #[must_use]
    pub fn fresh(remaining_attempts: i32) -> Self {
        Self {
            allowed: true,
            failed_count: 0,
            remaining_attempts,
            requires_captcha: false,
            is_blocked: false,
            locked_until: None,
            block_reason: None,
        }
    }

    /// `locked_until` when it is still ahead of `now`.
    #[must_use]
    pub fn active_lock(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.locked_until.filter(|until| *until > now)
    }
}

/// What the form may do with an email, resolved from a [`LoginStatus`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginState {
    Allowed,
    CaptchaRequired,
    TemporarilyLocked { until: DateTime<Utc> },
    PermanentlyBlocked { reason: Option<String> },
}

impl LoginState {
    /// Precedence: blocked, then a live lock, then any other denial, then CAPTCHA.
    ///
    /// A denial without a live cause (e.g. an expired `locked_until` the engine
    /// still reports) stays a lock so it is never silently dropped.
    #[must_use]
    pub fn resolve(status: &LoginStatus, now: DateTime<Utc>) -> Self {
        if status.is_blocked {
            return Self::PermanentlyBlocked {
                reason: status.block_reason.clone(),
            };
        }
        if let Some(until) = status.active_lock(now) {
            return Self::TemporarilyLocked { until };
        }
        if !status.allowed {
            return Self::TemporarilyLocked {
                until: status.locked_until.unwrap_or(now),
            };
        }
        if status.requires_captcha {
            return Self::CaptchaRequired;
        }
        Self::Allowed
    }

    /// Whether credentials may be sent (possibly after a challenge).
    #[must_use]
    pub fn permits_submit(&self) -> bool {
        matches!(self, Self::Allowed | Self::CaptchaRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-19T12:00:00Z")
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_default()
    }

    #[test]
    fn fresh_status_is_allowed() {
        let status = LoginStatus::fresh(5);
        assert_eq!(LoginState::resolve(&status, now()), LoginState::Allowed);
        assert!(LoginState::Allowed.permits_submit());
    }

    #[test]
    fn captcha_requirement_still_permits_submit() {
        let status = LoginStatus {
            requires_captcha: true,
            failed_count: 3,
            ..LoginStatus::fresh(2)
        };
        let state = LoginState::resolve(&status, now());
        assert_eq!(state, LoginState::CaptchaRequired);
        assert!(state.permits_submit());
    }

    #[test]
    fn block_wins_over_lock() {
        let until = now() + Duration::minutes(15);
        let status = LoginStatus {
            allowed: false,
            is_blocked: true,
            locked_until: Some(until),
            block_reason: Some("abuso".to_string()),
            ..LoginStatus::fresh(0)
        };
        assert_eq!(
            LoginState::resolve(&status, now()),
            LoginState::PermanentlyBlocked {
                reason: Some("abuso".to_string())
            }
        );
    }

    #[test]
    fn future_lock_denies() {
        let until = now() + Duration::minutes(15);
        let status = LoginStatus {
            allowed: false,
            locked_until: Some(until),
            requires_captcha: true,
            ..LoginStatus::fresh(0)
        };
        let state = LoginState::resolve(&status, now());
        assert_eq!(state, LoginState::TemporarilyLocked { until });
        assert!(!state.permits_submit());
    }

    #[test]
    fn expired_lock_with_allowed_status_is_ignored() {
        let status = LoginStatus {
            locked_until: Some(now() - Duration::minutes(1)),
            ..LoginStatus::fresh(5)
        };
        assert_eq!(LoginState::resolve(&status, now()), LoginState::Allowed);
    }

    #[test]
    fn bare_denial_is_kept_as_lock() {
        let status = LoginStatus {
            allowed: false,
            ..LoginStatus::fresh(0)
        };
        assert_eq!(
            LoginState::resolve(&status, now()),
            LoginState::TemporarilyLocked { until: now() }
        );
    }

    #[test]
    fn missing_fields_default() -> Result<(), serde_json::Error> {
        let status: LoginStatus = serde_json::from_str(r#"{"allowed": true}"#)?;
        assert_eq!(status, LoginStatus::fresh(0));
        Ok(())
    }
}
