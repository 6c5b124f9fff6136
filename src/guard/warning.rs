//! Warning banner shown above the login form, derived from the probed status.

use super::{relative_time::relative_to, status::LoginStatus};
use chrono::{DateTime, Utc};

/// Failed attempts after which the low-attempts banner may appear.
const WARN_AFTER_FAILURES: u32 = 3;
/// Remaining attempts at or below which the low-attempts banner may appear.
const WARN_AT_REMAINING: i32 = 3;

/// Glyphs available to banners. The table in [`Banner::icon`] is the only way
/// a banner picks one, so every kind has a defined icon.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Icon {
    ShieldAlert,
    Clock,
    AlertTriangle,
    Info,
}

impl Icon {
    #[must_use]
    pub fn glyph(self) -> &'static str {
        match self {
            Self::ShieldAlert => "⛔",
            Self::Clock => "⏳",
            Self::AlertTriangle => "⚠",
            Self::Info => "ℹ",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Banner {
    Blocked { reason: Option<String> },
    TemporarilyLocked { until: DateTime<Utc> },
    LowAttempts { remaining: i32 },
    None,
}

impl Banner {
    /// Precedence: blocked, then a lock still in the future, then low
    /// remaining attempts after repeated failures.
    #[must_use]
    pub fn from_status(status: &LoginStatus, now: DateTime<Utc>) -> Self {
        if status.is_blocked {
            Self::Blocked {
                reason: status.block_reason.clone(),
            }
        } else if let Some(until) = status.active_lock(now) {
            Self::TemporarilyLocked { until }
        } else if status.failed_count >= WARN_AFTER_FAILURES
            && status.remaining_attempts <= WARN_AT_REMAINING
        {
            Self::LowAttempts {
                remaining: status.remaining_attempts,
            }
        } else {
            Self::None
        }
    }

    #[must_use]
    pub fn icon(&self) -> Icon {
        match self {
            Self::Blocked { .. } => Icon::ShieldAlert,
            Self::TemporarilyLocked { .. } => Icon::Clock,
            Self::LowAttempts { .. } => Icon::AlertTriangle,
            Self::None => Icon::Info,
        }
    }

    /// User-facing text, `None` when nothing should be shown.
    #[must_use]
    pub fn message(&self, now: DateTime<Utc>) -> Option<String> {
        match self {
            Self::Blocked { reason } => Some(blocked_message(reason.as_deref())),
            Self::TemporarilyLocked { until } => Some(locked_message(*until, now)),
            Self::LowAttempts { remaining } => Some(format!(
                "Atenção: restam {} tentativa(s) antes do bloqueio temporário.",
                (*remaining).max(0)
            )),
            Self::None => None,
        }
    }
}

pub(crate) fn blocked_message(reason: Option<&str>) -> String {
    match reason {
        Some(reason) if !reason.trim().is_empty() => format!(
            "Sua conta foi bloqueada ({}). Entre em contato com o suporte.",
            reason.trim()
        ),
        _ => "Sua conta foi bloqueada. Entre em contato com o suporte.".to_string(),
    }
}

pub(crate) fn locked_message(until: DateTime<Utc>, now: DateTime<Utc>) -> String {
    format!(
        "Muitas tentativas de login. Tente novamente {}.",
        relative_to(until, now)
    )
}
