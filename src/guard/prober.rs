//! Debounced login status probe.
//!
//! Every keystroke bumps a generation counter and restarts a 500 ms timer;
//! only the settled email is sent to `check_login_allowed`. A request already
//! in flight is not cancelled, but its answer is dropped unless its generation
//! is still the current one, so a slow stale response can never overwrite a
//! fresher status. Probe failures are logged and leave the previous status in
//! place; a recorded failure is folded in first so its decision survives them.

use crate::backend::{FailedLoginRecord, PolicyEngine};
use crate::guard::LoginStatus;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::{runtime::Handle, sync::watch, task::JoinHandle, time::sleep};
use tracing::{debug, warn};

/// Settle delay between the last keystroke and the probe.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Latest probe result as observed by the form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProbeSnapshot {
    pub generation: u64,
    /// Email the status belongs to.
    pub email: Option<String>,
    pub status: Option<LoginStatus>,
}

impl ProbeSnapshot {
    #[must_use]
    pub fn captcha_visible(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|status| status.requires_captcha)
    }
}

pub struct StatusProber {
    engine: Arc<dyn PolicyEngine>,
    debounce: Duration,
    state: Arc<watch::Sender<ProbeSnapshot>>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl StatusProber {
    #[must_use]
    pub fn new(engine: Arc<dyn PolicyEngine>, debounce: Duration) -> Self {
        let (state, _) = watch::channel(ProbeSnapshot::default());
        Self {
            engine,
            debounce,
            state: Arc::new(state),
            pending: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProbeSnapshot> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> ProbeSnapshot {
        self.state.borrow().clone()
    }

    /// Last status probed for exactly this (trimmed) email.
    #[must_use]
    pub fn status_for(&self, email: &str) -> Option<LoginStatus> {
        let snapshot = self.state.borrow();
        if snapshot.email.as_deref() == Some(email.trim()) {
            snapshot.status.clone()
        } else {
            None
        }
    }

    /// Schedules a probe once `email` has been stable for the debounce delay.
    /// An empty email clears the status and issues no call.
    ///
    /// Outside a Tokio runtime the previous status is still invalidated but no
    /// probe is scheduled; [`StatusProber::refresh`] can fetch it later.
    pub fn email_changed(&self, email: &str) {
        self.cancel_pending();

        let email = email.trim().to_string();
        let generation = self.bump(email.is_empty());
        if email.is_empty() {
            return;
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!("no async runtime, login status probe skipped");
            return;
        };

        let engine = Arc::clone(&self.engine);
        let state = Arc::clone(&self.state);
        let delay = self.debounce;
        let handle = runtime.spawn(async move {
            sleep(delay).await;
            probe(engine.as_ref(), &state, generation, &email).await;
        });

        if let Ok(mut pending) = self.pending.lock() {
            *pending = Some(handle);
        }
    }

    /// Drops any pending probe and the current status (e.g. leaving login mode).
    pub fn clear(&self) {
        self.cancel_pending();
        self.bump(true);
    }

    /// Probes right away, superseding anything pending or in flight.
    pub async fn refresh(&self, email: &str) {
        self.cancel_pending();

        let email = email.trim();
        let generation = self.bump(email.is_empty());
        if email.is_empty() {
            return;
        }

        probe(self.engine.as_ref(), &self.state, generation, email).await;
    }

    /// Merges the engine's answer to a recorded failure into the status of
    /// `email`, superseding any probe in flight.
    ///
    /// Attempts left are derived from the previous status, keeping the total
    /// allowance constant; without one it stays at zero.
    pub fn apply_record(&self, email: &str, record: &FailedLoginRecord) {
        self.cancel_pending();

        let email = email.trim();
        let now = Utc::now();
        self.state.send_modify(|snapshot| {
            snapshot.generation += 1;

            let previous = if snapshot.email.as_deref() == Some(email) {
                snapshot.status.take()
            } else {
                None
            };
            let (remaining_attempts, block_reason) = previous.map_or((0, None), |status| {
                let consumed = i64::from(record.failed_count) - i64::from(status.failed_count);
                let remaining = i64::from(status.remaining_attempts) - consumed.max(0);
                (
                    i32::try_from(remaining.max(0)).unwrap_or(0),
                    status.block_reason,
                )
            });
            let locked = record.locked_until.is_some_and(|until| until > now);

            snapshot.email = Some(email.to_string());
            snapshot.status = Some(LoginStatus {
                allowed: !record.is_blocked && !locked,
                failed_count: record.failed_count,
                remaining_attempts,
                requires_captcha: record.requires_captcha,
                is_blocked: record.is_blocked,
                locked_until: record.locked_until,
                block_reason: block_reason.filter(|_| record.is_blocked),
            });
        });
    }

    fn bump(&self, clear: bool) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|snapshot| {
            snapshot.generation += 1;
            if clear {
                snapshot.email = None;
                snapshot.status = None;
            }
            generation = snapshot.generation;
        });
        generation
    }

    fn cancel_pending(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(handle) = pending.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for StatusProber {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

async fn probe(
    engine: &dyn PolicyEngine,
    state: &watch::Sender<ProbeSnapshot>,
    generation: u64,
    email: &str,
) {
    match engine.check_login_allowed(email).await {
        Ok(status) => {
            let applied = state.send_if_modified(|snapshot| {
                if snapshot.generation == generation {
                    snapshot.email = Some(email.to_string());
                    snapshot.status = Some(status);
                    true
                } else {
                    false
                }
            });
            if !applied {
                debug!(generation, "discarding stale login status");
            }
        }
        Err(err) => warn!("login status probe failed: {err}"),
    }
}
