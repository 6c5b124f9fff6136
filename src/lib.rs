//! # affiliate-auth (login guard for the affiliate platform)
//!
//! `affiliate-auth` is the client side of the affiliate platform's sign-in
//! funnel. Every policy decision lives on the managed backend; this crate only
//! probes it, interprets what it returns, and orchestrates the credential form.
//!
//! ## Login-attempt guard
//!
//! The backend policy engine counts failed attempts per email and decides when
//! an account needs a CAPTCHA, is temporarily locked, or is blocked for good.
//! The guard mirrors that state locally:
//!
//! - **Probe:** while the user types an email, a debounced probe calls
//!   `check_login_allowed` and keeps the latest [`guard::LoginStatus`].
//! - **Gate:** if the status requires a CAPTCHA, a token must be produced by the
//!   [`guard::ChallengeWidget`] before credentials are sent.
//! - **Submit:** [`guard::LoginForm`] short-circuits denied statuses, calls the
//!   auth provider, and reports failures back with `record_failed_login`.
//! - **Warn:** [`guard::Banner`] maps the status to one of four banners.
//!
//! The state machine itself (thresholds, counters) is server-side and invisible
//! here. Nothing in this crate retries on its own.

pub mod backend;
pub mod cli;
pub mod guard;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Route the front end sends users to after a successful sign-in.
pub const DASHBOARD_PATH: &str = "/user/dashboard";
