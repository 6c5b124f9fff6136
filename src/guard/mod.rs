//! Login-attempt guard: status probing, the CAPTCHA gate, credential
//! submission, and the warning banner.

mod challenge;
mod context;
mod form;
mod prober;
mod relative_time;
mod status;
mod storage;
mod validation;
mod warning;

#[cfg(test)]
pub(crate) mod testing;

pub use self::{
    challenge::{pass_gate, ChallengeWidget, StaticChallenge},
    context::{AuthServices, FormOptions},
    form::{FormError, LoginForm, Mode, Outcome},
    prober::{ProbeSnapshot, StatusProber, DEFAULT_DEBOUNCE},
    relative_time::relative_to,
    status::{LoginState, LoginStatus},
    storage::{default_state_dir, EmailStore, FileEmailStore, MemoryEmailStore, StorageError},
    validation::{
        valid_email, validate_email, validate_name, validate_password, Field, ValidationError,
    },
    warning::{Banner, Icon},
};
