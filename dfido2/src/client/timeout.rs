//! Ceremony lifetime timer
//!
//! WebAuthn lets the client correct an RP-supplied timeout into a sensible
//! range and pick its own default when none is given.
//!
//! Spec: <https://www.w3.org/TR/webauthn-3/#sctn-timeout-recommended-range>

use crate::options::UserVerificationRequirement;

use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
/// Default when user verification is discouraged
pub const DISCOURAGED_TIMEOUT: Duration = Duration::from_secs(300);
pub const MIN_TIMEOUT: Duration = Duration::from_secs(1);
pub const MAX_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Effective ceremony timeout
///
/// An explicit value is in milliseconds and truncated to whole seconds; zero
/// counts as absent. Absent picks a default from the user verification
/// requirement, where `None` is treated as discouraged.
pub fn adjust_lifetime_timer(
    timeout_ms: Option<u64>,
    user_verification: Option<UserVerificationRequirement>,
) -> Duration {
    let timeout = match timeout_ms {
        Some(ms) if ms > 0 => Duration::from_secs(ms / 1000),
        _ => match user_verification.unwrap_or(UserVerificationRequirement::Discouraged) {
            UserVerificationRequirement::Required | UserVerificationRequirement::Preferred => {
                DEFAULT_TIMEOUT
            }
            UserVerificationRequirement::Discouraged => DISCOURAGED_TIMEOUT,
        },
    };
    timeout.clamp(MIN_TIMEOUT, MAX_TIMEOUT)
}

/// Deadline of one ceremony; `None` never expires
#[derive(Debug, Clone, Copy)]
pub struct LifetimeTimer {
    deadline: Option<Instant>,
}

impl LifetimeTimer {
    pub fn start(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn infinite() -> Self {
        Self { deadline: None }
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Time left, or `None` for an infinite timer
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}
