//! Waiting for a pod to expose SSH.
//!
//! The loop polls a probe at a fixed interval until it reports an endpoint
//! or the budget runs out. It is the one place where failures are swallowed:
//! a transport error during a poll counts as "not reachable yet", so a flaky
//! network while the pod boots cannot end the wait early. Provider and
//! precondition errors still abort it.

use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{HalldyllError, Result};

use super::types::SshEndpoint;

/// Terminal state of a reachability wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Reachability {
    /// SSH is exposed.
    Reachable(SshEndpoint),
    /// The budget ran out first.
    TimedOut {
        /// Number of probes performed.
        polls: u32,
        /// Time spent waiting.
        #[serde(rename = "waited_secs", serialize_with = "as_secs")]
        waited: Duration,
    },
}

impl Reachability {
    /// Returns the endpoint if the pod became reachable.
    #[must_use]
    pub const fn endpoint(&self) -> Option<&SshEndpoint> {
        match self {
            Self::Reachable(endpoint) => Some(endpoint),
            Self::TimedOut { .. } => None,
        }
    }
}

fn as_secs<S: serde::Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_secs())
}

/// Interval and budget of a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between polls.
    pub interval: Duration,
    /// Total time allowed.
    pub budget: Duration,
}

impl PollPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(interval: Duration, budget: Duration) -> Self {
        Self { interval, budget }
    }
}

/// Polls `probe` until it yields an endpoint, the budget runs out, or
/// `cancel` fires.
///
/// A probe is only started while the deadline has not passed, and each
/// probe is cut off at the deadline, so the call never outlives the budget.
/// With budget `B` and interval `I` at most `ceil(B / I)` probes run.
///
/// # Errors
///
/// Returns [`HalldyllError::Cancelled`] on cancellation, and any
/// non-transport error a probe reports.
pub async fn poll_until_reachable<F, Fut>(
    mut probe: F,
    policy: PollPolicy,
    cancel: &CancellationToken,
) -> Result<Reachability>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<SshEndpoint>>>,
{
    let started = Instant::now();
    let deadline = started + policy.budget;
    let mut polls: u32 = 0;

    loop {
        polls += 1;

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(HalldyllError::Cancelled),
            outcome = tokio::time::timeout_at(deadline, probe()) => outcome,
        };

        match outcome {
            Ok(Ok(Some(endpoint))) => {
                info!(polls, %endpoint, "Pod is reachable");
                return Ok(Reachability::Reachable(endpoint));
            }
            Ok(Ok(None)) => debug!(polls, "Pod not reachable yet"),
            // Deliberately downgraded: the pod may still be booting.
            Ok(Err(HalldyllError::Transport(e))) => {
                warn!(polls, error = %e, "Poll failed, treating pod as not reachable yet");
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                debug!(polls, "Poll cut off at the deadline");
                break;
            }
        }

        let next = Instant::now() + policy.interval;
        if next >= deadline {
            break;
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(HalldyllError::Cancelled),
            () = tokio::time::sleep_until(next) => {}
        }
    }

    let waited = started.elapsed();
    info!(polls, waited_secs = waited.as_secs(), "Timed out waiting for pod to become reachable");
    Ok(Reachability::TimedOut { polls, waited })
}
