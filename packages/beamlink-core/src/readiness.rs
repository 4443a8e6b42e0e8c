//! Bounded readiness polling.
//!
//! Some collaborator resources (notably the remote media client of a freshly
//! started session) appear a little after the session itself. [`PollRequest`]
//! probes for such a resource at a fixed interval and gives up after a fixed
//! number of attempts.
//!
//! The wait is suspension-based: between probes the task sleeps on the Tokio
//! timer, so no thread is blocked, and a [`CancellationToken`] aborts the
//! wait as soon as the owning session goes away.

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Why a readiness wait ended without the resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadinessError {
    #[error("{resource} after {attempts} attempt(s)")]
    Timeout { resource: String, attempts: u32 },

    #[error("{resource} (wait cancelled)")]
    Cancelled { resource: String },
}

/// Interval and attempt budget for a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

/// A single readiness wait: a probe plus the policy it runs under.
pub struct PollRequest<F> {
    resource: String,
    policy: PollPolicy,
    probe: F,
}

impl<T, F> PollRequest<F>
where
    F: FnMut() -> Option<T>,
{
    pub fn new(resource: impl Into<String>, policy: PollPolicy, probe: F) -> Self {
        Self {
            resource: resource.into(),
            policy,
            probe,
        }
    }

    /// Runs the poll to completion.
    ///
    /// The first probe happens immediately. Each further probe follows one
    /// `interval` later, for at most `max_attempts` probes in total; the
    /// first present value wins and no further probes are made.
    pub async fn run(mut self, cancel: &CancellationToken) -> Result<T, ReadinessError> {
        let PollPolicy {
            interval,
            max_attempts,
        } = self.policy;

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(self.cancelled());
            }

            if let Some(value) = (self.probe)() {
                log::debug!(
                    "[Readiness] {} ready after {} attempt(s)",
                    self.resource,
                    attempt
                );
                return Ok(value);
            }

            if attempt == max_attempts {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled()),
                _ = tokio::time::sleep(interval) => {}
            }
        }

        log::warn!(
            "[Readiness] {} still unavailable after {} attempt(s)",
            self.resource,
            max_attempts
        );
        Err(ReadinessError::Timeout {
            resource: self.resource,
            attempts: max_attempts,
        })
    }

    fn cancelled(self) -> ReadinessError {
        log::debug!("[Readiness] Wait for {} cancelled", self.resource);
        ReadinessError::Cancelled {
            resource: self.resource,
        }
    }
}
