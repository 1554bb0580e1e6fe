//! Completion polling: sleep, query, repeat until terminal, deadline or cancel.

use std::time::Duration;

use catalog_client::{CatalogError, ServiceCatalog, ServiceInstance};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::{ProvisionError, ProvisionResult};
use crate::obs::{emit_poll_attempt, emit_poll_finished, emit_poll_query_failed};

/// Receiving side of a cancellation flag. Flipping the flag to `true` stops the poller.
pub type CancelSignal = watch::Receiver<bool>;

/// Create a cancellation flag, initially not cancelled.
pub fn cancel_channel() -> (watch::Sender<bool>, CancelSignal) {
    watch::channel(false)
}

/// Configuration for waiting on an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Time between status queries.
    pub interval: Duration,
    /// Maximum total wait.
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(5 * 60),
        }
    }
}

impl PollConfig {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Both durations positive and `interval <= timeout`.
    pub fn validate(&self) -> ProvisionResult<()> {
        if self.interval.is_zero() {
            return Err(ProvisionError::InvalidPollConfig(
                "interval must be positive".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ProvisionError::InvalidPollConfig(
                "timeout must be positive".to_string(),
            ));
        }
        if self.interval > self.timeout {
            return Err(ProvisionError::InvalidPollConfig(format!(
                "interval {:?} exceeds timeout {:?}",
                self.interval, self.timeout
            )));
        }
        Ok(())
    }
}

/// How a wait ended. Every variant keeps the most recent snapshot seen.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The instance reached a terminal state (ready or failed).
    Succeeded(ServiceInstance),
    /// A status query failed after the deadline had passed.
    Failed {
        error: CatalogError,
        last: Option<ServiceInstance>,
    },
    /// The deadline passed without a terminal state.
    TimedOut { last: Option<ServiceInstance> },
    /// The caller cancelled the wait.
    Cancelled { last: Option<ServiceInstance> },
}

impl PollOutcome {
    /// Most recent snapshot fetched, if any query succeeded.
    pub fn last_snapshot(&self) -> Option<&ServiceInstance> {
        match self {
            PollOutcome::Succeeded(instance) => Some(instance),
            PollOutcome::Failed { last, .. }
            | PollOutcome::TimedOut { last }
            | PollOutcome::Cancelled { last } => last.as_ref(),
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            PollOutcome::Succeeded(_) => "succeeded",
            PollOutcome::Failed { .. } => "failed",
            PollOutcome::TimedOut { .. } => "timed_out",
            PollOutcome::Cancelled { .. } => "cancelled",
        }
    }

    /// Split into the best snapshot and the error the command should report.
    pub fn into_parts(
        self,
        namespace: &str,
        name: &str,
        config: &PollConfig,
    ) -> (Option<ServiceInstance>, ProvisionResult<()>) {
        match self {
            PollOutcome::Succeeded(instance) => (Some(instance), Ok(())),
            PollOutcome::Failed { error, last } => (
                last,
                Err(ProvisionError::PollQueryFailed {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                    source: error,
                }),
            ),
            PollOutcome::TimedOut { last } => (
                last,
                Err(ProvisionError::PollTimedOut {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                    timeout: config.timeout,
                }),
            ),
            PollOutcome::Cancelled { last } => (
                last,
                Err(ProvisionError::PollCancelled {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                }),
            ),
        }
    }
}

/// Resolves once the flag is set. A dropped sender can never cancel.
pub(crate) async fn cancelled(cancel: &mut CancelSignal) {
    let closed = cancel.wait_for(|flag| *flag).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

/// Wait for an instance to reach a terminal state.
///
/// Queries are issued on a fixed `interval` cadence measured from the start
/// of the previous query, so they never run closer together than `interval`
/// and never overlap; a slow query delays the next one instead of bunching
/// them up. The first query is issued one interval after the call.
///
/// A failed query before the deadline (`start + timeout`) is logged and
/// polling continues. The deadline is checked when each query is issued, and
/// the whole wait, including an in-flight query, is cut off at
/// `deadline + interval`. Cancellation is observed during both the sleep and
/// the query.
///
/// Returns `Err` only for an invalid `config`.
pub async fn wait_for_instance(
    client: &dyn ServiceCatalog,
    namespace: &str,
    name: &str,
    config: &PollConfig,
    mut cancel: CancelSignal,
) -> ProvisionResult<PollOutcome> {
    config.validate()?;

    let start = Instant::now();
    let deadline = start + config.timeout;
    let mut ticks = tokio::time::interval_at(start + config.interval, config.interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let cutoff = tokio::time::sleep_until(deadline + config.interval);
    tokio::pin!(cutoff);

    let mut last: Option<ServiceInstance> = None;
    let mut attempt: u32 = 0;

    let outcome = loop {
        tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => break PollOutcome::Cancelled { last },
            _ = ticks.tick() => {}
            _ = &mut cutoff => break PollOutcome::TimedOut { last },
        }

        attempt += 1;
        let expired = Instant::now() >= deadline;
        let result = tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => break PollOutcome::Cancelled { last },
            result = client.retrieve_instance(namespace, name) => result,
            _ = &mut cutoff => break PollOutcome::TimedOut { last },
        };

        match result {
            Ok(instance) => {
                let terminal = instance.is_terminal();
                emit_poll_attempt(attempt, &instance.status_summary(), terminal);
                if terminal {
                    break PollOutcome::Succeeded(instance);
                }
                last = Some(instance);
                if expired {
                    break PollOutcome::TimedOut { last };
                }
            }
            Err(error) if expired => break PollOutcome::Failed { error, last },
            Err(error) => emit_poll_query_failed(attempt, &error),
        }
    };

    emit_poll_finished(outcome.label(), attempt, start.elapsed());
    Ok(outcome)
}
