//! Structured observability hooks for the provision lifecycle.
//!
//! Emission functions for key lifecycle events: request, acceptance, poll
//! attempts, poll result. Callers run inside the `svcat.provision` span, so
//! every event carries the instance namespace and name.
//!
//! Events are emitted at `info!`/`debug!` level; filter with `RUST_LOG`.

use std::time::Duration;

use tracing::{debug, info, warn};

/// Emit event: provision request about to be sent.
pub fn emit_provision_requested(class_name: &str, plan_name: &str, params: usize, secrets: usize) {
    info!(
        event = "provision.requested",
        class = %class_name,
        plan = %plan_name,
        params = params,
        secrets = secrets,
    );
}

/// Emit event: resource manager accepted the instance.
pub fn emit_provision_accepted(namespace: &str, name: &str, status: &str) {
    info!(event = "provision.accepted", namespace = %namespace, name = %name, status = %status);
}

/// Emit event: one status query completed.
pub fn emit_poll_attempt(attempt: u32, status: &str, terminal: bool) {
    debug!(event = "poll.attempt", attempt = attempt, status = %status, terminal = terminal);
}

/// Emit event: a status query failed before the deadline; polling continues (warning level).
pub fn emit_poll_query_failed(attempt: u32, error: &dyn std::fmt::Display) {
    warn!(event = "poll.query_failed", attempt = attempt, error = %error);
}

/// Emit event: polling finished with the given outcome.
pub fn emit_poll_finished(outcome: &str, attempts: u32, elapsed: Duration) {
    info!(
        event = "poll.finished",
        outcome = %outcome,
        attempts = attempts,
        elapsed_ms = elapsed.as_millis() as u64,
    );
}
