//! Completion poller timing and outcome tests.
//!
//! All tests run on tokio's paused clock, so elapsed times are exact.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use catalog_client::fakes::{ScriptedCatalog, ScriptedStatus};
use catalog_client::{
    CatalogError, CatalogResult, ProvisionOptions, ServiceCatalog, ServiceInstance,
};
use svcat_core::{cancel_channel, wait_for_instance, PollConfig, PollOutcome, ProvisionError};
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn seeded(statuses: Vec<ScriptedStatus>) -> ScriptedCatalog {
    let catalog = ScriptedCatalog::with_statuses(statuses);
    catalog.insert_instance(ServiceInstance::new("default", "db", "mysqldb", "free"));
    catalog
}

fn secs(interval: u64, timeout: u64) -> PollConfig {
    PollConfig::new(Duration::from_secs(interval), Duration::from_secs(timeout))
}

/// Records when each status query starts and optionally stalls it.
struct RecordingCatalog {
    inner: ScriptedCatalog,
    query_delay: Duration,
    started: Mutex<Vec<Instant>>,
}

impl RecordingCatalog {
    fn new(inner: ScriptedCatalog, query_delay: Duration) -> Self {
        Self {
            inner,
            query_delay,
            started: Mutex::new(Vec::new()),
        }
    }

    fn query_times(&self) -> Vec<Instant> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServiceCatalog for RecordingCatalog {
    async fn provision(
        &self,
        instance_name: &str,
        class_name: &str,
        plan_name: &str,
        options: &ProvisionOptions,
    ) -> CatalogResult<ServiceInstance> {
        self.inner
            .provision(instance_name, class_name, plan_name, options)
            .await
    }

    async fn retrieve_instance(
        &self,
        namespace: &str,
        name: &str,
    ) -> CatalogResult<ServiceInstance> {
        self.started.lock().unwrap().push(Instant::now());
        if !self.query_delay.is_zero() {
            tokio::time::sleep(self.query_delay).await;
        }
        self.inner.retrieve_instance(namespace, name).await
    }
}

// ---------------------------------------------------------------------------
// Terminal states
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn ready_after_four_pending_polls() {
    let catalog = seeded(vec![
        ScriptedStatus::Pending,
        ScriptedStatus::Pending,
        ScriptedStatus::Pending,
        ScriptedStatus::Pending,
        ScriptedStatus::Ready,
    ]);
    let (_tx, cancel) = cancel_channel();
    let start = Instant::now();

    let outcome = wait_for_instance(&catalog, "default", "db", &secs(1, 5), cancel)
        .await
        .unwrap();

    let elapsed = start.elapsed();
    match outcome {
        PollOutcome::Succeeded(instance) => assert!(instance.is_ready()),
        other => panic!("expected Succeeded, got {:?}", other),
    }
    assert!(catalog.retrieve_call_count() <= 5);
    assert!(elapsed >= Duration::from_secs(4), "elapsed {:?}", elapsed);
    assert!(elapsed <= Duration::from_secs(5), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn failed_instance_is_terminal() {
    let catalog = seeded(vec![ScriptedStatus::Pending, ScriptedStatus::Failed]);
    let (_tx, cancel) = cancel_channel();

    let outcome = wait_for_instance(&catalog, "default", "db", &secs(1, 10), cancel)
        .await
        .unwrap();

    match outcome {
        PollOutcome::Succeeded(instance) => assert!(instance.is_failed()),
        other => panic!("expected Succeeded, got {:?}", other),
    }
    assert_eq!(catalog.retrieve_call_count(), 2);
}

// ---------------------------------------------------------------------------
// Deadline
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn never_terminal_times_out_with_last_snapshot() {
    let catalog = seeded(vec![ScriptedStatus::Pending]);
    let (_tx, cancel) = cancel_channel();
    let start = Instant::now();

    let outcome = wait_for_instance(&catalog, "default", "db", &secs(1, 2), cancel)
        .await
        .unwrap();

    let elapsed = start.elapsed();
    match outcome {
        PollOutcome::TimedOut { last } => {
            let last = last.expect("last snapshot");
            assert_eq!(last.name, "db");
            assert!(!last.is_terminal());
        }
        other => panic!("expected TimedOut, got {:?}", other),
    }
    assert!(elapsed >= Duration::from_secs(2), "elapsed {:?}", elapsed);
    assert!(elapsed <= Duration::from_secs(3), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn overshoot_is_at_most_one_interval() {
    let catalog = seeded(Vec::new());
    let (_tx, cancel) = cancel_channel();
    let start = Instant::now();

    let outcome = wait_for_instance(&catalog, "default", "db", &secs(3, 7), cancel)
        .await
        .unwrap();

    assert!(matches!(outcome, PollOutcome::TimedOut { .. }));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(7), "elapsed {:?}", elapsed);
    assert!(elapsed <= Duration::from_secs(10), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn queries_never_closer_than_interval() {
    let catalog = RecordingCatalog::new(seeded(Vec::new()), Duration::from_millis(300));
    let (_tx, cancel) = cancel_channel();

    let outcome = wait_for_instance(&catalog, "default", "db", &secs(1, 5), cancel)
        .await
        .unwrap();

    assert!(matches!(outcome, PollOutcome::TimedOut { .. }));
    let times = catalog.query_times();
    assert!(times.len() >= 2);
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(1));
    }
}

#[tokio::test(start_paused = true)]
async fn slow_queries_stay_within_one_interval_of_timeout() {
    let catalog = RecordingCatalog::new(seeded(Vec::new()), Duration::from_millis(900));
    let (_tx, cancel) = cancel_channel();
    let start = Instant::now();

    let outcome = wait_for_instance(&catalog, "default", "db", &secs(1, 2), cancel)
        .await
        .unwrap();

    let elapsed = start.elapsed();
    match outcome {
        PollOutcome::TimedOut { last } => assert!(last.is_some()),
        other => panic!("expected TimedOut, got {:?}", other),
    }
    assert!(elapsed <= Duration::from_secs(3), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn stalled_query_is_cut_off_one_interval_after_timeout() {
    let catalog = RecordingCatalog::new(seeded(Vec::new()), Duration::from_secs(30));
    let (_tx, cancel) = cancel_channel();
    let start = Instant::now();

    let outcome = wait_for_instance(&catalog, "default", "db", &secs(1, 2), cancel)
        .await
        .unwrap();

    assert_eq!(outcome, PollOutcome::TimedOut { last: None });
    assert_eq!(catalog.query_times().len(), 1);
    let elapsed = start.elapsed();
    assert!(elapsed <= Duration::from_secs(3), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn cadence_is_measured_from_query_start() {
    let catalog = RecordingCatalog::new(seeded(Vec::new()), Duration::from_millis(1300));
    let (_tx, cancel) = cancel_channel();
    let start = Instant::now();

    let outcome = wait_for_instance(&catalog, "default", "db", &secs(1, 5), cancel)
        .await
        .unwrap();

    assert!(matches!(outcome, PollOutcome::TimedOut { .. }));
    let times = catalog.query_times();
    assert!(times.len() >= 3, "queries {}", times.len());
    for pair in times.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(gap >= Duration::from_secs(1), "gap {:?}", gap);
        assert!(gap < Duration::from_millis(1500), "gap {:?}", gap);
    }
    assert!(start.elapsed() <= Duration::from_secs(6));
}

// ---------------------------------------------------------------------------
// Query failures
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn transient_query_error_keeps_polling() {
    let catalog = seeded(vec![
        ScriptedStatus::Pending,
        ScriptedStatus::Error(CatalogError::Http("connection reset".to_string())),
        ScriptedStatus::Ready,
    ]);
    let (_tx, cancel) = cancel_channel();

    let outcome = wait_for_instance(&catalog, "default", "db", &secs(1, 10), cancel)
        .await
        .unwrap();

    assert!(matches!(outcome, PollOutcome::Succeeded(_)));
    assert_eq!(catalog.retrieve_call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn query_error_after_deadline_fails_with_last_snapshot() {
    let catalog = seeded(vec![
        ScriptedStatus::Pending,
        ScriptedStatus::Error(CatalogError::Api {
            status: 503,
            message: "unavailable".to_string(),
        }),
    ]);
    let (_tx, cancel) = cancel_channel();

    let outcome = wait_for_instance(&catalog, "default", "db", &secs(1, 2), cancel)
        .await
        .unwrap();

    match outcome {
        PollOutcome::Failed { error, last } => {
            assert!(matches!(error, CatalogError::Api { status: 503, .. }));
            assert!(last.is_some());
        }
        other => panic!("expected Failed, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn only_errors_until_deadline_fails_without_snapshot() {
    let catalog = ScriptedCatalog::new();
    let (_tx, cancel) = cancel_channel();

    let outcome = wait_for_instance(&catalog, "default", "missing", &secs(1, 3), cancel)
        .await
        .unwrap();

    match outcome {
        PollOutcome::Failed { error, last } => {
            assert!(matches!(error, CatalogError::InstanceNotFound { .. }));
            assert!(last.is_none());
        }
        other => panic!("expected Failed, got {:?}", other),
    }
    assert_eq!(catalog.retrieve_call_count(), 3);
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn cancel_during_sleep_returns_last_snapshot() {
    let catalog = seeded(Vec::new());
    let (tx, cancel) = cancel_channel();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(2500)).await;
        let _ = tx.send(true);
    });
    let start = Instant::now();

    let outcome = wait_for_instance(&catalog, "default", "db", &secs(1, 60), cancel)
        .await
        .unwrap();

    match outcome {
        PollOutcome::Cancelled { last } => assert!(last.is_some()),
        other => panic!("expected Cancelled, got {:?}", other),
    }
    assert_eq!(catalog.retrieve_call_count(), 2);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(2500), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(3), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn cancel_interrupts_in_flight_query() {
    let catalog = RecordingCatalog::new(seeded(Vec::new()), Duration::from_secs(30));
    let (tx, cancel) = cancel_channel();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let _ = tx.send(true);
    });
    let start = Instant::now();

    let outcome = wait_for_instance(&catalog, "default", "db", &secs(1, 60), cancel)
        .await
        .unwrap();

    assert_eq!(outcome, PollOutcome::Cancelled { last: None });
    assert_eq!(catalog.query_times().len(), 1);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(1500), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(2), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn already_cancelled_returns_before_first_query() {
    let catalog = seeded(vec![ScriptedStatus::Ready]);
    let (tx, cancel) = cancel_channel();
    tx.send(true).unwrap();

    let outcome = wait_for_instance(&catalog, "default", "db", &secs(1, 5), cancel)
        .await
        .unwrap();

    assert_eq!(outcome, PollOutcome::Cancelled { last: None });
    assert_eq!(catalog.retrieve_call_count(), 0);
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn invalid_config_rejected_before_any_query() {
    let catalog = seeded(vec![ScriptedStatus::Ready]);
    let (_tx, cancel) = cancel_channel();

    let err = wait_for_instance(&catalog, "default", "db", &secs(10, 5), cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::InvalidPollConfig(_)));
    assert_eq!(catalog.retrieve_call_count(), 0);
}
