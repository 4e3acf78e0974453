//! Poll-until-condition waiter.
//!
//! Some GleSYS operations finish asynchronously: a freshly created server is
//! locked and stopped for a while, a database is provisioned in the
//! background. [`wait_for_state`] polls a caller-supplied refresh function
//! until the observed attribute reaches the target value.
//!
//! Every poll is a fresh API read. Success is only reported after the target
//! was observed in one of them.
//!
//! ```text
//! WAITING --(observed == target)--> SUCCEEDED
//! WAITING --(observed in pending)--> WAITING
//! WAITING --(observed anything else)--> FAILED (unexpected state)
//! WAITING --(not found beyond grace)--> FAILED (not found)
//! WAITING --(refresh error)--> FAILED
//! WAITING --(deadline passed)--> TIMED_OUT
//! ```

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::ApiError;

/// What a wait is looking for and how patiently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitCondition {
    /// Value that ends the wait successfully.
    pub target: String,
    /// Values that mean "not there yet".
    pub pending: Vec<String>,
    /// Name of the observed attribute, used in logs and errors.
    pub attribute: String,
    /// Total time allowed for the wait.
    pub timeout: Duration,
    /// Delay between polls.
    pub delay: Duration,
    /// Lower bound for the delay between polls.
    pub min_interval: Duration,
    /// How many "not found" answers are tolerated before failing.
    pub not_found_checks: u32,
}

impl WaitCondition {
    /// A condition with one-second polling and a one-minute timeout.
    pub fn new<I, S>(attribute: impl Into<String>, target: impl Into<String>, pending: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target: target.into(),
            pending: pending.into_iter().map(Into::into).collect(),
            attribute: attribute.into(),
            timeout: Duration::from_secs(60),
            delay: Duration::from_secs(1),
            min_interval: Duration::from_secs(1),
            not_found_checks: 0,
        }
    }

    /// Server `isrunning` / `islocked` transitions.
    pub fn server(attribute: &str, target: &str, pending: &[&str]) -> Self {
        Self::new(attribute, target, pending.iter().copied())
            .with_timeout(Duration::from_secs(20 * 60))
            .with_delay(Duration::from_secs(6))
            .with_min_interval(Duration::from_secs(3))
    }

    /// Database status reaching `RUNNING`.
    pub fn database_running() -> Self {
        Self::new("status", "true", ["false"])
            .with_timeout(Duration::from_secs(20 * 60))
            .with_delay(Duration::from_secs(6))
            .with_min_interval(Duration::from_secs(3))
    }

    /// Parent server of a disk becoming unlocked. The server may not be
    /// visible yet right after it was created, hence the not-found grace.
    pub fn server_disk_parent_unlocked() -> Self {
        Self::new("islocked", "false", ["true"])
            .with_timeout(Duration::from_secs(10 * 60))
            .with_delay(Duration::from_secs(10))
            .with_min_interval(Duration::from_secs(3))
            .with_not_found_checks(60)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn with_not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    /// Time slept between two polls.
    pub fn interval(&self) -> Duration {
        self.delay.max(self.min_interval)
    }
}

/// Why a wait ended without reaching its target.
#[derive(Debug, Error)]
pub enum WaitError {
    #[error("timeout after {elapsed:?} waiting for {attribute} of {id} to become {target}")]
    Timeout {
        id: String,
        attribute: String,
        target: String,
        elapsed: Duration,
    },

    #[error("unexpected {attribute} of {id}: got {observed}, expected {target} (pending: {pending:?})")]
    UnexpectedState {
        id: String,
        attribute: String,
        observed: String,
        target: String,
        pending: Vec<String>,
    },

    #[error("{id} not found after {checks} checks")]
    NotFound { id: String, checks: u32 },

    #[error("error refreshing state: {0}")]
    Refresh(#[source] ApiError),
}

/// Poll `refresh` until it reports `cond.target` for `id`.
///
/// `refresh` returns the fetched snapshot together with the observed value
/// of the awaited attribute, `None` when the object is not found, or an error
/// which ends the wait immediately. The first poll happens right away; later
/// polls are spaced by [`WaitCondition::interval`], clamped to the deadline.
/// On success the snapshot of the poll that saw the target is returned.
pub async fn wait_for_state<T, F, Fut>(id: &str, cond: &WaitCondition, mut refresh: F) -> Result<T, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<(T, String)>, ApiError>>,
{
    let started = Instant::now();
    let deadline = started + cond.timeout;
    let mut not_found = 0u32;

    info!(
        id,
        attribute = %cond.attribute,
        target = %cond.target,
        timeout_secs = cond.timeout.as_secs(),
        "waiting for state"
    );

    loop {
        match refresh().await.map_err(WaitError::Refresh)? {
            Some((snapshot, observed)) => {
                if observed == cond.target {
                    info!(id, attribute = %cond.attribute, observed = %observed, "target state reached");
                    return Ok(snapshot);
                }
                if !cond.pending.iter().any(|p| *p == observed) {
                    warn!(id, attribute = %cond.attribute, observed = %observed, "unexpected state");
                    return Err(WaitError::UnexpectedState {
                        id: id.to_string(),
                        attribute: cond.attribute.clone(),
                        observed,
                        target: cond.target.clone(),
                        pending: cond.pending.clone(),
                    });
                }
                debug!(id, attribute = %cond.attribute, observed = %observed, "still pending");
            },
            None => {
                not_found += 1;
                if not_found > cond.not_found_checks {
                    return Err(WaitError::NotFound {
                        id: id.to_string(),
                        checks: not_found,
                    });
                }
                debug!(id, not_found, "not found yet");
            },
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(WaitError::Timeout {
                id: id.to_string(),
                attribute: cond.attribute.clone(),
                target: cond.target.clone(),
                elapsed: now - started,
            });
        }
        tokio::time::sleep(cond.interval().min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast() -> WaitCondition {
        WaitCondition::new("isrunning", "true", ["false"])
            .with_timeout(Duration::from_secs(60))
            .with_delay(Duration::from_secs(6))
            .with_min_interval(Duration::from_secs(3))
    }

    /// Refresh function answering from a script; the last entry repeats.
    fn scripted(
        script: Vec<Option<&'static str>>,
        calls: Arc<AtomicU32>,
    ) -> impl FnMut() -> std::future::Ready<Result<Option<(u32, String)>, ApiError>> {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            let idx = (n as usize).min(script.len() - 1);
            std::future::ready(Ok(script[idx].map(|v| (n, v.to_string()))))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_target_does_not_sleep() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();
        let snapshot = wait_for_state("srv1", &fast(), scripted(vec![Some("true")], calls.clone()))
            .await
            .unwrap();
        assert_eq!(snapshot, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_then_target_returns_last_snapshot() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();
        let snapshot = wait_for_state(
            "srv1",
            &fast(),
            scripted(vec![Some("false"), Some("false"), Some("true")], calls.clone()),
        )
        .await
        .unwrap();
        assert_eq!(snapshot, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_near_deadline() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();
        let err = wait_for_state::<u32, _, _>("srv1", &fast(), scripted(vec![Some("false")], calls.clone()))
            .await
            .unwrap_err();

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(60));
        assert!(elapsed <= Duration::from_secs(66));
        match err {
            WaitError::Timeout { id, attribute, .. } => {
                assert_eq!(id, "srv1");
                assert_eq!(attribute, "isrunning");
            },
            other => panic!("expected timeout, got {:?}", other),
        }
        // one immediate poll plus one per 6s interval up to and including the deadline
        assert_eq!(calls.load(Ordering::SeqCst), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_error_stops_polling() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let err = wait_for_state::<(), _, _>("db1", &fast(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Err(ApiError::Status {
                code: 500,
                text: "boom".to_string(),
            }))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, WaitError::Refresh(ApiError::Status { code: 500, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unexpected_state_fails_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let err = wait_for_state::<u32, _, _>("srv1", &fast(), scripted(vec![Some("maybe")], calls.clone()))
            .await
            .unwrap_err();
        match err {
            WaitError::UnexpectedState { observed, target, .. } => {
                assert_eq!(observed, "maybe");
                assert_eq!(target, "true");
            },
            other => panic!("expected unexpected state, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_within_grace_keeps_waiting() {
        let cond = fast().with_not_found_checks(2);
        let calls = Arc::new(AtomicU32::new(0));
        let snapshot = wait_for_state("srv1", &cond, scripted(vec![None, None, Some("true")], calls.clone()))
            .await
            .unwrap();
        assert_eq!(snapshot, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_beyond_grace_fails() {
        let cond = fast().with_not_found_checks(1);
        let calls = Arc::new(AtomicU32::new(0));
        let err = wait_for_state::<u32, _, _>("srv1", &cond, scripted(vec![None], calls.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::NotFound { checks: 2, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_call_site_conditions() {
        let server = WaitCondition::server("islocked", "false", &["true"]);
        assert_eq!(server.timeout, Duration::from_secs(1200));
        assert_eq!(server.interval(), Duration::from_secs(6));
        assert_eq!(server.not_found_checks, 0);

        let db = WaitCondition::database_running();
        assert_eq!(db.timeout, Duration::from_secs(1200));
        assert_eq!(db.target, "true");

        let disk = WaitCondition::server_disk_parent_unlocked();
        assert_eq!(disk.timeout, Duration::from_secs(600));
        assert_eq!(disk.interval(), Duration::from_secs(10));
        assert_eq!(disk.not_found_checks, 60);
    }

    #[test]
    fn test_interval_honours_min_interval() {
        let cond = fast()
            .with_delay(Duration::from_secs(1))
            .with_min_interval(Duration::from_secs(3));
        assert_eq!(cond.interval(), Duration::from_secs(3));
    }
}
