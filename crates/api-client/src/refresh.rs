//! Single-flight token refresh
//!
//! The coordinator is either idle or refreshing. The first caller to arrive
//! while idle becomes the leader and runs the refresh; callers arriving while
//! a refresh is in flight are queued and receive the leader's outcome. The
//! queue is drained exactly once, in enqueue order, when the refresh settles.
//!
//! Transitions:
//! - Idle → Refreshing (leader joins)
//! - Refreshing → Idle (leader settles, or its future is dropped)
//!
//! A dropped leader drains the queue with `RefreshError::Abandoned`, so the
//! coordinator can never be left refreshing with nobody to finish the job.
//!
//! The error of the most recent failed refresh is kept until the next refresh
//! starts, so a 401 that lands after the session was already torn down can
//! report it instead of starting another cycle.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::RefreshError;

/// New access token, or the reason the refresh failed.
pub type RefreshOutcome = std::result::Result<String, RefreshError>;

enum State {
    Idle,
    Refreshing(Vec<oneshot::Sender<RefreshOutcome>>),
}

struct Inner {
    state: State,
    last_failure: Option<RefreshError>,
}

enum Role<'a> {
    Leader(LeaderGuard<'a>),
    Follower(oneshot::Receiver<RefreshOutcome>),
}

/// Guarantees at most one refresh in flight per client.
///
/// The std Mutex is only held for state swaps, never across an await.
pub struct RefreshCoordinator {
    inner: Mutex<Inner>,
    queue_wait_timeout: Option<Duration>,
}

impl RefreshCoordinator {
    /// `queue_wait_timeout` bounds how long a queued caller waits; `None`
    /// waits for the refresh to settle.
    pub fn new(queue_wait_timeout: Option<Duration>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: State::Idle,
                last_failure: None,
            }),
            queue_wait_timeout,
        }
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(self.lock().state, State::Refreshing(_))
    }

    /// Error of the last refresh, if it failed. Cleared when a new refresh
    /// starts.
    pub fn last_failure(&self) -> Option<RefreshError> {
        self.lock().last_failure.clone()
    }

    /// Number of callers waiting on the in-flight refresh.
    pub fn queued(&self) -> usize {
        match &self.lock().state {
            State::Refreshing(waiters) => waiters.len(),
            State::Idle => 0,
        }
    }

    /// Run `refresh` unless one is already in flight, in which case wait for
    /// that one's outcome instead.
    ///
    /// `refresh` is only invoked by the leader.
    pub async fn refresh<F, Fut>(&self, refresh: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome>,
    {
        match self.join() {
            Role::Follower(rx) => self.wait(rx).await,
            Role::Leader(guard) => {
                let outcome = refresh().await;
                guard.settle(&outcome);
                outcome
            }
        }
    }

    fn join(&self) -> Role<'_> {
        let mut inner = self.lock();
        if let State::Refreshing(waiters) = &mut inner.state {
            let (tx, rx) = oneshot::channel();
            waiters.push(tx);
            debug!(queued = waiters.len(), "refresh in flight, queueing request");
            crate::metrics::record_queued();
            return Role::Follower(rx);
        }
        inner.state = State::Refreshing(Vec::new());
        inner.last_failure = None;
        debug!("starting token refresh");
        Role::Leader(LeaderGuard {
            coordinator: self,
            settled: false,
        })
    }

    async fn wait(&self, rx: oneshot::Receiver<RefreshOutcome>) -> RefreshOutcome {
        let received = match self.queue_wait_timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    warn!(
                        wait_ms = limit.as_millis() as u64,
                        "queued request timed out waiting for refresh"
                    );
                    return Err(RefreshError::QueueTimeout(limit));
                }
            },
            None => rx.await,
        };
        // Sender dropped without a value: the leader vanished mid-drain.
        received.unwrap_or(Err(RefreshError::Abandoned))
    }

    /// Return to idle and hand `outcome` to every queued caller.
    fn drain(&self, outcome: RefreshOutcome) {
        let waiters = {
            let mut inner = self.lock();
            inner.last_failure = outcome.as_ref().err().cloned();
            match std::mem::replace(&mut inner.state, State::Idle) {
                State::Refreshing(waiters) => waiters,
                State::Idle => Vec::new(),
            }
        };
        debug!(
            waiters = waiters.len(),
            success = outcome.is_ok(),
            "draining refresh queue"
        );
        for waiter in waiters {
            // A receiver that gave up (queue timeout) is simply skipped.
            let _ = waiter.send(outcome.clone());
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owned by the leader; drains the queue even if the leader is cancelled.
struct LeaderGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl LeaderGuard<'_> {
    fn settle(mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        self.coordinator.drain(outcome.clone());
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("refresh dropped before settling, failing queued requests");
            self.coordinator.drain(Err(RefreshError::Abandoned));
        }
    }
}
