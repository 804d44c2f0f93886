//! Write-behind queue for remote persistence.
//!
//! Local mutations are applied in memory first and then handed to this queue.
//! One worker drains it in order, retrying transient failures with capped
//! exponential backoff. A job whose kind has a newer job queued behind it is
//! skipped, since every job rewrites the whole collection for its kind. So is
//! a job older than a remote version the store has already applied.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::{broadcast, mpsc, watch};

use super::StoreEvent;
use crate::backend::RemoteBackend;
use crate::errors::AppError;
use crate::models::{ContentKind, ContentRow};

/// Retry behaviour for remote writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for WritePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl WritePolicy {
    /// Delay before retry number `attempt` (1-based), with up to 20% jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(8);
        let base = self.base_backoff.as_millis() as u64;
        let cap = self.max_backoff.as_millis() as u64;
        let backoff = base.saturating_mul(1_u64 << exp).min(cap);
        let jitter = rand::thread_rng().gen_range(0..=(backoff / 5).max(1));
        Duration::from_millis(backoff.saturating_add(jitter))
    }
}

struct WriteJob {
    seq: u64,
    row: ContentRow,
}

struct Queue {
    next_seq: u64,
    /// Newest queued sequence per kind.
    latest: HashMap<ContentKind, u64>,
    /// Newest remote version applied per kind; older jobs must not overwrite it.
    remote: HashMap<ContentKind, DateTime<Utc>>,
    tx: mpsc::UnboundedSender<WriteJob>,
}

pub(crate) struct WriteBehind {
    queue: Arc<Mutex<Queue>>,
    completed: watch::Receiver<u64>,
    failures: Arc<AtomicU64>,
}

impl WriteBehind {
    pub(crate) fn spawn(
        backend: Arc<dyn RemoteBackend>,
        policy: WritePolicy,
        events: broadcast::Sender<StoreEvent>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (completed_tx, completed) = watch::channel(0);
        let queue = Arc::new(Mutex::new(Queue {
            next_seq: 0,
            latest: HashMap::new(),
            remote: HashMap::new(),
            tx,
        }));
        let failures = Arc::new(AtomicU64::new(0));

        let worker = Worker {
            backend,
            policy,
            events,
            queue: Arc::downgrade(&queue),
            completed: completed_tx,
            failures: failures.clone(),
        };
        tokio::spawn(worker.run(rx));

        Self {
            queue,
            completed,
            failures,
        }
    }

    /// Queue a row for persistence and return its sequence number.
    pub(crate) fn enqueue(&self, row: ContentRow) -> u64 {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.next_seq += 1;
        let seq = queue.next_seq;
        queue.latest.insert(row.kind, seq);
        if queue.tx.send(WriteJob { seq, row }).is_err() {
            tracing::error!("Write queue worker is gone; dropping write {}", seq);
        }
        seq
    }

    /// Drop queued or retrying jobs for `kind` stamped before `applied_at`.
    ///
    /// Returns whether a job for `kind` is still outstanding. One already in
    /// flight cannot be recalled, so the caller has to queue the applied row
    /// behind it.
    pub(crate) fn supersede(&self, kind: ContentKind, applied_at: DateTime<Utc>) -> bool {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let current = queue.remote.entry(kind).or_insert(applied_at);
        if *current < applied_at {
            *current = applied_at;
        }
        queue.latest.contains_key(&kind)
    }

    /// Resolves once every job queued before this call has finished, successfully or not.
    pub(crate) fn barrier(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let target = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_seq;
        let mut completed = self.completed.clone();
        async move {
            // An error means the worker stopped; nothing is left to wait for.
            let _ = completed.wait_for(|done| *done >= target).await;
        }
    }

    /// Jobs queued but not yet finished.
    pub(crate) fn pending(&self) -> u64 {
        let queued = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_seq;
        queued.saturating_sub(*self.completed.borrow())
    }

    /// Jobs that exhausted their retries or failed permanently.
    pub(crate) fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

struct Worker {
    backend: Arc<dyn RemoteBackend>,
    policy: WritePolicy,
    events: broadcast::Sender<StoreEvent>,
    queue: std::sync::Weak<Mutex<Queue>>,
    completed: watch::Sender<u64>,
    failures: Arc<AtomicU64>,
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<WriteJob>) {
        while let Some(job) = rx.recv().await {
            let kind = job.row.kind;
            if self.is_superseded(&job) {
                tracing::debug!("Skipping write {} for {}; superseded", job.seq, kind);
            } else {
                self.persist(&job).await;
            }
            self.forget(&job);
            self.completed.send_replace(job.seq);
        }
        tracing::debug!("Write queue closed");
    }

    fn is_superseded(&self, job: &WriteJob) -> bool {
        let Some(queue) = self.queue.upgrade() else {
            return false;
        };
        let queue = queue.lock().unwrap_or_else(PoisonError::into_inner);
        let newer_queued = queue
            .latest
            .get(&job.row.kind)
            .is_some_and(|latest| *latest > job.seq);
        let newer_remote = queue
            .remote
            .get(&job.row.kind)
            .is_some_and(|applied| *applied > job.row.updated_at);
        newer_queued || newer_remote
    }

    fn forget(&self, job: &WriteJob) {
        let Some(queue) = self.queue.upgrade() else {
            return;
        };
        let mut queue = queue.lock().unwrap_or_else(PoisonError::into_inner);
        if queue.latest.get(&job.row.kind) == Some(&job.seq) {
            queue.latest.remove(&job.row.kind);
        }
    }

    async fn persist(&self, job: &WriteJob) {
        let kind = job.row.kind;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.backend.upsert(&job.row).await {
                Ok(()) => {
                    tracing::debug!("Persisted {} (write {}, attempt {})", kind, job.seq, attempt);
                    let _ = self.events.send(StoreEvent::Persisted {
                        kind,
                        updated_at: job.row.updated_at,
                    });
                    return;
                }
                Err(AppError::Offline) => {
                    tracing::debug!("Offline; {} kept in memory only", kind);
                    return;
                }
                Err(e) if e.is_retryable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.backoff(attempt);
                    tracing::warn!(
                        "Persisting {} failed (attempt {}/{}), retrying in {:?}: {}",
                        kind,
                        attempt,
                        self.policy.max_attempts,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    if self.is_superseded(job) {
                        tracing::debug!("Dropping retry of write {} for {}", job.seq, kind);
                        return;
                    }
                }
                Err(e) => {
                    tracing::error!("Persisting {} failed after {} attempts: {}", kind, attempt, e);
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    let _ = self.events.send(StoreEvent::PersistFailed {
                        kind,
                        error: e.to_string(),
                        attempts: attempt,
                    });
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let policy = WritePolicy {
            max_attempts: 5,
            base_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(1_000),
        };

        let first = policy.backoff(1);
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(120));

        let third = policy.backoff(3);
        assert!(third >= Duration::from_millis(400) && third <= Duration::from_millis(480));

        let capped = policy.backoff(20);
        assert!(capped >= Duration::from_millis(1_000) && capped <= Duration::from_millis(1_200));
    }
}
