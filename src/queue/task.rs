//! Queued Task Module
//!
//! A type-erased unit of work waiting in a queue, and the caller-side handle
//! that observes its single result.

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::debug;

use crate::error::QueueError;
use crate::queue::QueueStats;

/// Boxed future that runs an operation and delivers its result.
pub(crate) type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

// == Deadline Miss ==
/// Shared by a task and its handle so a missed deadline is counted once,
/// whichever side notices it first: the waiting caller, the drain loop
/// skipping an expired task, or the job finishing late.
#[derive(Debug)]
pub(crate) struct DeadlineMiss {
    recorded: AtomicBool,
    stats: Arc<Mutex<QueueStats>>,
}

impl DeadlineMiss {
    pub(crate) fn new(stats: Arc<Mutex<QueueStats>>) -> Arc<Self> {
        Arc::new(Self {
            recorded: AtomicBool::new(false),
            stats,
        })
    }

    pub(crate) fn record(&self) {
        if !self.recorded.swap(true, Ordering::SeqCst) {
            self.stats.lock().record_dropped();
        }
    }
}

// == Queued Task ==
/// A pending task. Lives in exactly one place: the pending queue, or
/// (once dispatched) the drain loop's in-flight set.
pub struct QueuedTask {
    pub(crate) id: u64,
    pub(crate) submitted_at: Instant,
    pub(crate) deadline: Instant,
    pub(crate) job: Job,
    pub(crate) miss: Arc<DeadlineMiss>,
}

impl QueuedTask {
    /// True once the caller can no longer receive the result.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Time spent waiting in the queue so far.
    pub fn waited(&self) -> Duration {
        Instant::now().saturating_duration_since(self.submitted_at)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Counts the task as dropped; used when it is discarded unexecuted.
    pub(crate) fn record_dropped(&self) {
        self.miss.record();
    }
}

impl std::fmt::Debug for QueuedTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedTask")
            .field("id", &self.id)
            .field("submitted_at", &self.submitted_at)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

// == Task Handle ==
/// Caller side of a submitted task.
///
/// Await it (or call [`TaskHandle::wait`]) to get the operation's result.
/// Dropping the handle discards the result but does not stop the operation.
#[derive(Debug)]
pub struct TaskHandle<T, E> {
    pub(crate) id: u64,
    pub(crate) receiver: oneshot::Receiver<Result<T, E>>,
    pub(crate) deadline: Instant,
    pub(crate) timeout: Duration,
    pub(crate) miss: Arc<DeadlineMiss>,
}

impl<T, E> TaskHandle<T, E> {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Instant after which the task fails with a timeout.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    // == Wait ==
    /// Waits for the result until the task's deadline.
    pub async fn wait(self) -> Result<T, QueueError<E>> {
        let timeout_ms = self.timeout.as_millis() as u64;

        match tokio::time::timeout_at(self.deadline, self.receiver).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(err))) => Err(QueueError::Operation(err)),
            // Skipped at dispatch because its deadline had already passed
            Ok(Err(_)) if Instant::now() >= self.deadline => {
                self.miss.record();
                Err(QueueError::OperationTimeout { timeout_ms })
            }
            Ok(Err(_)) => Err(QueueError::Cancelled),
            Err(_) => {
                debug!("Task {} timed out after {}ms", self.id, timeout_ms);
                self.miss.record();
                Err(QueueError::OperationTimeout { timeout_ms })
            }
        }
    }
}

impl<T, E> IntoFuture for TaskHandle<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = Result<T, QueueError<E>>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}
