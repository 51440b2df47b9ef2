//! Task Queue Module
//!
//! Bounded admission in front of an unbounded-concurrency executor. Work is
//! accepted synchronously (or rejected when the queue is full) and dispatched
//! in batches by the drain loop in [`crate::tasks::spawn_drain_task`].

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::QueueError;
use crate::queue::task::DeadlineMiss;
use crate::queue::{QueueStats, QueueStatsSnapshot, QueuedTask, TaskHandle};
use crate::tasks::spawn_drain_task;

/// Admission and batching parameters of a [`TaskQueue`].
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Pending tasks allowed before submissions are rejected
    pub max_queue_length: usize,
    /// Tasks dispatched per drain iteration
    pub batch_size: usize,
    /// Deadline applied by [`TaskQueue::submit`]
    pub default_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue_length: 2000,
            batch_size: 50,
            default_timeout: Duration::from_millis(10_000),
        }
    }
}

struct QueueShared {
    name: String,
    config: QueueConfig,
    pending: Mutex<VecDeque<QueuedTask>>,
    stats: Arc<Mutex<QueueStats>>,
    notify: Notify,
    accepting: AtomicBool,
    in_flight: AtomicUsize,
    next_id: AtomicU64,
}

// == Task Queue ==
/// Cheaply clonable handle to a bounded task queue.
#[derive(Clone)]
pub struct TaskQueue {
    shared: Arc<QueueShared>,
}

impl TaskQueue {
    // == Constructor ==
    /// Creates a queue without a drain loop. Use [`TaskQueue::start`] unless
    /// the drain task is spawned separately.
    pub fn new(name: impl Into<String>, config: QueueConfig) -> Self {
        let config = QueueConfig {
            batch_size: config.batch_size.max(1),
            ..config
        };

        Self {
            shared: Arc::new(QueueShared {
                name: name.into(),
                config,
                pending: Mutex::new(VecDeque::new()),
                stats: Arc::new(Mutex::new(QueueStats::new())),
                notify: Notify::new(),
                accepting: AtomicBool::new(true),
                in_flight: AtomicUsize::new(0),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Creates a queue and spawns its drain loop.
    pub fn start(name: impl Into<String>, config: QueueConfig) -> (Self, JoinHandle<()>) {
        let queue = Self::new(name, config);
        let handle = spawn_drain_task(queue.clone());
        (queue, handle)
    }

    // == Submit ==
    /// Enqueues `operation` with the default deadline.
    pub fn submit<F, Fut, T, E>(&self, operation: F) -> Result<TaskHandle<T, E>, QueueError<E>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.submit_with_timeout(operation, self.shared.config.default_timeout)
    }

    /// Enqueues `operation` with an explicit deadline.
    ///
    /// Admission is decided before this returns: a full queue yields
    /// [`QueueError::QueueFull`] and nothing is enqueued. The deadline starts
    /// counting now and covers both queue wait and execution.
    pub fn submit_with_timeout<F, Fut, T, E>(
        &self,
        operation: F,
        timeout: Duration,
    ) -> Result<TaskHandle<T, E>, QueueError<E>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let shared = &self.shared;
        let mut pending = shared.pending.lock();

        if !shared.accepting.load(Ordering::SeqCst) {
            return Err(QueueError::ShuttingDown);
        }

        let limit = shared.config.max_queue_length;
        if pending.len() >= limit {
            drop(pending);
            shared.stats.lock().record_rejected();
            warn!("Queue '{}' full, rejecting task ({} pending)", shared.name, limit);
            return Err(QueueError::QueueFull { limit });
        }

        let id = shared.next_id.fetch_add(1, Ordering::Relaxed);
        let submitted_at = Instant::now();
        let deadline = submitted_at + timeout;
        let (sender, receiver) = oneshot::channel();
        let stats = Arc::clone(&shared.stats);
        let miss = DeadlineMiss::new(Arc::clone(&shared.stats));
        let job_miss = Arc::clone(&miss);

        let job = Box::pin(async move {
            let started = Instant::now();
            let outcome = operation().await;
            stats.lock().record_processed(started.elapsed());
            if Instant::now() > deadline {
                job_miss.record();
            }
            // Receiver is gone after a timeout; the late result is discarded.
            let _ = sender.send(outcome);
        });

        pending.push_back(QueuedTask {
            id,
            submitted_at,
            deadline,
            job,
            miss: Arc::clone(&miss),
        });
        drop(pending);
        shared.notify.notify_one();

        Ok(TaskHandle {
            id,
            receiver,
            deadline,
            timeout,
            miss,
        })
    }

    // == Run ==
    /// Submits and waits in one step.
    ///
    /// Admission happens when the returned future is first polled; use
    /// [`TaskQueue::submit`] to learn about rejection immediately.
    pub async fn run<F, Fut, T, E>(&self, operation: F) -> Result<T, QueueError<E>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.submit(operation)?.wait().await
    }

    // == Shutdown ==
    /// Stops admission. The drain loop dispatches what is still pending,
    /// waits for in-flight tasks and then exits.
    pub fn shutdown(&self) {
        if self.shared.accepting.swap(false, Ordering::SeqCst) {
            info!("Queue '{}' shutting down", self.shared.name);
        }
        self.shared.notify.notify_one();
    }

    pub fn is_accepting(&self) -> bool {
        self.shared.accepting.load(Ordering::SeqCst)
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    /// Number of tasks waiting for dispatch.
    pub fn len(&self) -> usize {
        self.shared.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.pending.lock().is_empty()
    }

    /// Number of dispatched tasks not yet reaped by the drain loop.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Relaxed)
    }

    // == Stats ==
    pub fn stats(&self) -> QueueStatsSnapshot {
        let queue_size = self.len();
        self.shared.stats.lock().snapshot(
            queue_size,
            self.shared.config.max_queue_length,
            self.in_flight(),
        )
    }

    // == Drain Side ==
    /// Removes up to `batch_size` tasks from the head of the queue.
    pub(crate) fn take_batch(&self) -> Vec<QueuedTask> {
        let mut pending = self.shared.pending.lock();
        let count = pending.len().min(self.shared.config.batch_size);
        pending.drain(..count).collect()
    }

    /// Resolves after the next submission or shutdown signal.
    pub(crate) async fn notified(&self) {
        self.shared.notify.notified().await;
    }

    pub(crate) fn set_in_flight(&self, count: usize) {
        self.shared.in_flight.store(count, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("name", &self.shared.name)
            .field("config", &self.shared.config)
            .field("accepting", &self.is_accepting())
            .finish_non_exhaustive()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;
    use tokio::time::sleep;

    #[derive(Debug, Error, PartialEq)]
    #[error("operation failed: {0}")]
    struct TestError(String);

    fn config(max_queue_length: usize, batch_size: usize) -> QueueConfig {
        QueueConfig {
            max_queue_length,
            batch_size,
            default_timeout: Duration::from_secs(10),
        }
    }

    #[tokio::test]
    async fn test_third_submission_rejected_when_full() {
        let (queue, _drain) = TaskQueue::start("test", config(2, 50));

        let first = queue
            .submit(|| async { Ok::<_, TestError>(1) })
            .unwrap();
        let second = queue
            .submit(|| async { Ok::<_, TestError>(2) })
            .unwrap();
        let third = queue.submit(|| async { Ok::<_, TestError>(3) });

        assert!(matches!(third, Err(QueueError::QueueFull { limit: 2 })));
        assert_eq!(first.await.unwrap(), 1);
        assert_eq!(second.await.unwrap(), 2);

        let stats = queue.stats();
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.dropped, 0);
        assert_eq!(stats.rejected, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_operation_times_out() {
        let (queue, _drain) = TaskQueue::start("test", config(10, 50));

        let handle = queue
            .submit_with_timeout(
                || async {
                    sleep(Duration::from_millis(200)).await;
                    Ok::<_, TestError>("late")
                },
                Duration::from_millis(50),
            )
            .unwrap();

        let result = handle.await;
        assert!(matches!(
            result,
            Err(QueueError::OperationTimeout { timeout_ms: 50 })
        ));

        // Let the operation finish; its result goes nowhere
        sleep(Duration::from_millis(300)).await;
        let stats = queue.stats();
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.processed, 1);
    }

    #[tokio::test]
    async fn test_operation_error_propagates_verbatim() {
        let (queue, _drain) = TaskQueue::start("test", config(10, 50));

        let result = queue
            .submit(|| async { Err::<(), _>(TestError("X".to_string())) })
            .unwrap()
            .await;

        match result {
            Err(QueueError::Operation(err)) => assert_eq!(err, TestError("X".to_string())),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_starts_before_next_batch_dispatch() {
        let (queue, _drain) = TaskQueue::start("test", config(10, 2));
        let started = Arc::new(Mutex::new(Vec::new()));
        let delays = [40u64, 10, 5, 1];

        let handles: Vec<_> = delays
            .iter()
            .enumerate()
            .map(|(index, delay)| {
                let started = Arc::clone(&started);
                let delay = Duration::from_millis(*delay);
                queue
                    .submit(move || async move {
                        started.lock().push(index);
                        sleep(delay).await;
                        Ok::<_, TestError>(index)
                    })
                    .unwrap()
            })
            .collect();

        for (index, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), index);
        }

        let started = started.lock().clone();
        let mut first_batch = started[..2].to_vec();
        let mut second_batch = started[2..].to_vec();
        first_batch.sort_unstable();
        second_batch.sort_unstable();
        assert_eq!(first_batch, vec![0, 1]);
        assert_eq!(second_batch, vec![2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_excludes_queue_wait() {
        let queue = TaskQueue::new("test", config(10, 50));

        let handle = queue
            .submit(|| async {
                sleep(Duration::from_millis(20)).await;
                Ok::<_, TestError>(())
            })
            .unwrap();

        // Task sits in the queue for 500ms before any drain loop exists
        sleep(Duration::from_millis(500)).await;
        let _drain = spawn_drain_task(queue.clone());
        handle.await.unwrap();

        let stats = queue.stats();
        assert!(stats.max_time_ms >= 20.0, "max {}", stats.max_time_ms);
        assert!(stats.max_time_ms < 100.0, "max {}", stats.max_time_ms);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_task_is_skipped() {
        let queue = TaskQueue::new("test", config(10, 50));
        let ran = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&ran);
        let handle = queue
            .submit_with_timeout(
                move || async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok::<_, TestError>(())
                },
                Duration::from_millis(10),
            )
            .unwrap();

        let result = handle.await;
        assert!(matches!(result, Err(QueueError::OperationTimeout { .. })));

        let _drain = spawn_drain_task(queue.clone());
        sleep(Duration::from_millis(50)).await;

        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(queue.stats().processed, 0);
        // Counted once even though both the caller and the drain loop saw it expire
        assert_eq!(queue.stats().dropped, 1);
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counted_when_handle_is_dropped_while_queued() {
        let queue = TaskQueue::new("test", config(10, 50));

        let handle = queue
            .submit_with_timeout(|| async { Ok::<_, TestError>(()) }, Duration::from_millis(10))
            .unwrap();
        drop(handle);

        sleep(Duration::from_millis(50)).await;
        let _drain = spawn_drain_task(queue.clone());
        sleep(Duration::from_millis(10)).await;

        let stats = queue.stats();
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.processed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counted_when_handle_is_dropped_while_running() {
        let (queue, _drain) = TaskQueue::start("test", config(10, 50));

        let handle = queue
            .submit_with_timeout(
                || async {
                    sleep(Duration::from_millis(200)).await;
                    Ok::<_, TestError>(())
                },
                Duration::from_millis(50),
            )
            .unwrap();
        drop(handle);

        sleep(Duration::from_millis(300)).await;

        let stats = queue.stats();
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.processed, 1);
    }

    #[tokio::test]
    async fn test_shutdown_drains_pending_and_rejects_new_work() {
        let (queue, drain) = TaskQueue::start("test", config(10, 2));

        let handles: Vec<_> = (0..5)
            .map(|i| {
                queue
                    .submit(move || async move { Ok::<_, TestError>(i * 10) })
                    .unwrap()
            })
            .collect();

        queue.shutdown();
        let rejected = queue.submit(|| async { Ok::<_, TestError>(0) });
        assert!(matches!(rejected, Err(QueueError::ShuttingDown)));

        drain.await.unwrap();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), i * 10);
        }
        assert_eq!(queue.stats().processed, 5);
        assert_eq!(queue.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_run_helper() {
        let (queue, _drain) = TaskQueue::start("test", config(10, 50));

        let value = tokio_test::assert_ok!(queue.run(|| async { Ok::<_, TestError>("ok") }).await);
        assert_eq!(value, "ok");
    }

    #[tokio::test]
    async fn test_panicking_operation_is_cancelled() {
        let (queue, _drain) = TaskQueue::start("test", config(10, 50));

        let result = queue
            .submit(|| async {
                if true {
                    panic!("boom");
                }
                Ok::<(), TestError>(())
            })
            .unwrap()
            .await;

        assert!(matches!(result, Err(QueueError::Cancelled)));
    }
}
