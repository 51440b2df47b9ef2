//! Queue Drain Task
//!
//! Background task that pulls batches off a task queue and dispatches every
//! task of a batch concurrently.

use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::queue::TaskQueue;

/// Spawns the drain loop for `queue`.
///
/// Each iteration removes up to `batch_size` tasks from the head of the
/// queue, spawns them into a tracked set and yields before the next
/// iteration without waiting for the batch to finish. When the queue is
/// empty the loop sleeps until the next submission while reaping finished
/// tasks.
///
/// After [`TaskQueue::shutdown`] the loop keeps dispatching until the queue
/// is empty, then waits for in-flight tasks and returns. That wait ends at
/// the latest deadline among dispatched tasks; anything still running then
/// has no caller left and is aborted.
///
/// # Example
/// ```ignore
/// let queue = TaskQueue::new("teachers", QueueConfig::default());
/// let drain_handle = spawn_drain_task(queue.clone());
/// // Later, during shutdown:
/// queue.shutdown();
/// drain_handle.await?;
/// ```
pub fn spawn_drain_task(queue: TaskQueue) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting drain loop for queue '{}' with batch size {}",
            queue.name(),
            queue.config().batch_size
        );

        let mut in_flight: JoinSet<()> = JoinSet::new();
        let mut latest_deadline: Option<Instant> = None;

        loop {
            // Read before taking the batch so a late submission is never stranded
            let closing = !queue.is_accepting();
            let batch = queue.take_batch();

            if batch.is_empty() {
                if closing {
                    break;
                }

                tokio::select! {
                    _ = queue.notified() => {}
                    Some(result) = in_flight.join_next(), if !in_flight.is_empty() => {
                        report(queue.name(), result);
                    }
                }
                queue.set_in_flight(in_flight.len());
                continue;
            }

            let batch_len = batch.len();
            for task in batch {
                if task.is_expired() {
                    debug!(
                        "Queue '{}': skipping task {} whose deadline passed while queued",
                        queue.name(),
                        task.id()
                    );
                    task.record_dropped();
                    continue;
                }
                debug!(
                    "Queue '{}': dispatching task {} after {:?} in queue",
                    queue.name(),
                    task.id(),
                    task.waited()
                );
                latest_deadline = latest_deadline.max(Some(task.deadline));
                in_flight.spawn(task.job);
            }

            while let Some(result) = in_flight.try_join_next() {
                report(queue.name(), result);
            }
            queue.set_in_flight(in_flight.len());
            debug!(
                "Queue '{}': dispatched batch of {} ({} in flight)",
                queue.name(),
                batch_len,
                in_flight.len()
            );

            tokio::task::yield_now().await;
        }

        let grace = latest_deadline.unwrap_or_else(Instant::now);
        let joined = tokio::time::timeout_at(grace, async {
            while let Some(result) = in_flight.join_next().await {
                report(queue.name(), result);
            }
        })
        .await;

        if joined.is_err() {
            warn!(
                "Queue '{}': abandoning {} tasks still running past their deadline",
                queue.name(),
                in_flight.len()
            );
            in_flight.abort_all();
            while let Some(result) = in_flight.join_next().await {
                report(queue.name(), result);
            }
        }
        queue.set_in_flight(0);

        info!("Drain loop for queue '{}' stopped", queue.name());
    })
}

fn report(queue: &str, result: Result<(), JoinError>) {
    if let Err(err) = result {
        if err.is_panic() {
            warn!("Queue '{}': task panicked: {}", queue, err);
        } else {
            debug!("Queue '{}': task aborted: {}", queue, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::time::Duration;

    use crate::error::QueueError;
    use crate::queue::QueueConfig;

    #[tokio::test]
    async fn test_drain_loop_stops_after_shutdown() {
        let queue = TaskQueue::new("drain", QueueConfig::default());
        let handle = spawn_drain_task(queue.clone());

        queue.shutdown();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("drain loop should exit")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_gauge_tracks_running_tasks() {
        let queue = TaskQueue::new("drain", QueueConfig::default());
        let _handle = spawn_drain_task(queue.clone());

        let task = queue
            .submit(|| async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok::<_, std::convert::Infallible>(())
            })
            .unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(queue.in_flight(), 1);
        assert!(queue.is_empty());

        task.await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(queue.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_abandons_tasks_that_never_finish() {
        let queue = TaskQueue::new("drain", QueueConfig::default());
        let handle = spawn_drain_task(queue.clone());

        let task = queue
            .submit_with_timeout(
                std::future::pending::<Result<(), Infallible>>,
                Duration::from_millis(100),
            )
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(queue.in_flight(), 1);

        queue.shutdown();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("drain loop should exit")
            .unwrap();
        assert_eq!(queue.in_flight(), 0);
        assert!(matches!(
            task.await,
            Err(QueueError::OperationTimeout { timeout_ms: 100 })
        ));
        assert_eq!(queue.stats().dropped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_tasks_within_their_deadline() {
        let queue = TaskQueue::new("drain", QueueConfig::default());
        let handle = spawn_drain_task(queue.clone());

        let task = queue
            .submit(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok::<_, Infallible>("done")
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        queue.shutdown();
        handle.await.unwrap();

        assert_eq!(task.await.unwrap(), "done");
        assert_eq!(queue.stats().processed, 1);
    }

    #[tokio::test]
    async fn test_drain_can_be_aborted() {
        let queue = TaskQueue::new("drain", QueueConfig::default());
        let handle = spawn_drain_task(queue);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
