//! Fire-and-forget background task queue.
//!
//! Deferred work is drained by a single worker task, one item at a time, so
//! background checks never run parallel to each other. There is no result
//! channel back to the submitter.

use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;

type Task = Pin<Box<dyn Future<Output = ()> + Send>>;

const QUEUE_CAPACITY: usize = 64;

/// Handle for submitting deferred work.
#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::Sender<Task>,
}

impl TaskQueue {
    /// Create the queue and spawn its worker loop.
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::channel::<Task>(QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                task.await;
            }
        });

        Self { tx }
    }

    /// Submit a task for eventual execution. If the queue is full or shut
    /// down the task is dropped and the drop is logged.
    pub fn submit<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.tx.try_send(Box::pin(task)).is_err() {
            tracing::error!("Task queue unavailable, dropping background task");
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_submitted_task_runs() {
        let queue = TaskQueue::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let c = counter.clone();
        queue.submit(async move {
            c.fetch_add(1, Ordering::SeqCst);
        });

        // The worker runs tasks asynchronously; give it a moment.
        for _ in 0..50 {
            if counter.load(Ordering::SeqCst) == 1 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("background task never ran");
    }

    #[tokio::test]
    async fn test_tasks_run_sequentially() {
        let queue = TaskQueue::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            queue.submit(async move {
                order.lock().unwrap().push(i);
            });
        }

        for _ in 0..50 {
            if order.lock().unwrap().len() == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }
}
