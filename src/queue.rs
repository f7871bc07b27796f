//! Job substrate that carries rebuild requests to a worker.
//!
//! The store only needs `submit`; where and when the job runs is up to the
//! implementation. [`TokioQueue`] is the in-process implementation: a bounded
//! tokio channel drained by [`crate::worker::RebuildWorker::run`].

use crate::error::{Error, Result};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Asynchronous execution substrate for rebuild jobs.
///
/// Jobs are opaque byte payloads. Submission must not wait for the job to
/// run, and there is no return channel back to the submitter.
#[allow(async_fn_in_trait)]
pub trait JobQueue: Send + Sync + Clone {
    /// Enqueue a job.
    ///
    /// # Errors
    /// Returns `Error::SubmitError` if the substrate rejects the job.
    async fn submit(&self, job: Vec<u8>) -> Result<()>;
}

/// Sending half of an in-process bounded job queue.
#[derive(Clone, Debug)]
pub struct TokioQueue {
    sender: mpsc::Sender<Vec<u8>>,
}

/// Receiving half of a [`TokioQueue`].
#[derive(Debug)]
pub struct JobReceiver {
    receiver: mpsc::Receiver<Vec<u8>>,
}

impl TokioQueue {
    /// Create a queue holding at most `capacity` pending jobs.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn bounded(capacity: usize) -> (TokioQueue, JobReceiver) {
        let (sender, receiver) = mpsc::channel(capacity);
        (TokioQueue { sender }, JobReceiver { receiver })
    }

    /// Number of jobs that can still be accepted without rejection.
    pub fn remaining_capacity(&self) -> usize {
        self.sender.capacity()
    }
}

impl JobQueue for TokioQueue {
    async fn submit(&self, job: Vec<u8>) -> Result<()> {
        self.sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => Error::SubmitError("rebuild queue is full".to_string()),
            TrySendError::Closed(_) => Error::SubmitError("rebuild queue is closed".to_string()),
        })
    }
}

impl JobReceiver {
    /// Wait for the next job; `None` once every sender is dropped.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.receiver.recv().await
    }

    /// Take a pending job without waiting.
    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.receiver.try_recv().ok()
    }

    /// Stop accepting new jobs; already queued jobs can still be received.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_and_receive() {
        let (queue, mut receiver) = TokioQueue::bounded(4);

        queue.submit(b"job-1".to_vec()).await.expect("Failed to submit");
        queue.submit(b"job-2".to_vec()).await.expect("Failed to submit");

        assert_eq!(receiver.recv().await, Some(b"job-1".to_vec()));
        assert_eq!(receiver.try_recv(), Some(b"job-2".to_vec()));
        assert_eq!(receiver.try_recv(), None);
    }

    #[tokio::test]
    async fn test_submit_full_queue_rejected() {
        let (queue, _receiver) = TokioQueue::bounded(1);

        queue.submit(vec![1]).await.expect("Failed to submit");
        assert_eq!(queue.remaining_capacity(), 0);

        let result = queue.submit(vec![2]).await;
        assert!(matches!(result, Err(Error::SubmitError(_))));
    }

    #[tokio::test]
    async fn test_submit_closed_queue_rejected() {
        let (queue, receiver) = TokioQueue::bounded(1);
        drop(receiver);

        let result = queue.submit(vec![1]).await;
        assert!(matches!(result, Err(Error::SubmitError(_))));
    }

    #[tokio::test]
    async fn test_recv_ends_when_senders_dropped() {
        let (queue, mut receiver) = TokioQueue::bounded(1);
        drop(queue);
        assert_eq!(receiver.recv().await, None);
    }

    #[tokio::test]
    async fn test_close_rejects_new_jobs_and_keeps_buffered() {
        let (queue, mut receiver) = TokioQueue::bounded(4);
        queue.submit(b"queued".to_vec()).await.expect("Failed to submit");

        receiver.close();

        let result = queue.submit(b"late".to_vec()).await;
        assert!(matches!(result, Err(Error::SubmitError(_))));
        assert_eq!(receiver.recv().await, Some(b"queued".to_vec()));
        assert_eq!(receiver.recv().await, None);
    }
}
