//! Hands rebuild requests to the job substrate.

use crate::descriptor::RebuildRequest;
use crate::error::{Error, Result};
use crate::queue::JobQueue;

/// Fire-and-forget submission of rebuild requests.
///
/// The dispatcher encodes a [`RebuildRequest`] and submits it; it never
/// computes values and never waits for the rebuild. No de-duplication happens
/// here: the store's optional in-flight marker is the only guard against
/// duplicate dispatches.
#[derive(Clone, Debug)]
pub struct RebuildDispatcher<Q: JobQueue> {
    queue: Q,
}

impl<Q: JobQueue> RebuildDispatcher<Q> {
    pub fn new(queue: Q) -> Self {
        RebuildDispatcher { queue }
    }

    /// Submit one rebuild request.
    ///
    /// # Errors
    /// Returns `Error::SubmitError` if the request cannot be encoded or the
    /// substrate rejects it.
    pub async fn dispatch(&self, request: &RebuildRequest) -> Result<()> {
        let job = request
            .encode()
            .map_err(|e| Error::SubmitError(format!("cannot encode rebuild request: {}", e)))?;

        self.queue.submit(job).await.map_err(|e| match e {
            Error::SubmitError(_) => e,
            other => Error::SubmitError(other.to_string()),
        })?;

        debug!(
            "» Rebuild dispatched for {} via {}/{}",
            request.key, request.descriptor.target, request.descriptor.operation
        );
        Ok(())
    }

    /// Get queue reference (for advanced use).
    pub fn queue(&self) -> &Q {
        &self.queue
    }
}
