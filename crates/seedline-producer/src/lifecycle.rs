//! Control surface for a running seed producer.

use crate::channel::{QueueEntry, SeedOutputChannel};
use crate::error::Result;
use crate::producer::{SeedProducer, SeedSummary};
use seedline_core::ProducerId;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Handle returned by [`SeedProducer::start`].
///
/// None of the polling methods wait longer than the timeout they are given,
/// so a supervisor can interleave many handles.
#[derive(Debug)]
pub struct ProducerHandle {
    id: ProducerId,
    output: SeedOutputChannel,
    cancel: CancellationToken,
    task: JoinHandle<SeedSummary>,
    poll_timeout: Duration,
}

impl ProducerHandle {
    pub(crate) fn spawn(
        producer: SeedProducer,
        cancel: CancellationToken,
        poll_timeout: Duration,
    ) -> Self {
        let id = producer.id();
        let output = producer.output().clone();
        let run_token = cancel.clone();

        let task = tokio::spawn(async move { producer.seed_output_queue(&run_token).await });
        debug!(producer = %id, "seed producer started");

        Self {
            id,
            output,
            cancel,
            task,
            poll_timeout,
        }
    }

    /// Identifier carried by this producer's sentinel.
    #[must_use]
    pub fn id(&self) -> ProducerId {
        self.id
    }

    /// A clone of the output channel, for handing to consumers.
    #[must_use]
    pub fn output(&self) -> SeedOutputChannel {
        self.output.clone()
    }

    /// Take one produced entry, waiting at most `timeout`.
    pub async fn poll_result(&self, timeout: Duration) -> Option<QueueEntry> {
        self.output.poll(timeout).await
    }

    /// Take one produced entry, waiting at most the configured poll timeout.
    pub async fn get_result(&self) -> Option<QueueEntry> {
        self.poll_result(self.poll_timeout).await
    }

    /// Take one produced entry without waiting.
    #[must_use]
    pub fn try_result(&self) -> Option<QueueEntry> {
        self.output.try_dequeue()
    }

    /// Whether the output channel currently holds undelivered entries.
    ///
    /// This is a hint: another consumer may take them before the next poll.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        !self.output.is_empty()
    }

    /// Ask the producer to stop after the current target.
    ///
    /// An in-flight fetch is abandoned. The sentinel is still enqueued.
    /// Calling this more than once has no further effect.
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            debug!(producer = %self.id, "stop requested");
            self.cancel.cancel();
        }
    }

    /// Whether [`stop`](Self::stop) has been called or the token was
    /// cancelled by its parent.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the run has completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to complete and return its summary.
    ///
    /// # Errors
    /// Returns [`ProducerError::Join`](crate::ProducerError::Join) if the
    /// run task panicked or was aborted.
    pub async fn join(self) -> Result<SeedSummary> {
        Ok(self.task.await?)
    }
}
