//! Ordered response queue for pipelined connections.
//!
//! The read loop pushes one slot per request, in arrival order. Each slot is
//! resolved by the task handling that request, whenever it finishes. The
//! writer pops slots oldest first and waits on each one in turn, so a fast
//! response never overtakes a slow one that was requested earlier.
//!
//! ```text
//!   read loop ──push──▶ [ s0 | s1 | s2 | ... ] ──next──▶ writer ──▶ socket
//!                          ▲    ▲    ▲
//!   handler tasks ─────────┴────┴────┴── resolve (any order)
//! ```
//!
//! Capacity counts outstanding slots: a slot holds its share from `push`
//! until the writer has written its response and dropped it. Once `capacity`
//! slots are outstanding, `push` waits.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::http::response::Response;

/// Outstanding responses allowed per connection.
pub const DEFAULT_PIPELINE_DEPTH: usize = 50;

type SlotResult = anyhow::Result<Response>;

#[derive(Debug, thiserror::Error)]
#[error("response queue closed")]
pub struct QueueClosed;

#[derive(Debug, thiserror::Error)]
pub enum SlotError {
    #[error("handler failed: {0:#}")]
    Handler(anyhow::Error),

    /// The slot was dropped without being resolved, e.g. its task panicked.
    #[error("slot dropped without a response")]
    Abandoned,
}

struct QueuedSlot {
    index: u64,
    receiver: oneshot::Receiver<SlotResult>,
    permit: OwnedSemaphorePermit,
}

pub struct ResponseQueue;

impl ResponseQueue {
    /// Creates a queue allowing `capacity` outstanding slots (at least one).
    pub fn bounded(capacity: usize) -> (SlotPusher, SlotDrain) {
        let permits = Arc::new(Semaphore::new(capacity.max(1)));
        let (tx, rx) = mpsc::unbounded_channel();

        let pusher = SlotPusher {
            tx,
            permits: Arc::clone(&permits),
            next_index: 0,
        };
        let drain = SlotDrain {
            rx,
            permits,
            capacity: capacity.max(1),
        };
        (pusher, drain)
    }
}

/// Read side of the queue. Dropping it closes the queue for further pushes.
pub struct SlotPusher {
    tx: mpsc::UnboundedSender<QueuedSlot>,
    permits: Arc<Semaphore>,
    next_index: u64,
}

impl SlotPusher {
    /// Appends an empty slot, waiting while the queue is at capacity.
    ///
    /// Fails once the drain has been dropped.
    pub async fn push(&mut self) -> Result<ResponseSlot, QueueClosed> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| QueueClosed)?;

        let (sender, receiver) = oneshot::channel();
        let index = self.next_index;

        self.tx
            .send(QueuedSlot {
                index,
                receiver,
                permit,
            })
            .map_err(|_| QueueClosed)?;
        self.next_index += 1;

        Ok(ResponseSlot { index, sender })
    }

    /// Completes when the drain side is gone.
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Placeholder for the response to one request.
///
/// Resolving consumes the slot, so it can be filled at most once.
#[derive(Debug)]
pub struct ResponseSlot {
    index: u64,
    sender: oneshot::Sender<SlotResult>,
}

impl ResponseSlot {
    /// Position of this slot on its connection, starting at 0.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Delivers the outcome for this slot.
    ///
    /// If the connection is already closing nobody will write it; the result
    /// is dropped here and then.
    pub fn resolve(self, result: SlotResult) {
        if let Err(discarded) = self.sender.send(result) {
            debug!(
                slot = self.index,
                ok = discarded.is_ok(),
                "Connection closed, discarding response"
            );
            drop(discarded);
        }
    }
}

/// Write side of the queue.
pub struct SlotDrain {
    rx: mpsc::UnboundedReceiver<QueuedSlot>,
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl SlotDrain {
    /// Waits for the oldest slot to be resolved and returns it.
    ///
    /// Later slots are not looked at until this one is ready. Returns `None`
    /// once the pusher is dropped and every pushed slot has been returned.
    pub async fn next(&mut self) -> Option<SlotOutcome> {
        let queued = self.rx.recv().await?;

        let outcome = match queued.receiver.await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(SlotError::Handler(e)),
            Err(_) => Err(SlotError::Abandoned),
        };

        Some(SlotOutcome {
            index: queued.index,
            outcome,
            permit: queued.permit,
        })
    }

    /// Slots pushed but not yet released by the writer.
    pub fn outstanding(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }
}

impl Drop for SlotDrain {
    fn drop(&mut self) {
        // Wake a pusher blocked on capacity
        self.permits.close();
    }
}

/// A slot whose outcome is known, still holding its queue capacity.
pub struct SlotOutcome {
    index: u64,
    outcome: Result<Response, SlotError>,
    permit: OwnedSemaphorePermit,
}

impl SlotOutcome {
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Splits off the outcome. Drop the returned [`SlotPermit`] once the
    /// response has been written to free the capacity.
    pub fn into_parts(self) -> (Result<Response, SlotError>, SlotPermit) {
        (self.outcome, SlotPermit { _permit: self.permit })
    }
}

/// Queue capacity held by a slot until its response is on the wire.
pub struct SlotPermit {
    _permit: OwnedSemaphorePermit,
}
