//! Bounded FIFO of render slots.
//!
//! Each slot is a one-shot rendezvous between the render task that fills it
//! and the drain loop that reads it. Slots leave the queue in push order, so
//! output order follows traversal order no matter which render finishes
//! first.
//!
//! Capacity is enforced with a semaphore: every slot owns a permit from push
//! until the drain loop has finished waiting on it. `push` therefore blocks
//! while `capacity` slots are outstanding, which also caps the number of
//! render tasks alive at once (a task is only launched after its push).

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc, oneshot};

/// Producer half: pushes slots and closes the queue.
pub struct OrderingQueue<T> {
    slots_tx: mpsc::UnboundedSender<OrderingSlot<T>>,
    permits: Arc<Semaphore>,
}

/// Consumer half: pops slots in push order.
pub struct OrderedSlots<T> {
    slots_rx: mpsc::UnboundedReceiver<OrderingSlot<T>>,
    permits: Arc<Semaphore>,
}

/// Write side of one slot, handed to the render task.
pub struct SlotWriter<T> {
    tx: oneshot::Sender<T>,
}

/// Read side of one slot, popped by the drain loop.
pub struct OrderingSlot<T> {
    rx: oneshot::Receiver<T>,
    _permit: OwnedSemaphorePermit,
}

/// Create a queue holding at most `capacity` unconsumed slots.
#[must_use]
pub fn ordering_queue<T>(capacity: NonZeroUsize) -> (OrderingQueue<T>, OrderedSlots<T>) {
    let (slots_tx, slots_rx) = mpsc::unbounded_channel();
    let permits = Arc::new(Semaphore::new(capacity.get()));
    (
        OrderingQueue {
            slots_tx,
            permits: Arc::clone(&permits),
        },
        OrderedSlots { slots_rx, permits },
    )
}

impl<T> OrderingQueue<T> {
    /// Append a new slot, waiting while the queue is full.
    ///
    /// Returns `None` if the consumer half is gone.
    pub async fn push(&self) -> Option<SlotWriter<T>> {
        let permit = Arc::clone(&self.permits).acquire_owned().await.ok()?;
        let (tx, rx) = oneshot::channel();
        self.slots_tx
            .send(OrderingSlot {
                rx,
                _permit: permit,
            })
            .ok()?;
        Some(SlotWriter { tx })
    }

    /// Signal that no more slots will be pushed. Slots already pushed stay
    /// poppable.
    pub fn close(self) {}
}

impl<T> OrderedSlots<T> {
    /// Oldest unconsumed slot, or `None` once the queue is closed and empty.
    pub async fn pop(&mut self) -> Option<OrderingSlot<T>> {
        self.slots_rx.recv().await
    }
}

impl<T> Drop for OrderedSlots<T> {
    fn drop(&mut self) {
        // Wake a producer blocked in `push` so it observes the closed queue.
        self.permits.close();
    }
}

impl<T> SlotWriter<T> {
    /// Fill the slot. Consumes the writer: each slot is written at most once.
    pub fn complete(self, value: T) {
        // The reader may already be gone during shutdown; nothing to do then.
        let _ = self.tx.send(value);
    }
}

impl<T> OrderingSlot<T> {
    /// Wait for the slot's writer. `None` if the writer was dropped without
    /// completing (its task died). The slot's capacity is released on return.
    pub async fn wait(self) -> Option<T> {
        self.rx.await.ok()
    }
}
