//! Ticket-based async mutex.
//!
//! The queue is an ordered list of slots. Each slot carries a one-shot
//! signal; only the head slot is ever armed. Releasing the head removes it
//! and arms the next one, so jobs are admitted strictly in reservation order.
//!
//! # Invariants
//!
//! - Slot reservation is a single synchronous step ([`JobQueue::lock`]).
//! - At most one slot (the head) has been signalled at any instant.
//! - A [`SlotGuard`] releases its slot on drop, whichever way the job ends:
//!   normal return, error, panic or cancellation.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::trace;

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// One waiting job's turn.
struct QueueSlot {
    /// Ticket number, unique per queue.
    ticket: u64,
    /// Signal sender; taken when the slot is armed.
    signal: Option<oneshot::Sender<()>>,
}

/// Shared queue state.
#[derive(Default)]
struct QueueState {
    next_ticket: u64,
    slots: VecDeque<QueueSlot>,
}

impl QueueState {
    /// Signals the head slot if it has not been signalled yet.
    fn arm_head(&mut self) {
        if let Some(head) = self.slots.front_mut()
            && let Some(signal) = head.signal.take()
        {
            trace!(ticket = head.ticket, "Slot armed");
            // A dropped receiver means its guard is being dropped too and
            // will hand the lock on.
            let _ = signal.send(());
        }
    }

    /// Removes a slot, arming the successor if the slot was the head.
    fn release(&mut self, ticket: u64) {
        let Some(position) = self.slots.iter().position(|slot| slot.ticket == ticket) else {
            return;
        };

        self.slots.remove(position);
        trace!(ticket, remaining = self.slots.len(), "Slot released");

        if position == 0 {
            self.arm_head();
        }
    }
}

// ============================================================================
// JobQueue
// ============================================================================

/// FIFO mutual exclusion for asynchronous jobs.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone, Default)]
pub struct JobQueue {
    state: Arc<Mutex<QueueState>>,
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue")
            .field("len", &self.len())
            .finish()
    }
}

impl JobQueue {
    /// Creates an empty queue.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next slot.
    ///
    /// The slot's position is fixed when this returns. If the queue was
    /// empty the slot is armed immediately.
    #[must_use]
    pub fn lock(&self) -> Ticket {
        let (tx, rx) = oneshot::channel();

        let ticket = {
            let mut state = self.state.lock();
            let ticket = state.next_ticket;
            state.next_ticket += 1;
            state.slots.push_back(QueueSlot {
                ticket,
                signal: Some(tx),
            });

            if state.slots.len() == 1 {
                state.arm_head();
            }

            ticket
        };

        Ticket {
            signal: rx,
            guard: SlotGuard {
                state: Arc::clone(&self.state),
                ticket,
            },
        }
    }

    /// Schedules `job` for exclusive execution.
    ///
    /// The slot is reserved synchronously, before the returned future is
    /// first polled, so the execution order equals the call order no matter
    /// when or where the futures are driven. The slot is released once the
    /// job's future has completed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SlotAbandoned`] if the slot could not be granted.
    pub fn enqueue<F, Fut>(&self, job: F) -> impl Future<Output = Result<Fut::Output>> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send,
    {
        let ticket = self.lock();

        async move {
            let _guard = ticket.acquire().await?;
            Ok(job().await)
        }
    }

    /// Returns the number of slots, including the running job.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().slots.len()
    }

    /// Returns `true` when no job is running or waiting.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Ticket
// ============================================================================

/// A reserved place in the queue.
///
/// Dropping the ticket gives the place up.
#[must_use = "dropping a ticket gives up its place in the queue"]
pub struct Ticket {
    signal: oneshot::Receiver<()>,
    guard: SlotGuard,
}

impl Ticket {
    /// Waits until this slot reaches the head of the queue.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SlotAbandoned`] if the slot was removed before it
    /// was armed.
    pub async fn acquire(self) -> Result<SlotGuard> {
        let Self { signal, guard } = self;
        signal.await.map_err(|_| Error::SlotAbandoned)?;
        Ok(guard)
    }

    /// Returns the ticket number.
    #[inline]
    #[must_use]
    pub fn number(&self) -> u64 {
        self.guard.ticket
    }
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticket")
            .field("ticket", &self.guard.ticket)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SlotGuard
// ============================================================================

/// Exclusive access to the queue; released on drop.
pub struct SlotGuard {
    state: Arc<Mutex<QueueState>>,
    ticket: u64,
}

impl fmt::Debug for SlotGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotGuard")
            .field("ticket", &self.ticket)
            .finish_non_exhaustive()
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.state.lock().release(self.ticket);
    }
}

// ============================================================================
// Tests
// ============================================================================
