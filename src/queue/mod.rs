//! FIFO job queue granting exclusive access to the frame.
//!
//! Every command runs as a job on a [`JobQueue`]. Jobs are admitted one at a
//! time in the order they were enqueued.
//!
//! # Example
//!
//! ```ignore
//! let queue = JobQueue::new();
//!
//! // Slot is reserved here, before the future is polled.
//! let first = queue.enqueue(|| async { 1 });
//! let second = queue.enqueue(|| async { 2 });
//!
//! tokio::spawn(second);
//! assert_eq!(first.await?, 1);
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Ticket-based async mutex.
pub mod job_queue;

// ============================================================================
// Re-exports
// ============================================================================

pub use job_queue::{JobQueue, SlotGuard, Ticket};
