//! The controlled frame and its collaborators.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `host` | [`Frame`] and [`FrameHost`] traits implemented by the embedder |
//! | `controller` | [`FrameController`], [`ReadySignal`], [`LoadNotifier`] |
//! | `pointer` | [`Pointer`] trait and [`PointerAnimator`] |

// ============================================================================
// Submodules
// ============================================================================

/// Frame ownership and the navigation ready signal.
pub mod controller;

/// Collaborator traits.
pub mod host;

/// Simulated pointer animation.
pub mod pointer;

// ============================================================================
// Re-exports
// ============================================================================

pub use controller::{FrameController, LoadNotifier, ReadySignal};
pub use host::{Frame, FrameHost, NodeRef, Rect, Viewport};
pub use pointer::{AnimationTimings, Pointer, PointerAnimator};
