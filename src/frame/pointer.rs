//! Simulated pointer animation.
//!
//! Animated `click` and `enter` commands move a visible pointer over the
//! target before acting. The sequence is fixed:
//!
//! | Step | Default |
//! |------|---------|
//! | wait before approaching | 500ms |
//! | show pointer, move to target | 300ms |
//! | hover | 500ms |
//! | press animation | 200ms |
//! | run the action | - |
//! | linger | 1000ms |
//! | hide pointer | - |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::trace;

use crate::client::options::duration_ms;
use crate::error::Result;

use super::host::{Frame, NodeRef, Rect};

// ============================================================================
// Pointer
// ============================================================================

/// The visual pointer element on the hosting page.
#[async_trait]
pub trait Pointer: Send + Sync {
    /// Returns the pointer's current box.
    async fn rect(&self) -> Result<Rect>;

    /// Makes the pointer visible.
    async fn show(&self) -> Result<()>;

    /// Hides the pointer.
    async fn hide(&self) -> Result<()>;

    /// Animates the pointer to page position `(x, y)`.
    async fn move_to(&self, x: f64, y: f64, duration: Duration) -> Result<()>;

    /// Plays the press animation.
    async fn press(&self, duration: Duration) -> Result<()>;
}

// ============================================================================
// AnimationTimings
// ============================================================================

/// Delays and durations of the pointer sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationTimings {
    /// Wait before the pointer appears.
    #[serde(with = "duration_ms")]
    pub approach: Duration,
    /// Movement duration.
    #[serde(with = "duration_ms")]
    pub travel: Duration,
    /// Pause over the target.
    #[serde(with = "duration_ms")]
    pub hover: Duration,
    /// Press animation duration.
    #[serde(with = "duration_ms")]
    pub press: Duration,
    /// Pause after the action before hiding.
    #[serde(with = "duration_ms")]
    pub linger: Duration,
}

impl AnimationTimings {
    /// Default timings.
    pub const DEFAULT: Self = Self {
        approach: Duration::from_millis(500),
        travel: Duration::from_millis(300),
        hover: Duration::from_millis(500),
        press: Duration::from_millis(200),
        linger: Duration::from_millis(1000),
    };

    /// All delays zero.
    pub const INSTANT: Self = Self {
        approach: Duration::ZERO,
        travel: Duration::ZERO,
        hover: Duration::ZERO,
        press: Duration::ZERO,
        linger: Duration::ZERO,
    };

    /// Total time spent waiting, excluding the action itself.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.approach + self.travel + self.hover + self.press + self.linger
    }
}

impl Default for AnimationTimings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ============================================================================
// PointerAnimator
// ============================================================================

/// Runs the pointer sequence against a target element.
#[derive(Clone)]
pub struct PointerAnimator {
    pointer: Arc<dyn Pointer>,
    timings: AnimationTimings,
}

impl fmt::Debug for PointerAnimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointerAnimator")
            .field("timings", &self.timings)
            .finish_non_exhaustive()
    }
}

impl PointerAnimator {
    /// Creates an animator for `pointer`.
    #[must_use]
    pub fn new(pointer: Arc<dyn Pointer>, timings: AnimationTimings) -> Self {
        Self { pointer, timings }
    }

    /// Returns the configured timings.
    #[inline]
    #[must_use]
    pub fn timings(&self) -> &AnimationTimings {
        &self.timings
    }

    /// Moves the pointer onto `node`, presses, then runs `action`.
    ///
    /// Once shown, the pointer is hidden on every exit: after the linger
    /// delay when the action ran, immediately when a pointer step failed.
    /// The first error encountered is returned.
    pub async fn animate<A>(&self, frame: &dyn Frame, node: NodeRef, action: A) -> Result<()>
    where
        A: Future<Output = Result<()>> + Send,
    {
        sleep(self.timings.approach).await;

        let (x, y) = self.target(frame, node).await?;
        trace!(%node, x, y, "Moving pointer");

        self.pointer.show().await?;

        let approached = async {
            self.pointer.move_to(x, y, self.timings.travel).await?;
            sleep(self.timings.hover).await;
            self.pointer.press(self.timings.press).await
        }
        .await;

        let outcome = match approached {
            Ok(()) => {
                let outcome = action.await;
                sleep(self.timings.linger).await;
                outcome
            }
            Err(e) => {
                trace!(%node, error = %e, "Pointer step failed");
                Err(e)
            }
        };

        let hidden = self.pointer.hide().await;
        outcome.and(hidden)
    }

    /// Computes the pointer position for `node` in page coordinates.
    ///
    /// The pointer is offset by twice its own size so its tip lands on the
    /// element's centre.
    async fn target(&self, frame: &dyn Frame, node: NodeRef) -> Result<(f64, f64)> {
        let pointer = self.pointer.rect().await?;
        let element = frame.node_rect(node).await?;
        let outer = frame.bounding_rect().await?;

        let (cx, cy) = element.center();
        let x = cx + outer.left - pointer.width * 2.0;
        let y = cy + outer.top - pointer.height * 2.0;

        Ok((x, y))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::Error;
    use crate::frame::LoadNotifier;
    use crate::testing::{FakeFrame, FakePointer, Journal};

    fn setup() -> (PointerAnimator, Arc<FakeFrame>, Arc<FakePointer>, Journal) {
        let journal = Journal::default();
        let frame = FakeFrame::with_journal(LoadNotifier::new(), journal.clone());
        let pointer = FakePointer::new(journal.clone());
        let animator = PointerAnimator::new(pointer.clone(), AnimationTimings::INSTANT);
        (animator, frame, pointer, journal)
    }

    #[tokio::test]
    async fn test_sequence_order() {
        let (animator, frame, _, journal) = setup();
        let node = frame.insert("button", "Go");

        animator
            .animate(frame.as_ref(), node, frame.click(node))
            .await
            .expect("animate");

        assert_eq!(
            journal.entries(),
            vec!["pointer.show", "pointer.move", "pointer.press", "frame.click", "pointer.hide"]
        );
    }

    #[tokio::test]
    async fn test_target_position() {
        let (animator, frame, pointer, _) = setup();
        frame.set_bounding_rect(Rect::new(100.0, 50.0, 1024.0, 768.0));
        pointer.set_rect(Rect::new(0.0, 0.0, 20.0, 20.0));
        let node = frame.insert_at("a", "link", Rect::new(10.0, 10.0, 40.0, 20.0));

        animator
            .animate(frame.as_ref(), node, async { Ok(()) })
            .await
            .expect("animate");

        // centre (30, 20) + frame offset (100, 50) - 2 * pointer size (40, 40)
        assert_eq!(pointer.last_move(), Some((90.0, 30.0)));
    }

    #[tokio::test]
    async fn test_pointer_hidden_when_action_fails() {
        let (animator, frame, _, journal) = setup();
        let node = frame.insert("button", "Go");

        let err = animator
            .animate(frame.as_ref(), node, async { Err(Error::frame("detached")) })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Frame { .. }));
        assert_eq!(journal.entries().last().map(String::as_str), Some("pointer.hide"));
    }

    #[tokio::test]
    async fn test_pointer_hidden_when_move_fails() {
        let (animator, frame, pointer, journal) = setup();
        let node = frame.insert("button", "Go");
        pointer.set_failing_moves(true);

        let err = animator
            .animate(frame.as_ref(), node, frame.click(node))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Frame { .. }));
        assert_eq!(journal.entries(), vec!["pointer.show", "pointer.hide"]);
        assert_eq!(frame.clicks_of(node), 0);
    }

    #[test]
    fn test_default_timings() {
        let timings = AnimationTimings::default();
        assert_eq!(timings.approach, Duration::from_millis(500));
        assert_eq!(timings.total(), Duration::from_millis(2500));
    }

    #[test]
    fn test_timings_from_json() {
        let timings: AnimationTimings = serde_json::from_str(r#"{"linger": 50}"#).expect("json");
        assert_eq!(timings.linger, Duration::from_millis(50));
        assert_eq!(timings.travel, Duration::from_millis(300));
    }
}
