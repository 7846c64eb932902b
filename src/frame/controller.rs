//! Frame ownership and the navigation ready signal.
//!
//! A navigation is awaited with a single-slot signal:
//!
//! 1. [`FrameController::arm_ready_signal`] stores a fresh sender and
//!    returns the matching [`ReadySignal`]
//! 2. the navigation is triggered
//! 3. the host's load callback calls [`LoadNotifier::notify`], which fires
//!    the stored sender and clears the slot
//!
//! Arming replaces the stored sender. The replaced signal resolves to
//! [`Error::NavigationSuperseded`] instead of hanging. A load event with no
//! armed signal is dropped.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::error::{Error, Result};

use super::host::{Frame, NodeRef, Viewport};

// ============================================================================
// Types
// ============================================================================

/// Slot holding the currently armed signal.
type ReadySlot = Arc<Mutex<Option<oneshot::Sender<()>>>>;

// ============================================================================
// LoadNotifier
// ============================================================================

/// Handle given to the frame host to report completed loads.
#[derive(Clone, Default)]
pub struct LoadNotifier {
    slot: ReadySlot,
}

impl LoadNotifier {
    /// Creates a notifier with nothing armed.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports that the frame finished loading.
    ///
    /// Returns `true` if an armed signal was resolved.
    pub fn notify(&self) -> bool {
        let Some(sender) = self.slot.lock().take() else {
            trace!("Load event with no armed signal");
            return false;
        };

        sender.send(()).is_ok()
    }

    /// Returns `true` while a signal is armed and unresolved.
    #[inline]
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.slot.lock().is_some()
    }
}

impl fmt::Debug for LoadNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadNotifier")
            .field("armed", &self.is_armed())
            .finish()
    }
}

// ============================================================================
// ReadySignal
// ============================================================================

/// Resolves when the frame finishes the navigation it was armed for.
#[derive(Debug)]
#[must_use = "a ready signal does nothing unless awaited"]
pub struct ReadySignal {
    rx: oneshot::Receiver<()>,
}

impl Future for ReadySignal {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.map_err(|_| Error::NavigationSuperseded))
    }
}

// ============================================================================
// FrameController
// ============================================================================

/// Owns one frame and its outstanding ready signal.
///
/// Callers serialize access through the job queue; the controller itself
/// does not prevent two overlapping navigations.
pub struct FrameController {
    frame: Arc<dyn Frame>,
    loads: LoadNotifier,
}

impl fmt::Debug for FrameController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameController")
            .field("loads", &self.loads)
            .finish_non_exhaustive()
    }
}

impl FrameController {
    /// Wraps a frame whose host reports loads to `loads`.
    #[must_use]
    pub fn new(frame: Arc<dyn Frame>, loads: LoadNotifier) -> Self {
        Self { frame, loads }
    }

    /// Returns the underlying frame.
    #[inline]
    #[must_use]
    pub fn frame(&self) -> &Arc<dyn Frame> {
        &self.frame
    }

    /// Returns the notifier shared with the frame host.
    #[inline]
    #[must_use]
    pub fn loads(&self) -> &LoadNotifier {
        &self.loads
    }

    /// Arms a new ready signal, superseding any unresolved one.
    pub fn arm_ready_signal(&self) -> ReadySignal {
        let (tx, rx) = oneshot::channel();

        if self.loads.slot.lock().replace(tx).is_some() {
            debug!("Unresolved ready signal superseded");
        }

        ReadySignal { rx }
    }

    /// Starts navigating to `url`.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        debug!(url = %url, "Navigating frame");
        self.frame.navigate(url).await
    }

    /// Starts reloading the current document.
    pub async fn reload(&self) -> Result<()> {
        debug!("Reloading frame");
        self.frame.reload().await
    }

    /// Resizes the frame.
    pub async fn resize(&self, width: u32, height: u32) -> Result<()> {
        trace!(width, height, "Resizing frame");
        self.frame.resize(width, height).await
    }

    /// Resizes the frame to a preset.
    pub async fn resize_to(&self, viewport: Viewport) -> Result<()> {
        let (width, height) = viewport.dimensions();
        self.resize(width, height).await
    }

    /// Returns the frame's current location.
    pub async fn current_location(&self) -> Result<Option<String>> {
        self.frame.location().await
    }

    /// Resolves `selector` and picks the match at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ElementNotFound`] if there is no such match.
    pub async fn element(&self, selector: &str, index: usize) -> Result<NodeRef> {
        let nodes = self.frame.query_all(selector).await?;

        nodes
            .get(index)
            .copied()
            .ok_or_else(|| Error::element_not_found(selector, index))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio_test::task;
    use tokio_test::{assert_pending, assert_ready};

    use crate::testing::FakeFrame;

    fn controller() -> (FrameController, Arc<FakeFrame>) {
        let loads = LoadNotifier::new();
        let frame = FakeFrame::new(loads.clone());
        let controller = FrameController::new(frame.clone(), loads);
        (controller, frame)
    }

    #[test]
    fn test_signal_resolves_on_load() {
        let (controller, _) = controller();

        let mut signal = task::spawn(controller.arm_ready_signal());
        assert_pending!(signal.poll());

        assert!(controller.loads().notify());
        assert!(signal.is_woken());
        assert!(assert_ready!(signal.poll()).is_ok());
        assert!(!controller.loads().is_armed());
    }

    #[test]
    fn test_load_without_armed_signal_is_dropped() {
        let (controller, _) = controller();
        assert!(!controller.loads().notify());

        // A later signal is unaffected by the earlier spurious event.
        let mut signal = task::spawn(controller.arm_ready_signal());
        assert_pending!(signal.poll());
    }

    #[test]
    fn test_second_load_supersedes_first() {
        let (controller, _) = controller();

        let mut first = task::spawn(controller.arm_ready_signal());
        let mut second = task::spawn(controller.arm_ready_signal());

        // The abandoned signal is rejected rather than left hanging.
        let first = assert_ready!(first.poll());
        assert!(matches!(first, Err(Error::NavigationSuperseded)));
        assert_pending!(second.poll());

        assert!(controller.loads().notify());
        assert!(assert_ready!(second.poll()).is_ok());

        // The slot was cleared by the first event.
        assert!(!controller.loads().notify());
    }

    #[tokio::test]
    async fn test_navigate_and_location() {
        let (controller, frame) = controller();
        frame.set_auto_load(false);

        let signal = controller.arm_ready_signal();
        controller.navigate("about:blank").await.expect("navigate");
        controller.loads().notify();
        signal.await.expect("ready");

        assert_eq!(
            controller.current_location().await.expect("location"),
            Some("about:blank".to_string())
        );
    }

    #[tokio::test]
    async fn test_resize_to_preset() {
        let (controller, frame) = controller();
        controller
            .resize_to(Viewport::Smartphone)
            .await
            .expect("resize");
        assert_eq!(frame.size(), (411, 731));
    }

    #[tokio::test]
    async fn test_element_lookup() {
        let (controller, frame) = controller();
        frame.insert("a", "first");
        frame.insert("a", "second");

        let node = controller.element("a", 1).await.expect("element");
        assert_eq!(frame.html_of(node), "second");

        let err = controller.element("a", 2).await.unwrap_err();
        assert!(matches!(err, Error::ElementNotFound { index: 2, .. }));
    }
}
