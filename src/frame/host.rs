//! Collaborator traits implemented by the embedding page.
//!
//! The client never touches a DOM directly. The embedder provides:
//!
//! - a [`FrameHost`] that empties the container and creates a fresh frame
//! - the [`Frame`] itself (navigation, resize, element lookup and actions)
//!
//! Element handles are opaque [`NodeRef`]s allocated by the frame. Query
//! semantics (selector dialect, match order) belong to the implementation.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::controller::LoadNotifier;

// ============================================================================
// NodeRef
// ============================================================================

/// Opaque handle to an element inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(u64);

impl NodeRef {
    /// Wraps a frame-specific handle.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the frame-specific handle.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

// ============================================================================
// Rect
// ============================================================================

/// Bounding box in page pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge.
    pub left: f64,
    /// Top edge.
    pub top: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Rect {
    /// Creates a rectangle.
    #[inline]
    #[must_use]
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Returns the centre point.
    #[inline]
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            self.left + self.width / 2.0,
            self.top + self.height / 2.0,
        )
    }
}

// ============================================================================
// Viewport
// ============================================================================

/// Frame dimensions applied on reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Viewport {
    /// 411×731.
    Smartphone,
    /// 768×1024.
    Tablet,
    /// 1024×768.
    #[default]
    Desktop,
    /// Explicit size in pixels.
    Custom {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
}

impl Viewport {
    /// Returns `(width, height)` in pixels.
    #[must_use]
    pub const fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Smartphone => (411, 731),
            Self::Tablet => (768, 1024),
            Self::Desktop => (1024, 768),
            Self::Custom { width, height } => (width, height),
        }
    }
}

// ============================================================================
// Frame
// ============================================================================

/// One embedded browsing context.
///
/// Navigation methods only trigger the navigation; completion is reported
/// separately through the [`LoadNotifier`] handed to
/// [`FrameHost::create_frame`].
#[async_trait]
pub trait Frame: Send + Sync {
    /// Starts navigating to `url`.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Starts reloading the current document.
    async fn reload(&self) -> Result<()>;

    /// Sets the frame's outer size in pixels.
    async fn resize(&self, width: u32, height: u32) -> Result<()>;

    /// Returns the current document location, if any.
    async fn location(&self) -> Result<Option<String>>;

    /// Returns the frame's own position on the hosting page.
    async fn bounding_rect(&self) -> Result<Rect>;

    /// Returns every element matching `selector`, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<NodeRef>>;

    /// Returns an element's position relative to the frame.
    async fn node_rect(&self, node: NodeRef) -> Result<Rect>;

    /// Assigns an element's `value`.
    async fn set_value(&self, node: NodeRef, value: &str) -> Result<()>;

    /// Dispatches a `change` event on an element.
    async fn dispatch_change(&self, node: NodeRef) -> Result<()>;

    /// Clicks an element.
    async fn click(&self, node: NodeRef) -> Result<()>;

    /// Returns an element's serialized inner markup.
    async fn inner_html(&self, node: NodeRef) -> Result<String>;
}

// ============================================================================
// FrameHost
// ============================================================================

/// Creates frames inside the hosting page's container.
#[async_trait]
pub trait FrameHost: Send + Sync {
    /// Clears the container and inserts a fresh frame.
    ///
    /// The host must call [`LoadNotifier::notify`] every time the new frame
    /// finishes loading a document.
    async fn create_frame(&self, loads: LoadNotifier) -> Result<Arc<dyn Frame>>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_presets() {
        assert_eq!(Viewport::Smartphone.dimensions(), (411, 731));
        assert_eq!(Viewport::Tablet.dimensions(), (768, 1024));
        assert_eq!(Viewport::Desktop.dimensions(), (1024, 768));
        assert_eq!(Viewport::default(), Viewport::Desktop);
    }

    #[test]
    fn test_viewport_deserialize() {
        let preset: Viewport = serde_json::from_str(r#""tablet""#).expect("json");
        assert_eq!(preset, Viewport::Tablet);

        let custom: Viewport =
            serde_json::from_str(r#"{"custom":{"width":800,"height":600}}"#).expect("json");
        assert_eq!(custom.dimensions(), (800, 600));
    }

    #[test]
    fn test_rect_center() {
        let rect = Rect::new(10.0, 20.0, 100.0, 40.0);
        assert_eq!(rect.center(), (60.0, 40.0));
    }
}
