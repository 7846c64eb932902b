//! In-memory fakes for the frame collaborators.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};
use crate::frame::{Frame, FrameHost, LoadNotifier, NodeRef, Pointer, Rect};

// ============================================================================
// Tracing
// ============================================================================

/// Installs a test subscriber honouring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Journal
// ============================================================================

/// Ordered log of collaborator calls shared between fakes.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

// ============================================================================
// FakeFrame
// ============================================================================

struct FakeNode {
    selector: String,
    html: String,
    value: String,
    rect: Rect,
    clicks: usize,
    changes: usize,
}

struct FakeState {
    nodes: Vec<FakeNode>,
    location: Option<String>,
    size: (u32, u32),
    bounding: Rect,
    navigations: Vec<String>,
    reloads: usize,
    auto_load: bool,
}

/// A frame whose DOM is a flat list of `(selector, markup)` nodes.
///
/// Selectors match by string equality. With auto-load on (the default),
/// every navigation reports completion from a spawned task.
pub struct FakeFrame {
    loads: LoadNotifier,
    journal: Journal,
    state: Mutex<FakeState>,
}

impl FakeFrame {
    pub fn new(loads: LoadNotifier) -> Arc<Self> {
        Self::with_journal(loads, Journal::default())
    }

    pub fn with_journal(loads: LoadNotifier, journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            loads,
            journal,
            state: Mutex::new(FakeState {
                nodes: Vec::new(),
                location: None,
                size: (0, 0),
                bounding: Rect::default(),
                navigations: Vec::new(),
                reloads: 0,
                auto_load: true,
            }),
        })
    }

    pub fn loads(&self) -> &LoadNotifier {
        &self.loads
    }

    pub fn set_auto_load(&self, enabled: bool) {
        self.state.lock().auto_load = enabled;
    }

    pub fn set_bounding_rect(&self, rect: Rect) {
        self.state.lock().bounding = rect;
    }

    pub fn insert(&self, selector: &str, html: &str) -> NodeRef {
        self.insert_at(selector, html, Rect::new(0.0, 0.0, 10.0, 10.0))
    }

    pub fn insert_at(&self, selector: &str, html: &str, rect: Rect) -> NodeRef {
        let mut state = self.state.lock();
        state.nodes.push(FakeNode {
            selector: selector.to_string(),
            html: html.to_string(),
            value: String::new(),
            rect,
            clicks: 0,
            changes: 0,
        });
        NodeRef::new(state.nodes.len() as u64 - 1)
    }

    pub fn html_of(&self, node: NodeRef) -> String {
        self.read(node, |n| n.html.clone())
    }

    pub fn value_of(&self, node: NodeRef) -> String {
        self.read(node, |n| n.value.clone())
    }

    pub fn clicks_of(&self, node: NodeRef) -> usize {
        self.read(node, |n| n.clicks)
    }

    pub fn changes_of(&self, node: NodeRef) -> usize {
        self.read(node, |n| n.changes)
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().navigations.clone()
    }

    pub fn reloads(&self) -> usize {
        self.state.lock().reloads
    }

    pub fn size(&self) -> (u32, u32) {
        self.state.lock().size
    }

    fn read<T>(&self, node: NodeRef, f: impl FnOnce(&FakeNode) -> T) -> T {
        let state = self.state.lock();
        f(&state.nodes[node.raw() as usize])
    }

    fn update(&self, node: NodeRef, f: impl FnOnce(&mut FakeNode)) -> Result<()> {
        let mut state = self.state.lock();
        let node = state
            .nodes
            .get_mut(node.raw() as usize)
            .ok_or_else(|| Error::frame("stale node"))?;
        f(node);
        Ok(())
    }

    fn finish_load(&self) {
        if !self.state.lock().auto_load {
            return;
        }

        let loads = self.loads.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            loads.notify();
        });
    }
}

#[async_trait]
impl Frame for FakeFrame {
    async fn navigate(&self, url: &str) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.navigations.push(url.to_string());
            state.location = Some(url.to_string());
        }
        self.finish_load();
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        self.state.lock().reloads += 1;
        self.finish_load();
        Ok(())
    }

    async fn resize(&self, width: u32, height: u32) -> Result<()> {
        self.state.lock().size = (width, height);
        Ok(())
    }

    async fn location(&self) -> Result<Option<String>> {
        Ok(self.state.lock().location.clone())
    }

    async fn bounding_rect(&self) -> Result<Rect> {
        Ok(self.state.lock().bounding)
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<NodeRef>> {
        let state = self.state.lock();
        Ok(state
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.selector == selector)
            .map(|(i, _)| NodeRef::new(i as u64))
            .collect())
    }

    async fn node_rect(&self, node: NodeRef) -> Result<Rect> {
        let state = self.state.lock();
        state
            .nodes
            .get(node.raw() as usize)
            .map(|n| n.rect)
            .ok_or_else(|| Error::frame("stale node"))
    }

    async fn set_value(&self, node: NodeRef, value: &str) -> Result<()> {
        self.update(node, |n| n.value = value.to_string())?;
        self.journal.record("frame.set_value");
        Ok(())
    }

    async fn dispatch_change(&self, node: NodeRef) -> Result<()> {
        self.update(node, |n| n.changes += 1)?;
        self.journal.record("frame.change");
        Ok(())
    }

    async fn click(&self, node: NodeRef) -> Result<()> {
        self.update(node, |n| n.clicks += 1)?;
        self.journal.record("frame.click");
        Ok(())
    }

    async fn inner_html(&self, node: NodeRef) -> Result<String> {
        let state = self.state.lock();
        state
            .nodes
            .get(node.raw() as usize)
            .map(|n| n.html.clone())
            .ok_or_else(|| Error::frame("stale node"))
    }
}

// ============================================================================
// FakeHost
// ============================================================================

/// Records every frame it creates; new frames are seeded with fixed nodes.
#[derive(Default)]
pub struct FakeHost {
    seed: Vec<(String, String)>,
    frames: Mutex<Vec<Arc<FakeFrame>>>,
}

impl FakeHost {
    pub fn with_nodes(nodes: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            seed: nodes
                .iter()
                .map(|(selector, html)| (selector.to_string(), html.to_string()))
                .collect(),
            frames: Mutex::new(Vec::new()),
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn latest(&self) -> Option<Arc<FakeFrame>> {
        self.frames.lock().last().cloned()
    }
}

#[async_trait]
impl FrameHost for FakeHost {
    async fn create_frame(&self, loads: LoadNotifier) -> Result<Arc<dyn Frame>> {
        let frame = FakeFrame::new(loads);
        for (selector, html) in &self.seed {
            frame.insert(selector, html);
        }
        self.frames.lock().push(Arc::clone(&frame));
        Ok(frame)
    }
}

// ============================================================================
// FakePointer
// ============================================================================

/// Pointer that journals each step and remembers its last target.
pub struct FakePointer {
    journal: Journal,
    rect: Mutex<Rect>,
    last_move: Mutex<Option<(f64, f64)>>,
    failing_moves: Mutex<bool>,
}

impl FakePointer {
    pub fn new(journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            journal,
            rect: Mutex::new(Rect::new(0.0, 0.0, 16.0, 16.0)),
            last_move: Mutex::new(None),
            failing_moves: Mutex::new(false),
        })
    }

    pub fn set_rect(&self, rect: Rect) {
        *self.rect.lock() = rect;
    }

    pub fn set_failing_moves(&self, failing: bool) {
        *self.failing_moves.lock() = failing;
    }

    pub fn last_move(&self) -> Option<(f64, f64)> {
        *self.last_move.lock()
    }
}

#[async_trait]
impl Pointer for FakePointer {
    async fn rect(&self) -> Result<Rect> {
        Ok(*self.rect.lock())
    }

    async fn show(&self) -> Result<()> {
        self.journal.record("pointer.show");
        Ok(())
    }

    async fn hide(&self) -> Result<()> {
        self.journal.record("pointer.hide");
        Ok(())
    }

    async fn move_to(&self, x: f64, y: f64, duration: Duration) -> Result<()> {
        let failing = *self.failing_moves.lock();
        if failing {
            return Err(Error::frame("pointer detached"));
        }
        sleep(duration).await;
        *self.last_move.lock() = Some((x, y));
        self.journal.record("pointer.move");
        Ok(())
    }

    async fn press(&self, duration: Duration) -> Result<()> {
        sleep(duration).await;
        self.journal.record("pointer.press");
        Ok(())
    }
}
