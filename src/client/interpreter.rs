//! Executes decoded commands against the frame.
//!
//! | Command | Behaviour | Result |
//! |---------|-----------|--------|
//! | `load(url)` | arm ready signal, navigate, wait | `{exit_code: 0}` |
//! | `reload()` | arm ready signal, reload, wait | `{exit_code: 0}` |
//! | `enter(selector, index, value, animate)` | (animate) set value, settle; dispatch `change` | `{exit_code: 0}` |
//! | `click(selector, index, animate)` | click, at the end of the animation if animated | `{exit_code: 0}` |
//! | `get_html(selector, index)` | read inner markup | `{exit_code: 0, result}` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::frame::{FrameController, NodeRef, PointerAnimator, ReadySignal};
use crate::protocol::{Command, CommandResult};

// ============================================================================
// CommandInterpreter
// ============================================================================

/// Runs one command at a time against a [`FrameController`].
///
/// The interpreter keeps no state between commands; serialization is the
/// job queue's responsibility.
pub struct CommandInterpreter {
    frame: Arc<FrameController>,
    animator: Option<PointerAnimator>,
    settle_delay: Duration,
    navigation_timeout: Option<Duration>,
}

impl fmt::Debug for CommandInterpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandInterpreter")
            .field("animated", &self.animator.is_some())
            .field("settle_delay", &self.settle_delay)
            .field("navigation_timeout", &self.navigation_timeout)
            .finish_non_exhaustive()
    }
}

impl CommandInterpreter {
    /// Creates an interpreter over `frame`.
    ///
    /// Without an animator, animated commands run unanimated.
    #[must_use]
    pub fn new(
        frame: Arc<FrameController>,
        animator: Option<PointerAnimator>,
        settle_delay: Duration,
    ) -> Self {
        Self {
            frame,
            animator,
            settle_delay,
            navigation_timeout: None,
        }
    }

    /// Bounds how long `load`/`reload` wait for the frame.
    #[must_use]
    pub fn with_navigation_timeout(mut self, limit: Option<Duration>) -> Self {
        self.navigation_timeout = limit;
        self
    }

    /// Returns the controlled frame.
    #[inline]
    #[must_use]
    pub fn frame(&self) -> &Arc<FrameController> {
        &self.frame
    }

    /// Executes `command` to completion.
    ///
    /// # Errors
    ///
    /// - [`Error::ElementNotFound`] if the target element does not exist
    /// - [`Error::NavigationSuperseded`] if another navigation replaced this one
    /// - [`Error::Timeout`] if a navigation timeout is set and exceeded
    /// - any error raised by the frame or pointer collaborators
    pub async fn execute(&self, command: &Command) -> Result<CommandResult> {
        debug!(command = %command, "Executing");

        match command {
            Command::Load { url } => {
                let ready = self.frame.arm_ready_signal();
                self.frame.navigate(url).await?;
                self.wait_ready(ready).await?;
                Ok(CommandResult::success())
            }

            Command::Reload => {
                let ready = self.frame.arm_ready_signal();
                self.frame.reload().await?;
                self.wait_ready(ready).await?;
                Ok(CommandResult::success())
            }

            Command::Enter {
                selector,
                index,
                value,
                animate,
            } => {
                let node = self.frame.element(selector, *index).await?;
                let frame = self.frame.frame();

                match self.animator(*animate) {
                    Some(animator) => {
                        animator.animate(frame.as_ref(), node, async { Ok(()) }).await?;
                        frame.set_value(node, value).await?;
                        sleep(self.settle_delay).await;
                    }
                    None => frame.set_value(node, value).await?,
                }

                frame.dispatch_change(node).await?;
                Ok(CommandResult::success())
            }

            Command::Click {
                selector,
                index,
                animate,
            } => {
                let node = self.frame.element(selector, *index).await?;
                self.click(node, *animate).await?;
                Ok(CommandResult::success())
            }

            Command::GetHtml { selector, index } => {
                let node = self.frame.element(selector, *index).await?;
                let html = self.frame.frame().inner_html(node).await?;
                Ok(CommandResult::with_result(html))
            }
        }
    }

    async fn click(&self, node: NodeRef, animate: bool) -> Result<()> {
        let frame = self.frame.frame();

        match self.animator(animate) {
            Some(animator) => {
                animator
                    .animate(frame.as_ref(), node, frame.click(node))
                    .await
            }
            None => frame.click(node).await,
        }
    }

    /// Returns the animator when animation was requested and is available.
    fn animator(&self, animate: bool) -> Option<&PointerAnimator> {
        if !animate {
            return None;
        }

        if self.animator.is_none() {
            warn!("Animation requested but no pointer is configured");
        }

        self.animator.as_ref()
    }

    async fn wait_ready(&self, ready: ReadySignal) -> Result<()> {
        match self.navigation_timeout {
            None => ready.await,
            Some(limit) => timeout(limit, ready)
                .await
                .map_err(|_| Error::timeout("navigation", limit.as_millis() as u64))?,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
