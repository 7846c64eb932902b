//! Per-connection state: one frame, one queue.
//!
//! A session is created on every successful (re)connect. Creating it runs
//! the reset sequence: the host clears its container and creates a fresh
//! frame, which is then resized to the configured viewport.
//!
//! Dropping the session aborts every job still queued or running. Nothing
//! is carried over to the next session.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::frame::{FrameController, FrameHost, LoadNotifier, Pointer, PointerAnimator};
use crate::identifiers::SessionId;
use crate::protocol::{Command, CommandResult};
use crate::queue::JobQueue;

use super::interpreter::CommandInterpreter;
use super::options::{ClientOptions, ErrorReporting};

// ============================================================================
// Session
// ============================================================================

/// A fresh frame/queue pair bound to one connection.
pub struct Session {
    id: SessionId,
    queue: JobQueue,
    interpreter: Arc<CommandInterpreter>,
    reporting: ErrorReporting,
    replies: mpsc::UnboundedSender<CommandResult>,
    jobs: JoinSet<()>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("queue", &self.queue)
            .field("reporting", &self.reporting)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Runs the reset sequence and returns the new session.
    ///
    /// Results of accepted commands are sent to `replies`, one per command,
    /// in arrival order.
    ///
    /// # Errors
    ///
    /// Returns any error raised while creating or resizing the frame.
    pub async fn start(
        host: &dyn FrameHost,
        pointer: Option<Arc<dyn Pointer>>,
        options: &ClientOptions,
        replies: mpsc::UnboundedSender<CommandResult>,
    ) -> Result<Self> {
        let id = SessionId::next();

        let loads = LoadNotifier::new();
        let frame = host.create_frame(loads.clone()).await?;
        let controller = Arc::new(FrameController::new(frame, loads));
        controller.resize_to(options.viewport).await?;

        let animator = pointer.map(|pointer| PointerAnimator::new(pointer, options.animation));
        let interpreter = CommandInterpreter::new(controller, animator, options.settle_delay)
            .with_navigation_timeout(options.navigation_timeout);

        info!(session = %id, viewport = ?options.viewport, "Session reset");

        Ok(Self {
            id,
            queue: JobQueue::new(),
            interpreter: Arc::new(interpreter),
            reporting: options.error_reporting,
            replies,
            jobs: JoinSet::new(),
        })
    }

    /// Returns the session ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the frame controller.
    #[inline]
    #[must_use]
    pub fn frame(&self) -> &Arc<FrameController> {
        self.interpreter.frame()
    }

    /// Returns the number of commands queued or running.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Accepts one inbound message.
    ///
    /// The queue slot is reserved before this returns, so messages execute
    /// in the order they were dispatched. Decode failures take their slot
    /// too, which keeps replies aligned with requests.
    pub fn dispatch(&mut self, text: &str) {
        // Reap finished jobs.
        while self.jobs.try_join_next().is_some() {}

        let decoded = Command::decode(text);
        match &decoded {
            Ok(command) => debug!(session = %self.id, command = %command, "<<"),
            Err(e) => warn!(session = %self.id, error = %e, text = %text, "Undecodable message"),
        }

        let interpreter = Arc::clone(&self.interpreter);
        let replies = self.replies.clone();
        let reporting = self.reporting;
        let session = self.id;

        let job = self.queue.enqueue(move || async move {
            let outcome = match decoded {
                Ok(command) => interpreter.execute(&command).await,
                Err(e) => Err(e),
            };

            let reply = match outcome {
                Ok(result) => Some(result),
                Err(e) => failure_reply(session, reporting, &e),
            };

            if let Some(reply) = reply
                && replies.send(reply).is_err()
            {
                debug!(session = %session, "Reply dropped; connection gone");
            }
        });

        self.jobs.spawn(async move {
            if let Err(e) = job.await {
                warn!(error = %e, "Job never ran");
            }
        });
    }
}

/// Maps a failed command to its reply under `reporting`.
fn failure_reply(
    session: SessionId,
    reporting: ErrorReporting,
    error: &Error,
) -> Option<CommandResult> {
    warn!(session = %session, error = %error, "Command failed");

    match reporting {
        ErrorReporting::Report => Some(CommandResult::failure(error)),
        ErrorReporting::Silent => None,
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let pending = self.queue.len();
        if pending > 0 {
            info!(session = %self.id, pending, "Session ended; discarding in-flight commands");
        }
        // JoinSet aborts its tasks on drop.
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::time::timeout;

    use crate::error::{EXIT_ELEMENT, EXIT_PROTOCOL};
    use crate::frame::Viewport;
    use crate::testing::FakeHost;

    async fn start(
        host: &FakeHost,
        options: ClientOptions,
    ) -> (Session, mpsc::UnboundedReceiver<CommandResult>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session::start(host, None, &options, tx)
            .await
            .expect("session");
        (session, rx)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<CommandResult>) -> CommandResult {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("reply in time")
            .expect("reply")
    }

    #[tokio::test]
    async fn test_start_resets_frame_to_viewport() {
        let host = FakeHost::with_nodes(&[]);
        let (_session, _rx) = start(&host, ClientOptions::new()).await;

        assert_eq!(host.frame_count(), 1);
        let frame = host.latest().expect("frame");
        assert_eq!(frame.size(), Viewport::Desktop.dimensions());
    }

    #[tokio::test]
    async fn test_replies_follow_arrival_order() {
        let host = FakeHost::with_nodes(&[("#a", "A"), ("#b", "B")]);
        let (mut session, mut rx) = start(&host, ClientOptions::new()).await;

        session.dispatch(r#"["load", "/slow"]"#);
        session.dispatch(r##"["get_html", "#a"]"##);
        session.dispatch(r##"["get_html", "#b"]"##);

        assert_eq!(next(&mut rx).await, CommandResult::success());
        assert_eq!(next(&mut rx).await.result.as_deref(), Some("A"));
        assert_eq!(next(&mut rx).await.result.as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn test_reported_failures_keep_their_position() {
        let host = FakeHost::with_nodes(&[("#a", "A")]);
        let (mut session, mut rx) = start(&host, ClientOptions::new()).await;

        session.dispatch("{broken");
        session.dispatch(r##"["get_html", "#missing"]"##);
        session.dispatch(r##"["get_html", "#a"]"##);

        assert_eq!(next(&mut rx).await.exit_code, EXIT_PROTOCOL);
        assert_eq!(next(&mut rx).await.exit_code, EXIT_ELEMENT);
        assert_eq!(next(&mut rx).await, CommandResult::with_result("A"));
    }

    #[tokio::test]
    async fn test_silent_failures_send_nothing() {
        let host = FakeHost::with_nodes(&[("#a", "A")]);
        let options = ClientOptions::new().with_error_reporting(ErrorReporting::Silent);
        let (mut session, mut rx) = start(&host, options).await;

        session.dispatch(r#"["teleport"]"#);
        session.dispatch(r##"["click", "#missing"]"##);
        session.dispatch(r##"["get_html", "#a"]"##);

        // Only the successful command answers.
        assert_eq!(next(&mut rx).await, CommandResult::with_result("A"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_hung_navigation_stalls_queue() {
        let host = FakeHost::with_nodes(&[("#a", "A")]);
        let (mut session, mut rx) = start(&host, ClientOptions::new()).await;
        host.latest().expect("frame").set_auto_load(false);

        session.dispatch(r#"["load", "/never"]"#);
        session.dispatch(r##"["get_html", "#a"]"##);

        assert!(timeout(Duration::from_millis(50), rx.recv()).await.is_err());
        assert_eq!(session.pending(), 2);
    }

    #[tokio::test]
    async fn test_drop_discards_in_flight_commands() {
        let host = FakeHost::with_nodes(&[]);
        let (mut session, mut rx) = start(&host, ClientOptions::new()).await;
        host.latest().expect("frame").set_auto_load(false);

        session.dispatch(r#"["load", "/never"]"#);
        tokio::task::yield_now().await;
        drop(session);

        // The reply sender went away with the session's jobs.
        assert!(rx.recv().await.is_none());
    }
}
