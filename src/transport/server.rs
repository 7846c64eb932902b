//! Controller side of the control channel.
//!
//! A [`ControlServer`] listens for clients; each accepted client becomes a
//! [`Controller`] that sends commands and receives their results.
//!
//! # Connection Flow
//!
//! 1. `ControlServer::bind` - Bind to an address (port 0 for random)
//! 2. Point a client at [`ControlServer::page_url`]
//! 3. `ControlServer::accept` - Wait for the client to connect
//! 4. `Controller::send` - Send commands, await results
//!
//! # Reply Matching
//!
//! Replies carry no IDs. The controller keeps a FIFO of waiting requests
//! and hands each reply to the oldest one. A request that timed out keeps
//! its place, so its late reply is discarded rather than given to a newer
//! request.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::ConnectionToken;
use crate::protocol::{Command, CommandResult};

// ============================================================================
// Constants
// ============================================================================

/// Timeout for waiting for a client to connect.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for a command's reply.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Types
// ============================================================================

/// Waiting requests, oldest first.
type PendingQueue = VecDeque<oneshot::Sender<Result<CommandResult>>>;

/// Internal commands for the event loop.
enum ControllerCommand {
    /// Send a command and queue its response channel.
    Send {
        text: String,
        response_tx: oneshot::Sender<Result<CommandResult>>,
    },
    /// Close the connection.
    Shutdown,
}

// ============================================================================
// ControlServer
// ============================================================================

/// A listening control server.
///
/// # Example
///
/// ```ignore
/// use std::net::{IpAddr, Ipv4Addr};
/// use frame_pilot::transport::ControlServer;
///
/// let server = ControlServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
///
/// // Serve the hosting page at server.page_url("/ira/")...
///
/// let controller = server.accept().await?;
/// controller.load("https://example.com").await?;
/// ```
pub struct ControlServer {
    /// TCP listener for incoming connections.
    listener: TcpListener,
    /// Port the server is bound to.
    port: u16,
}

impl ControlServer {
    /// Binds to the specified address and port.
    ///
    /// Use port 0 to let the OS assign a random available port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(ip: IpAddr, port: u16) -> Result<Self> {
        let addr = SocketAddr::new(ip, port);
        let listener = TcpListener::bind(addr).await?;
        let actual_port = listener.local_addr()?.port();

        debug!(port = actual_port, "Control server bound");

        Ok(Self {
            listener,
            port: actual_port,
        })
    }

    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the WebSocket URL for this server.
    ///
    /// Format: `ws://127.0.0.1:{port}`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    /// Returns a hosting-page URL whose derived endpoint is this server.
    #[inline]
    #[must_use]
    pub fn page_url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    /// Returns the local socket address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the listener's address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts the next client (30s timeout).
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if no client connects in time
    /// - [`Error::WebSocket`] if the upgrade fails
    pub async fn accept(&self) -> Result<Controller> {
        self.accept_with_timeout(CONNECTION_TIMEOUT).await
    }

    /// Accepts the next client with a custom timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if no client connects in time
    /// - [`Error::WebSocket`] if the upgrade fails
    pub async fn accept_with_timeout(&self, limit: Duration) -> Result<Controller> {
        let (stream, peer) = timeout(limit, self.listener.accept())
            .await
            .map_err(|_| Error::connection_timeout(limit.as_millis() as u64))??;

        let ws_stream = accept_async(stream).await?;
        let controller = Controller::new(ws_stream);

        info!(%peer, token = %controller.token(), "Client connected");

        Ok(controller)
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Sends commands to one connected client.
///
/// Cloning yields another handle to the same connection.
#[derive(Clone)]
pub struct Controller {
    token: ConnectionToken,
    command_tx: mpsc::UnboundedSender<ControllerCommand>,
    pending: Arc<Mutex<PendingQueue>>,
    animations: bool,
}

impl Controller {
    /// Wraps an accepted socket; spawns the event loop.
    fn new(ws_stream: WebSocketStream<TcpStream>) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let pending = Arc::new(Mutex::new(PendingQueue::new()));

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            Arc::clone(&pending),
        ));

        Self {
            token: ConnectionToken::generate(),
            command_tx,
            pending,
            animations: false,
        }
    }

    /// Returns this connection's token.
    #[inline]
    #[must_use]
    pub fn token(&self) -> ConnectionToken {
        self.token
    }

    /// Sets the default `animate` flag for `enter` and `click`.
    #[inline]
    #[must_use]
    pub fn with_animations(mut self, animations: bool) -> Self {
        self.animations = animations;
        self
    }

    /// Returns the number of requests awaiting a reply.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Returns `true` while the event loop is running.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.command_tx.is_closed()
    }

    /// Sends a command and waits for its result (10s timeout).
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the connection is closed
    /// - [`Error::RequestTimeout`] if no reply arrives in time
    pub async fn send(&self, command: &Command) -> Result<CommandResult> {
        self.send_with_timeout(command, DEFAULT_COMMAND_TIMEOUT)
            .await
    }

    /// Sends a command and waits for its result with a custom timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the connection is closed
    /// - [`Error::RequestTimeout`] if no reply arrives in time
    pub async fn send_with_timeout(
        &self,
        command: &Command,
        request_timeout: Duration,
    ) -> Result<CommandResult> {
        let text = command.encode()?;
        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(ControllerCommand::Send { text, response_tx })
            .map_err(|_| Error::ConnectionClosed)?;

        match timeout(request_timeout, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => Err(Error::request_timeout(request_timeout.as_millis() as u64)),
        }
    }

    /// Navigates the client's frame.
    pub async fn load(&self, url: &str) -> Result<CommandResult> {
        self.send(&Command::Load {
            url: url.to_string(),
        })
        .await
    }

    /// Reloads the client's frame.
    pub async fn reload(&self) -> Result<CommandResult> {
        self.send(&Command::Reload).await
    }

    /// Enters `value` into the element at `selector`/`index`.
    pub async fn enter(
        &self,
        selector: &str,
        value: &str,
        index: Option<usize>,
        animate: Option<bool>,
    ) -> Result<CommandResult> {
        self.send(&Command::Enter {
            selector: selector.to_string(),
            index: index.unwrap_or(0),
            value: value.to_string(),
            animate: animate.unwrap_or(self.animations),
        })
        .await
    }

    /// Clicks the element at `selector`/`index`.
    pub async fn click(
        &self,
        selector: &str,
        index: Option<usize>,
        animate: Option<bool>,
    ) -> Result<CommandResult> {
        self.send(&Command::Click {
            selector: selector.to_string(),
            index: index.unwrap_or(0),
            animate: animate.unwrap_or(self.animations),
        })
        .await
    }

    /// Reads the inner markup of the element at `selector`/`index`.
    pub async fn get_html(&self, selector: &str, index: Option<usize>) -> Result<CommandResult> {
        self.send(&Command::GetHtml {
            selector: selector.to_string(),
            index: index.unwrap_or(0),
        })
        .await
    }

    /// Closes the connection.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ControllerCommand::Shutdown);
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        ws_stream: WebSocketStream<TcpStream>,
        mut command_rx: mpsc::UnboundedReceiver<ControllerCommand>,
        pending: Arc<Mutex<PendingQueue>>,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                // Replies from the client
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_reply(&text, &pending);
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by client");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Commands from the Rust API
                command = command_rx.recv() => {
                    match command {
                        Some(ControllerCommand::Send { text, response_tx }) => {
                            // Queue before sending so a fast reply finds it.
                            pending.lock().push_back(response_tx);

                            if let Err(e) = ws_write.send(Message::Text(text.into())).await
                                && let Some(tx) = pending.lock().pop_back()
                            {
                                let _ = tx.send(Err(Error::connection(e.to_string())));
                            }

                            trace!("Command sent");
                        }

                        Some(ControllerCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        Self::fail_pending_requests(&pending);

        debug!("Controller event loop terminated");
    }

    /// Hands a reply to the oldest waiting request.
    fn handle_reply(text: &str, pending: &Arc<Mutex<PendingQueue>>) {
        let Some(tx) = pending.lock().pop_front() else {
            warn!(text = %text, "Reply with no pending request");
            return;
        };

        let result = CommandResult::decode(text)
            .map_err(|e| Error::protocol(format!("malformed reply: {e}")));

        if tx.send(result).is_err() {
            debug!("Late reply discarded");
        }
    }

    /// Fails all pending requests with ConnectionClosed error.
    fn fail_pending_requests(pending: &Arc<Mutex<PendingQueue>>) {
        let drained: Vec<_> = pending.lock().drain(..).collect();
        let count = drained.len();

        for tx in drained {
            let _ = tx.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending requests on shutdown");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
