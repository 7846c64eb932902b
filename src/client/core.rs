//! Control client and its reconnect loop.
//!
//! The [`Client`] keeps one control channel open to the controller. Each
//! time the channel opens it starts a fresh [`Session`]; each time it
//! closes it waits `reconnect_delay` and tries again, forever, until shut
//! down.
//!
//! # State Machine
//!
//! ```text
//!            open ok + reset ok
//! Connecting ──────────────────► Open
//!     ▲                            │
//!     │ reconnect_delay            │ close / error
//!     │                            ▼
//!     └────────────────────────  Closed
//! ```
//!
//! A failed attempt goes straight from `Connecting` to `Closed`.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use frame_pilot::{Client, ConnectionState};
//!
//! let handle = Client::builder()
//!     .page_url("https://example.com/ira/")
//!     .host(Arc::new(MyHost::new()))
//!     .build()?
//!     .spawn();
//!
//! handle.wait_for_state(ConnectionState::Open).await?;
//! // ...
//! handle.shutdown().await;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::frame::{FrameHost, Pointer};
use crate::transport::{ControlConnection, Disconnect, control_endpoint};

use super::options::ClientOptions;
use super::session::Session;

// ============================================================================
// ConnectionState
// ============================================================================

/// Observed state of the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// An attempt is in progress.
    Connecting,
    /// Connected, and the session has been reset.
    Open,
    /// Disconnected; a retry is scheduled unless shutting down.
    Closed,
}

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`].
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Default)]
pub struct ClientBuilder {
    /// URL the hosting page was loaded from.
    page_url: Option<String>,
    /// Creates the frame on every reset.
    host: Option<Arc<dyn FrameHost>>,
    /// Visual pointer for animated commands.
    pointer: Option<Arc<dyn Pointer>>,
    /// Client configuration.
    options: ClientOptions,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("page_url", &self.page_url)
            .field("has_host", &self.host.is_some())
            .field("has_pointer", &self.pointer.is_some())
            .field("options", &self.options)
            .finish()
    }
}

impl ClientBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the URL of the hosting page.
    ///
    /// The control endpoint is derived from it.
    #[inline]
    #[must_use]
    pub fn page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }

    /// Sets the frame host.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: Arc<dyn FrameHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Sets the visual pointer used by animated commands.
    #[inline]
    #[must_use]
    pub fn pointer(mut self, pointer: Arc<dyn Pointer>) -> Self {
        self.pointer = Some(pointer);
        self
    }

    /// Sets the client options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the client with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the page URL or host is not set
    /// - [`Error::Url`] if the page URL does not parse
    /// - [`Error::Config`] if the page URL has no host
    pub fn build(self) -> Result<Client> {
        let page_url = self.page_url.ok_or_else(|| {
            Error::config(
                "Hosting page URL is required. Use .page_url() to set it.\n\
                 Example: Client::builder().page_url(\"https://example.com/ira/\")",
            )
        })?;

        let host = self.host.ok_or_else(|| {
            Error::config("Frame host is required. Use .host() to set it.")
        })?;

        let endpoint = control_endpoint(&Url::parse(&page_url)?)?;

        Ok(Client {
            endpoint,
            host,
            pointer: self.pointer,
            options: self.options,
        })
    }
}

// ============================================================================
// Client
// ============================================================================

/// Remote-control client for one embedded frame.
pub struct Client {
    endpoint: Url,
    host: Arc<dyn FrameHost>,
    pointer: Option<Arc<dyn Pointer>>,
    options: ClientOptions,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint.as_str())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a configuration builder for the client.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Returns the control endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Returns the client options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Starts the reconnect loop on the current runtime.
    ///
    /// Dropping the returned handle stops the client.
    #[must_use]
    pub fn spawn(self) -> ClientHandle {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let reconnects = Arc::new(AtomicU64::new(0));

        let task = tokio::spawn(self.run(state_tx, shutdown_rx, Arc::clone(&reconnects)));

        ClientHandle {
            state: state_rx,
            shutdown: shutdown_tx,
            reconnects,
            task: Some(task),
        }
    }

    /// Connects, serves, and reconnects until shutdown.
    async fn run(
        self,
        state: watch::Sender<ConnectionState>,
        mut shutdown: watch::Receiver<bool>,
        reconnects: Arc<AtomicU64>,
    ) {
        info!(endpoint = %self.endpoint, "Control client started");

        loop {
            state.send_replace(ConnectionState::Connecting);

            let outcome = self.connect_once(&state, &mut shutdown).await;
            state.send_replace(ConnectionState::Closed);

            match outcome {
                Disconnect::Shutdown => break,
                Disconnect::Closed => info!("Control channel closed"),
                Disconnect::Failed(e) => warn!(error = %e, "Control channel failed"),
            }

            if *shutdown.borrow() {
                break;
            }

            let delay = self.options.reconnect_delay;
            debug!(delay_ms = delay.as_millis() as u64, "Reconnect scheduled");

            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown.changed() => break,
            }

            let attempt = reconnects.fetch_add(1, Ordering::Relaxed) + 1;
            info!(attempt, endpoint = %self.endpoint, "Reconnecting");
        }

        info!("Control client stopped");
    }

    /// One connection: open, reset, serve.
    async fn connect_once(
        &self,
        state: &watch::Sender<ConnectionState>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Disconnect {
        let limit = self.options.connect_timeout;

        let connection = tokio::select! {
            result = timeout(limit, ControlConnection::open(&self.endpoint)) => match result {
                Ok(Ok(connection)) => connection,
                Ok(Err(e)) => return Disconnect::Failed(e),
                Err(_) => {
                    return Disconnect::Failed(Error::connection_timeout(limit.as_millis() as u64));
                }
            },
            _ = shutdown.changed() => return Disconnect::Shutdown,
        };

        let (replies_tx, mut replies_rx) = mpsc::unbounded_channel();

        let mut session = match Session::start(
            self.host.as_ref(),
            self.pointer.clone(),
            &self.options,
            replies_tx,
        )
        .await
        {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Reset failed");
                connection.close().await;
                return Disconnect::Failed(e);
            }
        };

        state.send_replace(ConnectionState::Open);

        connection
            .serve(&mut session, &mut replies_rx, shutdown)
            .await
    }
}

// ============================================================================
// ClientHandle
// ============================================================================

/// Handle to a running [`Client`].
pub struct ClientHandle {
    state: watch::Receiver<ConnectionState>,
    shutdown: watch::Sender<bool>,
    reconnects: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle")
            .field("state", &self.state())
            .field("reconnects", &self.reconnect_count())
            .finish_non_exhaustive()
    }
}

impl ClientHandle {
    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Returns a receiver that observes every state change.
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Waits until the client reaches `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the client stopped first.
    pub async fn wait_for_state(&self, target: ConnectionState) -> Result<()> {
        let mut state = self.state.clone();
        state
            .wait_for(|current| *current == target)
            .await
            .map(|_| ())
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Returns how many reconnect attempts have been made.
    #[inline]
    #[must_use]
    pub fn reconnect_count(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    /// Closes the channel and waits for the client to stop.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);

        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            error!(error = %e, "Control client task failed");
        }
    }
}

impl Drop for ClientHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

// ============================================================================
// Tests
// ============================================================================
