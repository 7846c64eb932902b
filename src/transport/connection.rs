//! Client side of the control channel.
//!
//! [`ControlConnection::serve`] runs the socket event loop for one
//! connection:
//!
//! - inbound text frames are handed to the session in arrival order
//! - results produced by the session are written back as text frames
//! - a shutdown request closes the socket
//!
//! The loop ends on close, error or shutdown; the caller decides whether to
//! reconnect.

// ============================================================================
// Imports
// ============================================================================

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};
use url::Url;

use crate::client::Session;
use crate::error::{Error, Result};
use crate::protocol::CommandResult;

use super::endpoint::is_secure;

// ============================================================================
// Types
// ============================================================================

/// Client-side WebSocket stream.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a connection's event loop ended.
#[derive(Debug)]
pub enum Disconnect {
    /// The peer closed the socket or the stream ended.
    Closed,
    /// A transport error ended the connection.
    Failed(Error),
    /// Shutdown was requested locally.
    Shutdown,
}

// ============================================================================
// ControlConnection
// ============================================================================

/// An open control channel socket.
pub struct ControlConnection {
    stream: WsStream,
}

impl ControlConnection {
    /// Opens a WebSocket to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WebSocket`] if the handshake fails.
    pub async fn open(endpoint: &Url) -> Result<Self> {
        if is_secure(endpoint) {
            // Fails harmlessly when a provider is already installed.
            let _ = rustls::crypto::ring::default_provider().install_default();
        }

        let (stream, response) = connect_async(endpoint.as_str()).await?;
        debug!(endpoint = %endpoint, status = %response.status(), "WebSocket connected");

        Ok(Self { stream })
    }

    /// Closes the socket without serving it.
    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }

    /// Runs the event loop until the connection ends.
    pub async fn serve(
        self,
        session: &mut Session,
        replies: &mut mpsc::UnboundedReceiver<CommandResult>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Disconnect {
        let (mut ws_write, mut ws_read) = self.stream.split();

        loop {
            tokio::select! {
                // Commands from the controller
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            session.dispatch(&text);
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            return Disconnect::Closed;
                        }

                        Some(Err(e)) => {
                            warn!(error = %e, "WebSocket error");
                            return Disconnect::Failed(e.into());
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            return Disconnect::Closed;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Results from the session
                reply = replies.recv() => {
                    let Some(reply) = reply else {
                        return Disconnect::Closed;
                    };

                    let json = match reply.encode() {
                        Ok(json) => json,
                        Err(e) => {
                            warn!(error = %e, "Failed to encode result");
                            continue;
                        }
                    };

                    debug!(session = %session.id(), result = %json, ">>");

                    if let Err(e) = ws_write.send(Message::Text(json.into())).await {
                        warn!(error = %e, "Failed to send result");
                        return Disconnect::Failed(e.into());
                    }
                }

                // Local shutdown (also fires when the handle is dropped)
                _ = shutdown.changed() => {
                    trace!("Shutdown requested");
                    let _ = ws_write.close().await;
                    return Disconnect::Shutdown;
                }
            }
        }
    }
}
