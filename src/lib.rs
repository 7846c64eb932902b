//! Frame Pilot - Remote control for an embedded browsing frame.
//!
//! A controller drives one sandboxed frame over a persistent WebSocket:
//! navigate, click, type, read markup. Every command is answered with a
//! structured result, in the order it arrived.
//!
//! # Architecture
//!
//! The crate covers both ends of the channel:
//!
//! - **Client**: Connects to the controller, runs commands against the frame
//! - **Controller**: Accepts a client, sends commands, matches replies
//!
//! Key design principles:
//!
//! - Commands run one at a time through a FIFO [`JobQueue`]
//! - `load`/`reload` wait for the frame's load event via a [`ReadySignal`]
//! - Messages carry no IDs; replies are matched by order
//! - Every (re)connect starts a fresh frame; nothing is replayed
//!
//! # Quick Start
//!
//! ```ignore
//! use std::net::{IpAddr, Ipv4Addr};
//! use std::sync::Arc;
//! use frame_pilot::{Client, ControlServer, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let server = ControlServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
//!
//!     // The embedder supplies the frame host.
//!     let client = Client::builder()
//!         .page_url(server.page_url("/ira/"))
//!         .host(Arc::new(MyHost::new()))
//!         .build()?
//!         .spawn();
//!
//!     let controller = server.accept().await?;
//!     controller.load("https://example.com").await?;
//!     controller.enter("input#q", "hello", None, Some(true)).await?;
//!     let html = controller.get_html("#results", None).await?;
//!     println!("{:?}", html.result);
//!
//!     client.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`], [`Session`], [`CommandInterpreter`], options |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`frame`] | Frame collaborators, [`FrameController`], pointer animation |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | [`Command`] and [`CommandResult`] wire types |
//! | [`queue`] | [`JobQueue`] async mutex |
//! | [`transport`] | WebSocket client connection and controller server |

// ============================================================================
// Modules
// ============================================================================

/// Control client, sessions and command execution.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// The controlled frame and its collaborators.
pub mod frame;

/// Type-safe identifiers.
pub mod identifiers;

/// Control channel message types.
pub mod protocol;

/// FIFO job queue.
pub mod queue;

/// WebSocket transport layer.
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{
    Client, ClientBuilder, ClientHandle, ClientOptions, CommandInterpreter, ConnectionState,
    ErrorReporting, Session,
};

// Error types
pub use error::{Error, Result};

// Frame types
pub use frame::{
    AnimationTimings, Frame, FrameController, FrameHost, LoadNotifier, NodeRef, Pointer,
    PointerAnimator, ReadySignal, Rect, Viewport,
};

// Identifier types
pub use identifiers::{ConnectionToken, SessionId};

// Protocol types
pub use protocol::{Command, CommandResult};

// Queue types
pub use queue::JobQueue;

// Transport types
pub use transport::{ControlServer, Controller};
