//! WebSocket transport layer.
//!
//! Both ends of the control channel live here.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Controller     │                              │  Client         │
//! │                 │         WebSocket            │                 │
//! │  ControlServer  │◄────────────────────────────►│ ControlConnection│
//! │  → Controller   │   host + path of the page    │  → Session      │
//! │                 │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `ControlServer::bind` - Controller listens
//! 2. `control_endpoint` - Client derives the address from its hosting page
//! 3. `ControlConnection::open` - Client connects
//! 4. `ControlConnection::serve` - Commands in, results out
//! 5. On close the client waits and reconnects with a fresh session
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Client-side socket event loop |
//! | `endpoint` | Endpoint derivation from the hosting page |
//! | `server` | Controller-side server and request matching |

// ============================================================================
// Submodules
// ============================================================================

/// Client-side socket event loop.
pub mod connection;

/// Endpoint derivation.
pub mod endpoint;

/// Controller-side WebSocket server.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{ControlConnection, Disconnect};
pub use endpoint::control_endpoint;
pub use server::{ControlServer, Controller};
