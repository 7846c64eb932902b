//! Control client.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Reconnecting control channel for one frame |
//! | [`ClientHandle`] | State, reconnect count, shutdown |
//! | [`Session`] | Fresh frame + job queue per connection |
//! | [`CommandInterpreter`] | Runs one command against the frame |
//! | [`ClientOptions`] | Delays, viewport, animation, error reporting |

// ============================================================================
// Submodules
// ============================================================================

/// Client, builder and reconnect loop.
pub mod core;

/// Command execution.
pub mod interpreter;

/// Client configuration.
pub mod options;

/// Per-connection session.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::{Client, ClientBuilder, ClientHandle, ConnectionState};
pub use interpreter::CommandInterpreter;
pub use options::{ClientOptions, ErrorReporting};
pub use session::Session;
