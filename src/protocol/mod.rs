//! Control channel message types.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Form |
//! |---------|-----------|------|
//! | [`Command`] | Controller → Client | JSON array `[name, ...args]` |
//! | [`CommandResult`] | Client → Controller | JSON object `{exit_code, result?, error?}` |
//!
//! There are no message IDs. The client runs one command at a time and
//! replies in arrival order, so the n-th result answers the n-th command.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Command enum and tuple codec |
//! | `result` | Result object |

// ============================================================================
// Submodules
// ============================================================================

/// Command enum and tuple codec.
pub mod command;

/// Command result object.
pub mod result;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::Command;
pub use result::CommandResult;
