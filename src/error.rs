//! Error types for frame-pilot.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use frame_pilot::{Command, Result};
//!
//! async fn example(controller: &Controller) -> Result<()> {
//!     controller.load("/login").await?;
//!     controller.click("#submit", None, None).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::UnknownCommand`], [`Error::InvalidArgument`] |
//! | Element | [`Error::ElementNotFound`] |
//! | Frame | [`Error::Frame`], [`Error::NavigationSuperseded`], [`Error::Timeout`] |
//! | Queue | [`Error::SlotAbandoned`] |
//! | Controller | [`Error::RequestTimeout`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit code reported for a successful command.
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code reported for a generic command failure.
pub const EXIT_FAILURE: i32 = 1;

/// Exit code reported when a command could not be decoded.
pub const EXIT_PROTOCOL: i32 = 2;

/// Exit code reported when the target element does not exist.
pub const EXIT_ELEMENT: i32 = 3;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client options or the hosting page URL are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Timed out waiting for the peer to connect.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// WebSocket connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Malformed inbound message.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Command name is not one of the recognized commands.
    #[error("Unknown command: {command}")]
    UnknownCommand {
        /// The unrecognized command name.
        command: String,
    },

    /// A command argument has the wrong shape.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Element Errors
    // ========================================================================
    /// Selector/index pair resolved to no element.
    #[error("Element not found: selector={selector}, index={index}")]
    ElementNotFound {
        /// Selector used for the lookup.
        selector: String,
        /// Zero-based position among the matches.
        index: usize,
    },

    // ========================================================================
    // Frame Errors
    // ========================================================================
    /// The frame collaborator failed to perform an operation.
    #[error("Frame error: {message}")]
    Frame {
        /// Description reported by the frame.
        message: String,
    },

    /// A newer navigation replaced the one being awaited.
    #[error("Navigation superseded by a newer load")]
    NavigationSuperseded,

    /// Operation timeout.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Queue Errors
    // ========================================================================
    /// A queue slot was dropped before it was granted.
    #[error("Job queue slot abandoned")]
    SlotAbandoned,

    // ========================================================================
    // Controller Errors
    // ========================================================================
    /// Controller request got no reply in time.
    #[error("Request timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an unknown command error.
    #[inline]
    pub fn unknown_command(command: impl Into<String>) -> Self {
        Self::UnknownCommand {
            command: command.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an element not found error.
    #[inline]
    pub fn element_not_found(selector: impl Into<String>, index: usize) -> Self {
        Self::ElementNotFound {
            selector: selector.into(),
            index,
        }
    }

    /// Creates a frame error.
    #[inline]
    pub fn frame(message: impl Into<String>) -> Self {
        Self::Frame {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(timeout_ms: u64) -> Self {
        Self::RequestTimeout { timeout_ms }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::Timeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if the inbound message could not be turned into a command.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::Protocol { .. }
                | Self::UnknownCommand { .. }
                | Self::InvalidArgument { .. }
                | Self::Json(_)
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Exit code reported to the controller for this failure.
    ///
    /// Always non-zero.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.is_protocol_error() {
            EXIT_PROTOCOL
        } else if matches!(self, Self::ElementNotFound { .. }) {
            EXIT_ELEMENT
        } else {
            EXIT_FAILURE
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
