//! Command results sent back to the controller.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{EXIT_SUCCESS, Error, Result};

// ============================================================================
// CommandResult
// ============================================================================

/// Outcome of one command.
///
/// # Format
///
/// Success:
/// ```json
/// { "exit_code": 0 }
/// { "exit_code": 0, "result": "<b>hi</b>" }
/// ```
///
/// Reported failure:
/// ```json
/// { "exit_code": 3, "error": "Element not found: selector=#x, index=0" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Zero on success.
    pub exit_code: i32,

    /// Command output (only `get_html` produces one).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    /// Failure description (only on reported failures).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResult {
    /// Creates a success result without output.
    #[inline]
    #[must_use]
    pub const fn success() -> Self {
        Self {
            exit_code: EXIT_SUCCESS,
            result: None,
            error: None,
        }
    }

    /// Creates a success result carrying output.
    #[inline]
    #[must_use]
    pub fn with_result(result: impl Into<String>) -> Self {
        Self {
            exit_code: EXIT_SUCCESS,
            result: Some(result.into()),
            error: None,
        }
    }

    /// Creates a failure result from an error.
    #[must_use]
    pub fn failure(error: &Error) -> Self {
        Self {
            exit_code: error.exit_code(),
            result: None,
            error: Some(error.to_string()),
        }
    }

    /// Returns `true` if the command succeeded.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == EXIT_SUCCESS
    }

    /// Serializes the result into its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a result from its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the text is not a result object.
    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl Default for CommandResult {
    fn default() -> Self {
        Self::success()
    }
}

// ============================================================================
// Tests
// ============================================================================
