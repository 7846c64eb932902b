//! Client configuration.
//!
//! Options can be built in code or loaded from JSON. Durations are integer
//! milliseconds on the wire.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use frame_pilot::{ClientOptions, ErrorReporting, Viewport};
//!
//! let options = ClientOptions::new()
//!     .with_reconnect_delay(Duration::from_millis(250))
//!     .with_viewport(Viewport::Tablet)
//!     .with_error_reporting(ErrorReporting::Silent);
//!
//! let from_file = ClientOptions::from_json(r#"{"reconnect_delay": 250}"#)?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::frame::{AnimationTimings, Viewport};

// ============================================================================
// Constants
// ============================================================================

/// Delay between a lost connection and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1000);

/// Limit on opening the control channel, handshake included.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause after an animated `enter` sets the value.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1000);

// ============================================================================
// ErrorReporting
// ============================================================================

/// What the client sends back when a command fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorReporting {
    /// Reply with a non-zero `exit_code` and an `error` message.
    #[default]
    Report,
    /// Log the failure and send nothing.
    Silent,
}

// ============================================================================
// ClientOptions
// ============================================================================

/// Control client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Delay before each reconnect attempt.
    #[serde(with = "duration_ms")]
    pub reconnect_delay: Duration,

    /// Limit on each connection attempt; expiry counts as a failed attempt.
    #[serde(with = "duration_ms")]
    pub connect_timeout: Duration,

    /// Pause after an animated `enter` sets the value.
    #[serde(with = "duration_ms")]
    pub settle_delay: Duration,

    /// Frame size applied on every reset.
    pub viewport: Viewport,

    /// Pointer animation timings.
    pub animation: AnimationTimings,

    /// Failure reply policy.
    pub error_reporting: ErrorReporting,

    /// Upper bound on waiting for a navigation; `None` waits forever.
    #[serde(with = "duration_ms_opt")]
    pub navigation_timeout: Option<Duration>,
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            viewport: Viewport::Desktop,
            animation: AnimationTimings::DEFAULT,
            error_reporting: ErrorReporting::Report,
            navigation_timeout: None,
        }
    }

    /// Parses options from JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the text is not valid options.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientOptions {
    /// Sets the reconnect delay.
    #[inline]
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the connection attempt limit.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the settle delay used by animated `enter`.
    #[inline]
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Sets the viewport applied on reset.
    #[inline]
    #[must_use]
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// Sets the pointer animation timings.
    #[inline]
    #[must_use]
    pub fn with_animation(mut self, timings: AnimationTimings) -> Self {
        self.animation = timings;
        self
    }

    /// Sets the failure reply policy.
    #[inline]
    #[must_use]
    pub fn with_error_reporting(mut self, reporting: ErrorReporting) -> Self {
        self.error_reporting = reporting;
        self
    }

    /// Bounds how long a navigation may take.
    #[inline]
    #[must_use]
    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = Some(timeout);
        self
    }
}

// ============================================================================
// Serde Helpers
// ============================================================================

/// `Duration` as integer milliseconds.
pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// `Option<Duration>` as nullable integer milliseconds.
pub(crate) mod duration_ms_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}

// ============================================================================
// Tests
// ============================================================================
