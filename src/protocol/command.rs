//! Command tuples exchanged over the control channel.
//!
//! On the wire a command is a JSON array whose first element is the command
//! name and whose remaining elements are positional arguments:
//!
//! | Command | Wire form |
//! |---------|-----------|
//! | `load` | `["load", url]` |
//! | `reload` | `["reload"]` |
//! | `enter` | `["enter", selector, index?, value, animate?]` |
//! | `click` | `["click", selector, index?, animate?]` |
//! | `get_html` | `["get_html", selector, index?]` |
//!
//! Trailing optional arguments may be omitted or `null`. An omitted or
//! `null` index means `0`; an omitted or `null` animate flag means `false`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::de::Error as DeError;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// Command Names
// ============================================================================

const LOAD: &str = "load";
const RELOAD: &str = "reload";
const ENTER: &str = "enter";
const CLICK: &str = "click";
const GET_HTML: &str = "get_html";

// ============================================================================
// Command
// ============================================================================

/// A decoded command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Navigate the frame and wait for the load to complete.
    Load {
        /// Target URL.
        url: String,
    },

    /// Reload the frame and wait for the load to complete.
    Reload,

    /// Set an element's value and dispatch a change notification.
    Enter {
        /// Element selector.
        selector: String,
        /// Position among the matches.
        index: usize,
        /// New value.
        value: String,
        /// Animate the pointer before typing.
        animate: bool,
    },

    /// Click an element.
    Click {
        /// Element selector.
        selector: String,
        /// Position among the matches.
        index: usize,
        /// Animate the pointer and click at the end of the animation.
        animate: bool,
    },

    /// Read an element's serialized inner markup.
    GetHtml {
        /// Element selector.
        selector: String,
        /// Position among the matches.
        index: usize,
    },
}

impl Command {
    /// Returns the wire name of the command.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Load { .. } => LOAD,
            Self::Reload => RELOAD,
            Self::Enter { .. } => ENTER,
            Self::Click { .. } => CLICK,
            Self::GetHtml { .. } => GET_HTML,
        }
    }

    /// Returns `true` for commands that wait on a navigation.
    #[inline]
    #[must_use]
    pub fn is_navigation(&self) -> bool {
        matches!(self, Self::Load { .. } | Self::Reload)
    }

    /// Decodes a command from a text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if the text is not a JSON array with a name
    /// - [`Error::UnknownCommand`] if the name is not recognized
    /// - [`Error::InvalidArgument`] if an argument has the wrong type
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::protocol(format!("unparseable message: {e}")))?;

        Self::try_from(value)
    }

    /// Encodes the command into its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Returns the positional wire arguments, name first.
    fn to_values(&self) -> Vec<Value> {
        let name = Value::from(self.name());

        match self {
            Self::Load { url } => vec![name, Value::from(url.as_str())],
            Self::Reload => vec![name],
            Self::Enter {
                selector,
                index,
                value,
                animate,
            } => vec![
                name,
                Value::from(selector.as_str()),
                Value::from(*index),
                Value::from(value.as_str()),
                Value::from(*animate),
            ],
            Self::Click {
                selector,
                index,
                animate,
            } => vec![
                name,
                Value::from(selector.as_str()),
                Value::from(*index),
                Value::from(*animate),
            ],
            Self::GetHtml { selector, index } => vec![
                name,
                Value::from(selector.as_str()),
                Value::from(*index),
            ],
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load { url } => write!(f, "load({url})"),
            Self::Reload => f.write_str("reload()"),
            Self::Enter {
                selector, index, ..
            } => write!(f, "enter({selector}[{index}])"),
            Self::Click {
                selector, index, ..
            } => write!(f, "click({selector}[{index}])"),
            Self::GetHtml { selector, index } => write!(f, "get_html({selector}[{index}])"),
        }
    }
}

// ============================================================================
// Decoding
// ============================================================================

impl TryFrom<Value> for Command {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        let Value::Array(args) = value else {
            return Err(Error::protocol("command must be a JSON array"));
        };

        let Some(name) = args.first() else {
            return Err(Error::protocol("command array is empty"));
        };

        let Some(name) = name.as_str() else {
            return Err(Error::protocol("command name must be a string"));
        };

        let args = Args { name, args: &args };

        match name {
            LOAD => Ok(Self::Load {
                url: args.string(1, "url")?,
            }),
            RELOAD => Ok(Self::Reload),
            ENTER => Ok(Self::Enter {
                selector: args.string(1, "selector")?,
                index: args.index(2)?,
                value: args.text(3, "value")?,
                animate: args.flag(4)?,
            }),
            CLICK => Ok(Self::Click {
                selector: args.string(1, "selector")?,
                index: args.index(2)?,
                animate: args.flag(3)?,
            }),
            GET_HTML => Ok(Self::GetHtml {
                selector: args.string(1, "selector")?,
                index: args.index(2)?,
            }),
            other => Err(Error::unknown_command(other)),
        }
    }
}

/// Positional argument accessors.
struct Args<'a> {
    name: &'a str,
    args: &'a [Value],
}

impl Args<'_> {
    /// Returns the argument at `pos`, treating `null` as absent.
    fn get(&self, pos: usize) -> Option<&Value> {
        self.args.get(pos).filter(|v| !v.is_null())
    }

    fn string(&self, pos: usize, what: &str) -> Result<String> {
        match self.get(pos) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(Error::invalid_argument(format!(
                "{}: {what} must be a string, got {other}",
                self.name
            ))),
            None => Err(Error::invalid_argument(format!(
                "{}: missing {what}",
                self.name
            ))),
        }
    }

    /// Like [`Args::string`], but numbers and booleans are stringified.
    fn text(&self, pos: usize, what: &str) -> Result<String> {
        match self.get(pos) {
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(Value::Bool(b)) => Ok(b.to_string()),
            _ => self.string(pos, what),
        }
    }

    fn index(&self, pos: usize) -> Result<usize> {
        match self.get(pos) {
            None => Ok(0),
            Some(value) => value
                .as_u64()
                .or_else(|| {
                    value
                        .as_f64()
                        .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                        .map(|f| f as u64)
                })
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| {
                    Error::invalid_argument(format!(
                        "{}: index must be a non-negative integer, got {value}",
                        self.name
                    ))
                }),
        }
    }

    fn flag(&self, pos: usize) -> Result<bool> {
        match self.get(pos) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(Error::invalid_argument(format!(
                "{}: animate must be a boolean, got {other}",
                self.name
            ))),
        }
    }
}

// ============================================================================
// Serde
// ============================================================================

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let values = self.to_values();
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in &values {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::try_from(value).map_err(D::Error::custom)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_decode_load() {
        let command = Command::decode(r#"["load", "about:blank"]"#).expect("decode");
        assert_eq!(
            command,
            Command::Load {
                url: "about:blank".into()
            }
        );
        assert!(command.is_navigation());
    }

    #[test]
    fn test_decode_reload_ignores_extra_args() {
        let command = Command::decode(r#"["reload", 1, 2]"#).expect("decode");
        assert_eq!(command, Command::Reload);
    }

    #[test]
    fn test_decode_enter_positions() {
        let command =
            Command::decode(r#"["enter", "input#q", 2, "hello", true]"#).expect("decode");
        assert_eq!(
            command,
            Command::Enter {
                selector: "input#q".into(),
                index: 2,
                value: "hello".into(),
                animate: true,
            }
        );
    }

    #[test]
    fn test_decode_enter_numeric_value() {
        let command = Command::decode(r#"["enter", "input", null, 42]"#).expect("decode");
        let Command::Enter { value, index, .. } = command else {
            panic!("expected enter");
        };
        assert_eq!(value, "42");
        assert_eq!(index, 0);
    }

    #[test]
    fn test_index_defaults_to_zero() {
        let omitted = Command::decode(r#"["click", "a"]"#).expect("decode");
        let null = Command::decode(r#"["click", "a", null, null]"#).expect("decode");
        let zero = Command::decode(r#"["click", "a", 0, false]"#).expect("decode");

        assert_eq!(omitted, zero);
        assert_eq!(null, zero);
    }

    #[test]
    fn test_integral_float_index_accepted() {
        let float = Command::decode(r#"["click", "a", 1.0]"#).expect("decode");
        let int = Command::decode(r#"["click", "a", 1]"#).expect("decode");
        assert_eq!(float, int);

        assert!(matches!(
            Command::decode(r#"["get_html", "a", 1.5]"#).unwrap_err(),
            Error::InvalidArgument { .. }
        ));
        assert!(matches!(
            Command::decode(r#"["get_html", "a", -2.0]"#).unwrap_err(),
            Error::InvalidArgument { .. }
        ));
    }

    #[test]
    fn test_get_html_index_defaults() {
        let command = Command::decode(r##"["get_html", "#x"]"##).expect("decode");
        assert_eq!(
            command,
            Command::GetHtml {
                selector: "#x".into(),
                index: 0
            }
        );
    }

    #[test]
    fn test_unparseable_is_protocol_error() {
        let err = Command::decode("not json").unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_non_array_is_protocol_error() {
        let err = Command::decode(r#"{"cmd": "load"}"#).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));

        let err = Command::decode("[]").unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_unknown_command() {
        let err = Command::decode(r#"["scroll", 0, 100]"#).unwrap_err();
        assert!(matches!(err, Error::UnknownCommand { ref command } if command == "scroll"));
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(matches!(
            Command::decode(r#"["load"]"#).unwrap_err(),
            Error::InvalidArgument { .. }
        ));
        assert!(matches!(
            Command::decode(r#"["click", "a", -1]"#).unwrap_err(),
            Error::InvalidArgument { .. }
        ));
        assert!(matches!(
            Command::decode(r#"["click", "a", 0, "yes"]"#).unwrap_err(),
            Error::InvalidArgument { .. }
        ));
    }

    #[test]
    fn test_encode_matches_wire_layout() {
        let command = Command::Enter {
            selector: "input#q".into(),
            index: 0,
            value: "hello".into(),
            animate: false,
        };
        let value: Value = serde_json::from_str(&command.encode().expect("encode")).expect("json");
        assert_eq!(value, json!(["enter", "input#q", 0, "hello", false]));
    }

    #[test]
    fn test_display() {
        let command = Command::Click {
            selector: ".square".into(),
            index: 3,
            animate: true,
        };
        assert_eq!(command.to_string(), "click(.square[3])");
    }

    proptest! {
        #[test]
        fn prop_missing_index_is_zero(selector in "[a-z#.]{1,12}", use_null in any::<bool>()) {
            let explicit = json!(["get_html", selector, 0]);
            let defaulted = if use_null {
                json!(["get_html", selector, null])
            } else {
                json!(["get_html", selector])
            };

            prop_assert_eq!(
                Command::try_from(explicit).expect("decode"),
                Command::try_from(defaulted).expect("decode")
            );
        }
    }
}
