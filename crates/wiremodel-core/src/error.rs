//! Error types for the wiremodel core library
//!
//! This module defines the error handling system for wiremodel, using thiserror
//! for the error definitions and anyhow for errors raised by user callbacks.
//! It also holds [`ConvertPolicy`], the strictness/presence mode every
//! conversion runs under.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Main error type for wiremodel operations
#[derive(Error, Debug)]
pub enum Error {
    /// A declared field is absent or null where it is mandatory
    #[error("Convert {key} failed: key {key} is required but not provided (model {model}{})", .wire_key.as_ref().map(|k| format!(", wire key {}", k)).unwrap_or_default())]
    RequiredFieldMissing {
        key: String,
        wire_key: Option<String>,
        model: String,
    },

    /// The top-level source has a shape the model cannot represent
    #[error("Try to convert a {source_type} to {target_type} (model {model}){}", .hint.as_ref().map(|h| format!(": {}", h)).unwrap_or_default())]
    TryConvertBadType {
        source_type: String,
        target_type: String,
        model: String,
        hint: Option<String>,
    },

    /// The declared type name has no registered converter
    #[error("Convert {key} failed: no converter was found for type {type_name} (model {model})")]
    NoConverterFound {
        key: String,
        type_name: String,
        model: String,
    },

    /// Strict conversion of a field without a declared type for the direction
    #[error("Convert {key} failed: must provide a {direction} type (model {model})")]
    MustProvideDirection {
        key: String,
        direction: String,
        model: String,
    },

    /// A converter invocation received a null/undefined required value
    #[error("Convert {key} failed: key {key} is required but not provided or null (model {model})")]
    RequiredKeyNull { key: String, model: String },

    /// Two model-side fields map onto the same wire-side name
    #[error("Detected field overlap in the name mapping table of {model}: field {key} maps to wire field {wire_key}, which is already written")]
    OverlapTable {
        key: String,
        wire_key: String,
        model: String,
    },

    /// Clone attempted on a model without a model type reference
    #[error("Model {model} can not be cloned: it was not created from a model type")]
    CannotClone { model: String },

    /// Every candidate converter rejected the value
    #[error("Convert {key} failed: all converters failed for type {type_name} (model {model}): {}", .messages.join(", "))]
    AllConvertersFailed {
        key: String,
        type_name: String,
        messages: Vec<String>,
        model: String,
    },

    /// Array transform helper received no source
    #[error("transform_array_model failed: the required field {key} is not provided")]
    ArrayRequiredKeyMissing { key: String },

    /// Array transform helper received a non-array source
    #[error("transform_array_model failed: the field {key} is not an array")]
    ArrayIsNotArray { key: String },

    /// Malformed or unresolvable object path
    #[error("Invalid path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    /// Caller supplied assertion failed
    #[error("{message}")]
    Assertion { message: String },

    /// Engine configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Error raised by a user callback (custom converter, hook)
    #[error("Callback error: {message}")]
    Callback {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Conversion policy of a model.
///
/// Combines a strictness axis (`default` reports nothing, `warning` logs and
/// continues, `strict` fails) with a presence axis (`*-required` policies treat
/// every declared field as mandatory and drop undeclared ones).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConvertPolicy {
    /// Convert declared fields silently, pass undeclared fields through
    #[default]
    Default,
    /// Like `Default`, but log conversion failures
    Warning,
    /// Every declared field is mandatory, failures are errors, undeclared fields dropped
    StrictRequired,
    /// Failures are errors, undeclared fields pass through
    StrictProvided,
    /// Like `StrictRequired`, but failures are logged instead of raised
    WarningRequired,
    /// Like `StrictProvided`, but failures are logged instead of raised
    WarningProvided,
}

impl ConvertPolicy {
    /// Conversion failures are errors
    pub fn is_strict(self) -> bool {
        matches!(self, Self::StrictRequired | Self::StrictProvided)
    }

    /// Conversion failures are logged
    pub fn is_warning(self) -> bool {
        matches!(self, Self::Warning | Self::WarningRequired | Self::WarningProvided)
    }

    /// Every declared field is mandatory and undeclared fields are dropped
    pub fn is_required(self) -> bool {
        matches!(self, Self::StrictRequired | Self::WarningRequired)
    }

    /// Symbolic name as used in configuration files
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Warning => "warning",
            Self::StrictRequired => "strict-required",
            Self::StrictProvided => "strict-provided",
            Self::WarningRequired => "warning-required",
            Self::WarningProvided => "warning-provided",
        }
    }
}

impl fmt::Display for ConvertPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConvertPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "default" => Ok(Self::Default),
            "warning" => Ok(Self::Warning),
            "strict-required" => Ok(Self::StrictRequired),
            "strict-provided" => Ok(Self::StrictProvided),
            "warning-required" => Ok(Self::WarningRequired),
            "warning-provided" => Ok(Self::WarningProvided),
            other => Err(Error::Configuration {
                message: format!("unknown convert policy '{}'", other),
            }),
        }
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Callback {
            message: err.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::RequiredFieldMissing {
            key: "name".to_string(),
            wire_key: Some("user_name".to_string()),
            model: "User".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("name is required"));
        assert!(text.contains("wire key user_name"));
        assert!(text.contains("User"));
    }

    #[test]
    fn test_all_converters_failed_lists_messages() {
        let err = Error::AllConvertersFailed {
            key: "price".to_string(),
            type_name: "number".to_string(),
            messages: vec!["Not a number".to_string(), "Empty".to_string()],
            model: "Order".to_string(),
        };
        assert!(err.to_string().ends_with("Not a number, Empty"));
    }

    #[test]
    fn test_policy_axes() {
        assert!(ConvertPolicy::StrictRequired.is_strict());
        assert!(ConvertPolicy::StrictRequired.is_required());
        assert!(!ConvertPolicy::StrictProvided.is_required());
        assert!(ConvertPolicy::WarningRequired.is_warning());
        assert!(ConvertPolicy::WarningRequired.is_required());
        assert!(ConvertPolicy::Warning.is_warning());
        assert!(!ConvertPolicy::Default.is_strict());
        assert!(!ConvertPolicy::Default.is_warning());
        assert!(!ConvertPolicy::Default.is_required());
    }

    #[test]
    fn test_policy_parse_and_display() {
        for policy in [
            ConvertPolicy::Default,
            ConvertPolicy::Warning,
            ConvertPolicy::StrictRequired,
            ConvertPolicy::StrictProvided,
            ConvertPolicy::WarningRequired,
            ConvertPolicy::WarningProvided,
        ] {
            assert_eq!(policy.to_string().parse::<ConvertPolicy>().unwrap(), policy);
        }
        assert!("strict".parse::<ConvertPolicy>().is_err());
    }

    #[test]
    fn test_policy_serde_names() {
        let policy: ConvertPolicy = serde_json::from_str("\"warning-provided\"").unwrap();
        assert_eq!(policy, ConvertPolicy::WarningProvided);
        assert_eq!(
            serde_json::to_string(&ConvertPolicy::StrictRequired).unwrap(),
            "\"strict-required\""
        );
    }
}
