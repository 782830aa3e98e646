use std::fmt;

use thiserror::Error;

use crate::types::Format;

/// Root cause of a failed coercion, independent of where in a nested value it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedTargetType,
    Decode,
    NoDefaultMapping,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::UnsupportedTargetType => write!(f, "unsupported target type"),
            ErrorKind::Decode => write!(f, "decode error"),
            ErrorKind::NoDefaultMapping => write!(f, "no default mapping"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoercionError {
    #[error("target type {target} cannot be built from a {type_name} value: {reason}")]
    UnsupportedTargetType {
        type_name: String,
        target: String,
        reason: String,
    },

    #[error("invalid {format} representation for type {type_name}: {message}")]
    Decode {
        type_name: String,
        format: Format,
        message: String,
    },

    #[error("no default mapping for type {type_name} and no override supplied")]
    NoDefaultMapping { type_name: String },

    #[error("array element {index}: {source}")]
    Element {
        index: usize,
        #[source]
        source: Box<CoercionError>,
    },

    #[error("field {position} ({name}): {source}")]
    Field {
        position: usize,
        name: String,
        #[source]
        source: Box<CoercionError>,
    },
}

pub type Result<T> = std::result::Result<T, CoercionError>;

impl CoercionError {
    pub(crate) fn decode(type_name: &str, format: Format, message: impl Into<String>) -> Self {
        CoercionError::Decode {
            type_name: type_name.to_string(),
            format,
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(type_name: &str, target: &str, reason: impl Into<String>) -> Self {
        CoercionError::UnsupportedTargetType {
            type_name: type_name.to_string(),
            target: target.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn no_default(type_name: &str) -> Self {
        CoercionError::NoDefaultMapping {
            type_name: type_name.to_string(),
        }
    }

    /// Annotate a failure with the 1-based array element it came from
    pub(crate) fn at_element(self, index: usize) -> Self {
        CoercionError::Element {
            index,
            source: Box::new(self),
        }
    }

    /// Annotate a failure with the 1-based composite field it came from
    pub(crate) fn at_field(self, position: usize, name: &str) -> Self {
        CoercionError::Field {
            position,
            name: name.to_string(),
            source: Box::new(self),
        }
    }

    /// The failure at the bottom of any element/field annotations
    pub fn root(&self) -> &CoercionError {
        match self {
            CoercionError::Element { source, .. } | CoercionError::Field { source, .. } => {
                source.root()
            }
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            CoercionError::UnsupportedTargetType { .. } => ErrorKind::UnsupportedTargetType,
            CoercionError::NoDefaultMapping { .. } => ErrorKind::NoDefaultMapping,
            _ => ErrorKind::Decode,
        }
    }

    /// Get the PostgreSQL error code for this error
    pub fn sqlstate(&self) -> &'static str {
        match self.kind() {
            ErrorKind::UnsupportedTargetType => "0A000", // feature_not_supported
            ErrorKind::Decode => "22P02",                // invalid_text_representation
            ErrorKind::NoDefaultMapping => "42704",      // undefined_object
        }
    }

    /// Coercion failures reflect a caller/schema mismatch, never a transient condition.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Location of the failing value inside the coerced tree, e.g. `[2].addr`.
    /// Empty when the failure is at the top level.
    pub fn path(&self) -> String {
        let mut path = String::new();
        let mut current = self;
        loop {
            match current {
                CoercionError::Element { index, source } => {
                    path.push_str(&format!("[{index}]"));
                    current = source;
                }
                CoercionError::Field { name, source, .. } => {
                    path.push('.');
                    path.push_str(name);
                    current = source;
                }
                _ => break,
            }
        }
        path
    }
}
