use bytes::Bytes;
use std::fmt;
use std::str::Utf8Error;

/// PostgreSQL result format code for a column or output parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    #[default]
    Text,
    Binary,
}

impl Format {
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Format::Text),
            1 => Some(Format::Binary),
            _ => None,
        }
    }

    pub fn code(&self) -> i16 {
        match self {
            Format::Text => 0,
            Format::Binary => 1,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Text => write!(f, "text"),
            Format::Binary => write!(f, "binary"),
        }
    }
}

/// A single protocol-decoded payload together with the format it arrived in
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawScalar {
    format: Format,
    bytes: Bytes,
}

impl RawScalar {
    pub fn new(format: Format, bytes: impl Into<Bytes>) -> Self {
        Self {
            format,
            bytes: bytes.into(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new(Format::Text, Bytes::from(value.into()))
    }

    pub fn binary(bytes: impl Into<Bytes>) -> Self {
        Self::new(Format::Binary, bytes)
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the payload, for slicing out nested values without copying
    pub fn payload(&self) -> &Bytes {
        &self.bytes
    }

    /// The payload as UTF-8, which is what every text-format value is
    pub fn as_str(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.bytes)
    }
}

/// A value as handed over by statement execution: decoded from the wire but
/// not yet coerced. Arrays and composites may arrive either already split
/// (`Sequence`/`Record`) or still packed in a single `Scalar` payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawValue {
    Null,
    Scalar(RawScalar),
    Sequence(Vec<RawValue>),
    Record(Vec<RawValue>),
}

impl RawValue {
    pub fn text(value: impl Into<String>) -> Self {
        RawValue::Scalar(RawScalar::text(value))
    }

    pub fn binary(bytes: impl Into<Bytes>) -> Self {
        RawValue::Scalar(RawScalar::binary(bytes))
    }

    /// Build from a DataRow column: `None` is the protocol's -1 length NULL
    pub fn from_wire(format: Format, value: Option<Bytes>) -> Self {
        match value {
            Some(bytes) => RawValue::Scalar(RawScalar::new(format, bytes)),
            None => RawValue::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }
}

impl From<RawScalar> for RawValue {
    fn from(scalar: RawScalar) -> Self {
        RawValue::Scalar(scalar)
    }
}
