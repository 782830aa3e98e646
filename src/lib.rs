pub mod codec;
pub mod coerce;
pub mod config;
pub mod error;
pub mod types;

pub use coerce::{coerce, Coercer, CoercerBuilder, ExtensionDecoder};
pub use config::CoercerConfig;
pub use error::{CoercionError, ErrorKind, Result};
pub use types::{
    Category, CustomObject, CustomValue, FieldDescriptor, Format, FromRecord, Interval, PgType,
    RawScalar, RawValue, Record, TargetType, TypeDescriptor, TypeMap, Value,
};
