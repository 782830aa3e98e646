// Module for type descriptors, raw/target values and the built-in mappings
pub mod type_mapper;
pub mod descriptor;
pub mod raw_value;
pub mod value;
pub mod type_map;
pub mod value_converter;
pub mod decimal_handler;
pub mod datetime_utils;

pub use type_mapper::{default_mapping, default_mappings, DefaultMapping, HostType, Oid, PgType};
pub use descriptor::{Category, FieldDescriptor, TypeDescriptor};
pub use raw_value::{Format, RawScalar, RawValue};
pub use value::{CustomObject, CustomValue, Interval, Record, Value};
pub use type_map::{FromRecord, TargetType, TypeMap};
pub use value_converter::ValueConverter;
pub use decimal_handler::DecimalHandler;
