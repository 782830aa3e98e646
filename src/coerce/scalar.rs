use std::borrow::Cow;
use tracing::trace;
use uuid::Uuid;

use super::Coercer;
use crate::codec::{BinaryDecoder, TextDecoder};
use crate::config::CoercerConfig;
use crate::error::{CoercionError, ErrorKind, Result};
use crate::types::datetime_utils;
use crate::types::type_map::ScalarConstructor;
use crate::types::{
    DecimalHandler, Format, PgType, RawScalar, RawValue, TargetType, TypeDescriptor, TypeMap,
    Value, ValueConverter,
};

impl Coercer {
    /// Scalars and enums: an override for the type name wins, otherwise the
    /// default decoder for the type
    pub(super) fn coerce_scalar(&self, raw: &RawValue, descriptor: &TypeDescriptor, type_map: &TypeMap) -> Result<Value> {
        let type_name = descriptor.name();
        let scalar = match raw {
            RawValue::Scalar(scalar) => scalar,
            RawValue::Sequence(_) => {
                return Err(CoercionError::decode(type_name, Format::Text, "expected a single value, got an array"));
            }
            RawValue::Record(_) => {
                return Err(CoercionError::decode(type_name, Format::Text, "expected a single value, got a composite"));
            }
            RawValue::Null => return Ok(Value::Null(descriptor.category())),
        };

        match type_map.resolve(type_name) {
            Some(target) => {
                trace!("Coercing {} value with override {}", type_name, target.name());
                self.construct_scalar(target, descriptor, scalar)
            }
            None => self.decode_default(descriptor, scalar),
        }
    }

    fn construct_scalar(&self, target: &TargetType, descriptor: &TypeDescriptor, scalar: &RawScalar) -> Result<Value> {
        let type_name = descriptor.name();
        let constructor = target.scalar_constructor().ok_or_else(|| {
            CoercionError::unsupported(type_name, target.name(), "it has no single-value constructor")
        })?;

        let built = match constructor {
            ScalarConstructor::Text(factory) => {
                let text = match scalar.format() {
                    Format::Text => Cow::Borrowed(
                        scalar
                            .as_str()
                            .map_err(|e| CoercionError::decode(type_name, Format::Text, e.to_string()))?,
                    ),
                    Format::Binary => Cow::Owned(self.binary_as_text(target, descriptor, scalar)?),
                };
                factory(&text)
            }
            ScalarConstructor::Binary(factory) => {
                if scalar.format() != Format::Binary {
                    return Err(CoercionError::unsupported(
                        type_name,
                        target.name(),
                        "it only accepts the binary representation",
                    ));
                }
                factory(scalar.bytes())
            }
            ScalarConstructor::Raw(factory) => factory(scalar),
        };

        built.map(Value::Custom).map_err(|message| {
            CoercionError::decode(
                type_name,
                scalar.format(),
                format!("{} rejected the value: {message}", target.name()),
            )
        })
    }

    /// Canonical text of a binary payload, for text-constructed targets
    fn binary_as_text(&self, target: &TargetType, descriptor: &TypeDescriptor, scalar: &RawScalar) -> Result<String> {
        let type_name = descriptor.name();
        let no_text_form = || {
            CoercionError::unsupported(
                type_name,
                target.name(),
                "it needs text and the binary representation has no known text form",
            )
        };

        let value = self.decode_default(descriptor, scalar).map_err(|e| match e.kind() {
            ErrorKind::NoDefaultMapping => no_text_form(),
            _ => e,
        })?;
        value.to_pg_text().ok_or_else(no_text_form)
    }

    /// Extension decoder first, then the built-in table
    pub(super) fn decode_default(&self, descriptor: &TypeDescriptor, scalar: &RawScalar) -> Result<Value> {
        let type_name = descriptor.name();

        if let TypeDescriptor::Enum { labels, .. } = descriptor {
            let label = scalar
                .as_str()
                .map_err(|e| CoercionError::decode(type_name, scalar.format(), e.to_string()))?;
            if !labels.is_empty() && !labels.iter().any(|l| l == label) {
                return Err(CoercionError::decode(
                    type_name,
                    scalar.format(),
                    format!("invalid input value for enum {type_name}: \"{label}\""),
                ));
            }
            return Ok(Value::Text(label.to_string()));
        }

        if let Some(decoder) = self.extension(type_name) {
            trace!("Coercing {} value with extension decoder", type_name);
            return decoder(scalar).map_err(|message| CoercionError::decode(type_name, scalar.format(), message));
        }

        let pg_type = descriptor
            .pg_type()
            .ok_or_else(|| CoercionError::no_default(type_name))?;
        decode_builtin(pg_type, scalar, &self.config)
            .map_err(|message| CoercionError::decode(type_name, scalar.format(), message))
    }
}

/// Decode a built-in scalar in either wire format into its default host value
pub(crate) fn decode_builtin(pg_type: PgType, scalar: &RawScalar, config: &CoercerConfig) -> std::result::Result<Value, String> {
    match scalar.format() {
        Format::Text => {
            let text = scalar.as_str().map_err(|e| format!("invalid UTF-8: {e}"))?;
            decode_text(pg_type, text, config)
        }
        Format::Binary => decode_binary(pg_type, scalar.bytes()),
    }
}

fn decode_text(pg_type: PgType, text: &str, config: &CoercerConfig) -> std::result::Result<Value, String> {
    let invalid = || format!("invalid input syntax for type {pg_type}: \"{text}\"");

    let value = match pg_type {
        PgType::Bool => Value::Bool(TextDecoder::parse_bool(text)?),
        PgType::Int2 => Value::Int2(text.trim().parse().map_err(|_| invalid())?),
        PgType::Int4 => Value::Int4(text.trim().parse().map_err(|_| invalid())?),
        PgType::Int8 => Value::Int8(text.trim().parse().map_err(|_| invalid())?),
        PgType::Oid => Value::Oid(text.trim().parse().map_err(|_| invalid())?),
        PgType::Float4 => Value::Float4(text.trim().parse().map_err(|_| invalid())?),
        PgType::Float8 => Value::Float8(text.trim().parse().map_err(|_| invalid())?),
        PgType::Numeric => Value::Numeric(DecimalHandler::parse_decimal(text)?),
        PgType::Money => Value::Money(DecimalHandler::parse_money(text)?),
        PgType::Text
        | PgType::Varchar
        | PgType::Bpchar
        | PgType::Name
        | PgType::Char
        | PgType::Xml
        | PgType::Unknown => Value::Text(text.to_string()),
        PgType::Bytea => Value::Bytea(TextDecoder::parse_bytea(text)?),
        PgType::Uuid => Value::Uuid(Uuid::parse_str(text.trim()).map_err(|_| invalid())?),
        PgType::Json | PgType::Jsonb => {
            Value::Json(serde_json::from_str(text).map_err(|e| format!("Invalid JSON: {e}"))?)
        }
        PgType::Date => Value::Date(datetime_utils::parse_date(text).ok_or_else(invalid)?),
        PgType::Time => Value::Time(datetime_utils::parse_time(text).ok_or_else(invalid)?),
        PgType::Timetz => {
            let (time, offset) = datetime_utils::parse_timetz(text).ok_or_else(invalid)?;
            Value::TimeTz(time, offset)
        }
        PgType::Timestamp => Value::Timestamp(datetime_utils::parse_timestamp(text).ok_or_else(invalid)?),
        PgType::Timestamptz => {
            Value::Timestamptz(datetime_utils::parse_timestamptz(text).ok_or_else(invalid)?)
        }
        PgType::Interval => Value::Interval(datetime_utils::parse_interval(text).ok_or_else(invalid)?),
        PgType::Inet
        | PgType::Cidr
        | PgType::Macaddr
        | PgType::Macaddr8
        | PgType::Bit
        | PgType::Varbit => {
            if config.validate_network_text {
                Value::Text(ValueConverter::validate_text(text, pg_type)?)
            } else {
                Value::Text(text.to_string())
            }
        }
    };
    Ok(value)
}

fn decode_binary(pg_type: PgType, bytes: &[u8]) -> std::result::Result<Value, String> {
    let value = match pg_type {
        PgType::Bool => Value::Bool(BinaryDecoder::decode_bool(bytes)?),
        PgType::Int2 => Value::Int2(BinaryDecoder::decode_int2(bytes)?),
        PgType::Int4 => Value::Int4(BinaryDecoder::decode_int4(bytes)?),
        PgType::Int8 => Value::Int8(BinaryDecoder::decode_int8(bytes)?),
        PgType::Oid => Value::Oid(BinaryDecoder::decode_oid(bytes)?),
        PgType::Float4 => Value::Float4(BinaryDecoder::decode_float4(bytes)?),
        PgType::Float8 => Value::Float8(BinaryDecoder::decode_float8(bytes)?),
        PgType::Numeric => Value::Numeric(DecimalHandler::decode_numeric(bytes)?),
        PgType::Money => Value::Money(DecimalHandler::decode_money(bytes)?),
        PgType::Text
        | PgType::Varchar
        | PgType::Bpchar
        | PgType::Name
        | PgType::Xml
        | PgType::Unknown => Value::Text(BinaryDecoder::decode_text(bytes)?),
        PgType::Char => Value::Text(BinaryDecoder::decode_char(bytes)?),
        PgType::Bytea => Value::Bytea(bytes.to_vec()),
        PgType::Uuid => Value::Uuid(BinaryDecoder::decode_uuid(bytes)?),
        PgType::Json => Value::Json(BinaryDecoder::decode_json(bytes)?),
        PgType::Jsonb => Value::Json(BinaryDecoder::decode_jsonb(bytes)?),
        PgType::Date => Value::Date(datetime_utils::decode_date(bytes)?),
        PgType::Time => Value::Time(datetime_utils::decode_time(bytes)?),
        PgType::Timetz => {
            let (time, offset) = datetime_utils::decode_timetz(bytes)?;
            Value::TimeTz(time, offset)
        }
        PgType::Timestamp => Value::Timestamp(datetime_utils::decode_timestamp(bytes)?),
        PgType::Timestamptz => Value::Timestamptz(datetime_utils::decode_timestamptz(bytes)?),
        PgType::Interval => Value::Interval(datetime_utils::decode_interval(bytes)?),
        PgType::Inet
        | PgType::Cidr
        | PgType::Macaddr
        | PgType::Macaddr8
        | PgType::Bit
        | PgType::Varbit => Value::Text(ValueConverter::binary_to_text(bytes, pg_type)?),
    };
    Ok(value)
}
