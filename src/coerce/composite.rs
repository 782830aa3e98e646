use std::borrow::Cow;
use tracing::trace;

use super::{payload_format, Coercer};
use crate::codec::{BinaryDecoder, TextDecoder};
use crate::error::{CoercionError, Result};
use crate::types::{Category, FieldDescriptor, Format, RawScalar, RawValue, Record, TypeMap, Value};

impl Coercer {
    /// Fields are coerced in declaration order with the same type map; the
    /// composite is then assembled either by its override's record
    /// constructor or as a plain `Record`.
    pub(super) fn coerce_composite(
        &self,
        raw: &RawValue,
        type_name: &str,
        fields: &[FieldDescriptor],
        type_map: &TypeMap,
    ) -> Result<Value> {
        let items: Cow<'_, [RawValue]> = match raw {
            RawValue::Record(items) => Cow::Borrowed(items.as_slice()),
            RawValue::Scalar(scalar) => Cow::Owned(self.split_record(type_name, fields, scalar)?),
            RawValue::Sequence(_) => {
                return Err(CoercionError::decode(
                    type_name,
                    payload_format(raw),
                    "expected a composite, got an array",
                ));
            }
            RawValue::Null => return Ok(Value::Null(Category::Record)),
        };

        if items.len() != fields.len() {
            return Err(CoercionError::decode(
                type_name,
                payload_format(raw),
                format!("expected {} fields, got {}", fields.len(), items.len()),
            ));
        }

        let assembly = match type_map.resolve(type_name) {
            Some(target) => {
                let constructor = target.record_constructor().ok_or_else(|| {
                    CoercionError::unsupported(
                        type_name,
                        target.name(),
                        "it has no constructor taking the composite's fields",
                    )
                })?;
                if constructor.arity != fields.len() {
                    return Err(CoercionError::unsupported(
                        type_name,
                        target.name(),
                        format!(
                            "its constructor takes {} fields but the composite has {}",
                            constructor.arity,
                            fields.len()
                        ),
                    ));
                }
                Some((target, constructor))
            }
            None => None,
        };

        let mut record = Record::with_capacity(fields.len());
        for (position, (field, item)) in fields.iter().zip(items.iter()).enumerate() {
            let value = self
                .coerce(item, &field.ty, type_map.nested())
                .map_err(|e| e.at_field(position + 1, &field.name))?;
            record.push(field.name.clone(), value);
        }

        let Some((target, constructor)) = assembly else {
            return Ok(Value::Record(record));
        };

        trace!("Assembling {} composite with override {}", type_name, target.name());
        (constructor.build)(&record).map(Value::Custom).map_err(|message| {
            CoercionError::decode(
                type_name,
                payload_format(raw),
                format!("{} rejected the value: {message}", target.name()),
            )
        })
    }

    fn split_record(&self, type_name: &str, fields: &[FieldDescriptor], scalar: &RawScalar) -> Result<Vec<RawValue>> {
        let malformed = |message: String| CoercionError::decode(type_name, scalar.format(), message);

        match scalar.format() {
            Format::Text => {
                let literal = scalar.as_str().map_err(|e| malformed(e.to_string()))?;
                TextDecoder::parse_record(literal, fields.len()).map_err(malformed)
            }
            Format::Binary => {
                let decoded = BinaryDecoder::decode_record(scalar.payload()).map_err(malformed)?;
                decoded
                    .into_iter()
                    .zip(fields.iter().map(Some).chain(std::iter::repeat(None)))
                    .enumerate()
                    .map(|(i, (field, descriptor))| {
                        let expected = descriptor.and_then(|d| d.ty.pg_type()).map(|t| t.to_oid());
                        match expected {
                            Some(expected) if field.oid != 0 && field.oid != expected => Err(malformed(format!(
                                "field {} has type OID {} but {} was expected",
                                i + 1,
                                field.oid,
                                expected
                            ))),
                            _ => Ok(match field.value {
                                Some(bytes) => RawValue::binary(bytes),
                                None => RawValue::Null,
                            }),
                        }
                    })
                    .collect()
            }
        }
    }
}
