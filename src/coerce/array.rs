use std::borrow::Cow;

use super::{payload_format, Coercer};
use crate::codec::{BinaryDecoder, TextDecoder};
use crate::error::{CoercionError, Result};
use crate::types::{Format, RawScalar, RawValue, TypeDescriptor, TypeMap, Value};

impl Coercer {
    pub(super) fn coerce_array(
        &self,
        raw: &RawValue,
        descriptor: &TypeDescriptor,
        element: &TypeDescriptor,
        type_map: &TypeMap,
    ) -> Result<Value> {
        let items: Cow<'_, [RawValue]> = match raw {
            RawValue::Sequence(items) => Cow::Borrowed(items.as_slice()),
            RawValue::Scalar(scalar) => Cow::Owned(self.split_array(descriptor, element, scalar)?),
            RawValue::Record(_) => {
                return Err(CoercionError::decode(
                    &descriptor.to_string(),
                    payload_format(raw),
                    "expected an array, got a composite",
                ));
            }
            RawValue::Null => return Ok(Value::Null(descriptor.category())),
        };

        self.coerce_elements(&items, element, type_map.nested())
            .map(Value::Sequence)
    }

    /// Coerce elements in order. A nested `Sequence` under a non-array element
    /// type is another dimension of the same array, so it recurses here
    /// rather than being treated as an element value.
    fn coerce_elements(&self, items: &[RawValue], element: &TypeDescriptor, type_map: &TypeMap) -> Result<Vec<Value>> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let value = match item {
                    RawValue::Sequence(inner) if element.element().is_none() => {
                        self.coerce_elements(inner, element, type_map).map(Value::Sequence)
                    }
                    _ => self.coerce(item, element, type_map),
                };
                value.map_err(|e| e.at_element(i + 1))
            })
            .collect()
    }

    fn split_array(&self, descriptor: &TypeDescriptor, element: &TypeDescriptor, scalar: &RawScalar) -> Result<Vec<RawValue>> {
        let max_dimensions = self.config.max_array_dimensions;
        let malformed = |message: String| CoercionError::decode(&descriptor.to_string(), scalar.format(), message);

        match scalar.format() {
            Format::Text => {
                let literal = scalar.as_str().map_err(|e| malformed(e.to_string()))?;
                TextDecoder::parse_array(literal, b',', max_dimensions).map_err(malformed)
            }
            Format::Binary => {
                let array = BinaryDecoder::decode_array(scalar.payload()).map_err(malformed)?;
                if array.dimensions.len() > max_dimensions {
                    return Err(malformed(format!(
                        "number of array dimensions ({}) exceeds the maximum allowed ({max_dimensions})",
                        array.dimensions.len()
                    )));
                }
                if let Some(expected) = element.pg_type().map(|t| t.to_oid()) {
                    if array.element_oid != 0 && array.element_oid != expected {
                        return Err(malformed(format!(
                            "array element type OID {} does not match {} ({expected})",
                            array.element_oid,
                            element.name()
                        )));
                    }
                }
                Ok(array.into_raw_elements())
            }
        }
    }
}
