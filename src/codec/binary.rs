use bytes::{Buf, Bytes};
use postgres_protocol::types as pg_types;
use uuid::Uuid;

use crate::types::{Oid, RawValue};

/// One dimension of a binary array header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayDimension {
    pub len: i32,
    pub lower_bound: i32,
}

/// A binary-format array split into its header and element payloads.
/// Element payloads share the buffer they were sliced from.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryArray {
    pub element_oid: Oid,
    pub has_nulls: bool,
    pub dimensions: Vec<ArrayDimension>,
    pub elements: Vec<Option<Bytes>>,
}

impl BinaryArray {
    /// Element payloads as raw values, nested one `Sequence` per extra
    /// dimension in row-major order
    pub fn into_raw_elements(self) -> Vec<RawValue> {
        let mut elements = self.elements.into_iter();
        nest(&mut elements, &self.dimensions)
    }
}

fn nest(elements: &mut std::vec::IntoIter<Option<Bytes>>, dims: &[ArrayDimension]) -> Vec<RawValue> {
    match dims.split_first() {
        None => Vec::new(),
        Some((first, [])) => elements
            .by_ref()
            .take(first.len as usize)
            .map(|element| match element {
                Some(bytes) => RawValue::binary(bytes),
                None => RawValue::Null,
            })
            .collect(),
        Some((first, rest)) => (0..first.len)
            .map(|_| RawValue::Sequence(nest(elements, rest)))
            .collect(),
    }
}

/// One field of a binary-format composite
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryField {
    pub oid: Oid,
    pub value: Option<Bytes>,
}

/// Binary format decoders for PostgreSQL types
pub struct BinaryDecoder;

impl BinaryDecoder {
    /// Decode a boolean value (OID 16)
    #[inline]
    pub fn decode_bool(bytes: &[u8]) -> Result<bool, String> {
        pg_types::bool_from_sql(bytes).map_err(|e| e.to_string())
    }

    /// Decode an int2/smallint value (OID 21)
    #[inline]
    pub fn decode_int2(bytes: &[u8]) -> Result<i16, String> {
        pg_types::int2_from_sql(bytes).map_err(|e| e.to_string())
    }

    /// Decode an int4/integer value (OID 23)
    #[inline]
    pub fn decode_int4(bytes: &[u8]) -> Result<i32, String> {
        pg_types::int4_from_sql(bytes).map_err(|e| e.to_string())
    }

    /// Decode an int8/bigint value (OID 20)
    #[inline]
    pub fn decode_int8(bytes: &[u8]) -> Result<i64, String> {
        pg_types::int8_from_sql(bytes).map_err(|e| e.to_string())
    }

    /// Decode an oid value (OID 26)
    #[inline]
    pub fn decode_oid(bytes: &[u8]) -> Result<u32, String> {
        pg_types::oid_from_sql(bytes).map_err(|e| e.to_string())
    }

    /// Decode a float4/real value (OID 700)
    #[inline]
    pub fn decode_float4(bytes: &[u8]) -> Result<f32, String> {
        pg_types::float4_from_sql(bytes).map_err(|e| e.to_string())
    }

    /// Decode a float8/double precision value (OID 701)
    #[inline]
    pub fn decode_float8(bytes: &[u8]) -> Result<f64, String> {
        pg_types::float8_from_sql(bytes).map_err(|e| e.to_string())
    }

    /// Decode text-like values (text, varchar, bpchar, name, xml).
    /// Binary format is the same as text format for these types
    #[inline]
    pub fn decode_text(bytes: &[u8]) -> Result<String, String> {
        pg_types::text_from_sql(bytes)
            .map(str::to_string)
            .map_err(|e| e.to_string())
    }

    /// Decode a "char" value (OID 18): a single byte
    pub fn decode_char(bytes: &[u8]) -> Result<String, String> {
        match bytes {
            [] => Ok(String::new()),
            [b] if b.is_ascii() => Ok(char::from(*b).to_string()),
            // Non-ASCII bytes come out of char_out in octal
            [b] => Ok(format!("\\{b:03o}")),
            _ => Err(format!("\"char\" must be at most 1 byte, got {}", bytes.len())),
        }
    }

    /// Decode a UUID value (OID 2950): 16 raw bytes
    pub fn decode_uuid(bytes: &[u8]) -> Result<Uuid, String> {
        pg_types::uuid_from_sql(bytes)
            .map(Uuid::from_bytes)
            .map_err(|e| e.to_string())
    }

    /// Decode a json value (OID 114), sent as plain JSON text
    pub fn decode_json(bytes: &[u8]) -> Result<serde_json::Value, String> {
        serde_json::from_slice(bytes).map_err(|e| format!("Invalid JSON: {e}"))
    }

    /// Decode a jsonb value (OID 3802): a version byte followed by JSON text
    pub fn decode_jsonb(bytes: &[u8]) -> Result<serde_json::Value, String> {
        match bytes.split_first() {
            Some((1, json)) => Self::decode_json(json),
            Some((version, _)) => Err(format!("Unsupported jsonb version: {version}")),
            None => Err("jsonb value is empty".to_string()),
        }
    }

    /// Split a binary array: ndim, flags, element OID, (len, lower bound)
    /// per dimension, then length-prefixed elements with -1 for NULL
    pub fn decode_array(payload: &Bytes) -> Result<BinaryArray, String> {
        let mut buf = payload.clone();

        let ndim = take_i32(&mut buf, "dimension count")?;
        if ndim < 0 {
            return Err(format!("Invalid number of dimensions: {ndim}"));
        }
        let flags = take_i32(&mut buf, "flags")?;
        if flags != 0 && flags != 1 {
            return Err(format!("Invalid array flags: {flags}"));
        }
        let element_oid = take_i32(&mut buf, "element type")? as Oid;

        let ndim = ndim as usize;
        if buf.remaining() < ndim * 8 {
            return Err(format!("Array header truncated: {ndim} dimensions declared"));
        }

        let mut dimensions = Vec::with_capacity(ndim);
        let mut count: usize = if ndim == 0 { 0 } else { 1 };
        for _ in 0..ndim {
            let len = take_i32(&mut buf, "dimension length")?;
            let lower_bound = take_i32(&mut buf, "lower bound")?;
            if len < 0 {
                return Err(format!("Invalid array dimension length: {len}"));
            }
            count = count
                .checked_mul(len as usize)
                .ok_or_else(|| "Array size exceeds the maximum allowed".to_string())?;
            dimensions.push(ArrayDimension { len, lower_bound });
        }

        // Every element needs at least its 4-byte length word
        if count > buf.remaining() / 4 {
            return Err(format!("Array declares {count} elements but the payload is too short"));
        }
        let has_nulls = flags == 1;
        let mut elements = Vec::with_capacity(count);
        for i in 0..count {
            let value = take_value(&mut buf)?;
            if value.is_none() && !has_nulls {
                return Err(format!("NULL array element {} but the null flag is not set", i + 1));
            }
            elements.push(value);
        }
        if buf.has_remaining() {
            return Err(format!("{} trailing bytes after array elements", buf.remaining()));
        }
        // Any zero-length dimension makes the whole array empty
        if count == 0 {
            dimensions.clear();
        }

        Ok(BinaryArray {
            element_oid,
            has_nulls,
            dimensions,
            elements,
        })
    }

    /// Split a binary record: field count, then OID and length-prefixed
    /// data per field with -1 for NULL
    pub fn decode_record(payload: &Bytes) -> Result<Vec<BinaryField>, String> {
        let mut buf = payload.clone();

        let nfields = take_i32(&mut buf, "field count")?;
        if nfields < 0 {
            return Err(format!("Invalid number of fields: {nfields}"));
        }
        let nfields = nfields as usize;
        if nfields > buf.remaining() / 8 {
            return Err(format!("Record declares {nfields} fields but the payload is too short"));
        }

        let mut fields = Vec::with_capacity(nfields);
        for _ in 0..nfields {
            let oid = take_i32(&mut buf, "field type")? as Oid;
            let value = take_value(&mut buf)?;
            fields.push(BinaryField { oid, value });
        }
        if buf.has_remaining() {
            return Err(format!("{} trailing bytes after record fields", buf.remaining()));
        }

        Ok(fields)
    }
}

fn take_i32(buf: &mut Bytes, what: &str) -> Result<i32, String> {
    if buf.remaining() < 4 {
        return Err(format!("Unexpected end of data reading {what}"));
    }
    Ok(buf.get_i32())
}

fn take_value(buf: &mut Bytes) -> Result<Option<Bytes>, String> {
    let len = take_i32(buf, "value length")?;
    match len {
        -1 => Ok(None),
        len if len < 0 => Err(format!("Invalid value length: {len}")),
        len if len as usize > buf.remaining() => Err(format!(
            "Value length {len} exceeds the {} bytes left",
            buf.remaining()
        )),
        len => Ok(Some(buf.split_to(len as usize))),
    }
}
