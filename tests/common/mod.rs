use bytes::{BufMut, Bytes, BytesMut};
use pgcoerce::{PgType, TypeDescriptor};

/// Binary int4 payload
#[allow(dead_code)]
pub fn int4(value: i32) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

/// Binary inet payload for an IPv4 address
#[allow(dead_code)]
pub fn inet4(addr: [u8; 4], bits: u8) -> Vec<u8> {
    let mut buf = vec![2, bits, 0, 4];
    buf.extend_from_slice(&addr);
    buf
}

/// Binary array payload with lower bounds of 1
#[allow(dead_code)]
pub fn binary_array(element_oid: u32, dims: &[i32], elements: &[Option<Vec<u8>>]) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_i32(dims.len() as i32);
    buf.put_i32(i32::from(elements.iter().any(Option::is_none)));
    buf.put_u32(element_oid);
    for len in dims {
        buf.put_i32(*len);
        buf.put_i32(1);
    }
    for element in elements {
        put_value(&mut buf, element.as_deref());
    }
    buf.freeze()
}

/// Binary record payload from (field type OID, payload) pairs
#[allow(dead_code)]
pub fn binary_record(fields: &[(u32, Option<Vec<u8>>)]) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_i32(fields.len() as i32);
    for (oid, value) in fields {
        buf.put_u32(*oid);
        put_value(&mut buf, value.as_deref());
    }
    buf.freeze()
}

fn put_value(buf: &mut BytesMut, value: Option<&[u8]>) {
    match value {
        Some(bytes) => {
            buf.put_i32(bytes.len() as i32);
            buf.put_slice(bytes);
        }
        None => buf.put_i32(-1),
    }
}

/// `CREATE TYPE address AS (street text, city text, zip int4)`
#[allow(dead_code)]
pub fn address_type() -> TypeDescriptor {
    TypeDescriptor::composite(
        "address",
        [
            ("street", TypeDescriptor::builtin(PgType::Text)),
            ("city", TypeDescriptor::builtin(PgType::Text)),
            ("zip", TypeDescriptor::builtin(PgType::Int4)),
        ],
    )
}

/// `CREATE TYPE mood AS ENUM ('sad', 'ok', 'happy')`
#[allow(dead_code)]
pub fn mood_type() -> TypeDescriptor {
    TypeDescriptor::enumeration("mood", ["sad", "ok", "happy"])
}
