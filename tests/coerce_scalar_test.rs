mod common;

use chrono::{NaiveDate, TimeZone, Utc};
use pgcoerce::{
    coerce, Category, Coercer, ErrorKind, Interval, PgType, RawScalar, RawValue, TargetType,
    TypeDescriptor, TypeMap, Value,
};
use rust_decimal::Decimal;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{inet4, int4, mood_type};

fn builtin(pg_type: PgType) -> TypeDescriptor {
    TypeDescriptor::builtin(pg_type)
}

fn inet_map() -> TypeMap {
    TypeMap::new().with("inet", TargetType::from_text::<IpAddr>("IpAddr"))
}

#[test]
fn test_text_and_binary_agree() {
    let map = TypeMap::new();
    let cases: Vec<(PgType, &str, Vec<u8>)> = vec![
        (PgType::Int4, "42", int4(42)),
        (PgType::Int8, "-7", (-7i64).to_be_bytes().to_vec()),
        (PgType::Bool, "t", vec![1]),
        (PgType::Float8, "0.5", 0.5f64.to_be_bytes().to_vec()),
        (PgType::Text, "héllo", "héllo".as_bytes().to_vec()),
        (PgType::Bytea, "\\x0102ff", vec![1, 2, 255]),
        (
            PgType::Uuid,
            "a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11",
            uuid::Uuid::parse_str("a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11")
                .unwrap()
                .as_bytes()
                .to_vec(),
        ),
        (
            PgType::Numeric,
            "12345.678",
            // ndigits 3, weight 1, positive, dscale 3, groups 1 2345 6780
            vec![0, 3, 0, 1, 0, 0, 0, 3, 0, 1, 0x09, 0x29, 0x1a, 0x7c],
        ),
        (PgType::Date, "2000-01-02", 1i32.to_be_bytes().to_vec()),
        (
            PgType::Timestamptz,
            "2000-01-01 01:00:00+01",
            0i64.to_be_bytes().to_vec(),
        ),
        (PgType::Inet, "10.1.2.3", inet4([10, 1, 2, 3], 32)),
        (PgType::Cidr, "10.1.2.0/24", inet4([10, 1, 2, 0], 24)),
    ];

    for (pg_type, text, binary) in cases {
        let descriptor = builtin(pg_type);
        let from_text = coerce(&RawValue::text(text), &descriptor, &map).unwrap();
        let from_binary = coerce(&RawValue::binary(binary), &descriptor, &map).unwrap();
        assert_eq!(from_text, from_binary, "{pg_type} decoded differently per format");
    }
}

#[test]
fn test_default_values() {
    let map = TypeMap::new();
    assert_eq!(
        coerce(&RawValue::text("12.50"), &builtin(PgType::Numeric), &map).unwrap(),
        Value::Numeric(Decimal::from_str("12.50").unwrap())
    );
    assert_eq!(
        coerce(&RawValue::text("2024-03-01 12:00:00+02"), &builtin(PgType::Timestamptz), &map).unwrap(),
        Value::Timestamptz(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
    );
    assert_eq!(
        coerce(&RawValue::text("1 year 2 mons 3 days 04:05:06"), &builtin(PgType::Interval), &map).unwrap(),
        Value::Interval(Interval::new(14, 3, 14_706_000_000))
    );
    assert_eq!(
        coerce(&RawValue::text("0044-03-15 BC"), &builtin(PgType::Date), &map).unwrap(),
        Value::Date(NaiveDate::from_ymd_opt(-43, 3, 15).unwrap())
    );
    assert_eq!(
        coerce(&RawValue::text("{\"k\": [1, null]}"), &builtin(PgType::Jsonb), &map).unwrap(),
        Value::Json(serde_json::json!({"k": [1, null]}))
    );
}

#[test]
fn test_inet_override_text_format() {
    let value = coerce(&RawValue::text("192.168.0.1"), &builtin(PgType::Inet), &inet_map()).unwrap();

    let Value::Custom(custom) = &value else {
        panic!("expected an override-built value, got {value:?}");
    };
    assert_eq!(custom.target(), "IpAddr");
    assert_eq!(
        value.downcast_ref::<IpAddr>(),
        Some(&"192.168.0.1".parse::<IpAddr>().unwrap())
    );
}

#[test]
fn test_inet_override_binary_format() {
    let raw = RawValue::binary(inet4([10, 0, 0, 7], 32));
    let value = coerce(&raw, &builtin(PgType::Inet), &inet_map()).unwrap();
    assert_eq!(value.downcast_ref::<IpAddr>(), Some(&"10.0.0.7".parse::<IpAddr>().unwrap()));
}

#[test]
fn test_override_is_keyed_by_name_only() {
    // cidr has the same representation but is a different type name
    let value = coerce(&RawValue::text("10.0.0.0/8"), &builtin(PgType::Cidr), &inet_map()).unwrap();
    assert_eq!(value, Value::Text("10.0.0.0/8".to_string()));
}

#[test]
fn test_override_rejection_is_decode_error() {
    let err = coerce(&RawValue::text("10.0.0.0/8"), &builtin(PgType::Inet), &inet_map()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert_eq!(err.sqlstate(), "22P02");
    assert!(err.to_string().contains("IpAddr rejected the value"), "{err}");
}

#[test]
fn test_override_without_matching_constructor() {
    let binary_only = TypeMap::new().with(
        "inet",
        TargetType::binary("InetBytes", |bytes: &[u8]| Ok(bytes.to_vec())),
    );
    let err = coerce(&RawValue::text("10.0.0.1"), &builtin(PgType::Inet), &binary_only).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedTargetType);
    assert_eq!(err.sqlstate(), "0A000");

    let record_only = TypeMap::new().with("int4", TargetType::record("Row", 1, |r: &pgcoerce::Record| Ok(r.len())));
    let err = coerce(&RawValue::text("1"), &builtin(PgType::Int4), &record_only).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedTargetType);
    assert!(!err.is_retryable());
}

#[test]
fn test_binary_override_receives_wire_bytes() {
    let map = TypeMap::new().with(
        "inet",
        TargetType::binary("InetBytes", |bytes: &[u8]| Ok(bytes.to_vec())),
    );
    let payload = inet4([127, 0, 0, 1], 32);
    let value = coerce(&RawValue::binary(payload.clone()), &builtin(PgType::Inet), &map).unwrap();
    assert_eq!(value.downcast_ref::<Vec<u8>>(), Some(&payload));
}

#[test]
fn test_raw_override_sees_format() {
    let map = TypeMap::new().with(
        "int4",
        TargetType::raw("Format", |raw: &RawScalar| Ok(raw.format())),
    );
    let value = coerce(&RawValue::binary(int4(1)), &builtin(PgType::Int4), &map).unwrap();
    assert_eq!(value.downcast_ref::<pgcoerce::Format>(), Some(&pgcoerce::Format::Binary));
}

#[test]
fn test_unknown_type_without_override() {
    let err = coerce(&RawValue::text("a=>1"), &TypeDescriptor::scalar("hstore"), &TypeMap::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoDefaultMapping);
    assert_eq!(err.sqlstate(), "42704");
    assert_eq!(err.to_string(), "no default mapping for type hstore and no override supplied");
}

#[test]
fn test_unknown_binary_type_cannot_feed_text_constructor() {
    let map = TypeMap::new().with("hstore", TargetType::from_text::<String>("String"));
    let err = coerce(&RawValue::binary(vec![0, 0, 0, 0]), &TypeDescriptor::scalar("hstore"), &map).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedTargetType);

    // Text format works without any default
    let value = coerce(&RawValue::text("a=>1"), &TypeDescriptor::scalar("hstore"), &map).unwrap();
    assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("a=>1"));
}

#[test]
fn test_extension_decoder_precedence() {
    let coercer = Coercer::builder()
        .extension("citext", |raw: &RawScalar| {
            raw.as_str()
                .map(|s| Value::Text(s.to_lowercase()))
                .map_err(|e| e.to_string())
        })
        .build();
    let citext = TypeDescriptor::scalar("citext");

    let value = coercer.coerce(&RawValue::text("MiXeD"), &citext, &TypeMap::new()).unwrap();
    assert_eq!(value, Value::Text("mixed".to_string()));

    // An override still wins over the extension
    let map = TypeMap::new().with("citext", TargetType::from_text::<String>("String"));
    let value = coercer.coerce(&RawValue::text("MiXeD"), &citext, &map).unwrap();
    assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("MiXeD"));
}

#[test]
fn test_null_skips_override() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let map = TypeMap::new().with(
        "int4",
        TargetType::text("Counted", move |s: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            s.parse::<i32>().map_err(|e| e.to_string())
        }),
    );

    let value = coerce(&RawValue::Null, &builtin(PgType::Int4), &map).unwrap();
    assert_eq!(value, Value::Null(Category::Scalar));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    coerce(&RawValue::text("5"), &builtin(PgType::Int4), &map).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_enum_labels() {
    let map = TypeMap::new();
    assert_eq!(
        coerce(&RawValue::text("happy"), &mood_type(), &map).unwrap(),
        Value::Text("happy".to_string())
    );
    // Binary enum values are the label bytes
    assert_eq!(
        coerce(&RawValue::binary(&b"sad"[..]), &mood_type(), &map).unwrap(),
        Value::Text("sad".to_string())
    );
    let err = coerce(&RawValue::text("ecstatic"), &mood_type(), &map).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mood {
    Sad,
    Ok,
    Happy,
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sad" => Ok(Mood::Sad),
            "ok" => Ok(Mood::Ok),
            "happy" => Ok(Mood::Happy),
            other => Err(format!("unknown mood {other}")),
        }
    }
}

#[test]
fn test_enum_override() {
    let map = TypeMap::new().with("mood", TargetType::from_text::<Mood>("Mood"));
    let value = coerce(&RawValue::text("ok"), &mood_type(), &map).unwrap();
    assert_eq!(value.downcast_ref::<Mood>(), Some(&Mood::Ok));
    assert_ne!(value.downcast_ref::<Mood>(), Some(&Mood::Sad));
    assert_ne!(value.downcast_ref::<Mood>(), Some(&Mood::Happy));
}

#[test]
fn test_coercion_is_repeatable() {
    let map = inet_map();
    let raw = RawValue::text("::1");
    let first = coerce(&raw, &builtin(PgType::Inet), &map).unwrap();
    let second = coerce(&raw, &builtin(PgType::Inet), &map).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_array_payload_for_scalar_is_rejected() {
    let raw = RawValue::Sequence(vec![RawValue::text("1")]);
    let err = coerce(&raw, &builtin(PgType::Int4), &TypeMap::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[test]
fn test_oversized_text_fields_are_decode_errors() {
    let map = TypeMap::new();
    let cases = [
        (PgType::Timetz, "10:00:00+99999999"),
        (PgType::Timetz, "10:00:00+05:-99999999"),
        (PgType::Timestamptz, "2024-03-01 12:00:00+99999999"),
        (PgType::Interval, "00:999999999999999"),
        (PgType::Interval, "-9999999999:00:00"),
        (PgType::Interval, "2147483647 years"),
        (PgType::Interval, "PT999999999999999M"),
        (PgType::Numeric, "99999999999999999999999999999999999999"),
        (PgType::Numeric, "1e999999999999"),
        (PgType::Money, "$99999999999999999999999999999999999999.00"),
        (PgType::Int4, "99999999999"),
        (PgType::Int2, "40000"),
        (PgType::Date, "99999999-01-01"),
    ];

    for (pg_type, text) in cases {
        let err = coerce(&RawValue::text(text), &builtin(pg_type), &map).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode, "{pg_type} {text:?}");
    }
}

#[test]
fn test_extreme_binary_numeric_is_decode_error() {
    // ndigits 1, weight 32767, positive, dscale 0, one digit group
    let huge = vec![0, 1, 0x7f, 0xff, 0, 0, 0, 0, 0, 1];
    let err = coerce(&RawValue::binary(huge), &builtin(PgType::Numeric), &TypeMap::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);

    // Header claims more digit groups than the payload carries
    let short = vec![0x7f, 0xff, 0, 0, 0, 0, 0, 0, 0, 1];
    let err = coerce(&RawValue::binary(short), &builtin(PgType::Numeric), &TypeMap::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
}
