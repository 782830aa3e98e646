use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use rust_decimal::Decimal;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::types::Category;

/// A coerced value. Built-in defaults land in the typed variants, caller
/// overrides land in `Custom`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL, remembering whether it stood for a scalar, an array or a row
    Null(Category),
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Oid(u32),
    Float4(f32),
    Float8(f64),
    Numeric(Decimal),
    Money(Decimal),
    Text(String),
    Bytea(Vec<u8>),
    Uuid(Uuid),
    Json(serde_json::Value),
    Date(NaiveDate),
    Time(NaiveTime),
    TimeTz(NaiveTime, FixedOffset),
    Timestamp(NaiveDateTime),
    Timestamptz(DateTime<Utc>),
    Interval(Interval),
    Sequence(Vec<Value>),
    Record(Record),
    Custom(CustomValue),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    pub fn category(&self) -> Category {
        match self {
            Value::Null(category) => *category,
            Value::Sequence(_) => Category::Sequence,
            Value::Record(_) => Category::Record,
            _ => Category::Scalar,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int2(v) => Some(i64::from(*v)),
            Value::Int4(v) => Some(i64::from(*v)),
            Value::Int8(v) => Some(*v),
            Value::Oid(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Borrow the object an override produced, if it is a `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Custom(custom) => custom.downcast_ref(),
            _ => None,
        }
    }

    /// The text the server would send for this scalar in text format.
    /// `None` for NULL, arrays, composites and override-built objects.
    pub fn to_pg_text(&self) -> Option<String> {
        let text = match self {
            Value::Bool(b) => if *b { "t" } else { "f" }.to_string(),
            Value::Int2(v) => v.to_string(),
            Value::Int4(v) => v.to_string(),
            Value::Int8(v) => v.to_string(),
            Value::Oid(v) => v.to_string(),
            Value::Float4(v) => float_text(f64::from(*v), v.to_string()),
            Value::Float8(v) => float_text(*v, v.to_string()),
            Value::Numeric(d) => d.to_string(),
            Value::Money(d) => money_text(d),
            Value::Text(s) => s.clone(),
            Value::Bytea(bytes) => format!("\\x{}", hex::encode(bytes)),
            Value::Uuid(u) => u.to_string(),
            Value::Json(json) => json.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Time(t) => clock_text(t),
            Value::TimeTz(t, offset) => format!("{}{}", clock_text(t), offset_text(offset)),
            Value::Timestamp(ts) => format!("{} {}", ts.date().format("%Y-%m-%d"), clock_text(&ts.time())),
            Value::Timestamptz(ts) => {
                let naive = ts.naive_utc();
                format!("{} {}+00", naive.date().format("%Y-%m-%d"), clock_text(&naive.time()))
            }
            Value::Interval(interval) => interval.to_string(),
            Value::Null(_) | Value::Sequence(_) | Value::Record(_) | Value::Custom(_) => return None,
        };
        Some(text)
    }
}

fn float_text(value: f64, rendered: String) -> String {
    if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        rendered
    }
}

fn clock_text(time: &NaiveTime) -> String {
    let mut text = time.format("%H:%M:%S").to_string();
    let micros = (time.nanosecond() / 1_000).min(999_999);
    if micros != 0 {
        let frac = format!("{micros:06}");
        text.push('.');
        text.push_str(frac.trim_end_matches('0'));
    }
    text
}

fn offset_text(offset: &FixedOffset) -> String {
    let east = offset.local_minus_utc();
    let sign = if east < 0 { '-' } else { '+' };
    let east = east.unsigned_abs();
    let (hours, minutes, seconds) = (east / 3600, (east / 60) % 60, east % 60);
    match (minutes, seconds) {
        (0, 0) => format!("{sign}{hours:02}"),
        (_, 0) => format!("{sign}{hours:02}:{minutes:02}"),
        _ => format!("{sign}{hours:02}:{minutes:02}:{seconds:02}"),
    }
}

fn money_text(amount: &Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let plain = format!("{:.2}", rounded.abs());
    let (whole, cents) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{}${grouped}.{cents}", if negative { "-" } else { "" })
}

/// Ordered field name to value mapping produced for a composite
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: Value) {
        self.fields.push((name.into(), value));
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Positional access, 0-based
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.fields.get(index).map(|(_, v)| v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn into_values(self) -> Vec<Value> {
        self.fields.into_iter().map(|(_, v)| v).collect()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// PostgreSQL interval: months and days are kept apart from the clock part
/// because their length depends on the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Interval {
    pub months: i32,
    pub days: i32,
    pub microseconds: i64,
}

impl Interval {
    pub fn new(months: i32, days: i32, microseconds: i64) -> Self {
        Self {
            months,
            days,
            microseconds,
        }
    }
}

impl fmt::Display for Interval {
    /// Renders in the `postgres` IntervalStyle
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        let years = self.months / 12;
        let months = self.months % 12;
        if years != 0 {
            parts.push(format!("{years} year{}", if years == 1 { "" } else { "s" }));
        }
        if months != 0 {
            parts.push(format!("{months} mon{}", if months == 1 { "" } else { "s" }));
        }
        if self.days != 0 {
            parts.push(format!("{} day{}", self.days, if self.days == 1 { "" } else { "s" }));
        }
        if self.microseconds != 0 || parts.is_empty() {
            let sign = if self.microseconds < 0 { "-" } else { "" };
            let total = self.microseconds.unsigned_abs();
            let hours = total / 3_600_000_000;
            let minutes = (total / 60_000_000) % 60;
            let seconds = (total / 1_000_000) % 60;
            let micros = total % 1_000_000;
            let mut clock = format!("{sign}{hours:02}:{minutes:02}:{seconds:02}");
            if micros != 0 {
                let frac = format!("{micros:06}");
                clock.push('.');
                clock.push_str(frac.trim_end_matches('0'));
            }
            parts.push(clock);
        }
        f.write_str(&parts.join(" "))
    }
}

/// Object-safe view of whatever an override factory produced.
///
/// Implemented for every `Debug + PartialEq + Send + Sync + 'static` type, so
/// factories can return plain Rust values.
pub trait CustomObject: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn eq_dyn(&self, other: &dyn CustomObject) -> bool;
}

impl<T> CustomObject for T
where
    T: Any + fmt::Debug + PartialEq + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_dyn(&self, other: &dyn CustomObject) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }
}

/// An override-constructed object, tagged with the target type that built it
#[derive(Debug, Clone)]
pub struct CustomValue {
    target: Arc<str>,
    object: Arc<dyn CustomObject>,
}

impl CustomValue {
    pub fn new<T: CustomObject>(target: impl Into<Arc<str>>, object: T) -> Self {
        Self {
            target: target.into(),
            object: Arc::new(object),
        }
    }

    /// Name of the target type whose factory produced this object
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.object.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }
}

impl PartialEq for CustomValue {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target && self.object.eq_dyn(other.object.as_ref())
    }
}
