//! Utility functions for PostgreSQL date/time values in both wire formats
use byteorder::{BigEndian, ByteOrder};
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};

use crate::types::Interval;

/// Days from 0001-01-01 (CE day 1) to 2000-01-01, where PostgreSQL binary
/// date/time values count from
const PG_EPOCH_DAYS_FROM_CE: i32 = 730_120;

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_MINUTE: i64 = 60 * MICROS_PER_SECOND;
const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MINUTE;

fn pg_epoch_date() -> NaiveDate {
    NaiveDate::from_num_days_from_ce_opt(PG_EPOCH_DAYS_FROM_CE).unwrap_or_default()
}

fn pg_epoch() -> NaiveDateTime {
    pg_epoch_date().and_time(NaiveTime::MIN)
}

fn expect_len(bytes: &[u8], len: usize, what: &str) -> Result<(), String> {
    if bytes.len() == len {
        Ok(())
    } else {
        Err(format!("{what} must be {len} bytes, got {}", bytes.len()))
    }
}

/// Binary DATE: int4 days since 2000-01-01
pub fn decode_date(bytes: &[u8]) -> Result<NaiveDate, String> {
    expect_len(bytes, 4, "date")?;
    let days = BigEndian::read_i32(bytes);
    if days == i32::MAX || days == i32::MIN {
        return Err("infinite date is not representable".to_string());
    }
    pg_epoch_date()
        .checked_add_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| format!("date out of range: {days} days from 2000-01-01"))
}

/// Binary TIME: int8 microseconds since midnight
pub fn decode_time(bytes: &[u8]) -> Result<NaiveTime, String> {
    expect_len(bytes, 8, "time")?;
    micros_to_time(BigEndian::read_i64(bytes))
}

/// Binary TIMETZ: int8 microseconds since midnight, then int4 zone offset in
/// seconds west of UTC
pub fn decode_timetz(bytes: &[u8]) -> Result<(NaiveTime, FixedOffset), String> {
    expect_len(bytes, 12, "timetz")?;
    let time = micros_to_time(BigEndian::read_i64(&bytes[0..8]))?;
    let zone = BigEndian::read_i32(&bytes[8..12]);
    let offset = FixedOffset::west_opt(zone).ok_or_else(|| format!("invalid time zone offset: {zone}"))?;
    Ok((time, offset))
}

/// Binary TIMESTAMP: int8 microseconds since 2000-01-01 00:00:00
pub fn decode_timestamp(bytes: &[u8]) -> Result<NaiveDateTime, String> {
    expect_len(bytes, 8, "timestamp")?;
    let micros = BigEndian::read_i64(bytes);
    if micros == i64::MAX || micros == i64::MIN {
        return Err("infinite timestamp is not representable".to_string());
    }
    pg_epoch()
        .checked_add_signed(Duration::microseconds(micros))
        .ok_or_else(|| format!("timestamp out of range: {micros} microseconds from 2000-01-01"))
}

/// Binary TIMESTAMPTZ: same layout as TIMESTAMP, always UTC
pub fn decode_timestamptz(bytes: &[u8]) -> Result<DateTime<Utc>, String> {
    decode_timestamp(bytes).map(|naive| naive.and_utc())
}

/// Binary INTERVAL: int8 microseconds, int4 days, int4 months
pub fn decode_interval(bytes: &[u8]) -> Result<Interval, String> {
    expect_len(bytes, 16, "interval")?;
    Ok(Interval::new(
        BigEndian::read_i32(&bytes[12..16]),
        BigEndian::read_i32(&bytes[8..12]),
        BigEndian::read_i64(&bytes[0..8]),
    ))
}

fn micros_to_time(micros: i64) -> Result<NaiveTime, String> {
    if !(0..24 * MICROS_PER_HOUR).contains(&micros) {
        return Err(format!("time out of range: {micros} microseconds"));
    }
    let seconds = (micros / MICROS_PER_SECOND) as u32;
    let nanos = ((micros % MICROS_PER_SECOND) * 1000) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, nanos)
        .ok_or_else(|| format!("time out of range: {micros} microseconds"))
}

/// Parse DATE text output (ISO DateStyle), including the ` BC` suffix
pub fn parse_date(date_str: &str) -> Option<NaiveDate> {
    let trimmed = date_str.trim();
    match trimmed.strip_suffix(" BC") {
        Some(body) => {
            let date = NaiveDate::parse_from_str(body, "%Y-%m-%d").ok()?;
            // 1 BC is astronomical year 0
            NaiveDate::from_ymd_opt(1 - date.year(), date.month(), date.day())
        }
        None => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok(),
    }
}

/// Parse TIME text output
pub fn parse_time(time_str: &str) -> Option<NaiveTime> {
    let formats = [
        "%H:%M:%S%.f", // HH:MM:SS.ffffff
        "%H:%M:%S",    // HH:MM:SS
        "%H:%M",       // HH:MM
    ];

    let trimmed = time_str.trim();
    formats
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
}

/// Parse TIMETZ text output, e.g. `04:05:06.789-08` or `04:05:06+05:30`
pub fn parse_timetz(value: &str) -> Option<(NaiveTime, FixedOffset)> {
    let trimmed = value.trim();
    let split = trimmed.rfind(['+', '-'])?;
    let time = parse_time(&trimmed[..split])?;
    let offset = parse_offset(&trimmed[split..])?;
    Some((time, offset))
}

/// Parse TIMESTAMP text output (ISO DateStyle)
pub fn parse_timestamp(timestamp_str: &str) -> Option<NaiveDateTime> {
    let formats = [
        "%Y-%m-%d %H:%M:%S%.f", // YYYY-MM-DD HH:MM:SS.ffffff
        "%Y-%m-%d %H:%M:%S",    // YYYY-MM-DD HH:MM:SS
        "%Y-%m-%dT%H:%M:%S%.f", // ISO format with T
        "%Y-%m-%dT%H:%M:%S",    // ISO format with T
    ];

    let trimmed = timestamp_str.trim();
    let (body, bc) = match trimmed.strip_suffix(" BC") {
        Some(body) => (body, true),
        None => (trimmed, false),
    };

    let parsed = formats
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(body, format).ok())?;
    if bc {
        let date = NaiveDate::from_ymd_opt(1 - parsed.year(), parsed.month(), parsed.day())?;
        Some(date.and_time(parsed.time()))
    } else {
        Some(parsed)
    }
}

/// Parse TIMESTAMPTZ text output such as `2024-03-01 12:00:00.5+02`.
/// The session's zone offset is applied and the result normalized to UTC.
pub fn parse_timestamptz(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    // The date part contains '-' too, so only look past it
    let time_start = trimmed.find([' ', 'T'])?;
    let split = time_start + trimmed[time_start..].rfind(['+', '-'])?;
    let naive = parse_timestamp(&trimmed[..split])?;
    let offset = parse_offset(&trimmed[split..])?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a numeric zone offset: `+HH`, `-HH:MM` or `+HH:MM:SS`
fn parse_offset(offset: &str) -> Option<FixedOffset> {
    let (sign, body) = match offset.as_bytes().first()? {
        b'+' => (1, &offset[1..]),
        b'-' => (-1, &offset[1..]),
        _ => return None,
    };
    let mut parts = body.split(':');
    let hours: i32 = parts.next()?.parse().ok()?;
    let minutes: i32 = parts.next().map(str::parse::<i32>).transpose().ok()?.unwrap_or(0);
    let seconds: i32 = parts.next().map(str::parse::<i32>).transpose().ok()?.unwrap_or(0);
    if parts.next().is_some() || !(0..60).contains(&minutes) || !(0..60).contains(&seconds) {
        return None;
    }
    let total = hours
        .checked_mul(3600)?
        .checked_add(minutes * 60)?
        .checked_add(seconds)?;
    FixedOffset::east_opt(total.checked_mul(sign)?)
}

/// Parse INTERVAL text output in the `postgres` style
/// (`1 year 2 mons -3 days 04:05:06.5`) or ISO 8601 (`P1Y2M3DT4H5M6.5S`).
pub fn parse_interval(value: &str) -> Option<Interval> {
    let trimmed = value.trim();
    if let Some(iso) = trimmed.strip_prefix('P') {
        return parse_iso_interval(iso);
    }

    let mut interval = Interval::default();
    let mut tokens = trimmed.split_whitespace();
    let mut seen = false;
    while let Some(token) = tokens.next() {
        seen = true;
        if token.contains(':') {
            interval.microseconds = interval.microseconds.checked_add(parse_clock(token)?)?;
            continue;
        }
        let amount: i32 = token.parse().ok()?;
        let unit = tokens.next()?;
        match unit.trim_end_matches('s') {
            "year" => interval.months = interval.months.checked_add(amount.checked_mul(12)?)?,
            "mon" => interval.months = interval.months.checked_add(amount)?,
            "day" => interval.days = interval.days.checked_add(amount)?,
            _ => return None,
        }
    }
    seen.then_some(interval)
}

/// `[+-]HH:MM[:SS[.ffffff]]` to signed microseconds
fn parse_clock(token: &str) -> Option<i64> {
    let (negative, body) = match token.as_bytes().first()? {
        b'-' => (true, &token[1..]),
        b'+' => (false, &token[1..]),
        _ => (false, token),
    };
    let mut parts = body.split(':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let micros = match parts.next() {
        Some(seconds) => parse_seconds(seconds)?,
        None => 0,
    };
    if parts.next().is_some() {
        return None;
    }
    let total = hours
        .checked_mul(MICROS_PER_HOUR)?
        .checked_add(minutes.checked_mul(MICROS_PER_MINUTE)?)?
        .checked_add(micros)?;
    if negative { total.checked_neg() } else { Some(total) }
}

/// `SS[.ffffff]` to microseconds, rounding past microsecond precision away
fn parse_seconds(seconds: &str) -> Option<i64> {
    let (whole, frac) = match seconds.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (seconds, ""),
    };
    let whole: i64 = whole.parse().ok()?;
    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut frac_digits: String = frac.chars().take(6).collect();
    while frac_digits.len() < 6 {
        frac_digits.push('0');
    }
    let frac: i64 = frac_digits.parse().ok()?;
    whole.checked_mul(MICROS_PER_SECOND)?.checked_add(frac)
}

fn parse_iso_interval(body: &str) -> Option<Interval> {
    let mut interval = Interval::default();
    let mut in_time = false;
    let mut number = String::new();
    for c in body.chars() {
        match c {
            'T' if number.is_empty() => in_time = true,
            '0'..='9' | '.' | '-' => number.push(c),
            unit => {
                let amount = std::mem::take(&mut number);
                match (in_time, unit) {
                    (false, 'Y') => {
                        let years = amount.parse::<i32>().ok()?;
                        interval.months = interval.months.checked_add(years.checked_mul(12)?)?;
                    }
                    (false, 'M') => {
                        interval.months = interval.months.checked_add(amount.parse().ok()?)?;
                    }
                    (false, 'W') => {
                        let weeks = amount.parse::<i32>().ok()?;
                        interval.days = interval.days.checked_add(weeks.checked_mul(7)?)?;
                    }
                    (false, 'D') => {
                        interval.days = interval.days.checked_add(amount.parse().ok()?)?;
                    }
                    (true, 'H') | (true, 'M') | (true, 'S') => {
                        let micros = match unit {
                            'H' => amount.parse::<i64>().ok()?.checked_mul(MICROS_PER_HOUR)?,
                            'M' => amount.parse::<i64>().ok()?.checked_mul(MICROS_PER_MINUTE)?,
                            _ => match amount.strip_prefix('-') {
                                Some(positive) => parse_seconds(positive)?.checked_neg()?,
                                None => parse_seconds(&amount)?,
                            },
                        };
                        interval.microseconds = interval.microseconds.checked_add(micros)?;
                    }
                    _ => return None,
                }
            }
        }
    }
    number.is_empty().then_some(interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_binary_date() {
        assert_eq!(decode_date(&0i32.to_be_bytes()).unwrap(), NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
        assert_eq!(
            decode_date(&(-10957i32).to_be_bytes()).unwrap(),
            NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
        );
        assert!(decode_date(&i32::MAX.to_be_bytes()).is_err());
        assert!(decode_date(&[0, 0]).is_err());
    }

    #[test]
    fn test_binary_timestamp_and_time() {
        let micros: i64 = 86_400 * MICROS_PER_SECOND + 1_500_000;
        let ts = decode_timestamp(&micros.to_be_bytes()).unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2000, 1, 2).unwrap());
        assert_eq!(ts.time().second(), 1);
        assert_eq!(ts.time().nanosecond(), 500_000_000);

        let time = decode_time(&(3 * MICROS_PER_HOUR).to_be_bytes()).unwrap();
        assert_eq!(time.hour(), 3);
        assert!(decode_time(&(25 * MICROS_PER_HOUR).to_be_bytes()).is_err());
    }

    #[test]
    fn test_binary_timetz_offset_is_west_positive() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(12 * MICROS_PER_HOUR).to_be_bytes());
        bytes.extend_from_slice(&(-7200i32).to_be_bytes());
        let (time, offset) = decode_timetz(&bytes).unwrap();
        assert_eq!(time.hour(), 12);
        assert_eq!(offset.local_minus_utc(), 7200);
    }

    #[test]
    fn test_binary_interval() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&5_000_000i64.to_be_bytes());
        bytes.extend_from_slice(&3i32.to_be_bytes());
        bytes.extend_from_slice(&14i32.to_be_bytes());
        assert_eq!(decode_interval(&bytes).unwrap(), Interval::new(14, 3, 5_000_000));
    }

    #[test]
    fn test_text_dates_and_times() {
        assert_eq!(parse_date("2024-02-29"), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(parse_date("0044-03-15 BC").map(|d| d.year()), Some(-43));
        assert!(parse_date("2024-02-30").is_none());
        assert_eq!(parse_time("13:14:15.5").map(|t| t.nanosecond()), Some(500_000_000));

        let (time, offset) = parse_timetz("04:05:06-08").unwrap();
        assert_eq!(time, NaiveTime::from_hms_opt(4, 5, 6).unwrap());
        assert_eq!(offset.local_minus_utc(), -8 * 3600);
        assert_eq!(parse_timetz("04:05:06+05:30").map(|(_, o)| o.local_minus_utc()), Some(19800));
    }

    #[test]
    fn test_text_timestamptz_normalizes_to_utc() {
        let ts = parse_timestamptz("2024-03-01 12:00:00.25+02").unwrap();
        assert_eq!(ts.hour(), 10);
        assert_eq!(ts.nanosecond(), 250_000_000);
        let ts = parse_timestamptz("2024-03-01 12:00:00-03:30").unwrap();
        assert_eq!((ts.hour(), ts.minute()), (15, 30));
        assert!(parse_timestamptz("2024-03-01 12:00:00").is_none());
    }

    #[test]
    fn test_text_interval() {
        assert_eq!(
            parse_interval("1 year 2 mons 3 days 04:05:06.5"),
            Some(Interval::new(14, 3, 14_706_500_000))
        );
        assert_eq!(parse_interval("-1 days +02:00:00"), Some(Interval::new(0, -1, 2 * MICROS_PER_HOUR)));
        assert_eq!(parse_interval("00:00:00"), Some(Interval::default()));
        assert_eq!(parse_interval("P1Y2M3DT4H5M6.5S"), Some(Interval::new(14, 3, 14_706_500_000)));
        assert!(parse_interval("3 fortnights").is_none());
        assert!(parse_interval("").is_none());
    }

    #[test]
    fn test_oversized_text_fields_are_rejected() {
        assert!(parse_timetz("10:00:00+99999999").is_none());
        assert!(parse_timetz("10:00:00+05:-99999999").is_none());
        assert!(parse_timestamptz("2024-03-01 12:00:00-99999999").is_none());
        assert!(parse_interval("00:999999999999999").is_none());
        assert!(parse_interval("-9999999999:00:00").is_none());
        assert!(parse_interval("99999999999 days").is_none());
        assert!(parse_interval("PT999999999999999M").is_none());
        assert!(parse_interval("PT-99999999999999999S").is_none());
    }
}
