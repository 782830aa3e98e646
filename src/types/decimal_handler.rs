use byteorder::{BigEndian, ByteOrder};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;
const NBASE_DIGITS: usize = 4;

static MONEY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?[\$€£¥]?-?[0-9][0-9,]*(\.[0-9]+)?$").expect("money pattern is valid")
});

pub struct DecimalHandler;

impl DecimalHandler {
    /// Convert a string to rust_decimal::Decimal
    pub fn parse_decimal(s: &str) -> Result<Decimal, String> {
        match s.trim() {
            "NaN" => Err("NUMERIC NaN is not representable".to_string()),
            "Infinity" | "-Infinity" => Err("infinite NUMERIC is not representable".to_string()),
            trimmed => Decimal::from_str(trimmed)
                .or_else(|_| Decimal::from_scientific(trimmed))
                .map_err(|e| format!("Invalid numeric value: {e}")),
        }
    }

    /// Decode PostgreSQL binary NUMERIC format to rust_decimal
    pub fn decode_numeric(bytes: &[u8]) -> Result<Decimal, String> {
        // PostgreSQL NUMERIC format:
        // - ndigits (int16): number of digit groups
        // - weight (int16): weight of first digit group (in base NBASE)
        // - sign (int16): NUMERIC_POS, NUMERIC_NEG, or a special value
        // - dscale (int16): display scale (digits after decimal point)
        // - digits: array of int16, each containing up to 4 decimal digits (NBASE=10000)
        if bytes.len() < 8 {
            return Err("Invalid NUMERIC binary format: too short".to_string());
        }

        let ndigits = BigEndian::read_i16(&bytes[0..2]);
        let weight = BigEndian::read_i16(&bytes[2..4]) as i32;
        let sign = BigEndian::read_u16(&bytes[4..6]);
        let dscale = BigEndian::read_i16(&bytes[6..8]);

        match sign {
            NUMERIC_POS | NUMERIC_NEG => {}
            NUMERIC_NAN => return Err("NUMERIC NaN is not representable".to_string()),
            NUMERIC_PINF | NUMERIC_NINF => {
                return Err("infinite NUMERIC is not representable".to_string());
            }
            other => return Err(format!("Invalid NUMERIC sign: 0x{other:04x}")),
        }
        if ndigits < 0 || dscale < 0 {
            return Err("Invalid NUMERIC binary format: negative header field".to_string());
        }
        let ndigits = ndigits as usize;
        let dscale = dscale as usize;

        if bytes.len() != 8 + ndigits * 2 {
            return Err(format!(
                "Invalid NUMERIC binary format: expected {} digit bytes, found {}",
                ndigits * 2,
                bytes.len() - 8
            ));
        }

        let mut digits = Vec::with_capacity(ndigits);
        for chunk in bytes[8..].chunks_exact(2) {
            let digit = BigEndian::read_i16(chunk);
            if !(0..10000).contains(&digit) {
                return Err(format!("Invalid NUMERIC digit group: {digit}"));
            }
            digits.push(digit);
        }

        // Digit group i carries NBASE^(weight - i)
        let group = |i: i32| -> i16 {
            if i < 0 {
                0
            } else {
                digits.get(i as usize).copied().unwrap_or(0)
            }
        };

        let mut text = String::new();
        if sign == NUMERIC_NEG {
            text.push('-');
        }

        if weight < 0 {
            text.push('0');
        } else {
            for i in 0..=weight {
                if i == 0 {
                    text.push_str(&group(i).to_string());
                } else {
                    text.push_str(&format!("{:04}", group(i)));
                }
            }
        }

        if dscale > 0 {
            let mut frac = String::with_capacity(dscale + NBASE_DIGITS);
            let mut i = weight + 1;
            while frac.len() < dscale {
                frac.push_str(&format!("{:04}", group(i)));
                i += 1;
            }
            frac.truncate(dscale);
            text.push('.');
            text.push_str(&frac);
        }

        Decimal::from_str(&text).map_err(|e| format!("NUMERIC value out of range: {e}"))
    }

    /// Decode a binary MONEY value: an int8 count of cents
    pub fn decode_money(bytes: &[u8]) -> Result<Decimal, String> {
        if bytes.len() != 8 {
            return Err(format!("Invalid MONEY binary length: {}", bytes.len()));
        }
        Ok(Decimal::new(BigEndian::read_i64(bytes), 2))
    }

    /// Parse MONEY text output such as `$1,234.56`, `-$12.00` or `($12.00)`
    pub fn parse_money(value: &str) -> Result<Decimal, String> {
        let trimmed = value.trim();
        let (negative, body) = match trimmed
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
        {
            Some(inner) => (true, inner.trim()),
            None => (false, trimmed),
        };

        if !MONEY_REGEX.is_match(body) {
            return Err(format!("Invalid money format: {value}"));
        }

        let digits: String = body
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();
        let amount = Decimal::from_str(&digits).map_err(|e| format!("Invalid money value: {e}"))?;
        Ok(if negative { -amount } else { amount })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric_bytes(weight: i16, sign: u16, dscale: i16, digits: &[i16]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(digits.len() as i16).to_be_bytes());
        buf.extend_from_slice(&weight.to_be_bytes());
        buf.extend_from_slice(&sign.to_be_bytes());
        buf.extend_from_slice(&dscale.to_be_bytes());
        for d in digits {
            buf.extend_from_slice(&d.to_be_bytes());
        }
        buf
    }

    #[test]
    fn test_parse_decimal() {
        assert!(DecimalHandler::parse_decimal("123.45").is_ok());
        assert!(DecimalHandler::parse_decimal("-123.45").is_ok());
        assert!(DecimalHandler::parse_decimal("0").is_ok());
        assert!(DecimalHandler::parse_decimal("1.5e3").is_ok());
        assert!(DecimalHandler::parse_decimal("NaN").is_err());
        assert!(DecimalHandler::parse_decimal("invalid").is_err());
    }

    #[test]
    fn test_decode_numeric() {
        // 12345.678 -> groups [1, 2345, 6780], weight 1, dscale 3
        let bytes = numeric_bytes(1, NUMERIC_POS, 3, &[1, 2345, 6780]);
        assert_eq!(
            DecimalHandler::decode_numeric(&bytes).unwrap(),
            Decimal::from_str("12345.678").unwrap()
        );

        // -0.0001 -> groups [1], weight -1, dscale 4
        let bytes = numeric_bytes(-1, NUMERIC_NEG, 4, &[1]);
        assert_eq!(
            DecimalHandler::decode_numeric(&bytes).unwrap(),
            Decimal::from_str("-0.0001").unwrap()
        );

        // 0.00000012 -> groups [12], weight -2, dscale 8
        let bytes = numeric_bytes(-2, NUMERIC_POS, 8, &[12]);
        assert_eq!(
            DecimalHandler::decode_numeric(&bytes).unwrap(),
            Decimal::from_str("0.00000012").unwrap()
        );

        // 20000 -> groups [2], weight 1 (trailing zero group stripped)
        let bytes = numeric_bytes(1, NUMERIC_POS, 0, &[2]);
        assert_eq!(DecimalHandler::decode_numeric(&bytes).unwrap(), Decimal::from(20000));

        let zero = numeric_bytes(0, NUMERIC_POS, 2, &[]);
        assert_eq!(DecimalHandler::decode_numeric(&zero).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_decode_numeric_rejects_specials() {
        assert!(DecimalHandler::decode_numeric(&numeric_bytes(0, NUMERIC_NAN, 0, &[])).is_err());
        assert!(DecimalHandler::decode_numeric(&numeric_bytes(0, NUMERIC_PINF, 0, &[])).is_err());
        assert!(DecimalHandler::decode_numeric(&[0, 1]).is_err());
        let mut truncated = numeric_bytes(0, NUMERIC_POS, 0, &[5]);
        truncated.pop();
        assert!(DecimalHandler::decode_numeric(&truncated).is_err());
    }

    #[test]
    fn test_decode_numeric_extreme_header() {
        // 10000^32767 is far beyond 96 bits
        let huge = numeric_bytes(i16::MAX, NUMERIC_POS, 0, &[1]);
        assert!(DecimalHandler::decode_numeric(&huge).is_err());

        // Display scale past what Decimal holds either rounds or fails
        let wide = numeric_bytes(0, NUMERIC_POS, i16::MAX, &[1]);
        let decoded = DecimalHandler::decode_numeric(&wide);
        assert!(decoded.map_or(true, |d| d == Decimal::ONE));

        assert!(DecimalHandler::decode_numeric(&numeric_bytes(0, NUMERIC_POS, -1, &[1])).is_err());
        assert!(DecimalHandler::decode_numeric(&numeric_bytes(0, NUMERIC_POS, 0, &[10000])).is_err());
    }

    #[test]
    fn test_parse_oversized_text() {
        assert!(DecimalHandler::parse_decimal(&"9".repeat(40)).is_err());
        assert!(DecimalHandler::parse_decimal("1e999999999999").is_err());
        assert!(DecimalHandler::parse_money(&format!("${}", "9".repeat(40))).is_err());
    }

    #[test]
    fn test_money() {
        assert_eq!(DecimalHandler::parse_money("$1,234.56").unwrap(), Decimal::new(123456, 2));
        assert_eq!(DecimalHandler::parse_money("-$12.00").unwrap(), Decimal::new(-1200, 2));
        assert_eq!(DecimalHandler::parse_money("($12.00)").unwrap(), Decimal::new(-1200, 2));
        assert!(DecimalHandler::parse_money("twelve").is_err());

        let cents = 123456i64.to_be_bytes();
        assert_eq!(DecimalHandler::decode_money(&cents).unwrap(), Decimal::new(123456, 2));
        assert!(DecimalHandler::decode_money(&cents[..4]).is_err());
    }
}
