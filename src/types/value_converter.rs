use postgres_protocol::types as pg_types;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::types::type_mapper::PgType;

/// Produces the canonical text form of the network and bit-string types,
/// which default to `String` on the host side.
pub struct ValueConverter;

impl ValueConverter {
    /// Validate a text-format value of a network or bit-string type.
    /// Other types pass through untouched.
    pub fn validate_text(value: &str, pg_type: PgType) -> Result<String, String> {
        match pg_type {
            PgType::Cidr => Self::convert_cidr(value),
            PgType::Inet => Self::convert_inet(value),
            PgType::Macaddr => Self::convert_macaddr(value, 6),
            PgType::Macaddr8 => Self::convert_macaddr(value, 8),
            PgType::Bit | PgType::Varbit => Self::convert_bit(value),
            _ => Ok(value.to_string()),
        }
    }

    /// Render a binary-format value of a network or bit-string type as text,
    /// matching what the server would have sent in text format.
    pub fn binary_to_text(bytes: &[u8], pg_type: PgType) -> Result<String, String> {
        match pg_type {
            PgType::Inet | PgType::Cidr => {
                let inet = pg_types::inet_from_sql(bytes).map_err(|e| e.to_string())?;
                let full = match inet.addr() {
                    IpAddr::V4(_) => 32,
                    IpAddr::V6(_) => 128,
                };
                if pg_type == PgType::Inet && inet.netmask() == full {
                    Ok(inet.addr().to_string())
                } else {
                    Ok(format!("{}/{}", inet.addr(), inet.netmask()))
                }
            }
            PgType::Macaddr => {
                let mac = pg_types::macaddr_from_sql(bytes).map_err(|e| e.to_string())?;
                Ok(Self::format_mac(&mac))
            }
            PgType::Macaddr8 => {
                if bytes.len() != 8 {
                    return Err(format!("macaddr8 must be 8 bytes, got {}", bytes.len()));
                }
                Ok(Self::format_mac(bytes))
            }
            PgType::Bit | PgType::Varbit => {
                let varbit = pg_types::varbit_from_sql(bytes).map_err(|e| e.to_string())?;
                let bits = varbit.len();
                let data = varbit.bytes();
                if data.len() != bits.div_ceil(8) {
                    return Err(format!(
                        "bit string of {bits} bits needs {} bytes, got {}",
                        bits.div_ceil(8),
                        data.len()
                    ));
                }
                Ok((0..bits)
                    .map(|i| if data[i / 8] & (0x80 >> (i % 8)) != 0 { '1' } else { '0' })
                    .collect())
            }
            other => Err(format!("{other} has no network/bit text form")),
        }
    }

    fn format_mac(bytes: &[u8]) -> String {
        bytes
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Validate and convert CIDR values
    fn convert_cidr(value: &str) -> Result<String, String> {
        let trimmed = value.trim();

        let (ip_part, prefix_part) = trimmed
            .split_once('/')
            .ok_or_else(|| format!("Invalid CIDR format: {value}"))?;

        let ip = Self::parse_ip(ip_part)
            .ok_or_else(|| format!("Invalid IP address in CIDR: {ip_part}"))?;

        let prefix: u8 = prefix_part
            .parse()
            .map_err(|_| format!("Invalid prefix length: {prefix_part}"))?;

        match ip {
            IpAddr::V4(_) if prefix > 32 => {
                Err(format!("IPv4 prefix length cannot exceed 32: {prefix}"))
            }
            IpAddr::V6(_) if prefix > 128 => {
                Err(format!("IPv6 prefix length cannot exceed 128: {prefix}"))
            }
            _ => Ok(trimmed.to_string()),
        }
    }

    /// Validate and convert INET values
    fn convert_inet(value: &str) -> Result<String, String> {
        let trimmed = value.trim();

        // INET can be just an IP address or IP/prefix
        if trimmed.contains('/') {
            Self::convert_cidr(trimmed)
        } else if Self::parse_ip(trimmed).is_some() {
            Ok(trimmed.to_string())
        } else {
            Err(format!("Invalid INET format: {value}"))
        }
    }

    /// Validate MAC addresses, normalizing hyphen separators to colons
    fn convert_macaddr(value: &str, octets: usize) -> Result<String, String> {
        let trimmed = value.trim();

        let normalized = if trimmed.contains(':') {
            trimmed.to_string()
        } else if trimmed.contains('-') {
            trimmed.replace('-', ":")
        } else {
            return Err(format!("Invalid MAC address format: {value}"));
        };

        let parts: Vec<&str> = normalized.split(':').collect();
        if parts.len() != octets {
            return Err(format!("MAC address must have {octets} parts: {value}"));
        }

        for part in &parts {
            if part.len() != 2 || !part.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(format!("Invalid MAC address part: {part}"));
            }
        }

        Ok(normalized.to_lowercase())
    }

    /// Validate bit strings
    fn convert_bit(value: &str) -> Result<String, String> {
        let trimmed = value.trim();

        // Remove B prefix if present (e.g., B'1010')
        let bit_string = trimmed
            .strip_prefix("B'")
            .and_then(|rest| rest.strip_suffix('\''))
            .unwrap_or(trimmed);

        if bit_string.chars().all(|c| c == '0' || c == '1') {
            Ok(bit_string.to_string())
        } else {
            Err(format!("Invalid bit string: {value}"))
        }
    }

    fn parse_ip(s: &str) -> Option<IpAddr> {
        s.parse::<Ipv4Addr>()
            .map(IpAddr::V4)
            .or_else(|_| s.parse::<Ipv6Addr>().map(IpAddr::V6))
            .ok()
    }
}
