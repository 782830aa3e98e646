use once_cell::sync::Lazy;
pub use postgres_protocol::Oid;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Built-in PostgreSQL scalar types, keyed by their catalog OID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PgType {
    Bool = 16,
    Bytea = 17,
    Char = 18,
    Name = 19,
    Int8 = 20,
    Int2 = 21,
    Int4 = 23,
    Text = 25,
    Oid = 26,
    Json = 114,
    Xml = 142,
    Cidr = 650,
    Float4 = 700,
    Float8 = 701,
    Unknown = 705,
    Macaddr8 = 774,
    Money = 790,
    Macaddr = 829,
    Inet = 869,
    Bpchar = 1042,
    Varchar = 1043,
    Date = 1082,
    Time = 1083,
    Timestamp = 1114,
    Timestamptz = 1184,
    Interval = 1186,
    Timetz = 1266,
    Bit = 1560,
    Varbit = 1562,
    Numeric = 1700,
    Uuid = 2950,
    Jsonb = 3802,
}

impl PgType {
    pub const ALL: [PgType; 32] = [
        PgType::Bool,
        PgType::Bytea,
        PgType::Char,
        PgType::Name,
        PgType::Int8,
        PgType::Int2,
        PgType::Int4,
        PgType::Text,
        PgType::Oid,
        PgType::Json,
        PgType::Xml,
        PgType::Cidr,
        PgType::Float4,
        PgType::Float8,
        PgType::Unknown,
        PgType::Macaddr8,
        PgType::Money,
        PgType::Macaddr,
        PgType::Inet,
        PgType::Bpchar,
        PgType::Varchar,
        PgType::Date,
        PgType::Time,
        PgType::Timestamp,
        PgType::Timestamptz,
        PgType::Interval,
        PgType::Timetz,
        PgType::Bit,
        PgType::Varbit,
        PgType::Numeric,
        PgType::Uuid,
        PgType::Jsonb,
    ];

    pub fn from_oid(oid: Oid) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.to_oid() == oid)
    }

    /// Resolve the element type of a built-in array type OID (e.g. 1007 -> int4)
    pub fn from_array_oid(oid: Oid) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.array_oid() == Some(oid))
    }

    /// Look up a type by its canonical catalog name. Case-sensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        BY_NAME.get(name).copied()
    }

    /// Resolve a type name as written in SQL, accepting the standard aliases
    /// (`integer`, `character varying(20)`, `TIMESTAMP WITH TIME ZONE`, ...).
    pub fn from_sql_name(name: &str) -> Option<Self> {
        let lowered = name.trim().to_lowercase();

        // Drop type modifiers such as varchar(255) or numeric(10,2)
        let base = match lowered.find('(') {
            Some(paren_pos) => {
                let mut base = lowered[..paren_pos].trim_end().to_string();
                // "time(3) with time zone" keeps its suffix
                if let Some(close) = lowered[paren_pos..].find(')') {
                    let rest = lowered[paren_pos + close + 1..].trim();
                    if !rest.is_empty() {
                        base.push(' ');
                        base.push_str(rest);
                    }
                }
                base
            }
            None => lowered,
        };

        if let Some(t) = Self::from_name(&base) {
            return Some(t);
        }

        match base.as_str() {
            "boolean" => Some(PgType::Bool),
            "smallint" => Some(PgType::Int2),
            "integer" | "int" => Some(PgType::Int4),
            "bigint" => Some(PgType::Int8),
            "real" => Some(PgType::Float4),
            "double precision" | "float" => Some(PgType::Float8),
            "decimal" => Some(PgType::Numeric),
            "character varying" => Some(PgType::Varchar),
            "character" => Some(PgType::Bpchar),
            "\"char\"" => Some(PgType::Char),
            "timestamp without time zone" => Some(PgType::Timestamp),
            "timestamp with time zone" => Some(PgType::Timestamptz),
            "time without time zone" => Some(PgType::Time),
            "time with time zone" => Some(PgType::Timetz),
            "bit varying" => Some(PgType::Varbit),
            _ => None,
        }
    }

    pub fn to_oid(&self) -> Oid {
        *self as Oid
    }

    /// OID of the one-dimensional array type whose elements are this type
    pub fn array_oid(&self) -> Option<Oid> {
        let oid = match self {
            PgType::Bool => 1000,
            PgType::Bytea => 1001,
            PgType::Char => 1002,
            PgType::Name => 1003,
            PgType::Int8 => 1016,
            PgType::Int2 => 1005,
            PgType::Int4 => 1007,
            PgType::Text => 1009,
            PgType::Oid => 1028,
            PgType::Json => 199,
            PgType::Xml => 143,
            PgType::Cidr => 651,
            PgType::Float4 => 1021,
            PgType::Float8 => 1022,
            PgType::Unknown => return None,
            PgType::Macaddr8 => 775,
            PgType::Money => 791,
            PgType::Macaddr => 1040,
            PgType::Inet => 1041,
            PgType::Bpchar => 1014,
            PgType::Varchar => 1015,
            PgType::Date => 1182,
            PgType::Time => 1183,
            PgType::Timestamp => 1115,
            PgType::Timestamptz => 1185,
            PgType::Interval => 1187,
            PgType::Timetz => 1270,
            PgType::Bit => 1561,
            PgType::Varbit => 1563,
            PgType::Numeric => 1231,
            PgType::Uuid => 2951,
            PgType::Jsonb => 3807,
        };
        Some(oid)
    }

    pub fn name(&self) -> &'static str {
        match self {
            PgType::Bool => "bool",
            PgType::Bytea => "bytea",
            PgType::Char => "char",
            PgType::Name => "name",
            PgType::Int8 => "int8",
            PgType::Int2 => "int2",
            PgType::Int4 => "int4",
            PgType::Text => "text",
            PgType::Oid => "oid",
            PgType::Json => "json",
            PgType::Xml => "xml",
            PgType::Cidr => "cidr",
            PgType::Float4 => "float4",
            PgType::Float8 => "float8",
            PgType::Unknown => "unknown",
            PgType::Macaddr8 => "macaddr8",
            PgType::Money => "money",
            PgType::Macaddr => "macaddr",
            PgType::Inet => "inet",
            PgType::Bpchar => "bpchar",
            PgType::Varchar => "varchar",
            PgType::Date => "date",
            PgType::Time => "time",
            PgType::Timestamp => "timestamp",
            PgType::Timestamptz => "timestamptz",
            PgType::Interval => "interval",
            PgType::Timetz => "timetz",
            PgType::Bit => "bit",
            PgType::Varbit => "varbit",
            PgType::Numeric => "numeric",
            PgType::Uuid => "uuid",
            PgType::Jsonb => "jsonb",
        }
    }

    /// The canonical host type a value of this database type decodes to when
    /// the caller supplies no override.
    pub fn host_type(&self) -> HostType {
        match self {
            PgType::Bool => HostType::Bool,
            PgType::Int2 => HostType::I16,
            PgType::Int4 => HostType::I32,
            PgType::Int8 => HostType::I64,
            PgType::Oid => HostType::U32,
            PgType::Float4 => HostType::F32,
            PgType::Float8 => HostType::F64,
            PgType::Numeric => HostType::Decimal,
            PgType::Money => HostType::Money,
            PgType::Text
            | PgType::Varchar
            | PgType::Bpchar
            | PgType::Name
            | PgType::Char
            | PgType::Xml
            | PgType::Unknown
            | PgType::Inet
            | PgType::Cidr
            | PgType::Macaddr
            | PgType::Macaddr8
            | PgType::Bit
            | PgType::Varbit => HostType::String,
            PgType::Bytea => HostType::Bytes,
            PgType::Uuid => HostType::Uuid,
            PgType::Json | PgType::Jsonb => HostType::Json,
            PgType::Date => HostType::Date,
            PgType::Time => HostType::Time,
            PgType::Timetz => HostType::TimeTz,
            PgType::Timestamp => HostType::Timestamp,
            PgType::Timestamptz => HostType::Timestamptz,
            PgType::Interval => HostType::Interval,
        }
    }
}

impl fmt::Display for PgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

static BY_NAME: Lazy<HashMap<&'static str, PgType>> =
    Lazy::new(|| PgType::ALL.iter().map(|t| (t.name(), *t)).collect());

/// Host-side representation chosen for a database scalar by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostType {
    Bool,
    I16,
    I32,
    I64,
    U32,
    F32,
    F64,
    Decimal,
    Money,
    String,
    Bytes,
    Uuid,
    Json,
    Date,
    Time,
    TimeTz,
    Timestamp,
    Timestamptz,
    Interval,
}

impl HostType {
    /// Rust type carried by the matching `Value` variant
    pub fn rust_type(&self) -> &'static str {
        match self {
            HostType::Bool => "bool",
            HostType::I16 => "i16",
            HostType::I32 => "i32",
            HostType::I64 => "i64",
            HostType::U32 => "u32",
            HostType::F32 => "f32",
            HostType::F64 => "f64",
            HostType::Decimal | HostType::Money => "rust_decimal::Decimal",
            HostType::String => "String",
            HostType::Bytes => "Vec<u8>",
            HostType::Uuid => "uuid::Uuid",
            HostType::Json => "serde_json::Value",
            HostType::Date => "chrono::NaiveDate",
            HostType::Time => "chrono::NaiveTime",
            HostType::TimeTz => "(chrono::NaiveTime, chrono::FixedOffset)",
            HostType::Timestamp => "chrono::NaiveDateTime",
            HostType::Timestamptz => "chrono::DateTime<chrono::Utc>",
            HostType::Interval => "pgcoerce::Interval",
        }
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rust_type())
    }
}

/// One row of the default scalar mapping table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DefaultMapping {
    pub type_name: &'static str,
    pub oid: Oid,
    pub array_oid: Option<Oid>,
    pub host_type: HostType,
}

static DEFAULT_MAPPINGS: Lazy<Vec<DefaultMapping>> = Lazy::new(|| {
    let mut table: Vec<DefaultMapping> = PgType::ALL
        .iter()
        .map(|t| DefaultMapping {
            type_name: t.name(),
            oid: t.to_oid(),
            array_oid: t.array_oid(),
            host_type: t.host_type(),
        })
        .collect();
    table.sort_by_key(|m| m.oid);
    table
});

/// The fixed default scalar mapping table, ordered by OID
pub fn default_mappings() -> &'static [DefaultMapping] {
    &DEFAULT_MAPPINGS
}

/// Default mapping for a canonical database type name, if one exists
pub fn default_mapping(type_name: &str) -> Option<&'static DefaultMapping> {
    default_mappings().iter().find(|m| m.type_name == type_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oid_round_trip_for_every_type() {
        for t in PgType::ALL {
            assert_eq!(PgType::from_oid(t.to_oid()), Some(t));
            assert_eq!(PgType::from_name(t.name()), Some(t));
            if let Some(array_oid) = t.array_oid() {
                assert_eq!(PgType::from_array_oid(array_oid), Some(t));
            }
        }
    }

    #[test]
    fn test_from_name_is_case_sensitive() {
        assert_eq!(PgType::from_name("int4"), Some(PgType::Int4));
        assert_eq!(PgType::from_name("INT4"), None);
        assert_eq!(PgType::from_name("integer"), None);
    }

    #[test]
    fn test_from_sql_name_aliases() {
        assert_eq!(PgType::from_sql_name("INTEGER"), Some(PgType::Int4));
        assert_eq!(PgType::from_sql_name("character varying(255)"), Some(PgType::Varchar));
        assert_eq!(PgType::from_sql_name("NUMERIC(10,2)"), Some(PgType::Numeric));
        assert_eq!(PgType::from_sql_name("double precision"), Some(PgType::Float8));
        assert_eq!(PgType::from_sql_name("TIMESTAMP WITH TIME ZONE"), Some(PgType::Timestamptz));
        assert_eq!(PgType::from_sql_name("time(3) with time zone"), Some(PgType::Timetz));
        assert_eq!(PgType::from_sql_name("hstore"), None);
    }

    #[test]
    fn test_default_table_is_sorted_and_complete() {
        let table = default_mappings();
        assert_eq!(table.len(), PgType::ALL.len());
        assert!(table.windows(2).all(|w| w[0].oid < w[1].oid));
        assert_eq!(default_mapping("inet").map(|m| m.host_type), Some(HostType::String));
        assert_eq!(default_mapping("int8").map(|m| m.host_type), Some(HostType::I64));
        assert!(default_mapping("hstore").is_none());
    }
}
