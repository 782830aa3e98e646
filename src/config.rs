use clap::Parser;

/// PostgreSQL's MAXDIM
pub const DEFAULT_MAX_ARRAY_DIMENSIONS: usize = 6;

/// Knobs the coercer consults while decoding. Immutable once a coercer is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercerConfig {
    /// Arrays with more dimensions than this are rejected as malformed
    pub max_array_dimensions: usize,
    /// Check text-format inet/cidr/macaddr/bit values before handing them
    /// out as strings
    pub validate_network_text: bool,
}

impl Default for CoercerConfig {
    fn default() -> Self {
        Self {
            max_array_dimensions: DEFAULT_MAX_ARRAY_DIMENSIONS,
            validate_network_text: true,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "pgcoerce")]
#[command(about = "pgcoerce - coerce PostgreSQL result values into typed Rust values", long_about = None)]
pub struct Config {
    #[arg(long, default_value = "warn", env = "PGCOERCE_LOG_LEVEL")]
    pub log_level: String,

    #[arg(long, default_value = "6", env = "PGCOERCE_MAX_ARRAY_DIMENSIONS", help = "Maximum number of array dimensions accepted")]
    pub max_array_dimensions: usize,

    #[arg(long, env = "PGCOERCE_NO_VALIDATE_NETWORK_TEXT", help = "Pass text-format network and bit-string values through unchecked")]
    pub no_validate_network_text: bool,

    // Diagnostics
    #[arg(long, help = "Print the default database type to Rust type mapping table")]
    pub list_defaults: bool,

    #[arg(long, help = "Print output as JSON")]
    pub json: bool,

    #[arg(long = "type", value_name = "SQL_TYPE", help = "Database type of the value, e.g. int4, numeric(10,2), text[]")]
    pub type_name: Option<String>,

    #[arg(long, value_name = "LITERAL", requires = "type_name", help = "Value to coerce, in text format")]
    pub value: Option<String>,

    #[arg(long, requires = "value", help = "Treat --value as hex-encoded binary format")]
    pub binary: bool,
}

impl Config {
    /// Load configuration from command line arguments and environment variables
    pub fn load() -> Self {
        Config::parse()
    }

    /// The coercer settings carried by this configuration
    pub fn coercer_config(&self) -> CoercerConfig {
        CoercerConfig {
            max_array_dimensions: self.max_array_dimensions,
            validate_network_text: !self.no_validate_network_text,
        }
    }
}
