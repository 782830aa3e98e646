use anyhow::{Context, Result};
use serde_json::json;
use tracing::debug;

use pgcoerce::config::Config;
use pgcoerce::types::default_mappings;
use pgcoerce::{Coercer, RawScalar, RawValue, TypeDescriptor, TypeMap, Value};

fn main() -> Result<()> {
    let config = Config::load();

    // Initialize logging; stdout is reserved for results
    tracing_subscriber::fmt()
        .with_env_filter(config.log_level.clone())
        .with_writer(std::io::stderr)
        .init();

    debug!("pgcoerce v{}", env!("CARGO_PKG_VERSION"));

    if config.list_defaults {
        return list_defaults(config.json);
    }

    match (&config.type_name, &config.value) {
        (Some(type_name), Some(value)) => coerce_value(&config, type_name, value),
        _ => anyhow::bail!("nothing to do: pass --list-defaults, or --type <SQL_TYPE> --value <LITERAL>"),
    }
}

fn list_defaults(as_json: bool) -> Result<()> {
    let mappings = default_mappings();
    if as_json {
        println!("{}", serde_json::to_string_pretty(mappings)?);
        return Ok(());
    }

    println!("{:<12} {:>5} {:>6}  rust type", "type", "oid", "array");
    for mapping in mappings {
        let array_oid = mapping.array_oid.map(|oid| oid.to_string()).unwrap_or_default();
        println!(
            "{:<12} {:>5} {:>6}  {}",
            mapping.type_name,
            mapping.oid,
            array_oid,
            mapping.host_type.rust_type()
        );
    }
    Ok(())
}

fn coerce_value(config: &Config, type_name: &str, value: &str) -> Result<()> {
    let descriptor = TypeDescriptor::parse(type_name);
    let raw = if config.binary {
        let bytes = hex::decode(value.trim_start_matches("\\x")).context("--value is not valid hex")?;
        RawValue::Scalar(RawScalar::binary(bytes))
    } else {
        RawValue::text(value)
    };

    let coercer = Coercer::with_config(config.coercer_config());
    let coerced = coercer
        .coerce(&raw, &descriptor, &TypeMap::new())
        .with_context(|| format!("cannot coerce {value:?} as {descriptor}"))?;

    if config.json {
        println!("{}", serde_json::to_string_pretty(&to_json(&coerced))?);
    } else {
        println!("{coerced:#?}");
    }
    Ok(())
}

fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null(_) => serde_json::Value::Null,
        Value::Bool(b) => json!(b),
        Value::Int2(v) => json!(v),
        Value::Int4(v) => json!(v),
        Value::Int8(v) => json!(v),
        Value::Oid(v) => json!(v),
        Value::Float4(v) => json!(v),
        Value::Float8(v) => json!(v),
        Value::Json(v) => v.clone(),
        Value::Sequence(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Record(record) => serde_json::Value::Object(
            record
                .iter()
                .map(|(name, value)| (name.to_string(), to_json(value)))
                .collect(),
        ),
        Value::Custom(custom) => json!(format!("{custom:?}")),
        other => other.to_pg_text().map(serde_json::Value::String).unwrap_or_default(),
    }
}
