//! Value coercion: turns raw wire values into typed Rust values, consulting
//! a caller-supplied [`TypeMap`] before falling back to the built-in defaults.
mod array;
mod composite;
mod scalar;

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::CoercerConfig;
use crate::error::Result;
use crate::types::{Format, RawScalar, RawValue, TypeDescriptor, TypeMap, Value};

/// Default decoder for an engine-specific scalar type the built-in table
/// doesn't cover
pub type ExtensionDecoder = Arc<dyn Fn(&RawScalar) -> std::result::Result<Value, String> + Send + Sync>;

static DEFAULT_COERCER: Lazy<Coercer> = Lazy::new(Coercer::new);

/// Coerce with a process-wide coercer using the default configuration and
/// no extension decoders
pub fn coerce(raw: &RawValue, descriptor: &TypeDescriptor, type_map: &TypeMap) -> Result<Value> {
    DEFAULT_COERCER.coerce(raw, descriptor, type_map)
}

/// Stateless apart from its configuration and extension decoders, both fixed
/// at construction, so one coercer can serve any number of threads.
#[derive(Clone, Default)]
pub struct Coercer {
    config: CoercerConfig,
    extensions: Arc<HashMap<String, ExtensionDecoder>>,
}

impl Coercer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CoercerConfig) -> Self {
        Self {
            config,
            extensions: Arc::default(),
        }
    }

    pub fn builder() -> CoercerBuilder {
        CoercerBuilder::default()
    }

    pub fn config(&self) -> &CoercerConfig {
        &self.config
    }

    /// Whether a value of this scalar type can be coerced without an override
    pub fn has_default(&self, descriptor: &TypeDescriptor) -> bool {
        match descriptor {
            TypeDescriptor::Scalar { name, .. } => {
                self.extensions.contains_key(name) || descriptor.pg_type().is_some()
            }
            TypeDescriptor::Enum { .. } => true,
            TypeDescriptor::Array { element } => self.has_default(element),
            TypeDescriptor::Composite { fields, .. } => {
                fields.iter().all(|field| self.has_default(&field.ty))
            }
        }
    }

    /// Coerce one raw value according to its descriptor and the effective
    /// type map. NULL becomes `Value::Null` of the descriptor's category
    /// whatever the map says; arrays and composites are coerced element by
    /// element with the same map, and the first failure is returned
    /// annotated with where it happened.
    pub fn coerce(&self, raw: &RawValue, descriptor: &TypeDescriptor, type_map: &TypeMap) -> Result<Value> {
        if raw.is_null() {
            return Ok(Value::Null(descriptor.category()));
        }

        match descriptor {
            TypeDescriptor::Scalar { .. } | TypeDescriptor::Enum { .. } => {
                self.coerce_scalar(raw, descriptor, type_map)
            }
            TypeDescriptor::Array { element } => self.coerce_array(raw, descriptor, element, type_map),
            TypeDescriptor::Composite { name, fields } => {
                self.coerce_composite(raw, name, fields, type_map)
            }
        }
    }

    fn extension(&self, type_name: &str) -> Option<&ExtensionDecoder> {
        self.extensions.get(type_name)
    }
}

impl fmt::Debug for Coercer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut extensions: Vec<&str> = self.extensions.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        f.debug_struct("Coercer")
            .field("config", &self.config)
            .field("extensions", &extensions)
            .finish()
    }
}

#[derive(Default)]
pub struct CoercerBuilder {
    config: CoercerConfig,
    extensions: HashMap<String, ExtensionDecoder>,
}

impl CoercerBuilder {
    pub fn config(mut self, config: CoercerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_array_dimensions(mut self, max: usize) -> Self {
        self.config.max_array_dimensions = max;
        self
    }

    /// Register the default decoder for a scalar type name. Overrides in a
    /// type map still take precedence; built-ins are consulted only when no
    /// extension matches.
    pub fn extension<F>(mut self, type_name: impl Into<String>, decoder: F) -> Self
    where
        F: Fn(&RawScalar) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.extensions.insert(type_name.into(), Arc::new(decoder));
        self
    }

    pub fn build(self) -> Coercer {
        Coercer {
            config: self.config,
            extensions: Arc::new(self.extensions),
        }
    }
}

/// Format to report for a failure about the payload as a whole. Pre-split
/// payloads report the format of their first scalar.
fn payload_format(raw: &RawValue) -> Format {
    scalar_format(raw).unwrap_or(Format::Text)
}

fn scalar_format(raw: &RawValue) -> Option<Format> {
    match raw {
        RawValue::Scalar(scalar) => Some(scalar.format()),
        RawValue::Sequence(items) | RawValue::Record(items) => items.iter().find_map(scalar_format),
        RawValue::Null => None,
    }
}
