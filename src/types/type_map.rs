use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::types::{CustomObject, CustomValue, RawScalar, Record};

type TextFactory = Arc<dyn Fn(&str) -> Result<CustomValue, String> + Send + Sync>;
type BinaryFactory = Arc<dyn Fn(&[u8]) -> Result<CustomValue, String> + Send + Sync>;
type RawFactory = Arc<dyn Fn(&RawScalar) -> Result<CustomValue, String> + Send + Sync>;
type RecordFactory = Arc<dyn Fn(&Record) -> Result<CustomValue, String> + Send + Sync>;

/// How a target type builds itself from a single scalar value
#[derive(Clone)]
pub(crate) enum ScalarConstructor {
    /// From the canonical text representation. Binary payloads of built-in
    /// types are rendered to text first.
    Text(TextFactory),
    /// From the binary wire representation only
    Binary(BinaryFactory),
    /// From the payload in whichever format it arrived
    Raw(RawFactory),
}

#[derive(Clone)]
pub(crate) struct RecordConstructor {
    pub(crate) arity: usize,
    pub(crate) build: RecordFactory,
}

/// Types that can be assembled from a coerced composite, in field order
pub trait FromRecord: CustomObject + Sized {
    /// Number of fields the constructor takes
    const ARITY: usize;

    fn from_record(record: &Record) -> Result<Self, String>;
}

/// A caller-selected host type: a name plus the construction paths it offers.
///
/// Factories return plain Rust values; the registry tags them with the
/// target name so results stay comparable.
#[derive(Clone)]
pub struct TargetType {
    name: Arc<str>,
    scalar: Option<ScalarConstructor>,
    record: Option<RecordConstructor>,
}

impl TargetType {
    /// Target built through `FromStr` on the canonical text representation,
    /// the single-argument constructor most host types already have.
    pub fn from_text<T>(name: impl Into<Arc<str>>) -> Self
    where
        T: FromStr + CustomObject,
        T::Err: fmt::Display,
    {
        Self::text(name, |s: &str| s.parse::<T>().map_err(|e| e.to_string()))
    }

    pub fn text<T, F>(name: impl Into<Arc<str>>, factory: F) -> Self
    where
        T: CustomObject,
        F: Fn(&str) -> Result<T, String> + Send + Sync + 'static,
    {
        let name = name.into();
        let target = Arc::clone(&name);
        Self {
            name,
            scalar: Some(ScalarConstructor::Text(Arc::new(move |s| {
                factory(s).map(|object| CustomValue::new(Arc::clone(&target), object))
            }))),
            record: None,
        }
    }

    pub fn binary<T, F>(name: impl Into<Arc<str>>, factory: F) -> Self
    where
        T: CustomObject,
        F: Fn(&[u8]) -> Result<T, String> + Send + Sync + 'static,
    {
        let name = name.into();
        let target = Arc::clone(&name);
        Self {
            name,
            scalar: Some(ScalarConstructor::Binary(Arc::new(move |bytes| {
                factory(bytes).map(|object| CustomValue::new(Arc::clone(&target), object))
            }))),
            record: None,
        }
    }

    pub fn raw<T, F>(name: impl Into<Arc<str>>, factory: F) -> Self
    where
        T: CustomObject,
        F: Fn(&RawScalar) -> Result<T, String> + Send + Sync + 'static,
    {
        let name = name.into();
        let target = Arc::clone(&name);
        Self {
            name,
            scalar: Some(ScalarConstructor::Raw(Arc::new(move |raw| {
                factory(raw).map(|object| CustomValue::new(Arc::clone(&target), object))
            }))),
            record: None,
        }
    }

    /// Target assembled from a composite's coerced fields. `arity` is the
    /// field count the constructor accepts.
    pub fn record<T, F>(name: impl Into<Arc<str>>, arity: usize, factory: F) -> Self
    where
        T: CustomObject,
        F: Fn(&Record) -> Result<T, String> + Send + Sync + 'static,
    {
        let name = name.into();
        let target = Arc::clone(&name);
        Self {
            name,
            scalar: None,
            record: Some(RecordConstructor {
                arity,
                build: Arc::new(move |record| {
                    factory(record).map(|object| CustomValue::new(Arc::clone(&target), object))
                }),
            }),
        }
    }

    pub fn from_record<T: FromRecord>(name: impl Into<Arc<str>>) -> Self {
        Self::record(name, T::ARITY, T::from_record)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_scalar_constructor(&self) -> bool {
        self.scalar.is_some()
    }

    /// Field count accepted by the record constructor, if there is one
    pub fn record_arity(&self) -> Option<usize> {
        self.record.as_ref().map(|r| r.arity)
    }

    pub(crate) fn scalar_constructor(&self) -> Option<&ScalarConstructor> {
        self.scalar.as_ref()
    }

    pub(crate) fn record_constructor(&self) -> Option<&RecordConstructor> {
        self.record.as_ref()
    }
}

impl fmt::Debug for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scalar = self.scalar.as_ref().map(|c| match c {
            ScalarConstructor::Text(_) => "text",
            ScalarConstructor::Binary(_) => "binary",
            ScalarConstructor::Raw(_) => "raw",
        });
        f.debug_struct("TargetType")
            .field("name", &self.name)
            .field("scalar", &scalar)
            .field("record_arity", &self.record_arity())
            .finish()
    }
}

/// Caller-supplied overrides from database type name to target type.
///
/// Keys are canonical type names and lookups are case-sensitive. A map is
/// read-only while a coercion runs and the same map applies at every nesting
/// level of the value being coerced.
#[derive(Clone, Default, Debug)]
pub struct TypeMap {
    entries: HashMap<String, TargetType>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, type_name: impl Into<String>, target: TargetType) -> Self {
        self.insert(type_name, target);
        self
    }

    /// Map `type_name` to `target`, returning the mapping it replaced.
    /// A name never maps to more than one target.
    pub fn insert(&mut self, type_name: impl Into<String>, target: TargetType) -> Option<TargetType> {
        let type_name = type_name.into();
        let previous = self.entries.insert(type_name.clone(), target);
        if let Some(previous) = &previous {
            debug!("Type map entry for {} replaced (was {})", type_name, previous.name());
        }
        previous
    }

    pub fn remove(&mut self, type_name: &str) -> Option<TargetType> {
        self.entries.remove(type_name)
    }

    /// The override for a database type name, if the caller supplied one
    pub fn resolve(&self, type_name: &str) -> Option<&TargetType> {
        self.entries.get(type_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mapped type names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The map to use for array elements and composite fields: this one,
    /// unchanged. Overrides are keyed by type name, not by position.
    pub fn nested(&self) -> &TypeMap {
        self
    }

    /// Pick the map for one call. A map passed with the call replaces the
    /// session's map entirely; without one the session map applies.
    pub fn effective<'a>(call: Option<&'a TypeMap>, session: &'a TypeMap) -> &'a TypeMap {
        call.unwrap_or(session)
    }
}

impl<S: Into<String>> FromIterator<(S, TargetType)> for TypeMap {
    fn from_iter<I: IntoIterator<Item = (S, TargetType)>>(iter: I) -> Self {
        let mut map = TypeMap::new();
        map.extend(iter);
        map
    }
}

impl<S: Into<String>> Extend<(S, TargetType)> for TypeMap {
    fn extend<I: IntoIterator<Item = (S, TargetType)>>(&mut self, iter: I) {
        for (type_name, target) in iter {
            self.insert(type_name, target);
        }
    }
}
