use postgres_protocol::Oid;
use std::fmt;
use std::sync::Arc;

use crate::types::PgType;

/// Shape of a value: what a NULL of this type still reports itself as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Scalar,
    Sequence,
    Record,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Scalar => write!(f, "scalar"),
            Category::Sequence => write!(f, "array"),
            Category::Record => write!(f, "composite"),
        }
    }
}

/// Catalog metadata for a database-side type.
///
/// Descriptors are immutable and cheap to clone; nested parts are shared
/// behind `Arc` so the schema layer can cache and hand them out freely.
/// Every descriptor is a finite tree, so recursing over one terminates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    /// A scalar identified by its canonical name. Names with no built-in
    /// default (extension types such as `hstore`) are scalars too.
    Scalar { name: String, oid: Option<Oid> },
    Array { element: Arc<TypeDescriptor> },
    Composite {
        name: String,
        fields: Arc<[FieldDescriptor]>,
    },
    Enum { name: String, labels: Arc<[String]> },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: TypeDescriptor,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

impl TypeDescriptor {
    pub fn scalar(name: impl Into<String>) -> Self {
        let name = name.into();
        let oid = PgType::from_name(&name).map(|t| t.to_oid());
        TypeDescriptor::Scalar { name, oid }
    }

    pub fn builtin(pg_type: PgType) -> Self {
        TypeDescriptor::Scalar {
            name: pg_type.name().to_string(),
            oid: Some(pg_type.to_oid()),
        }
    }

    pub fn array(element: TypeDescriptor) -> Self {
        TypeDescriptor::Array {
            element: Arc::new(element),
        }
    }

    pub fn composite<N, I>(name: impl Into<String>, fields: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, TypeDescriptor)>,
    {
        TypeDescriptor::Composite {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(n, ty)| FieldDescriptor::new(n, ty))
                .collect(),
        }
    }

    pub fn enumeration<L, I>(name: impl Into<String>, labels: I) -> Self
    where
        L: Into<String>,
        I: IntoIterator<Item = L>,
    {
        TypeDescriptor::Enum {
            name: name.into(),
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a SQL type name into a descriptor.
    ///
    /// Understands the built-in aliases, `[]` and `[N]` suffixes and the
    /// catalog's `_elem` array naming. Declared dimensions collapse into one
    /// array level (`int4[][]` is `int4[]`); the value decides how many
    /// dimensions it has. Anything unknown becomes a scalar carrying the name
    /// as written, to be served by an override or an extension decoder.
    pub fn parse(sql_name: &str) -> Self {
        let trimmed = sql_name.trim();

        if let Some(inner) = strip_array_suffix(trimmed) {
            return match Self::parse(inner) {
                array @ TypeDescriptor::Array { .. } => array,
                element => Self::array(element),
            };
        }
        if let Some(element) = trimmed.strip_prefix('_') {
            if let Some(pg_type) = PgType::from_name(element) {
                return Self::array(Self::builtin(pg_type));
            }
        }

        match PgType::from_sql_name(trimmed) {
            Some(pg_type) => Self::builtin(pg_type),
            None => Self::scalar(trimmed),
        }
    }

    /// The name used for type map lookups. Arrays answer with their
    /// element's name, so one override covers both `T` and `T[]`.
    pub fn name(&self) -> &str {
        match self {
            TypeDescriptor::Scalar { name, .. }
            | TypeDescriptor::Composite { name, .. }
            | TypeDescriptor::Enum { name, .. } => name.as_str(),
            TypeDescriptor::Array { element } => element.name(),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            TypeDescriptor::Scalar { .. } | TypeDescriptor::Enum { .. } => Category::Scalar,
            TypeDescriptor::Array { .. } => Category::Sequence,
            TypeDescriptor::Composite { .. } => Category::Record,
        }
    }

    pub fn oid(&self) -> Option<Oid> {
        match self {
            TypeDescriptor::Scalar { oid, .. } => *oid,
            TypeDescriptor::Array { element } => element
                .pg_type()
                .and_then(|t| t.array_oid()),
            _ => None,
        }
    }

    /// Built-in scalar this descriptor names, if any
    pub fn pg_type(&self) -> Option<PgType> {
        match self {
            TypeDescriptor::Scalar { name, oid } => oid
                .and_then(PgType::from_oid)
                .filter(|t| t.name() == name.as_str())
                .or_else(|| PgType::from_name(name)),
            _ => None,
        }
    }

    pub fn element(&self) -> Option<&TypeDescriptor> {
        match self {
            TypeDescriptor::Array { element } => Some(element.as_ref()),
            _ => None,
        }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        match self {
            TypeDescriptor::Composite { fields, .. } => &fields[..],
            _ => &[],
        }
    }

    /// Structural nesting depth; a scalar is depth 1
    pub fn depth(&self) -> usize {
        match self {
            TypeDescriptor::Scalar { .. } | TypeDescriptor::Enum { .. } => 1,
            TypeDescriptor::Array { element } => 1 + element.depth(),
            TypeDescriptor::Composite { fields, .. } => {
                1 + fields.iter().map(|f| f.ty.depth()).max().unwrap_or(0)
            }
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Array { element } => write!(f, "{element}[]"),
            other => f.write_str(other.name()),
        }
    }
}

/// Strip one `[]` or `[N]` suffix
fn strip_array_suffix(name: &str) -> Option<&str> {
    let body = name.strip_suffix(']')?;
    let open = body.rfind('[')?;
    body[open + 1..]
        .chars()
        .all(|c| c.is_ascii_digit())
        .then(|| name[..open].trim_end())
}
