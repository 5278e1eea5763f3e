//! View definitions and typed field access
//!
//! A search view is a wide, denormalized SQL projection. Each projected column
//! is described by a [`ViewColumn`]: its storage name, declared scalar kind,
//! whether its stored value is ciphertext, whether it participates in
//! free-text filtering, and a typed getter/setter pair built once per result
//! type. [`ViewSource`] is the seam a data-access layer implements to expose a
//! view to the search engine.

use crate::error::Result;
use crate::infrastructure::executor::SqlParam;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar kinds a view column may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    BigInt,
    Int,
    Bool,
}

impl ValueKind {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::BigInt => "bigint",
            Self::Int => "int",
            Self::Bool => "bool",
        }
    }

    /// Create from string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "bigint" => Some(Self::BigInt),
            "int" => Some(Self::Int),
            "bool" => Some(Self::Bool),
            _ => None,
        }
    }

    /// Get all scalar kinds
    pub fn all() -> Vec<Self> {
        vec![Self::Text, Self::BigInt, Self::Int, Self::Bool]
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A scalar read from or written to a result row
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    BigInt(i64),
    Int(i32),
    Bool(bool),
    Null,
}

impl FieldValue {
    /// The kind this value carries, or `None` for null
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Text(_) => Some(ValueKind::Text),
            Self::BigInt(_) => Some(ValueKind::BigInt),
            Self::Int(_) => Some(ValueKind::Int),
            Self::Bool(_) => Some(ValueKind::Bool),
            Self::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// String rendering used for free-text matching; `None` for null
    pub fn render(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::BigInt(n) => Some(n.to_string()),
            Self::Int(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Null => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_big_int(self) -> Option<i64> {
        match self {
            Self::BigInt(n) => Some(n),
            Self::Int(n) => Some(n as i64),
            _ => None,
        }
    }

    pub fn into_int(self) -> Option<i32> {
        match self {
            Self::Int(n) => Some(n),
            _ => None,
        }
    }

    pub fn into_bool(self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map(Self::Text).unwrap_or(Self::Null)
    }
}

impl From<Option<i64>> for FieldValue {
    fn from(value: Option<i64>) -> Self {
        value.map(Self::BigInt).unwrap_or(Self::Null)
    }
}

impl From<Option<i32>> for FieldValue {
    fn from(value: Option<i32>) -> Self {
        value.map(Self::Int).unwrap_or(Self::Null)
    }
}

impl From<Option<bool>> for FieldValue {
    fn from(value: Option<bool>) -> Self {
        value.map(Self::Bool).unwrap_or(Self::Null)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Requested or default ordering direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// SQL keyword for this direction
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Create from string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A view's default ordering: field name plus direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: &'static str,
    pub order: SortOrder,
}

impl SortSpec {
    pub const fn new(field: &'static str, order: SortOrder) -> Self {
        Self { field, order }
    }
}

/// One projected column of a search view, with its typed accessor pair
///
/// The getter and setter are plain function pointers resolved when the view
/// definition is constructed, so population and sorting never look up fields
/// by name at run time.
pub struct ViewColumn<R> {
    /// Logical field name, used for sort resolution
    pub name: &'static str,
    /// Storage column name within the view
    pub column: &'static str,
    /// Declared scalar kind of the stored value
    pub kind: ValueKind,
    /// Stored value is ciphertext and must be decrypted on read
    pub encrypted: bool,
    /// Participates in free-text filtering
    pub filterable: bool,
    /// Related sub-object this column writes through, if any
    pub entity: Option<&'static str>,
    /// Read the field from a populated record
    pub get: fn(&R) -> FieldValue,
    /// Write a raw (already decrypted) value into a record
    pub set: fn(&mut R, FieldValue),
}

impl<R> ViewColumn<R> {
    pub fn new(
        name: &'static str,
        column: &'static str,
        kind: ValueKind,
        get: fn(&R) -> FieldValue,
        set: fn(&mut R, FieldValue),
    ) -> Self {
        Self {
            name,
            column,
            kind,
            encrypted: false,
            filterable: false,
            entity: None,
            get,
            set,
        }
    }

    /// Mark the stored value as encrypted at rest
    pub fn encrypted(mut self) -> Self {
        self.encrypted = true;
        self
    }

    /// Include this column in free-text filtering
    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    /// Name the related sub-object this column belongs to
    pub fn for_entity(mut self, entity: &'static str) -> Self {
        self.entity = Some(entity);
        self
    }
}

impl<R> Clone for ViewColumn<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for ViewColumn<R> {}

impl<R> fmt::Debug for ViewColumn<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewColumn")
            .field("name", &self.name)
            .field("column", &self.column)
            .field("kind", &self.kind)
            .field("encrypted", &self.encrypted)
            .field("filterable", &self.filterable)
            .field("entity", &self.entity)
            .finish()
    }
}

/// A typed result row of a search view
///
/// Records are constructed per row via [`Default`] and filled through the
/// column accessors. Related sub-objects are plain struct fields initialized
/// by the same `Default`.
pub trait ViewRecord: Default + Send + 'static {
    /// Stable row identity within the view, used to deduplicate candidates
    fn uuid(&self) -> &str;
}

/// The data-access seam a search view is exposed through
///
/// Implementations own the view name, the always-applied fixed filter, the
/// column table, and the SQL fragments for free-text filtering and named
/// bounds. Clause builders push their positional parameters onto `params` in
/// the order their `?` placeholders appear.
pub trait ViewSource: Send + Sync {
    type Record: ViewRecord;

    /// Name of the SQL view or projection to select from
    fn view(&self) -> &str;

    /// Predicate every query against this view must satisfy
    fn fixed_filter(&self) -> &str;

    /// The column table for this view
    fn columns(&self) -> &[ViewColumn<Self::Record>];

    /// SQL fragment applying the free-text filter, with `?` placeholders
    fn filter_clause(&self, filter: &str, params: &mut Vec<SqlParam>) -> String;

    /// SQL fragment applying a named bound; unknown names are an error
    fn bound_clause(&self, name: &str, value: &str, params: &mut Vec<SqlParam>) -> Result<String>;

    /// Ordering applied when the request does not name a sort field
    fn default_sort(&self) -> SortSpec;

    /// Whether any column forces the in-memory fallback path
    fn has_encrypted_filterable(&self) -> bool {
        self.columns().iter().any(|c| c.encrypted && c.filterable)
    }

    /// Look up a column by logical field name
    fn column_named(&self, name: &str) -> Option<&ViewColumn<Self::Record>> {
        self.columns().iter().find(|c| c.name == name)
    }
}
