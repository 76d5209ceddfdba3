//! Column definitions.
//!
//! A [`Column`] names a field of a record, gives it a display title, and
//! declares how it participates in filtering and sorting. The record itself
//! is only ever read through the column's accessor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// The kind of data a column holds.
///
/// Rendering decisions are left to the consumer; the engine only uses the
/// kind to describe the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    #[default]
    Text,
    Select,
    MultiSelect,
    Date,
    Number,
    Switch,
}

/// One choice offered by a `Select` or `MultiSelect` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnOption {
    pub label: String,
    pub value: Value,
}

impl ColumnOption {
    pub fn new(label: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

type Accessor<R> = Arc<dyn Fn(&R) -> Value + Send + Sync>;

/// Describes how one field of `R` participates in search, filter, and sort.
///
/// # Example
///
/// ```
/// use gridgate_core::{Column, ColumnKind, Value};
///
/// struct User { name: String, age: u32 }
///
/// let columns = vec![
///     Column::new("name", "Name", |u: &User| Value::from(u.name.as_str())),
///     Column::new("age", "Age", |u: &User| Value::from(u.age)).kind(ColumnKind::Number),
/// ];
/// assert_eq!(columns[1].key(), "age");
/// ```
pub struct Column<R> {
    key: String,
    title: String,
    sortable: bool,
    filterable: bool,
    kind: ColumnKind,
    options: Vec<ColumnOption>,
    accessor: Accessor<R>,
}

impl<R> Column<R> {
    /// Create a sortable, filterable text column.
    pub fn new<F>(key: impl Into<String>, title: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&R) -> Value + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            title: title.into(),
            sortable: true,
            filterable: true,
            kind: ColumnKind::default(),
            options: Vec::new(),
            accessor: Arc::new(accessor),
        }
    }

    pub fn kind(mut self, kind: ColumnKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn filterable(mut self, filterable: bool) -> Self {
        self.filterable = filterable;
        self
    }

    pub fn options(mut self, options: Vec<ColumnOption>) -> Self {
        self.options = options;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_sortable(&self) -> bool {
        self.sortable
    }

    pub fn is_filterable(&self) -> bool {
        self.filterable
    }

    pub fn column_kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn column_options(&self) -> &[ColumnOption] {
        &self.options
    }

    /// Read this column's value from a record.
    pub fn value(&self, record: &R) -> Value {
        (self.accessor)(record)
    }
}

impl Column<serde_json::Value> {
    /// Create a column over JSON object records that reads `record[key]`.
    ///
    /// Missing keys and non-object records read as [`Value::Null`].
    pub fn json(key: impl Into<String>, title: impl Into<String>) -> Self {
        let key = key.into();
        let field = key.clone();
        Self::new(key, title, move |record: &serde_json::Value| {
            record
                .get(&field)
                .cloned()
                .map(Value::from)
                .unwrap_or(Value::Null)
        })
    }
}

impl<R> Clone for Column<R> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            title: self.title.clone(),
            sortable: self.sortable,
            filterable: self.filterable,
            kind: self.kind,
            options: self.options.clone(),
            accessor: Arc::clone(&self.accessor),
        }
    }
}

impl<R> fmt::Debug for Column<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("key", &self.key)
            .field("title", &self.title)
            .field("sortable", &self.sortable)
            .field("filterable", &self.filterable)
            .field("kind", &self.kind)
            .field("options", &self.options.len())
            .finish()
    }
}

/// Find a column by key.
pub fn find_column<'c, R>(columns: &'c [Column<R>], key: &str) -> Option<&'c Column<R>> {
    columns.iter().find(|c| c.key == key)
}
