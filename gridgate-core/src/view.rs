//! View state and derived views.
//!
//! This module provides:
//! - [`SortDirection`] / [`SortKey`] - One entry in a multi-key sort
//! - [`ViewState`] - The complete input driving a derived view
//! - [`DerivedView`] - The filtered and sorted output for a record set

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroUsize;

use crate::value::Value;

/// Default number of records per page.
pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(size) => size,
    None => unreachable!(),
};

/// Direction of one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction: {}", other)),
        }
    }
}

/// One entry of the sort list: a column key and a direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub key: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// The single source of truth for a derived view.
///
/// `page` is 1-based and is clamped against the current total whenever a
/// page is read, so a stored page may point past the end without harm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    #[serde(default)]
    pub search_query: String,

    /// Active filter values keyed by column key.
    #[serde(default)]
    pub filters: BTreeMap<String, Value>,

    /// Sort keys in priority order.
    #[serde(default)]
    pub sort: Vec<SortKey>,

    #[serde(default = "default_page")]
    pub page: usize,

    #[serde(default = "default_page_size")]
    pub page_size: NonZeroUsize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> NonZeroUsize {
    DEFAULT_PAGE_SIZE
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            search_query: String::new(),
            filters: BTreeMap::new(),
            sort: Vec::new(),
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl ViewState {
    pub fn with_page_size(mut self, page_size: NonZeroUsize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_search(mut self, query: impl Into<String>) -> Self {
        self.search_query = query.into();
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    pub fn with_sort(mut self, sort: Vec<SortKey>) -> Self {
        self.sort = sort;
        self
    }

    /// Whether any filter currently constrains the view.
    pub fn has_active_filters(&self) -> bool {
        self.filters.values().any(Value::is_active_filter)
    }

    /// Current direction for a column, if it is part of the sort list.
    pub fn sort_direction(&self, key: &str) -> Option<SortDirection> {
        self.sort.iter().find(|s| s.key == key).map(|s| s.direction)
    }
}

/// The output of applying a [`ViewState`] to a record set.
///
/// Holds references into the source records: `filtered` keeps source order,
/// `sorted` is a permutation of `filtered`, and `total == filtered.len()`.
#[derive(Debug)]
pub struct DerivedView<'a, R> {
    pub filtered: Vec<&'a R>,
    pub sorted: Vec<&'a R>,
    pub total: usize,
}

impl<'a, R> DerivedView<'a, R> {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

impl<R> Clone for DerivedView<'_, R> {
    fn clone(&self) -> Self {
        Self {
            filtered: self.filtered.clone(),
            sorted: self.sorted.clone(),
            total: self.total,
        }
    }
}
