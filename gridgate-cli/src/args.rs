//! Parsers for the view arguments shared by `query` and `export`.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Args;
use gridgate_core::{Column, SortDirection, SortKey, Value, ViewState};

/// A column given as `key` or `key=Title`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub key: String,
    pub title: String,
}

impl ColumnSpec {
    pub fn to_column(&self) -> Column<serde_json::Value> {
        Column::json(self.key.clone(), self.title.clone())
    }
}

/// A filter given as `key=value` (text match) or `key:=value` (typed match).
///
/// `a|b` filters on a set of values.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub key: String,
    pub value: Value,
}

pub fn parse_column(s: &str) -> Result<ColumnSpec, String> {
    let (key, title) = match s.split_once('=') {
        Some((key, title)) => (key.trim(), title.trim()),
        None => (s.trim(), s.trim()),
    };
    if key.is_empty() {
        return Err(format!("empty column key in {:?}", s));
    }
    let title = if title.is_empty() { key } else { title };
    Ok(ColumnSpec {
        key: key.to_string(),
        title: title.to_string(),
    })
}

pub fn parse_filter(s: &str) -> Result<FilterSpec, String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {:?}", s))?;
    let (key, typed) = match key.strip_suffix(':') {
        Some(key) => (key.trim(), true),
        None => (key.trim(), false),
    };
    if key.is_empty() {
        return Err(format!("empty filter key in {:?}", s));
    }

    let scalar = |raw: &str| {
        if typed {
            parse_typed(raw)
        } else {
            Value::text(raw.trim())
        }
    };
    let value = if raw.contains('|') {
        Value::List(raw.split('|').map(scalar).collect())
    } else {
        scalar(raw)
    };

    Ok(FilterSpec {
        key: key.to_string(),
        value,
    })
}

/// `true`/`false` and numbers compare by equality; anything else stays text.
fn parse_typed(raw: &str) -> Value {
    let raw = raw.trim();
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => raw
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Value::Number)
            .unwrap_or_else(|| Value::text(raw)),
    }
}

/// A sort key given as `key`, `key:asc`, or `key:desc`.
pub fn parse_sort(s: &str) -> Result<SortKey, String> {
    let (key, direction) = match s.split_once(':') {
        Some((key, direction)) => (key.trim(), direction.parse::<SortDirection>()?),
        None => (s.trim(), SortDirection::Asc),
    };
    if key.is_empty() {
        return Err(format!("empty sort key in {:?}", s));
    }
    Ok(SortKey {
        key: key.to_string(),
        direction,
    })
}

/// Where records come from, and how to view them.
#[derive(Debug, Args)]
pub struct ViewArgs {
    /// Read records from a local JSON file
    #[arg(long, conflicts_with = "remote", required_unless_present = "remote")]
    pub file: Option<PathBuf>,

    /// Fetch records from an API path (e.g. projects/)
    #[arg(long)]
    pub remote: Option<String>,

    /// Columns to show, as key or key=Title (comma-separated)
    #[arg(short, long, value_delimiter = ',', value_parser = parse_column)]
    pub columns: Vec<ColumnSpec>,

    /// Case-insensitive search across all columns
    #[arg(short, long, default_value = "")]
    pub search: String,

    /// Column filter as key=value, or key:=value to match numbers and booleans exactly (repeatable)
    #[arg(short, long, value_parser = parse_filter)]
    pub filter: Vec<FilterSpec>,

    /// Sort key as key or key:desc (repeatable, first is primary)
    #[arg(long, value_parser = parse_sort)]
    pub sort: Vec<SortKey>,
}

impl ViewArgs {
    /// Build the view state for the given paging.
    pub fn view_state(&self, page: usize, page_size: NonZeroUsize) -> ViewState {
        let mut state = ViewState::default()
            .with_page_size(page_size)
            .with_search(self.search.clone())
            .with_sort(self.sort.clone());
        for filter in &self.filter {
            state = state.with_filter(filter.key.clone(), filter.value.clone());
        }
        state.page = page.max(1);
        state
    }

    /// The requested columns, or one column per key of the first record.
    pub fn columns_for(&self, records: &[serde_json::Value]) -> Vec<Column<serde_json::Value>> {
        if !self.columns.is_empty() {
            return self.columns.iter().map(ColumnSpec::to_column).collect();
        }

        records
            .first()
            .and_then(|record| record.as_object())
            .map(|object| {
                object
                    .keys()
                    .map(|key| Column::json(key.clone(), key.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}
