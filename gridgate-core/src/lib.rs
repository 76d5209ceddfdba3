//! # Gridgate Core
//!
//! The tabular data engine behind every list screen.
//!
//! This crate provides:
//! - [`Column`] and [`Value`] - Typed access to arbitrary record types
//! - [`ViewState`] and [`DerivedView`] - Search, filters, sort, and paging in, filtered and sorted records out
//! - [`engine`] - Pure search, filter, and stable multi-key sort
//! - [`pagination`] - Page slicing with clamping
//! - [`export`] - CSV export of the full derived view
//! - [`Selection`] - Row selection keyed by a stable record identity
//! - [`Table`] - A facade holding records, columns, and view state together
//!
//! ## Quick Start
//!
//! ```rust
//! use gridgate_core::{Column, SortKey, Table, ViewState};
//! use serde_json::json;
//!
//! let records = vec![
//!     json!({"name": "Bob", "age": 30}),
//!     json!({"name": "Amy", "age": 25}),
//! ];
//! let columns = vec![Column::json("name", "Name"), Column::json("age", "Age")];
//! let state = ViewState::default().with_sort(vec![SortKey::asc("age")]);
//!
//! let table = Table::new(records, columns, state);
//! let view = table.derived_view();
//! assert_eq!(view.sorted[0]["name"], "Amy");
//! ```

pub mod column;
pub mod engine;
pub mod export;
pub mod pagination;
pub mod selection;
pub mod table;
pub mod value;
pub mod view;

// Re-export commonly used types at crate root
pub use column::{
    Column,
    ColumnKind,
    ColumnOption,
};

pub use value::Value;

pub use view::{
    DerivedView,
    SortDirection,
    SortKey,
    ViewState,
    DEFAULT_PAGE_SIZE,
};

pub use pagination::Page;

pub use export::{
    ExportError,
    default_export_filename,
    export_filename,
};

pub use selection::Selection;

pub use table::Table;
