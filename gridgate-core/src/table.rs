//! The table facade: records, columns, and view state behind one handle.
//!
//! [`Table`] is what list screens hold on to. It owns the current record set,
//! its [`ViewState`], and optionally a [`Selection`], funnels every state
//! change through its methods, and recomputes the derived view on demand.

use std::hash::Hash;
use std::io;
use std::num::NonZeroUsize;

use crate::column::{Column, find_column};
use crate::engine;
use crate::export::{self, ExportError};
use crate::pagination::{self, Page};
use crate::selection::Selection;
use crate::value::Value;
use crate::view::{DerivedView, SortKey, ViewState};

/// Records, columns, and view state for one list screen.
///
/// `K` is the selection key type; tables created with [`Table::new`] carry no
/// selection until [`Table::with_selection`] is called.
#[derive(Debug, Clone)]
pub struct Table<R, K = ()> {
    records: Vec<R>,
    columns: Vec<Column<R>>,
    state: ViewState,
    selection: Option<Selection<R, K>>,
}

impl<R> Table<R> {
    pub fn new(records: Vec<R>, columns: Vec<Column<R>>, state: ViewState) -> Self {
        Self {
            records,
            columns,
            state,
            selection: None,
        }
    }

    /// Track row selection by the key `key_fn` extracts from each record.
    pub fn with_selection<K, F>(self, key_fn: F) -> Table<R, K>
    where
        K: Eq + Hash + Clone,
        F: Fn(&R) -> K + Send + Sync + 'static,
    {
        Table {
            records: self.records,
            columns: self.columns,
            state: self.state,
            selection: Some(Selection::new(key_fn)),
        }
    }
}

impl<R, K> Table<R, K>
where
    K: Eq + Hash + Clone,
{
    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn columns(&self) -> &[Column<R>] {
        &self.columns
    }

    pub fn view_state(&self) -> &ViewState {
        &self.state
    }

    pub fn selection(&self) -> Option<&Selection<R, K>> {
        self.selection.as_ref()
    }

    pub fn selection_mut(&mut self) -> Option<&mut Selection<R, K>> {
        self.selection.as_mut()
    }

    /// Selected records in source order; empty without a selection.
    pub fn selected_records(&self) -> Vec<&R> {
        match &self.selection {
            Some(selection) => selection.selected_in(&self.records),
            None => Vec::new(),
        }
    }

    /// Replace the record set, keeping the current view state.
    ///
    /// Selected rows whose key is still present stay selected; keys that no
    /// longer appear are dropped.
    pub fn set_records(&mut self, records: Vec<R>) {
        if let Some(selection) = &mut self.selection {
            selection.retain_present(&records);
        }
        self.records = records;
    }

    /// Compute the filtered and sorted view of the current records.
    pub fn derived_view(&self) -> DerivedView<'_, R> {
        engine::derive(&self.records, &self.columns, &self.state)
    }

    /// Total number of records passing search and filters.
    pub fn total(&self) -> usize {
        self.derived_view().total
    }

    /// The current page number, clamped against the current total.
    pub fn current_page(&self) -> usize {
        pagination::clamp_page(self.state.page, self.total(), self.state.page_size)
    }

    pub fn page_count(&self) -> usize {
        pagination::page_count(self.total(), self.state.page_size)
    }

    /// Slice a derived view to the current page.
    pub fn page<'v, 'a>(&self, view: &'v DerivedView<'a, R>) -> Page<'v, &'a R> {
        pagination::paginate(&view.sorted, self.state.page, self.state.page_size)
    }

    /// Records on the current page, in display order.
    pub fn page_records(&self) -> Vec<&R> {
        let view = self.derived_view();
        self.page(&view).items.to_vec()
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.state.search_query = query.into();
    }

    /// Set or replace the filter for `key`.
    ///
    /// Inactive values (null, empty text, empty list) remove the filter.
    pub fn set_filter(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        if value.is_active_filter() {
            self.state.filters.insert(key, value);
        } else {
            self.state.filters.remove(&key);
        }
    }

    pub fn clear_filter(&mut self, key: &str) {
        self.state.filters.remove(key);
    }

    pub fn clear_filters(&mut self) {
        self.state.filters.clear();
    }

    /// Advance the sort cycle for a column.
    ///
    /// Returns `false` without changing anything when the column is unknown
    /// or not sortable.
    pub fn toggle_sort(&mut self, key: &str) -> bool {
        match find_column(&self.columns, key) {
            Some(column) if column.is_sortable() => {
                engine::toggle_sort(&mut self.state.sort, key);
                true
            }
            _ => false,
        }
    }

    pub fn set_sort(&mut self, sort: Vec<SortKey>) {
        self.state.sort = sort;
    }

    /// Request a page. The stored value is clamped whenever a page is read.
    pub fn set_page(&mut self, page: usize) {
        self.state.page = page.max(1);
    }

    /// Change the page size and return to the first page.
    pub fn set_page_size(&mut self, page_size: NonZeroUsize) {
        self.state.page_size = page_size;
        self.state.page = 1;
    }

    /// Write the whole filtered and sorted view as CSV.
    pub fn export_csv<W: io::Write>(&self, writer: W) -> Result<usize, ExportError> {
        let view = self.derived_view();
        export::write_csv(writer, &self.columns, view.sorted.iter().copied())
    }

    pub fn export_csv_string(&self) -> Result<String, ExportError> {
        let view = self.derived_view();
        export::export_csv_string(&self.columns, view.sorted.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value as Json, json};

    fn table() -> Table<Json> {
        let records = (1..=12)
            .map(|i| {
                let team = if i % 2 == 0 { "even" } else { "odd" };
                json!({"id": i, "name": format!("user-{:02}", i), "team": team})
            })
            .collect();
        let columns = vec![
            Column::json("id", "ID"),
            Column::json("name", "Name"),
            Column::json("team", "Team").sortable(false),
        ];
        Table::new(records, columns, ViewState::default())
    }

    fn ids(records: &[&Json]) -> Vec<i64> {
        records.iter().map(|r| r["id"].as_i64().unwrap()).collect()
    }

    #[test]
    fn test_page_size_change_resets_page() {
        let mut table = table();
        table.set_page(2);
        assert_eq!(table.current_page(), 2);

        table.set_page_size(NonZeroUsize::new(5).unwrap());
        assert_eq!(table.view_state().page, 1);
        assert_eq!(table.page_count(), 3);
    }

    #[test]
    fn test_page_clamped_after_filter_shrinks_total() {
        let mut table = table();
        table.set_page(2);
        table.set_filter("team", "even");

        assert_eq!(table.total(), 6);
        assert_eq!(table.current_page(), 1);
        assert_eq!(ids(&table.page_records()), vec![2, 4, 6, 8, 10, 12]);
    }

    #[test]
    fn test_empty_filter_value_removes_filter() {
        let mut table = table();
        table.set_filter("team", "odd");
        assert_eq!(table.total(), 6);

        table.set_filter("team", "");
        assert!(table.view_state().filters.is_empty());
        assert_eq!(table.total(), 12);
    }

    #[test]
    fn test_toggle_sort_respects_sortable() {
        let mut table = table();
        assert!(!table.toggle_sort("team"));
        assert!(!table.toggle_sort("nope"));
        assert!(table.view_state().sort.is_empty());

        assert!(table.toggle_sort("id"));
        assert!(table.toggle_sort("id"));
        assert_eq!(ids(&table.page_records())[0], 12);
    }

    #[test]
    fn test_selection_follows_reloaded_records() {
        let mut table = table().with_selection(|r: &Json| r["id"].as_i64());
        assert!(table.selected_records().is_empty());

        let page = table.page_records().into_iter().cloned().collect::<Vec<_>>();
        let selection = table.selection_mut().unwrap();
        selection.select(&page[1]);
        selection.select(&page[2]);

        // Regenerated records: same ids, fresh values, id 3 gone
        let reloaded = (1..=12)
            .filter(|i| *i != 3)
            .map(|i| json!({"id": i, "name": format!("renamed-{:02}", i), "team": "any"}))
            .collect();
        table.set_records(reloaded);

        let selected = table.selected_records();
        assert_eq!(ids(&selected), vec![2]);
        assert_eq!(selected[0]["name"], "renamed-02");
        assert_eq!(table.selection().unwrap().len(), 1);
    }

    #[test]
    fn test_table_without_selection() {
        let mut table = table();
        assert!(table.selection().is_none());
        table.set_records(vec![json!({"id": 1})]);
        assert!(table.selected_records().is_empty());
    }

    #[test]
    fn test_export_covers_all_pages() {
        let mut table = table();
        table.set_page_size(NonZeroUsize::new(3).unwrap());
        table.set_search("user-1");

        let csv = table.export_csv_string().unwrap();
        // header plus user-10, user-11, user-12
        assert_eq!(csv.lines().count(), 4);
        assert!(csv.starts_with("\"ID\",\"Name\",\"Team\"\n"));
    }
}
