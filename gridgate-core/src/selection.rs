//! Row selection keyed by record identity.
//!
//! Selection is tracked by a key extracted from each record, so it survives
//! the record set being reloaded or rebuilt between renders.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

type KeyFn<R, K> = Arc<dyn Fn(&R) -> K + Send + Sync>;

/// A set of selected records, identified by a caller-supplied key.
///
/// # Example
///
/// ```
/// use gridgate_core::Selection;
///
/// struct Task { id: u64, title: &'static str }
///
/// let tasks = vec![Task { id: 1, title: "a" }, Task { id: 2, title: "b" }];
/// let mut selection = Selection::new(|t: &Task| t.id);
/// selection.toggle(&tasks[1]);
///
/// // A freshly loaded copy of the same rows is still selected
/// let reloaded = vec![Task { id: 2, title: "b" }];
/// assert!(selection.is_selected(&reloaded[0]));
/// ```
pub struct Selection<R, K> {
    key_fn: KeyFn<R, K>,
    selected: HashSet<K>,
}

impl<R, K> Selection<R, K>
where
    K: Eq + Hash + Clone,
{
    pub fn new<F>(key_fn: F) -> Self
    where
        F: Fn(&R) -> K + Send + Sync + 'static,
    {
        Self {
            key_fn: Arc::new(key_fn),
            selected: HashSet::new(),
        }
    }

    pub fn key_of(&self, record: &R) -> K {
        (self.key_fn)(record)
    }

    pub fn is_selected(&self, record: &R) -> bool {
        self.selected.contains(&self.key_of(record))
    }

    pub fn select(&mut self, record: &R) {
        self.selected.insert(self.key_of(record));
    }

    pub fn deselect(&mut self, record: &R) {
        let key = self.key_of(record);
        self.selected.remove(&key);
    }

    /// Flip the selection state of a record. Returns the new state.
    pub fn toggle(&mut self, record: &R) -> bool {
        let key = self.key_of(record);
        if self.selected.remove(&key) {
            false
        } else {
            self.selected.insert(key);
            true
        }
    }

    pub fn select_all<'a, I>(&mut self, records: I)
    where
        R: 'a,
        I: IntoIterator<Item = &'a R>,
    {
        for record in records {
            self.select(record);
        }
    }

    /// Whether every record in `records` is selected (false when empty).
    pub fn all_selected<'a, I>(&self, records: I) -> bool
    where
        R: 'a,
        I: IntoIterator<Item = &'a R>,
    {
        let mut any = false;
        for record in records {
            if !self.is_selected(record) {
                return false;
            }
            any = true;
        }
        any
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.selected.iter()
    }

    /// Selected records of `records`, in source order.
    pub fn selected_in<'a>(&self, records: &'a [R]) -> Vec<&'a R> {
        records.iter().filter(|r| self.is_selected(r)).collect()
    }

    /// Drop selected keys that no longer appear in `records`.
    pub fn retain_present(&mut self, records: &[R]) {
        let present: HashSet<K> = records.iter().map(|r| self.key_of(r)).collect();
        self.selected.retain(|k| present.contains(k));
    }
}

impl<R, K: Clone> Clone for Selection<R, K> {
    fn clone(&self) -> Self {
        Self {
            key_fn: Arc::clone(&self.key_fn),
            selected: self.selected.clone(),
        }
    }
}

impl<R, K: fmt::Debug> fmt::Debug for Selection<R, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("selected", &self.selected)
            .finish()
    }
}
