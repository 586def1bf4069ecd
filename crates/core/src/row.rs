//! Row structure for Cambium tables.
//!
//! A row is an insertion-ordered mapping from column name to value. Partial
//! rows (a subset of a table's columns) are first-class: update change sets,
//! primary-key records and cursors are all rows over fewer columns.

use crate::error::{Error, Result};
use crate::value::Value;
use alloc::string::String;
use alloc::vec::Vec;

/// A row in a table: column name → value, in insertion order.
///
/// Tables in this system are narrow, so entries are kept in a vector and
/// looked up by linear scan. Iteration order is the order columns were set,
/// which makes rendered column lists deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Row {
    entries: Vec<(String, Value)>,
}

impl Row {
    /// Creates an empty row.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a row from (name, value) pairs.
    pub fn from_pairs<I, N, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<Value>,
    {
        let mut row = Self::new();
        for (name, value) in pairs {
            row.set(name, value);
        }
        row
    }

    /// Returns the number of columns bound in this row.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no columns are bound.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Gets the value bound to a column, if any.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Returns whether the column is bound in this row.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Binds a value to a column, replacing any existing binding in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Iterates over (name, value) pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Returns the column names in insertion order.
    pub fn column_names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Shallow-merges another row into this one, right-biased.
    ///
    /// Columns bound in `other` replace this row's bindings; columns absent
    /// from `other` are left untouched. Used to fold update events into a
    /// live snapshot.
    pub fn merge(&mut self, other: &Row) {
        for (name, value) in other.iter() {
            self.set(name, value.clone());
        }
    }

    /// Returns a new row restricted to the named columns, in that order.
    ///
    /// Columns absent from this row are skipped.
    pub fn project(&self, columns: &[&str]) -> Row {
        let mut out = Row::new();
        for &name in columns {
            if let Some(value) = self.get(name) {
                out.set(name, value.clone());
            }
        }
        out
    }

    /// Materializes the named columns as a value tuple, in the given order.
    ///
    /// Errors with `SchemaViolation` when a component is missing; key tuples
    /// must be complete to route or bind correctly.
    pub fn key_tuple(&self, columns: &[String]) -> Result<Vec<Value>> {
        columns
            .iter()
            .map(|name| {
                self.get(name).cloned().ok_or_else(|| {
                    Error::schema_violation(alloc::format!(
                        "row is missing key column: {}",
                        name
                    ))
                })
            })
            .collect()
    }
}

impl<N: Into<String>, V: Into<Value>> FromIterator<(N, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Row::from_pairs(iter)
    }
}

/// Builds a single-column key record, a convenience for simple primary keys.
pub fn key_of(column: impl Into<String>, value: impl Into<Value>) -> Row {
    let mut row = Row::new();
    row.set(column, value);
    row
}
