//! Table schema definition.

use super::column::ColumnDef;
use crate::error::{Error, Result};
use crate::row::Row;
use crate::types::DataType;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// A table schema: name, ordered columns, and the primary-key column order.
///
/// Schemas are immutable configuration; primary-key order is significant
/// because it is the lexicographic cursor order for seek pagination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSchema {
    name: String,
    columns: Vec<ColumnDef>,
    primary_key: Vec<String>,
}

impl TableSchema {
    /// Returns the table name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the column definitions in declaration order.
    #[inline]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Returns the primary-key column names in declaration order.
    #[inline]
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// Gets a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Returns all column names in declaration order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    /// Returns the non-key column names in declaration order.
    pub fn non_key_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(|c| c.name())
            .filter(|n| !self.is_primary_key(n))
            .collect()
    }

    /// Returns whether the named column is part of the primary key.
    pub fn is_primary_key(&self, name: &str) -> bool {
        self.primary_key.iter().any(|k| k == name)
    }

    /// Validates a complete row against this schema.
    ///
    /// Every declared column must be bound with a kind-compatible value, and
    /// the row must not bind columns outside the schema.
    pub fn check_row(&self, row: &Row) -> Result<()> {
        for col in &self.columns {
            match row.get(col.name()) {
                None => {
                    return Err(Error::schema_violation(format!(
                        "row is missing column: {}",
                        col.name()
                    )))
                }
                Some(value) if !value.matches_type(col.kind()) => {
                    return Err(Error::type_mismatch(col.kind(), value.data_type()))
                }
                Some(_) => {}
            }
        }
        self.check_known_columns(row)
    }

    /// Validates a partial row: every bound column must exist and match its kind.
    pub fn check_partial(&self, row: &Row) -> Result<()> {
        for (name, value) in row.iter() {
            match self.column(name) {
                None => {
                    return Err(Error::schema_violation(format!(
                        "no such column: {}",
                        name
                    )))
                }
                Some(col) if !value.matches_type(col.kind()) => {
                    return Err(Error::type_mismatch(col.kind(), value.data_type()))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Validates a primary-key record: exactly the key columns, kind-matched.
    pub fn check_key(&self, key: &Row) -> Result<()> {
        for pk in &self.primary_key {
            if key.get(pk).is_none() {
                return Err(Error::schema_violation(format!(
                    "key is missing primary-key column: {}",
                    pk
                )));
            }
        }
        self.check_partial(key)
    }

    fn check_known_columns(&self, row: &Row) -> Result<()> {
        for (name, _) in row.iter() {
            if self.column(name).is_none() {
                return Err(Error::schema_violation(format!(
                    "no such column: {}",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Builder for table schemas.
pub struct SchemaBuilder {
    name: String,
    columns: Vec<ColumnDef>,
    primary_key: Vec<String>,
}

impl SchemaBuilder {
    /// Creates a new schema builder for the named table.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        check_naming_rules(&name)?;
        Ok(Self {
            name,
            columns: Vec::new(),
            primary_key: Vec::new(),
        })
    }

    /// Adds a column to the schema.
    pub fn column(mut self, name: impl Into<String>, kind: DataType) -> Result<Self> {
        let name = name.into();
        check_naming_rules(&name)?;
        if self.columns.iter().any(|c| c.name() == name) {
            return Err(Error::schema_violation(format!(
                "column already exists: {}",
                name
            )));
        }
        self.columns.push(ColumnDef::new(name, kind));
        Ok(self)
    }

    /// Sets the primary key, in cursor order.
    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Builds the schema, validating the primary key against the columns.
    pub fn build(self) -> Result<TableSchema> {
        if self.primary_key.is_empty() {
            return Err(Error::schema_violation("primary key must not be empty"));
        }
        for pk in &self.primary_key {
            if !self.columns.iter().any(|c| c.name() == *pk) {
                return Err(Error::schema_violation(format!(
                    "primary-key column not found: {}",
                    pk
                )));
            }
        }
        Ok(TableSchema {
            name: self.name,
            columns: self.columns,
            primary_key: self.primary_key,
        })
    }
}

/// Validates an identifier follows naming rules.
fn check_naming_rules(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::schema_violation("name cannot be empty"));
    }
    let first = name.chars().next().unwrap();
    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(Error::schema_violation(format!(
            "name must start with letter or underscore: {}",
            name
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::schema_violation(format!(
            "name contains invalid characters: {}",
            name
        )));
    }
    Ok(())
}
