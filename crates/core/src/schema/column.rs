//! Column definition for Cambium table schemas.

use crate::types::DataType;
use alloc::string::String;

/// A column declaration: a name and a scalar kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDef {
    name: String,
    kind: DataType,
}

impl ColumnDef {
    /// Creates a new column definition.
    pub fn new(name: impl Into<String>, kind: DataType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Returns the column name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared kind.
    #[inline]
    pub fn kind(&self) -> DataType {
        self.kind
    }
}
