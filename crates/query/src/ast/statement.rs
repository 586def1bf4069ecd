//! Statement AST definitions.
//!
//! Statements are immutable values describing one table operation. They carry
//! the table name and parameterizable scalars; the compiler turns them into
//! SQL text plus a bind schedule.

use super::expr::{Expr, Scalar};
use alloc::string::String;
use alloc::vec::Vec;
use cambium_core::Order;

/// Conflict clause of an insert: on conflict over `columns`, update `set`.
#[derive(Clone, Debug, PartialEq)]
pub struct OnConflict {
    /// The conflict-target columns (the unique key).
    pub columns: Vec<String>,
    /// Assignments applied when the conflict fires, in iteration order.
    pub set: Vec<(String, Scalar)>,
}

/// Statement AST node.
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    /// Row-returning select.
    Select {
        table: String,
        columns: Vec<Expr>,
        filter: Option<Expr>,
        order_by: Vec<(String, Order)>,
        limit: Option<Scalar>,
    },
    /// `SELECT COUNT(*)`.
    Count {
        table: String,
        filter: Option<Expr>,
    },
    /// Insert with an optional on-conflict-do-update clause.
    Insert {
        table: String,
        values: Vec<(String, Scalar)>,
        on_conflict: Option<OnConflict>,
    },
    /// Update by primary key.
    Update {
        table: String,
        set: Vec<(String, Scalar)>,
        key: Vec<(String, Scalar)>,
    },
    /// Delete by primary key.
    Delete {
        table: String,
        key: Vec<(String, Scalar)>,
    },
}

impl Statement {
    /// Creates a bare select over the given columns.
    pub fn select(table: impl Into<String>, columns: Vec<Expr>) -> Self {
        Statement::Select {
            table: table.into(),
            columns,
            filter: None,
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Creates a count statement.
    pub fn count(table: impl Into<String>, filter: Option<Expr>) -> Self {
        Statement::Count {
            table: table.into(),
            filter,
        }
    }

    /// Creates an insert statement.
    pub fn insert(table: impl Into<String>, values: Vec<(String, Scalar)>) -> Self {
        Statement::Insert {
            table: table.into(),
            values,
            on_conflict: None,
        }
    }

    /// Creates an update statement.
    pub fn update(
        table: impl Into<String>,
        set: Vec<(String, Scalar)>,
        key: Vec<(String, Scalar)>,
    ) -> Self {
        Statement::Update {
            table: table.into(),
            set,
            key,
        }
    }

    /// Creates a delete statement.
    pub fn delete(table: impl Into<String>, key: Vec<(String, Scalar)>) -> Self {
        Statement::Delete {
            table: table.into(),
            key,
        }
    }

    /// Sets the filter of a select or count; no-op on other kinds.
    pub fn with_filter(mut self, expr: Expr) -> Self {
        match &mut self {
            Statement::Select { filter, .. } | Statement::Count { filter, .. } => {
                *filter = Some(expr);
            }
            _ => {}
        }
        self
    }

    /// Sets the ordering of a select; no-op on other kinds.
    pub fn with_order_by(mut self, order: Vec<(String, Order)>) -> Self {
        if let Statement::Select { order_by, .. } = &mut self {
            *order_by = order;
        }
        self
    }

    /// Sets the limit of a select; no-op on other kinds.
    pub fn with_limit(mut self, scalar: Scalar) -> Self {
        if let Statement::Select { limit, .. } = &mut self {
            *limit = Some(scalar);
        }
        self
    }

    /// Sets the conflict clause of an insert; no-op on other kinds.
    pub fn with_on_conflict(mut self, clause: OnConflict) -> Self {
        if let Statement::Insert { on_conflict, .. } = &mut self {
            *on_conflict = Some(clause);
        }
        self
    }

    /// Returns the table this statement targets.
    pub fn table(&self) -> &str {
        match self {
            Statement::Select { table, .. }
            | Statement::Count { table, .. }
            | Statement::Insert { table, .. }
            | Statement::Update { table, .. }
            | Statement::Delete { table, .. } => table,
        }
    }
}
