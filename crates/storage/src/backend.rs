//! Backend contract for storage drivers.
//!
//! The core never talks SQL to a concrete engine; it prepares statements
//! through this interface and binds ordered parameter lists. Any synchronous
//! engine offering prepare/get/all/run plus transactions can sit behind it.

use alloc::boxed::Box;
use alloc::vec::Vec;
use cambium_core::{Result, Row, Value};

/// A prepared statement handle.
pub trait StatementHandle {
    /// Runs the statement expecting at most one row.
    fn get(&self, params: &[Value]) -> Result<Option<Row>>;

    /// Runs the statement collecting all rows.
    fn all(&self, params: &[Value]) -> Result<Vec<Row>>;

    /// Runs the statement for effect; returns whether any rows changed.
    fn run(&self, params: &[Value]) -> Result<bool>;
}

/// A synchronous, serialized storage backend.
pub trait Backend {
    /// Prepares a SQL statement.
    fn prepare(&self, sql: &str) -> Result<Box<dyn StatementHandle>>;

    /// Runs `f` inside a transaction: commit on `Ok`, roll back and
    /// re-raise on `Err`.
    fn transaction(&self, f: &mut dyn FnMut() -> Result<()>) -> Result<()>;
}
