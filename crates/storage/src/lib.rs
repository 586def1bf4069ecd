//! Cambium Storage - The storage adapter between tables and a backend.
//!
//! `TableStore` wraps a synchronous relational backend behind schema-typed
//! operations: insert/upsert/update/delete/find-unique run through an
//! internal compiled-statement cache, and `find_many` drives the
//! seek-pagination planner. The backend itself is abstract: anything
//! offering `prepare` → get/all/run plus transactions implements `Backend`.
//!
//! # Example
//!
//! ```ignore
//! use cambium_storage::TableStore;
//!
//! let store = TableStore::new(schema, backend)?;
//! store.insert(&row)?;
//! let page = store.find_many(&PageQuery::forward(10, None, order_by))?;
//! ```

#![no_std]

extern crate alloc;

mod adapter;
mod backend;

pub use adapter::{
    Mutation, PreparedCount, PreparedMutation, PreparedQueryAll, PreparedQueryOne, TableStore,
};
pub use backend::{Backend, StatementHandle};
