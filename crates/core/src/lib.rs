//! Cambium Core - Core types for the Cambium reactive table layer.
//!
//! This crate provides the foundational types shared by every other crate:
//!
//! - `DataType`: Supported scalar kinds (Boolean, Int64, Float64, String, DateTime)
//! - `Value`: Runtime values stored in table cells and bound to statement parameters
//! - `Row`: A named record; full rows, partial rows, key records and cursors
//! - `schema`: Table schema declarations (columns + primary-key order)
//! - `comparator`: Direction type and lexicographic tuple/row comparison
//! - `Error`: Error taxonomy for the whole system
//!
//! # Example
//!
//! ```rust
//! use cambium_core::{DataType, Row, Value};
//! use cambium_core::schema::SchemaBuilder;
//!
//! let schema = SchemaBuilder::new("users")
//!     .unwrap()
//!     .column("id", DataType::Int64)
//!     .unwrap()
//!     .column("name", DataType::String)
//!     .unwrap()
//!     .primary_key(&["id"])
//!     .build()
//!     .unwrap();
//!
//! let row = Row::from_pairs([
//!     ("id", Value::Int64(1)),
//!     ("name", Value::String("Alice".into())),
//! ]);
//!
//! assert!(schema.check_row(&row).is_ok());
//! assert_eq!(row.get("name"), Some(&Value::String("Alice".into())));
//! ```

#![no_std]

extern crate alloc;

pub mod comparator;
mod error;
mod row;
pub mod schema;
mod types;
mod value;

pub use comparator::{tuple_compare, Order, RowComparator};
pub use error::{Error, Result};
pub use row::{key_of, Row};
pub use types::DataType;
pub use value::Value;
