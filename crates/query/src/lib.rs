//! Cambium Query - Statement AST, SQL compiler and pagination planner.
//!
//! This crate turns declarative table operations into backend SQL:
//!
//! - `ast`: Expression and statement sum types with late-bound parameters
//!   carried as data (`FieldPath`), not closures
//! - `compile`: Statement → parameterized SQL plus an ordered bind schedule
//! - `paginate`: Seek-pagination planner producing the seven-query bundle
//!   (first/last/next/prev/count-total/count-after/count-before)
//! - `interp`: Client-side expression evaluation against a single row
//!
//! # Example
//!
//! ```rust
//! use cambium_query::ast::{BindContext, Expr, FieldPath, Scalar, Statement};
//! use cambium_query::compile::compile;
//! use cambium_core::{Row, Value};
//!
//! let stmt = Statement::select("users", vec![Expr::column("id")])
//!     .with_filter(Expr::gt(Expr::column("age"), Expr::literal(18i64)))
//!     .with_limit(Scalar::Param(FieldPath::limit()));
//!
//! let compiled = compile(&stmt).unwrap();
//! assert_eq!(
//!     compiled.sql(),
//!     "SELECT id FROM (users) WHERE (age > ?) LIMIT ?"
//! );
//!
//! let params = compiled.bind(&BindContext::new().with_limit(10)).unwrap();
//! assert_eq!(params, vec![Value::Int64(18), Value::Int64(10)]);
//! ```

#![no_std]

extern crate alloc;

pub mod ast;
pub mod builder;
pub mod compile;
pub mod interp;
pub mod lower;
pub mod paginate;

pub use ast::{BinaryOp, BindContext, BindRoot, Expr, FieldPath, OnConflict, Scalar, Statement, UnaryOp};
pub use builder::{col, lit, ExprExt};
pub use compile::{compile, CompiledSql};
pub use lower::expand_row_values;
pub use paginate::{Page, PageQueries, PageQuery, PageRequest, RowValues};
