//! AST definitions for Cambium statements and expressions.

mod expr;
mod statement;

pub use expr::{BinaryOp, BindContext, BindRoot, Expr, FieldPath, Scalar, UnaryOp};
pub use statement::{OnConflict, Statement};
