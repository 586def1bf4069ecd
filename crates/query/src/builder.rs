//! Fluent builders for query predicates.
//!
//! This module provides the `col`/`lit` entry points for building filter
//! expressions without spelling out AST nodes:
//!
//! ```rust
//! use cambium_query::builder::{col, lit, ExprExt};
//!
//! let filter = col("age").gte(lit(18i64)).and(col("age").lt(lit(65i64)));
//! ```
//!
//! Everything lowers to the plain `Expr` sum type; the builders carry no
//! state of their own.

use crate::ast::{Expr, FieldPath};
use alloc::string::String;
use cambium_core::{Order, Value};

/// Starts an expression from a column reference.
pub fn col(name: impl Into<String>) -> Col {
    Col { name: name.into() }
}

/// Starts an expression from a literal value.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

/// Starts an expression from a late-bound parameter.
pub fn param(path: FieldPath) -> Expr {
    Expr::Param(path)
}

/// A column reference under construction.
#[derive(Clone, Debug)]
pub struct Col {
    name: String,
}

impl Col {
    /// Finishes as a bare column expression.
    pub fn expr(self) -> Expr {
        Expr::Column(self.name)
    }

    /// Creates an equality expression: column = value
    pub fn eq(self, rhs: impl IntoExpr) -> Expr {
        Expr::eq(self.expr(), rhs.into_expr())
    }

    /// Creates a not-equal expression: column != value
    pub fn ne(self, rhs: impl IntoExpr) -> Expr {
        Expr::ne(self.expr(), rhs.into_expr())
    }

    /// Creates a greater-than expression: column > value
    pub fn gt(self, rhs: impl IntoExpr) -> Expr {
        Expr::gt(self.expr(), rhs.into_expr())
    }

    /// Creates a greater-than-or-equal expression: column >= value
    pub fn gte(self, rhs: impl IntoExpr) -> Expr {
        Expr::ge(self.expr(), rhs.into_expr())
    }

    /// Creates a less-than expression: column < value
    pub fn lt(self, rhs: impl IntoExpr) -> Expr {
        Expr::lt(self.expr(), rhs.into_expr())
    }

    /// Creates a less-than-or-equal expression: column <= value
    pub fn lte(self, rhs: impl IntoExpr) -> Expr {
        Expr::le(self.expr(), rhs.into_expr())
    }

    /// Pairs this column with ascending order, for order-by lists.
    pub fn asc(self) -> (String, Order) {
        (self.name, Order::Asc)
    }

    /// Pairs this column with descending order, for order-by lists.
    pub fn desc(self) -> (String, Order) {
        (self.name, Order::Desc)
    }
}

/// Combinators on finished expressions.
pub trait ExprExt {
    /// Conjunction: self AND other
    fn and(self, other: Expr) -> Expr;
    /// Disjunction: self OR other
    fn or(self, other: Expr) -> Expr;
    /// Negation: NOT self
    fn not(self) -> Expr;
}

impl ExprExt for Expr {
    fn and(self, other: Expr) -> Expr {
        Expr::and(self, other)
    }

    fn or(self, other: Expr) -> Expr {
        Expr::or(self, other)
    }

    fn not(self) -> Expr {
        Expr::not(self)
    }
}

/// Anything usable as the right-hand side of a comparison.
pub trait IntoExpr {
    fn into_expr(self) -> Expr;
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl IntoExpr for Col {
    fn into_expr(self) -> Expr {
        self.expr()
    }
}

impl IntoExpr for FieldPath {
    fn into_expr(self) -> Expr {
        Expr::Param(self)
    }
}

macro_rules! into_expr_via_value {
    ($($ty:ty),+ $(,)?) => {
        $(impl IntoExpr for $ty {
            fn into_expr(self) -> Expr {
                Expr::Literal(self.into())
            }
        })+
    };
}

into_expr_via_value!(Value, bool, i32, i64, f64, &str, String);
