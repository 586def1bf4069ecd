//! Expression AST definitions.
//!
//! Expressions form the WHERE predicates, column lists and cursor tuples of
//! every statement. Late-bound parameters are plain data: a `FieldPath` names
//! where in the bind context the value comes from, so compiled statements can
//! be rebound any number of times without captured closures.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use cambium_core::{Error, Result, Row, Value};

/// Binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    // Logical
    And,
    Or,
}

impl BinaryOp {
    /// Returns the SQL token for this operator.
    pub fn sql_token(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }

    /// Returns whether this is a comparison operator.
    #[inline]
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

impl UnaryOp {
    /// Returns the SQL token for this operator.
    pub fn sql_token(&self) -> &'static str {
        match self {
            UnaryOp::Not => "NOT",
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
        }
    }
}

/// The root a late-bound parameter resolves against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindRoot {
    /// The full row of a mutation context.
    Row,
    /// The primary-key record of a mutation context.
    Key,
    /// The cursor record of a pagination context.
    Cursor,
    /// The page-size limit of a pagination context.
    Limit,
}

/// A path into the bind context: a root plus an optional field name.
///
/// Parameters are data rather than captured closures, so a compiled statement
/// is serializable and can be rebound against any context.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldPath {
    root: BindRoot,
    field: Option<String>,
}

impl FieldPath {
    /// A path to a field of the context row.
    pub fn row(field: impl Into<String>) -> Self {
        Self {
            root: BindRoot::Row,
            field: Some(field.into()),
        }
    }

    /// A path to a field of the context key record.
    pub fn key(field: impl Into<String>) -> Self {
        Self {
            root: BindRoot::Key,
            field: Some(field.into()),
        }
    }

    /// A path to a field of the context cursor.
    pub fn cursor(field: impl Into<String>) -> Self {
        Self {
            root: BindRoot::Cursor,
            field: Some(field.into()),
        }
    }

    /// The path to the context limit.
    pub fn limit() -> Self {
        Self {
            root: BindRoot::Limit,
            field: None,
        }
    }

    /// Returns the root of this path.
    #[inline]
    pub fn root(&self) -> BindRoot {
        self.root
    }

    /// Returns the field component, if any.
    #[inline]
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Renders the path for error messages, e.g. `cursor.id`.
    pub fn describe(&self) -> String {
        let root = match self.root {
            BindRoot::Row => "row",
            BindRoot::Key => "key",
            BindRoot::Cursor => "cursor",
            BindRoot::Limit => "limit",
        };
        match &self.field {
            Some(field) => format!("{}.{}", root, field),
            None => String::from(root),
        }
    }
}

/// A bind-time value source: a literal captured at build time, or a
/// late-bound field path resolved against the bind context.
///
/// This is the union of parameterizable nodes; insert/update/delete carry
/// one per column, and every rendered `?` placeholder schedules one.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    /// Literal value, fixed when the statement was built.
    Value(Value),
    /// Late-bound parameter resolved at bind time.
    Param(FieldPath),
}

impl Scalar {
    /// Resolves this scalar against a bind context.
    pub fn resolve(&self, ctx: &BindContext<'_>) -> Result<Value> {
        match self {
            Scalar::Value(v) => Ok(v.clone()),
            Scalar::Param(path) => ctx.resolve(path),
        }
    }
}

impl From<Value> for Scalar {
    fn from(v: Value) -> Self {
        Scalar::Value(v)
    }
}

impl From<FieldPath> for Scalar {
    fn from(p: FieldPath) -> Self {
        Scalar::Param(p)
    }
}

/// The context a compiled statement's parameters resolve against.
#[derive(Clone, Copy, Debug, Default)]
pub struct BindContext<'a> {
    row: Option<&'a Row>,
    key: Option<&'a Row>,
    cursor: Option<&'a Row>,
    limit: Option<i64>,
}

impl<'a> BindContext<'a> {
    /// Creates an empty bind context.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the context row.
    pub fn with_row(mut self, row: &'a Row) -> Self {
        self.row = Some(row);
        self
    }

    /// Sets the context key record.
    pub fn with_key(mut self, key: &'a Row) -> Self {
        self.key = Some(key);
        self
    }

    /// Sets the context cursor.
    pub fn with_cursor(mut self, cursor: &'a Row) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// Sets the context limit.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resolves a field path, erring with `MissingBinding` when the root or
    /// field is absent.
    pub fn resolve(&self, path: &FieldPath) -> Result<Value> {
        match path.root() {
            BindRoot::Limit => self
                .limit
                .map(Value::Int64)
                .ok_or_else(|| Error::missing_binding(path.describe())),
            root => {
                let record = match root {
                    BindRoot::Row => self.row,
                    BindRoot::Key => self.key,
                    BindRoot::Cursor => self.cursor,
                    BindRoot::Limit => unreachable!(),
                };
                let record =
                    record.ok_or_else(|| Error::missing_binding(path.describe()))?;
                let field = path
                    .field()
                    .ok_or_else(|| Error::missing_binding(path.describe()))?;
                record
                    .get(field)
                    .cloned()
                    .ok_or_else(|| Error::missing_binding(path.describe()))
            }
        }
    }
}

/// Expression AST node.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Column reference by name.
    Column(String),
    /// Literal value; renders as a positional placeholder.
    Literal(Value),
    /// Late-bound parameter; renders as a positional placeholder.
    Param(FieldPath),
    /// Binary operation.
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// Unary operation.
    Unary { op: UnaryOp, expr: Box<Expr> },
    /// Function call.
    Function { name: String, args: Vec<Expr> },
    /// Row-value tuple.
    Tuple(Vec<Expr>),
    /// `*`, valid only in a select column list.
    Asterisk,
}

impl Expr {
    /// Creates a column reference.
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    /// Creates a literal expression.
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// Creates a late-bound parameter expression.
    pub fn param(path: FieldPath) -> Self {
        Expr::Param(path)
    }

    /// Creates a row-value tuple.
    pub fn tuple(exprs: Vec<Expr>) -> Self {
        Expr::Tuple(exprs)
    }

    /// Creates a function call.
    pub fn function(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Function {
            name: name.into(),
            args,
        }
    }

    fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Creates an equality expression.
    pub fn eq(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOp::Eq, right)
    }

    /// Creates a not-equal expression.
    pub fn ne(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOp::Ne, right)
    }

    /// Creates a less-than expression.
    pub fn lt(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOp::Lt, right)
    }

    /// Creates a less-than-or-equal expression.
    pub fn le(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOp::Le, right)
    }

    /// Creates a greater-than expression.
    pub fn gt(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOp::Gt, right)
    }

    /// Creates a greater-than-or-equal expression.
    pub fn ge(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOp::Ge, right)
    }

    /// Creates an addition expression.
    pub fn add(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOp::Add, right)
    }

    /// Creates a subtraction expression.
    pub fn sub(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOp::Sub, right)
    }

    /// Creates a multiplication expression.
    pub fn mul(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOp::Mul, right)
    }

    /// Creates a division expression.
    pub fn div(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOp::Div, right)
    }

    /// Creates an exponentiation expression.
    pub fn pow(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOp::Pow, right)
    }

    /// Creates a conjunction.
    pub fn and(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOp::And, right)
    }

    /// Creates a disjunction.
    pub fn or(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOp::Or, right)
    }

    /// Creates a negation.
    pub fn not(expr: Expr) -> Self {
        Expr::Unary {
            op: UnaryOp::Not,
            expr: Box::new(expr),
        }
    }

    /// Creates an arithmetic negation.
    pub fn neg(expr: Expr) -> Self {
        Expr::Unary {
            op: UnaryOp::Neg,
            expr: Box::new(expr),
        }
    }

    /// Returns a short name for the node kind, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Column(_) => "column",
            Expr::Literal(_) => "literal",
            Expr::Param(_) => "param",
            Expr::Binary { .. } => "binary",
            Expr::Unary { .. } => "unary",
            Expr::Function { .. } => "function",
            Expr::Tuple(_) => "tuple",
            Expr::Asterisk => "asterisk",
        }
    }
}
