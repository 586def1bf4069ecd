//! SQL compiler: statement AST → parameterized SQL plus a bind schedule.
//!
//! Rendering emits one positional `?` per literal or late-bound parameter and
//! appends the matching `Scalar` to the schedule in strict left-to-right
//! order of appearance. Binding the compiled statement against a context then
//! yields the concrete parameter list in that same order.

use crate::ast::{BindContext, Expr, Scalar, Statement, UnaryOp};
use alloc::string::String;
use alloc::vec::Vec;
use cambium_core::{Error, Order, Result, Value};

/// A compiled statement: SQL text plus its parameter schedule.
#[derive(Clone, Debug)]
pub struct CompiledSql {
    sql: String,
    params: Vec<Scalar>,
}

impl CompiledSql {
    /// Returns the SQL text.
    #[inline]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns the parameter schedule in placeholder order.
    #[inline]
    pub fn params(&self) -> &[Scalar] {
        &self.params
    }

    /// Resolves the schedule against a bind context into concrete values.
    pub fn bind(&self, ctx: &BindContext<'_>) -> Result<Vec<Value>> {
        self.params.iter().map(|p| p.resolve(ctx)).collect()
    }
}

/// Compiles a statement into SQL text and a parameter schedule.
pub fn compile(stmt: &Statement) -> Result<CompiledSql> {
    let mut r = Renderer::new();
    match stmt {
        Statement::Select {
            table,
            columns,
            filter,
            order_by,
            limit,
        } => r.render_select(table, columns, filter.as_ref(), order_by, limit.as_ref())?,
        Statement::Count { table, filter } => r.render_count(table, filter.as_ref())?,
        Statement::Insert {
            table,
            values,
            on_conflict,
        } => r.render_insert(table, values, on_conflict.as_ref())?,
        Statement::Update { table, set, key } => r.render_update(table, set, key)?,
        Statement::Delete { table, key } => r.render_delete(table, key)?,
    }
    let compiled = r.finish();
    tracing::trace!(sql = compiled.sql.as_str(), params = compiled.params.len(), "compiled statement");
    Ok(compiled)
}

struct Renderer {
    sql: String,
    params: Vec<Scalar>,
}

impl Renderer {
    fn new() -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn finish(self) -> CompiledSql {
        CompiledSql {
            sql: self.sql,
            params: self.params,
        }
    }

    fn push(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    fn push_placeholder(&mut self, scalar: Scalar) {
        self.sql.push('?');
        self.params.push(scalar);
    }

    /// Renders an expression. `Asterisk` is only legal in a select column
    /// list, which is rendered separately; reaching it here is unsupported.
    fn render_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Column(name) => {
                self.push(name);
                Ok(())
            }
            Expr::Literal(value) => {
                self.push_placeholder(Scalar::Value(value.clone()));
                Ok(())
            }
            Expr::Param(path) => {
                self.push_placeholder(Scalar::Param(path.clone()));
                Ok(())
            }
            Expr::Binary { left, op, right } => {
                self.push("(");
                self.render_expr(left)?;
                self.push(" ");
                self.push(op.sql_token());
                self.push(" ");
                self.render_expr(right)?;
                self.push(")");
                Ok(())
            }
            Expr::Unary { op, expr } => {
                self.push("(");
                self.push(op.sql_token());
                if matches!(op, UnaryOp::Not) {
                    self.push(" ");
                }
                self.render_expr(expr)?;
                self.push(")");
                Ok(())
            }
            Expr::Function { name, args } => {
                self.push(name);
                self.push("(");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.render_expr(arg)?;
                }
                self.push(")");
                Ok(())
            }
            Expr::Tuple(exprs) => {
                self.push("(");
                for (i, e) in exprs.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.render_expr(e)?;
                }
                self.push(")");
                Ok(())
            }
            Expr::Asterisk => Err(Error::compile_unsupported(
                "asterisk outside select column list",
            )),
        }
    }

    fn render_select(
        &mut self,
        table: &str,
        columns: &[Expr],
        filter: Option<&Expr>,
        order_by: &[(String, Order)],
        limit: Option<&Scalar>,
    ) -> Result<()> {
        self.push("SELECT ");
        for (i, col) in columns.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            if matches!(col, Expr::Asterisk) {
                self.push("*");
            } else {
                self.render_expr(col)?;
            }
        }
        self.push(" FROM (");
        self.push(table);
        self.push(")");
        if let Some(filter) = filter {
            self.push(" WHERE ");
            self.render_expr(filter)?;
        }
        if !order_by.is_empty() {
            self.push(" ORDER BY ");
            for (i, (col, order)) in order_by.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.push(col);
                self.push(match order {
                    Order::Asc => " ASC",
                    Order::Desc => " DESC",
                });
            }
        }
        if let Some(limit) = limit {
            self.push(" LIMIT ");
            self.push_placeholder(limit.clone());
        }
        Ok(())
    }

    fn render_count(&mut self, table: &str, filter: Option<&Expr>) -> Result<()> {
        self.push("SELECT COUNT(*) FROM (");
        self.push(table);
        self.push(")");
        if let Some(filter) = filter {
            self.push(" WHERE ");
            self.render_expr(filter)?;
        }
        Ok(())
    }

    fn render_insert(
        &mut self,
        table: &str,
        values: &[(String, Scalar)],
        on_conflict: Option<&crate::ast::OnConflict>,
    ) -> Result<()> {
        if values.is_empty() {
            return Err(Error::schema_violation("insert with no columns"));
        }
        self.push("INSERT INTO ");
        self.push(table);
        self.push(" (");
        for (i, (col, _)) in values.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push(col);
        }
        self.push(") VALUES (");
        for (i, (_, scalar)) in values.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_placeholder(scalar.clone());
        }
        self.push(")");
        if let Some(clause) = on_conflict {
            self.push(" ON CONFLICT (");
            for (i, col) in clause.columns.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.push(col);
            }
            self.push(") DO UPDATE SET ");
            for (i, (col, scalar)) in clause.set.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.push(col);
                self.push(" = ");
                self.push_placeholder(scalar.clone());
            }
        }
        Ok(())
    }

    fn render_update(
        &mut self,
        table: &str,
        set: &[(String, Scalar)],
        key: &[(String, Scalar)],
    ) -> Result<()> {
        if set.is_empty() {
            return Err(Error::schema_violation("update with no assignments"));
        }
        if key.is_empty() {
            return Err(Error::schema_violation("update with no key"));
        }
        self.push("UPDATE ");
        self.push(table);
        self.push(" SET ");
        for (i, (col, scalar)) in set.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push(col);
            self.push(" = ");
            self.push_placeholder(scalar.clone());
        }
        self.push(" WHERE ");
        self.render_key_predicate(key);
        Ok(())
    }

    fn render_delete(&mut self, table: &str, key: &[(String, Scalar)]) -> Result<()> {
        if key.is_empty() {
            return Err(Error::schema_violation("delete with no key"));
        }
        self.push("DELETE FROM ");
        self.push(table);
        self.push(" WHERE ");
        self.render_key_predicate(key);
        Ok(())
    }

    fn render_key_predicate(&mut self, key: &[(String, Scalar)]) {
        for (i, (col, scalar)) in key.iter().enumerate() {
            if i > 0 {
                self.push(" AND ");
            }
            self.push(col);
            self.push(" = ");
            self.push_placeholder(scalar.clone());
        }
    }
}
