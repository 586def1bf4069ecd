//! Storage adapter: schema-typed operations over a prepared-statement backend.
//!
//! `TableStore` owns the backend handle and the compiled-statement cache for
//! one table. The four fixed-shape statements (insert, upsert, delete-by-key,
//! select-by-key) are prepared eagerly at construction; update statements
//! depend on which columns change and are compiled on demand, cached by that
//! column shape. Cursor-paginated reads go through the pagination planner.

use crate::backend::{Backend, StatementHandle};
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use cambium_core::schema::TableSchema;
use cambium_core::{Error, Result, Row};
use cambium_query::ast::{BindContext, Expr, FieldPath, OnConflict, Scalar, Statement};
use cambium_query::compile::{compile, CompiledSql};
use cambium_query::paginate::{Page, PageQueries, PageQuery, PageRequest, RowValues};
use core::cell::RefCell;
use hashbrown::HashMap;

/// A prepared statement expecting at most one row.
pub struct PreparedQueryOne {
    compiled: CompiledSql,
    handle: Box<dyn StatementHandle>,
}

impl PreparedQueryOne {
    /// Binds the context and runs the query.
    pub fn run(&self, ctx: &BindContext<'_>) -> Result<Option<Row>> {
        self.handle.get(&self.compiled.bind(ctx)?)
    }

    /// Returns the compiled SQL text.
    #[inline]
    pub fn sql(&self) -> &str {
        self.compiled.sql()
    }
}

/// A prepared statement returning all matching rows.
pub struct PreparedQueryAll {
    compiled: CompiledSql,
    handle: Box<dyn StatementHandle>,
}

impl PreparedQueryAll {
    /// Binds the context and runs the query.
    pub fn run(&self, ctx: &BindContext<'_>) -> Result<Vec<Row>> {
        self.handle.all(&self.compiled.bind(ctx)?)
    }

    /// Returns the compiled SQL text.
    #[inline]
    pub fn sql(&self) -> &str {
        self.compiled.sql()
    }
}

/// A prepared `COUNT(*)` statement.
pub struct PreparedCount {
    compiled: CompiledSql,
    handle: Box<dyn StatementHandle>,
}

impl PreparedCount {
    /// Binds the context and returns the count.
    pub fn run(&self, ctx: &BindContext<'_>) -> Result<u64> {
        let row = self
            .handle
            .get(&self.compiled.bind(ctx)?)?
            .ok_or_else(|| Error::backend("count query returned no row"))?;
        let value = row
            .iter()
            .next()
            .map(|(_, v)| v.clone())
            .ok_or_else(|| Error::backend("count query returned an empty row"))?;
        value
            .as_i64()
            .map(|n| n.max(0) as u64)
            .ok_or_else(|| Error::backend("count query returned a non-integer"))
    }

    /// Returns the compiled SQL text.
    #[inline]
    pub fn sql(&self) -> &str {
        self.compiled.sql()
    }
}

/// A prepared mutation statement.
pub struct PreparedMutation {
    compiled: CompiledSql,
    handle: Box<dyn StatementHandle>,
}

impl PreparedMutation {
    /// Binds the context and runs the mutation; returns whether rows changed.
    pub fn run(&self, ctx: &BindContext<'_>) -> Result<bool> {
        self.handle.run(&self.compiled.bind(ctx)?)
    }

    /// Returns the compiled SQL text.
    #[inline]
    pub fn sql(&self) -> &str {
        self.compiled.sql()
    }
}

/// One member of a transactional mutation batch.
#[derive(Clone, Debug)]
pub enum Mutation {
    Insert { row: Row },
    Upsert { row: Row },
    Update { key: Row, changes: Row },
    Delete { key: Row },
}

/// The storage adapter for one table.
pub struct TableStore {
    schema: Rc<TableSchema>,
    backend: Rc<dyn Backend>,
    row_values: RowValues,
    insert_stmt: PreparedMutation,
    upsert_stmt: PreparedMutation,
    delete_stmt: PreparedMutation,
    find_stmt: PreparedQueryOne,
    update_cache: RefCell<HashMap<Vec<String>, Rc<PreparedMutation>>>,
}

impl TableStore {
    /// Creates the adapter, eagerly preparing the four fixed statements.
    /// Seek predicates use native row-value comparison.
    pub fn new(schema: Rc<TableSchema>, backend: Rc<dyn Backend>) -> Result<Self> {
        Self::with_row_values(schema, backend, RowValues::Native)
    }

    /// Creates the adapter for a backend with the given row-value support.
    /// Backends without row values get their seek predicates lowered to the
    /// scalar expansion.
    pub fn with_row_values(
        schema: Rc<TableSchema>,
        backend: Rc<dyn Backend>,
        row_values: RowValues,
    ) -> Result<Self> {
        let insert_stmt = prepare_mutation_on(&*backend, &insert_statement(&schema))?;
        let upsert_stmt = prepare_mutation_on(&*backend, &upsert_statement(&schema))?;
        let delete_stmt = prepare_mutation_on(&*backend, &delete_statement(&schema))?;
        let find_stmt = {
            let compiled = compile(&find_statement(&schema))?;
            let handle = backend.prepare(compiled.sql())?;
            PreparedQueryOne { compiled, handle }
        };
        Ok(Self {
            schema,
            backend,
            row_values,
            insert_stmt,
            upsert_stmt,
            delete_stmt,
            find_stmt,
            update_cache: RefCell::new(HashMap::new()),
        })
    }

    /// Returns the table schema.
    #[inline]
    pub fn schema(&self) -> &Rc<TableSchema> {
        &self.schema
    }

    /// Inserts a complete row.
    pub fn insert(&self, row: &Row) -> Result<()> {
        self.schema.check_row(row)?;
        tracing::debug!(table = self.schema.name(), "insert");
        self.insert_stmt
            .run(&BindContext::new().with_row(row))
            .map(|_| ())
    }

    /// Inserts a complete row, updating the non-key columns on conflict.
    pub fn upsert(&self, row: &Row) -> Result<()> {
        self.schema.check_row(row)?;
        tracing::debug!(table = self.schema.name(), "upsert");
        self.upsert_stmt
            .run(&BindContext::new().with_row(row))
            .map(|_| ())
    }

    /// Updates the named columns of one row.
    ///
    /// An empty change set is the fast-path no-op: no statement runs.
    pub fn update(&self, key: &Row, changes: &Row) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        self.schema.check_key(key)?;
        self.schema.check_partial(changes)?;

        let columns: Vec<String> = changes
            .column_names()
            .iter()
            .map(|c| c.to_string())
            .collect();
        let stmt = self.update_statement_for(&columns)?;
        tracing::debug!(table = self.schema.name(), columns = columns.len(), "update");
        stmt.run(&BindContext::new().with_row(changes).with_key(key))
            .map(|_| ())
    }

    /// Deletes one row by key. Deleting an absent key is not distinguished.
    pub fn delete(&self, key: &Row) -> Result<()> {
        self.schema.check_key(key)?;
        tracing::debug!(table = self.schema.name(), "delete");
        self.delete_stmt
            .run(&BindContext::new().with_key(key))
            .map(|_| ())
    }

    /// Loads one row by key.
    pub fn find_unique(&self, key: &Row) -> Result<Option<Row>> {
        self.schema.check_key(key)?;
        self.find_stmt.run(&BindContext::new().with_key(key))
    }

    /// Runs a cursor-paginated read.
    ///
    /// Returned rows are cursor records in order-by direction regardless of
    /// the fetch direction; counts complete the page accounting.
    pub fn find_many(&self, query: &PageQuery) -> Result<Page> {
        let queries = PageQueries::plan_with(
            &self.schema,
            &query.order_by,
            query.filter.as_ref(),
            self.row_values,
        )?;

        let load_first = self.prepare_compiled_all(&queries.load_first)?;
        let load_last = self.prepare_compiled_all(&queries.load_last)?;
        let load_next = self.prepare_compiled_all(&queries.load_next)?;
        let load_prev = self.prepare_compiled_all(&queries.load_prev)?;
        let count_total = self.prepare_compiled_count(&queries.count_total)?;
        let count_after = self.prepare_compiled_count(&queries.count_after)?;
        let count_before = self.prepare_compiled_count(&queries.count_before)?;

        let limit = query.request.limit() as i64;
        let mut rows = match &query.request {
            PageRequest::Forward { after: None, .. } => {
                load_first.run(&BindContext::new().with_limit(limit))?
            }
            PageRequest::Forward {
                after: Some(cursor),
                ..
            } => load_next.run(&BindContext::new().with_cursor(cursor).with_limit(limit))?,
            PageRequest::Backward { before: None, .. } => {
                load_last.run(&BindContext::new().with_limit(limit))?
            }
            PageRequest::Backward {
                before: Some(cursor),
                ..
            } => load_prev.run(&BindContext::new().with_cursor(cursor).with_limit(limit))?,
        };
        // Backward loads run under the inverted ordering; restore the
        // natural direction.
        if !query.request.is_forward() {
            rows.reverse();
        }

        let row_count = count_total.run(&BindContext::new())?;
        let start_cursor = rows.first().cloned();
        let end_cursor = rows.last().cloned();

        let item_before_count = match (&query.request, &start_cursor) {
            (PageRequest::Forward { after: None, .. }, _) => 0,
            (_, Some(start)) => count_before.run(&BindContext::new().with_cursor(start))?,
            (_, None) => row_count,
        };
        let item_after_count = match (&query.request, &end_cursor) {
            (PageRequest::Backward { before: None, .. }, _) => 0,
            (_, Some(end)) => count_after.run(&BindContext::new().with_cursor(end))?,
            (_, None) => row_count,
        };

        Ok(Page {
            rows,
            row_count,
            start_cursor,
            end_cursor,
            item_before_count,
            item_after_count,
        })
    }

    /// Runs a batch of mutations inside one backend transaction.
    pub fn mutate_many(&self, mutations: &[Mutation]) -> Result<()> {
        if mutations.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            table = self.schema.name(),
            mutations = mutations.len(),
            "mutate_many"
        );
        self.backend.transaction(&mut || {
            for mutation in mutations {
                self.apply(mutation)?;
            }
            Ok(())
        })
    }

    fn apply(&self, mutation: &Mutation) -> Result<()> {
        match mutation {
            Mutation::Insert { row } => self.insert(row),
            Mutation::Upsert { row } => self.upsert(row),
            Mutation::Update { key, changes } => self.update(key, changes),
            Mutation::Delete { key } => self.delete(key),
        }
    }

    /// Prepares an arbitrary statement expecting at most one row.
    pub fn prepare_query_one(&self, stmt: &Statement) -> Result<PreparedQueryOne> {
        let compiled = compile(stmt)?;
        let handle = self.backend.prepare(compiled.sql())?;
        Ok(PreparedQueryOne { compiled, handle })
    }

    /// Prepares an arbitrary row-returning statement.
    pub fn prepare_query_all(&self, stmt: &Statement) -> Result<PreparedQueryAll> {
        let compiled = compile(stmt)?;
        let handle = self.backend.prepare(compiled.sql())?;
        Ok(PreparedQueryAll { compiled, handle })
    }

    /// Prepares an arbitrary count statement.
    pub fn prepare_count(&self, stmt: &Statement) -> Result<PreparedCount> {
        let compiled = compile(stmt)?;
        let handle = self.backend.prepare(compiled.sql())?;
        Ok(PreparedCount { compiled, handle })
    }

    /// Prepares an arbitrary mutation statement.
    pub fn prepare_mutation(&self, stmt: &Statement) -> Result<PreparedMutation> {
        let compiled = compile(stmt)?;
        let handle = self.backend.prepare(compiled.sql())?;
        Ok(PreparedMutation { compiled, handle })
    }

    fn prepare_compiled_all(&self, compiled: &CompiledSql) -> Result<PreparedQueryAll> {
        let handle = self.backend.prepare(compiled.sql())?;
        Ok(PreparedQueryAll {
            compiled: compiled.clone(),
            handle,
        })
    }

    fn prepare_compiled_count(&self, compiled: &CompiledSql) -> Result<PreparedCount> {
        let handle = self.backend.prepare(compiled.sql())?;
        Ok(PreparedCount {
            compiled: compiled.clone(),
            handle,
        })
    }

    /// Gets or compiles the update statement for one set of changed columns.
    /// Entries are write-once per column shape.
    fn update_statement_for(&self, columns: &[String]) -> Result<Rc<PreparedMutation>> {
        if let Some(stmt) = self.update_cache.borrow().get(columns) {
            return Ok(stmt.clone());
        }
        let stmt = Rc::new(self.prepare_mutation(&update_statement(&self.schema, columns))?);
        self.update_cache
            .borrow_mut()
            .insert(columns.to_vec(), stmt.clone());
        Ok(stmt)
    }
}

fn prepare_mutation_on(backend: &dyn Backend, stmt: &Statement) -> Result<PreparedMutation> {
    let compiled = compile(stmt)?;
    let handle = backend.prepare(compiled.sql())?;
    Ok(PreparedMutation { compiled, handle })
}

fn insert_statement(schema: &TableSchema) -> Statement {
    let values = schema
        .column_names()
        .iter()
        .map(|c| (c.to_string(), Scalar::Param(FieldPath::row(*c))))
        .collect();
    Statement::insert(schema.name(), values)
}

fn upsert_statement(schema: &TableSchema) -> Statement {
    let stmt = insert_statement(schema);
    let set: Vec<(String, Scalar)> = schema
        .non_key_columns()
        .iter()
        .map(|c| (c.to_string(), Scalar::Param(FieldPath::row(*c))))
        .collect();
    // With no non-key columns there is nothing to update on conflict and
    // upsert degrades to a plain insert.
    if set.is_empty() {
        return stmt;
    }
    stmt.with_on_conflict(OnConflict {
        columns: schema.primary_key().to_vec(),
        set,
    })
}

fn delete_statement(schema: &TableSchema) -> Statement {
    let key = schema
        .primary_key()
        .iter()
        .map(|c| (c.clone(), Scalar::Param(FieldPath::key(c.clone()))))
        .collect();
    Statement::delete(schema.name(), key)
}

fn find_statement(schema: &TableSchema) -> Statement {
    let columns = schema
        .column_names()
        .iter()
        .map(|c| Expr::column(*c))
        .collect();
    Statement::select(schema.name(), columns).with_filter(key_predicate(schema))
}

fn update_statement(schema: &TableSchema, columns: &[String]) -> Statement {
    let set = columns
        .iter()
        .map(|c| (c.clone(), Scalar::Param(FieldPath::row(c.clone()))))
        .collect();
    let key = schema
        .primary_key()
        .iter()
        .map(|c| (c.clone(), Scalar::Param(FieldPath::key(c.clone()))))
        .collect();
    Statement::update(schema.name(), set, key)
}

/// `pk1 = ? AND pk2 = ? …` as an expression tree, for select-by-key.
fn key_predicate(schema: &TableSchema) -> Expr {
    let mut pred: Option<Expr> = None;
    for pk in schema.primary_key() {
        let eq = Expr::eq(
            Expr::column(pk.clone()),
            Expr::param(FieldPath::key(pk.clone())),
        );
        pred = Some(match pred {
            Some(p) => Expr::and(p, eq),
            None => eq,
        });
    }
    pred.expect("schemas carry a nonempty primary key")
}
