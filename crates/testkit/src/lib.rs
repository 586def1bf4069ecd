//! Test scaffolding for Cambium.
//!
//! The integration suites run against a real SQL engine: `SqliteBackend`
//! implements the storage backend contract over an in-memory SQLite
//! connection. SQLite speaks the full emitted surface — positional `?`
//! placeholders, row-value tuple comparison and `ON CONFLICT .. DO UPDATE` —
//! so it doubles as the reference engine for the pagination scenarios.

use cambium_core::schema::{SchemaBuilder, TableSchema};
use cambium_core::{DataType, Error, Result, Row, Value};
use cambium_storage::{Backend, StatementHandle};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes tracing for test binaries. Safe to call multiple times.
pub fn init_tracing_for_tests() {
    INIT.call_once(|| {
        use tracing_subscriber::filter::EnvFilter;
        use tracing_subscriber::fmt;
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt().with_env_filter(filter).with_target(false).init();
    });
}

/// An in-memory SQLite backend implementing the storage contract.
///
/// Column kinds are registered per table at DDL time so results decode back
/// to the declared kinds (SQLite stores booleans and datetimes as integers).
pub struct SqliteBackend {
    conn: Rc<Connection>,
    columns: Rc<RefCell<HashMap<String, DataType>>>,
}

impl SqliteBackend {
    /// Opens a fresh in-memory database.
    pub fn in_memory() -> Rc<Self> {
        let conn = Connection::open_in_memory().expect("open in-memory sqlite");
        Rc::new(Self {
            conn: Rc::new(conn),
            columns: Rc::new(RefCell::new(HashMap::new())),
        })
    }

    /// Creates the table for a schema and registers its column kinds.
    pub fn create_table(&self, schema: &TableSchema) {
        let mut ddl = String::from("CREATE TABLE ");
        ddl.push_str(schema.name());
        ddl.push_str(" (");
        for (i, col) in schema.columns().iter().enumerate() {
            if i > 0 {
                ddl.push_str(", ");
            }
            ddl.push_str(col.name());
            ddl.push(' ');
            ddl.push_str(affinity(col.kind()));
            self.columns
                .borrow_mut()
                .insert(col.name().to_string(), col.kind());
        }
        ddl.push_str(", PRIMARY KEY (");
        ddl.push_str(&schema.primary_key().join(", "));
        ddl.push_str("))");
        self.conn.execute_batch(&ddl).expect("create table");
    }

    /// Runs one raw SQL statement, for seeding fixtures.
    pub fn execute_sql(&self, sql: &str) {
        self.conn.execute_batch(sql).expect("execute sql");
    }
}

fn affinity(kind: DataType) -> &'static str {
    match kind {
        DataType::Boolean | DataType::Int64 | DataType::DateTime => "INTEGER",
        DataType::Float64 => "REAL",
        DataType::String => "TEXT",
    }
}

fn to_backend(err: rusqlite::Error) -> Error {
    Error::backend(err.to_string())
}

fn to_sql(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Boolean(b) => rusqlite::types::Value::Integer(*b as i64),
        Value::Int64(i) => rusqlite::types::Value::Integer(*i),
        Value::Float64(f) => rusqlite::types::Value::Real(*f),
        Value::String(s) => rusqlite::types::Value::Text(s.clone()),
        Value::DateTime(ts) => rusqlite::types::Value::Integer(*ts),
    }
}

fn decode(name: &str, value: ValueRef<'_>, kinds: &HashMap<String, DataType>) -> Value {
    match (kinds.get(name), value) {
        (Some(DataType::Boolean), ValueRef::Integer(i)) => Value::Boolean(i != 0),
        (Some(DataType::DateTime), ValueRef::Integer(i)) => Value::DateTime(i),
        (Some(DataType::Float64), ValueRef::Integer(i)) => Value::Float64(i as f64),
        (_, ValueRef::Null) => Value::Null,
        (_, ValueRef::Integer(i)) => Value::Int64(i),
        (_, ValueRef::Real(f)) => Value::Float64(f),
        (_, ValueRef::Text(t)) => Value::String(String::from_utf8_lossy(t).into_owned()),
        (_, ValueRef::Blob(_)) => Value::Null,
    }
}

struct SqliteStatement {
    conn: Rc<Connection>,
    columns: Rc<RefCell<HashMap<String, DataType>>>,
    sql: String,
}

impl SqliteStatement {
    fn query_rows(&self, params: &[Value]) -> Result<Vec<Row>> {
        let mut stmt = self.conn.prepare_cached(&self.sql).map_err(to_backend)?;
        let names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        let kinds = self.columns.borrow();

        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter().map(to_sql)))
            .map_err(to_backend)?;
        let mut out = Vec::new();
        while let Some(r) = rows.next().map_err(to_backend)? {
            let mut row = Row::new();
            for (i, name) in names.iter().enumerate() {
                let value = r.get_ref(i).map_err(to_backend)?;
                row.set(name.clone(), decode(name, value, &kinds));
            }
            out.push(row);
        }
        Ok(out)
    }
}

impl StatementHandle for SqliteStatement {
    fn get(&self, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.query_rows(params)?.into_iter().next())
    }

    fn all(&self, params: &[Value]) -> Result<Vec<Row>> {
        self.query_rows(params)
    }

    fn run(&self, params: &[Value]) -> Result<bool> {
        let mut stmt = self.conn.prepare_cached(&self.sql).map_err(to_backend)?;
        let changed = stmt
            .execute(rusqlite::params_from_iter(params.iter().map(to_sql)))
            .map_err(to_backend)?;
        Ok(changed > 0)
    }
}

impl Backend for SqliteBackend {
    fn prepare(&self, sql: &str) -> Result<Box<dyn StatementHandle>> {
        // Validate the statement up front; the handle re-prepares through
        // SQLite's statement cache on each call.
        self.conn.prepare(sql).map_err(to_backend)?;
        Ok(Box::new(SqliteStatement {
            conn: self.conn.clone(),
            columns: self.columns.clone(),
            sql: sql.to_string(),
        }))
    }

    fn transaction(&self, f: &mut dyn FnMut() -> Result<()>) -> Result<()> {
        self.conn.execute_batch("BEGIN").map_err(to_backend)?;
        match f() {
            Ok(()) => self.conn.execute_batch("COMMIT").map_err(to_backend),
            Err(err) => {
                self.conn
                    .execute_batch("ROLLBACK")
                    .map_err(to_backend)?;
                Err(err)
            }
        }
    }
}

/// The `users(id pk, name, age)` fixture schema.
pub fn users_schema() -> TableSchema {
    SchemaBuilder::new("users")
        .unwrap()
        .column("id", DataType::Int64)
        .unwrap()
        .column("name", DataType::String)
        .unwrap()
        .column("age", DataType::Int64)
        .unwrap()
        .primary_key(&["id"])
        .build()
        .unwrap()
}

/// The `composite(id, sub_id)` fixture schema with a composite primary key.
pub fn composite_schema() -> TableSchema {
    SchemaBuilder::new("composite")
        .unwrap()
        .column("id", DataType::Int64)
        .unwrap()
        .column("sub_id", DataType::Int64)
        .unwrap()
        .column("label", DataType::String)
        .unwrap()
        .primary_key(&["id", "sub_id"])
        .build()
        .unwrap()
}

/// Seeds `users` with ids 1..=10 and `age = 20 + id`.
pub fn seed_users(backend: &SqliteBackend) {
    backend.create_table(&users_schema());
    for id in 1..=10 {
        backend.execute_sql(&format!(
            "INSERT INTO users (id, name, age) VALUES ({id}, 'user{id}', {})",
            20 + id
        ));
    }
}

/// Seeds `composite` with the 3×2 grid (1..=3) × (1..=2).
pub fn seed_composite(backend: &SqliteBackend) {
    backend.create_table(&composite_schema());
    for id in 1..=3 {
        for sub_id in 1..=2 {
            backend.execute_sql(&format!(
                "INSERT INTO composite (id, sub_id, label) VALUES ({id}, {sub_id}, '{id}-{sub_id}')"
            ));
        }
    }
}
