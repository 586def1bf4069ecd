//! Scalar-kind round-trips through the backend contract.
//!
//! SQLite stores booleans and datetimes as integers; the testkit backend
//! decodes results against the declared schema, and the adapter must hand
//! kind-faithful rows back for every declared type.

use cambium_core::schema::{SchemaBuilder, TableSchema};
use cambium_core::{key_of, DataType, Order, Row, Value};
use cambium_query::builder::col;
use cambium_query::paginate::PageQuery;
use cambium_storage::TableStore;
use cambium_testkit::SqliteBackend;
use std::rc::Rc;

fn sessions_schema() -> TableSchema {
    SchemaBuilder::new("sessions")
        .unwrap()
        .column("id", DataType::Int64)
        .unwrap()
        .column("started_at", DataType::DateTime)
        .unwrap()
        .column("active", DataType::Boolean)
        .unwrap()
        .column("score", DataType::Float64)
        .unwrap()
        .primary_key(&["id"])
        .build()
        .unwrap()
}

fn sessions_store() -> TableStore {
    let backend = SqliteBackend::in_memory();
    backend.create_table(&sessions_schema());
    TableStore::new(Rc::new(sessions_schema()), backend).unwrap()
}

fn session(id: i64, started_at: i64, active: bool, score: f64) -> Row {
    Row::from_pairs([
        ("id", Value::Int64(id)),
        ("started_at", Value::DateTime(started_at)),
        ("active", Value::Boolean(active)),
        ("score", Value::Float64(score)),
    ])
}

#[test]
fn every_kind_round_trips() {
    let store = sessions_store();
    store.insert(&session(1, 1_700_000_000_000, true, 0.75)).unwrap();

    let found = store.find_unique(&key_of("id", 1i64)).unwrap().unwrap();
    assert_eq!(found.get("started_at"), Some(&Value::DateTime(1_700_000_000_000)));
    assert_eq!(found.get("active"), Some(&Value::Boolean(true)));
    assert_eq!(found.get("score"), Some(&Value::Float64(0.75)));
}

#[test]
fn boolean_filters_match() {
    let store = sessions_store();
    store.insert(&session(1, 10, true, 1.0)).unwrap();
    store.insert(&session(2, 20, false, 2.0)).unwrap();
    store.insert(&session(3, 30, true, 3.0)).unwrap();

    let query = PageQuery::forward(10, None, vec![col("id").asc()])
        .with_filter(col("active").eq(true));
    let page = store.find_many(&query).unwrap();

    let ids: Vec<i64> = page
        .rows
        .iter()
        .map(|r| r.get("id").unwrap().as_i64().unwrap())
        .collect();
    assert_eq!(ids, [1, 3]);
    assert_eq!(page.row_count, 2);
}

#[test]
fn float_ordering_column_carries_into_cursors() {
    let store = sessions_store();
    store.insert(&session(1, 10, true, 2.5)).unwrap();
    store.insert(&session(2, 20, true, 0.5)).unwrap();
    store.insert(&session(3, 30, true, 1.5)).unwrap();
    store.insert(&session(4, 40, true, 2.5)).unwrap();

    // Non-key ordering column ahead of the key; uniform ascending.
    let order = vec![("score".to_string(), Order::Asc), ("id".to_string(), Order::Asc)];

    let first = store
        .find_many(&PageQuery::forward(2, None, order.clone()))
        .unwrap();
    let got: Vec<(f64, i64)> = first
        .rows
        .iter()
        .map(|r| {
            (
                r.get("score").unwrap().as_f64().unwrap(),
                r.get("id").unwrap().as_i64().unwrap(),
            )
        })
        .collect();
    assert_eq!(got, [(0.5, 2), (1.5, 3)]);

    // The cursor carries both ordering components; ties on score break by id.
    let second = store
        .find_many(&PageQuery::forward(
            2,
            first.end_cursor.clone(),
            order.clone(),
        ))
        .unwrap();
    let got: Vec<(f64, i64)> = second
        .rows
        .iter()
        .map(|r| {
            (
                r.get("score").unwrap().as_f64().unwrap(),
                r.get("id").unwrap().as_i64().unwrap(),
            )
        })
        .collect();
    assert_eq!(got, [(2.5, 1), (2.5, 4)]);
    assert_eq!(second.item_before_count, 2);
    assert_eq!(second.item_after_count, 0);
}

#[test]
fn datetime_ordering_descending() {
    let store = sessions_store();
    store.insert(&session(1, 30, true, 1.0)).unwrap();
    store.insert(&session(2, 10, true, 1.0)).unwrap();
    store.insert(&session(3, 20, true, 1.0)).unwrap();

    let order = vec![
        ("started_at".to_string(), Order::Desc),
        ("id".to_string(), Order::Desc),
    ];
    let page = store.find_many(&PageQuery::forward(3, None, order)).unwrap();

    let stamps: Vec<i64> = page
        .rows
        .iter()
        .map(|r| r.get("started_at").unwrap().as_datetime().unwrap())
        .collect();
    assert_eq!(stamps, [30, 20, 10]);
}
