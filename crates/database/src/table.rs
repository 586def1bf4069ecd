//! The reactive table: schema-typed writes plus live read handles.
//!
//! Writes go through the storage adapter first, then publish one event batch
//! to the table's bus; delivery is synchronous, so every live handle has
//! observed the mutation before the call returns. `find_unique` serves
//! refcounted Dynamics out of the per-key cache; `find_many` derives page
//! deltas from the event stream through the client-side filter interpreter.

use crate::cache::{KeyTuple, RowCache, EVICT_GRACE_MS};
use crate::clock::Clock;
use crate::events::TableEvent;
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use cambium_core::schema::TableSchema;
use cambium_core::{Result, Row, RowComparator};
use cambium_query::interp;
use cambium_query::paginate::{Page, PageQuery};
use cambium_reactive::{
    partition_by_key, Dynamic, DynamicSource, EventBus, KeyChangesHandle, Observer, Partition,
    SubscriptionId,
};
use cambium_storage::{Backend, Mutation, TableStore};
use core::cell::RefCell;

/// One entry of a page delta.
#[derive(Clone, Debug, PartialEq)]
pub enum PageChange {
    /// A row matching the page filter appeared.
    Add { row: Row },
    /// The keyed row disappeared.
    Remove { key: Row },
}

/// The delta applied to a live page for one event batch.
pub type PageDelta = Vec<PageChange>;

/// A live handle on one row: `None` while the row does not exist.
pub type RowDynamic = Dynamic<Option<Row>, ()>;

/// A live handle on one page of results.
pub type PageDynamic = Dynamic<Page, PageDelta>;

struct PageWatcher {
    probe: Box<dyn Fn() -> usize>,
    sub: SubscriptionId,
}

/// A reactive table over one schema.
pub struct Table {
    store: TableStore,
    schema: Rc<TableSchema>,
    events: EventBus<Vec<TableEvent>>,
    flat: EventBus<TableEvent>,
    partition: Partition<TableEvent, KeyTuple>,
    cache: Rc<RefCell<RowCache>>,
    watchers: RefCell<Vec<PageWatcher>>,
    clock: Rc<dyn Clock>,
}

impl Table {
    /// Creates a table over the backend with the system clock.
    #[cfg(feature = "std")]
    pub fn new(schema: Rc<TableSchema>, backend: Rc<dyn Backend>) -> Result<Self> {
        Self::with_clock(schema, backend, Rc::new(crate::clock::SystemClock))
    }

    /// Creates a table over the backend with an explicit clock.
    pub fn with_clock(
        schema: Rc<TableSchema>,
        backend: Rc<dyn Backend>,
        clock: Rc<dyn Clock>,
    ) -> Result<Self> {
        let store = TableStore::new(schema.clone(), backend)?;
        let events: EventBus<Vec<TableEvent>> = EventBus::new();
        let flat: EventBus<TableEvent> = EventBus::new();
        let partition = {
            let schema = schema.clone();
            partition_by_key(&flat, move |event: &TableEvent| {
                event.key_tuple(&schema).unwrap_or_default()
            })
        };
        Ok(Self {
            store,
            schema,
            events,
            flat,
            partition,
            cache: Rc::new(RefCell::new(RowCache::new(EVICT_GRACE_MS))),
            watchers: RefCell::new(Vec::new()),
            clock,
        })
    }

    /// Returns the table schema.
    #[inline]
    pub fn schema(&self) -> &Rc<TableSchema> {
        &self.schema
    }

    /// Returns the underlying storage adapter.
    #[inline]
    pub fn store(&self) -> &TableStore {
        &self.store
    }

    /// Returns the table's event stream; one batch per mutation.
    #[inline]
    pub fn events(&self) -> &EventBus<Vec<TableEvent>> {
        &self.events
    }

    /// Inserts a row and publishes its event.
    pub fn insert(&self, row: &Row) -> Result<()> {
        self.sweep();
        self.store.insert(row)?;
        self.publish(alloc::vec![TableEvent::Insert { row: row.clone() }]);
        Ok(())
    }

    /// Upserts a row and publishes its event.
    ///
    /// An upsert replaces the whole row snapshot, so it publishes as an
    /// insert event.
    pub fn upsert(&self, row: &Row) -> Result<()> {
        self.sweep();
        self.store.upsert(row)?;
        self.publish(alloc::vec![TableEvent::Insert { row: row.clone() }]);
        Ok(())
    }

    /// Updates the named columns of one row and publishes the partial change.
    ///
    /// An empty change set is a no-op: no statement, no event.
    pub fn update(&self, key: &Row, changes: &Row) -> Result<()> {
        self.sweep();
        if changes.is_empty() {
            return Ok(());
        }
        self.store.update(key, changes)?;
        self.publish(alloc::vec![TableEvent::Update {
            key: key.clone(),
            changes: changes.clone(),
        }]);
        Ok(())
    }

    /// Deletes one row by key and publishes its event.
    pub fn delete(&self, key: &Row) -> Result<()> {
        self.sweep();
        self.store.delete(key)?;
        self.publish(alloc::vec![TableEvent::Delete { key: key.clone() }]);
        Ok(())
    }

    /// Runs a mutation batch transactionally, publishing one event batch
    /// after commit. On error nothing is published.
    pub fn mutate_many(&self, mutations: &[Mutation]) -> Result<()> {
        self.sweep();
        self.store.mutate_many(mutations)?;
        let batch: Vec<TableEvent> = mutations.iter().filter_map(event_of).collect();
        if !batch.is_empty() {
            self.publish(batch);
        }
        Ok(())
    }

    /// Returns a live handle on one row.
    ///
    /// Repeated calls for the same key share one cached upstream; each caller
    /// gets an independent fork. The cache entry outlives its last handle by
    /// the eviction grace window.
    pub fn find_unique(&self, key: &Row) -> Result<RowDynamic> {
        self.sweep();
        self.schema.check_key(key)?;
        let tuple = key.key_tuple(self.schema.primary_key())?;

        if let Some(fork) = self.cache.borrow_mut().fork(&tuple) {
            return Ok(fork);
        }

        let initial = self.store.find_unique(key)?;
        let source: DynamicSource<Option<Row>, ()> = DynamicSource::new();
        let master = source.dynamic(initial.clone());

        let group = self.partition.substream(&tuple);
        let group_sub = {
            let snapshot = Rc::new(RefCell::new(initial));
            let source = source.clone();
            group.subscribe(Observer::next(move |event: &TableEvent| {
                let next = fold_row_event(snapshot.borrow().clone(), event);
                *snapshot.borrow_mut() = next.clone();
                source.push((), next);
            }))
        };

        let fork = master.fork()?;
        self.cache
            .borrow_mut()
            .insert(tuple, source, master, group, group_sub);
        Ok(fork)
    }

    /// Returns a live handle on one page of results.
    ///
    /// The page delta stream emits at most one delta per mutation: inserts of
    /// filter-matching rows as adds, deletes of matching keys as removes.
    /// Updates produce no page delta; the refinement would emit a synthetic
    /// remove-plus-add when an update changes filter eligibility.
    pub fn find_many(&self, query: &PageQuery) -> Result<PageDynamic> {
        self.sweep();
        let page = self.store.find_many(query)?;

        let source: DynamicSource<Page, PageDelta> = DynamicSource::new();
        let dynamic = source.dynamic(page.clone());

        let sub = {
            let snapshot = Rc::new(RefCell::new(page));
            let source = source.clone();
            let filter = query.filter.clone();
            let comparator = RowComparator::new(query.order_by.clone());
            let order_columns: Vec<String> =
                query.order_by.iter().map(|(c, _)| c.clone()).collect();
            let schema = self.schema.clone();
            let cache = self.cache.clone();

            self.events
                .subscribe(Observer::next(move |batch: &Vec<TableEvent>| {
                    let mut delta: PageDelta = Vec::new();
                    for event in batch {
                        match event {
                            TableEvent::Insert { row } => {
                                let hit = match &filter {
                                    Some(f) => interp::matches(f, row).unwrap_or(false),
                                    None => true,
                                };
                                if hit {
                                    delta.push(PageChange::Add { row: row.clone() });
                                }
                            }
                            TableEvent::Delete { key } => {
                                // Filter against the cached pre-delete row if
                                // one is live; unknown rows remove
                                // conservatively.
                                let hit = match &filter {
                                    Some(f) => match peek_cached(&cache, &schema, key) {
                                        Some(Some(row)) => {
                                            interp::matches(f, &row).unwrap_or(true)
                                        }
                                        _ => true,
                                    },
                                    None => true,
                                };
                                if hit {
                                    delta.push(PageChange::Remove { key: key.clone() });
                                }
                            }
                            TableEvent::Update { .. } => {}
                        }
                    }
                    if delta.is_empty() {
                        return;
                    }
                    let next = {
                        let mut page = snapshot.borrow().clone();
                        apply_page_delta(&mut page, &delta, &comparator, &order_columns, &schema);
                        page
                    };
                    *snapshot.borrow_mut() = next.clone();
                    source.push(delta, next);
                }))
        };

        self.watchers.borrow_mut().push(PageWatcher {
            probe: Box::new({
                let source = source.clone();
                move || source.handle_count()
            }),
            sub,
        });
        Ok(dynamic)
    }

    /// Returns a handle on the table's alive-key stream.
    ///
    /// Keys become alive on their first routed event; the first subscription
    /// replays all currently-alive keys as one bulk add.
    pub fn key_changes(&self) -> KeyChangesHandle<TableEvent, KeyTuple> {
        self.partition.key_changes()
    }

    /// Returns the number of cached row Dynamics (eviction not yet run).
    pub fn cached_rows(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Runs cache eviction and page-watcher cleanup against the clock.
    ///
    /// Every public operation sweeps on entry; callers only need this
    /// directly when idle.
    pub fn sweep(&self) {
        let now = self.clock.now_ms();
        self.cache.borrow_mut().sweep(now);
        let mut watchers = self.watchers.borrow_mut();
        watchers.retain(|w| {
            if (w.probe)() == 0 {
                self.events.unsubscribe(w.sub);
                false
            } else {
                true
            }
        });
    }

    fn publish(&self, batch: Vec<TableEvent>) {
        tracing::debug!(
            table = self.schema.name(),
            events = batch.len(),
            "publishing event batch"
        );
        self.events.publish(&batch);
        for event in &batch {
            self.flat.publish(event);
        }
    }
}

/// Folds one event into a row snapshot.
fn fold_row_event(prev: Option<Row>, event: &TableEvent) -> Option<Row> {
    match event {
        TableEvent::Insert { row } => Some(row.clone()),
        TableEvent::Update { changes, .. } => prev.map(|mut row| {
            row.merge(changes);
            row
        }),
        TableEvent::Delete { .. } => None,
    }
}

fn event_of(mutation: &Mutation) -> Option<TableEvent> {
    match mutation {
        Mutation::Insert { row } | Mutation::Upsert { row } => {
            Some(TableEvent::Insert { row: row.clone() })
        }
        Mutation::Update { key, changes } => {
            if changes.is_empty() {
                None
            } else {
                Some(TableEvent::Update {
                    key: key.clone(),
                    changes: changes.clone(),
                })
            }
        }
        Mutation::Delete { key } => Some(TableEvent::Delete { key: key.clone() }),
    }
}

fn peek_cached(
    cache: &Rc<RefCell<RowCache>>,
    schema: &TableSchema,
    key: &Row,
) -> Option<Option<Row>> {
    let tuple = key.key_tuple(schema.primary_key()).ok()?;
    cache.borrow().peek(&tuple)
}

/// Folds a delta into the page's row list, keeping order-by position.
/// Cursor and count recomputation is the consumer's job.
fn apply_page_delta(
    page: &mut Page,
    delta: &PageDelta,
    comparator: &RowComparator,
    order_columns: &[String],
    schema: &TableSchema,
) {
    let columns: Vec<&str> = order_columns.iter().map(|c| c.as_str()).collect();
    for change in delta {
        match change {
            PageChange::Add { row } => {
                // Adds are idempotent by key: an upsert re-announces an
                // existing row, which must not duplicate its cursor.
                if let Ok(tuple) = row.key_tuple(schema.primary_key()) {
                    page.rows
                        .retain(|r| r.key_tuple(schema.primary_key()).ok() != Some(tuple.clone()));
                }
                let cursor = row.project(&columns);
                let at = page
                    .rows
                    .iter()
                    .position(|r| comparator.is_before(&cursor, r))
                    .unwrap_or(page.rows.len());
                page.rows.insert(at, cursor);
            }
            PageChange::Remove { key } => {
                let Ok(tuple) = key.key_tuple(schema.primary_key()) else {
                    continue;
                };
                page.rows
                    .retain(|r| r.key_tuple(schema.primary_key()).ok() != Some(tuple.clone()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use cambium_core::schema::SchemaBuilder;
    use cambium_core::{DataType, Order, Value};

    fn users() -> TableSchema {
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

    fn user(id: i64, name: &str, age: i64) -> Row {
        Row::from_pairs([
            ("id", Value::Int64(id)),
            ("name", Value::String(name.into())),
            ("age", Value::Int64(age)),
        ])
    }

    #[test]
    fn test_fold_row_event() {
        let row = user(1, "Alice", 25);

        let after_insert = fold_row_event(None, &TableEvent::Insert { row: row.clone() });
        assert_eq!(after_insert, Some(row.clone()));

        let patch = Row::from_pairs([("name", Value::String("Bob".into()))]);
        let after_update = fold_row_event(
            after_insert,
            &TableEvent::Update {
                key: Row::from_pairs([("id", Value::Int64(1))]),
                changes: patch,
            },
        );
        let updated = after_update.clone().unwrap();
        assert_eq!(updated.get("name"), Some(&Value::String("Bob".into())));
        assert_eq!(updated.get("age"), Some(&Value::Int64(25)));

        let after_delete = fold_row_event(
            after_update,
            &TableEvent::Delete {
                key: Row::from_pairs([("id", Value::Int64(1))]),
            },
        );
        assert_eq!(after_delete, None);
    }

    #[test]
    fn test_update_on_absent_row_stays_absent() {
        let patch = Row::from_pairs([("name", Value::String("Bob".into()))]);
        let next = fold_row_event(
            None,
            &TableEvent::Update {
                key: Row::from_pairs([("id", Value::Int64(1))]),
                changes: patch,
            },
        );
        assert_eq!(next, None);
    }

    #[test]
    fn test_apply_page_delta_add_keeps_order() {
        let schema = users();
        let comparator = RowComparator::new(vec![("id".into(), Order::Asc)]);
        let order_columns = vec![String::from("id")];

        let mut page = Page {
            rows: vec![
                Row::from_pairs([("id", Value::Int64(2))]),
                Row::from_pairs([("id", Value::Int64(6))]),
            ],
            ..Page::default()
        };

        apply_page_delta(
            &mut page,
            &vec![PageChange::Add {
                row: user(4, "Dee", 24),
            }],
            &comparator,
            &order_columns,
            &schema,
        );

        let ids: Vec<i64> = page
            .rows
            .iter()
            .map(|r| r.get("id").unwrap().as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![2, 4, 6]);
        // Added rows are stored as cursor records.
        assert_eq!(page.rows[1].column_names(), ["id"]);
    }

    #[test]
    fn test_apply_page_delta_add_descending() {
        let schema = users();
        let comparator = RowComparator::new(vec![("id".into(), Order::Desc)]);
        let order_columns = vec![String::from("id")];

        let mut page = Page {
            rows: vec![
                Row::from_pairs([("id", Value::Int64(9))]),
                Row::from_pairs([("id", Value::Int64(3))]),
            ],
            ..Page::default()
        };

        apply_page_delta(
            &mut page,
            &vec![PageChange::Add {
                row: user(6, "Fay", 26),
            }],
            &comparator,
            &order_columns,
            &schema,
        );

        let ids: Vec<i64> = page
            .rows
            .iter()
            .map(|r| r.get("id").unwrap().as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![9, 6, 3]);
    }

    #[test]
    fn test_apply_page_delta_add_is_idempotent_by_key() {
        let schema = users();
        let comparator = RowComparator::new(vec![("id".into(), Order::Asc)]);
        let order_columns = vec![String::from("id")];

        let mut page = Page {
            rows: vec![
                Row::from_pairs([("id", Value::Int64(2))]),
                Row::from_pairs([("id", Value::Int64(4))]),
            ],
            ..Page::default()
        };

        // An upsert re-announces id 4; the page must not duplicate it.
        apply_page_delta(
            &mut page,
            &vec![PageChange::Add {
                row: user(4, "Dee again", 25),
            }],
            &comparator,
            &order_columns,
            &schema,
        );

        let ids: Vec<i64> = page
            .rows
            .iter()
            .map(|r| r.get("id").unwrap().as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[test]
    fn test_apply_page_delta_remove_by_key() {
        let schema = users();
        let comparator = RowComparator::new(vec![("id".into(), Order::Asc)]);
        let order_columns = vec![String::from("id")];

        let mut page = Page {
            rows: vec![
                Row::from_pairs([("id", Value::Int64(2))]),
                Row::from_pairs([("id", Value::Int64(4))]),
            ],
            ..Page::default()
        };

        apply_page_delta(
            &mut page,
            &vec![PageChange::Remove {
                key: Row::from_pairs([("id", Value::Int64(2))]),
            }],
            &comparator,
            &order_columns,
            &schema,
        );

        let ids: Vec<i64> = page
            .rows
            .iter()
            .map(|r| r.get("id").unwrap().as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![4]);
    }

    #[test]
    fn test_event_of_skips_empty_updates() {
        let m = Mutation::Update {
            key: Row::from_pairs([("id", Value::Int64(1))]),
            changes: Row::new(),
        };
        assert_eq!(event_of(&m), None);

        let m = Mutation::Upsert {
            row: user(1, "Alice", 25),
        };
        assert!(matches!(event_of(&m), Some(TableEvent::Insert { .. })));
    }
}
