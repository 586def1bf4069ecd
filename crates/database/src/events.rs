//! Table mutation events.
//!
//! Every mutation publishes one batch of these to the table's event bus; the
//! reactive layer folds them into live snapshots. The partition key of an
//! event is its primary-key value tuple in schema declaration order.

use alloc::vec::Vec;
use cambium_core::schema::TableSchema;
use cambium_core::{Result, Row, Value};

/// A change applied to one row of a table.
#[derive(Clone, Debug, PartialEq)]
pub enum TableEvent {
    /// A row came into existence with this full snapshot (insert or upsert).
    Insert { row: Row },
    /// The named columns of the keyed row changed.
    Update { key: Row, changes: Row },
    /// The keyed row was removed.
    Delete { key: Row },
}

impl TableEvent {
    /// Materializes the primary-key values in declaration order.
    pub fn key_tuple(&self, schema: &TableSchema) -> Result<Vec<Value>> {
        match self {
            TableEvent::Insert { row } => row.key_tuple(schema.primary_key()),
            TableEvent::Update { key, .. } | TableEvent::Delete { key } => {
                key.key_tuple(schema.primary_key())
            }
        }
    }

    /// Returns the event's key record: the full row for inserts, the key
    /// otherwise.
    pub fn key_record(&self) -> &Row {
        match self {
            TableEvent::Insert { row } => row,
            TableEvent::Update { key, .. } | TableEvent::Delete { key } => key,
        }
    }
}
