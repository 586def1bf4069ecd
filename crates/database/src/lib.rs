//! Cambium Database - The reactive table layer.
//!
//! A `Table` pairs a storage adapter with an event bus: every mutation runs
//! its prepared statement, then publishes one event batch; live read handles
//! fold those events into fresh snapshots and re-emit the deltas.
//!
//! - `find_unique` returns a `Dynamic<Option<Row>, ()>` served from a
//!   refcounted per-key cache with a 10-second eviction grace window
//! - `find_many` returns a `Dynamic<Page, PageDelta>` whose deltas are
//!   derived from insert/delete events through the page's filter
//! - `mutate_many` groups mutations in one backend transaction and one
//!   event batch
//!
//! # Example
//!
//! ```ignore
//! use cambium_database::Table;
//!
//! let table = Table::new(schema, backend)?;
//! let alice = table.find_unique(&key_of("id", 1))?;
//!
//! table.update(&key_of("id", 1), &Row::from_pairs([("name", "Bob")]))?;
//! assert_eq!(alice.read()?.unwrap().get("name"), Some(&"Bob".into()));
//! ```

#![no_std]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod cache;
pub mod clock;
pub mod events;
pub mod table;

pub use cache::{KeyTuple, EVICT_GRACE_MS};
pub use clock::{Clock, ManualClock};
#[cfg(feature = "std")]
pub use clock::SystemClock;
pub use events::TableEvent;
pub use table::{PageChange, PageDelta, PageDynamic, RowDynamic, Table};
