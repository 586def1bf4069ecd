//! Per-key cache of live row Dynamics with delayed eviction.
//!
//! Each cached entry pairs the master Dynamic for one primary-key tuple with
//! its upstream source and its subscription into the key's event substream.
//! The refcount is read from the source's handle count: the master
//! contributes one, every caller fork one more. When only the master is left
//! the entry enters a grace window; a fork within the window cancels
//! eviction, a sweep past the deadline tears the entry down.

use crate::events::TableEvent;
use alloc::vec::Vec;
use cambium_core::{Row, Value};
use cambium_reactive::{Dynamic, DynamicSource, GroupHandle, SubscriptionId};
use hashbrown::HashMap;

/// Primary-key values in schema declaration order.
pub type KeyTuple = Vec<Value>;

/// How long an unreferenced entry survives before eviction.
pub const EVICT_GRACE_MS: u64 = 10_000;

pub(crate) struct CacheEntry {
    pub source: DynamicSource<Option<Row>, ()>,
    pub master: Dynamic<Option<Row>, ()>,
    pub group: GroupHandle<TableEvent, KeyTuple>,
    pub group_sub: SubscriptionId,
    evict_at: Option<u64>,
}

pub(crate) struct RowCache {
    entries: HashMap<KeyTuple, CacheEntry>,
    grace_ms: u64,
}

impl RowCache {
    pub fn new(grace_ms: u64) -> Self {
        Self {
            entries: HashMap::new(),
            grace_ms,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, key: &KeyTuple) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(
        &mut self,
        key: KeyTuple,
        source: DynamicSource<Option<Row>, ()>,
        master: Dynamic<Option<Row>, ()>,
        group: GroupHandle<TableEvent, KeyTuple>,
        group_sub: SubscriptionId,
    ) {
        self.entries.insert(
            key,
            CacheEntry {
                source,
                master,
                group,
                group_sub,
                evict_at: None,
            },
        );
    }

    /// Forks the cached master for a key, cancelling any pending eviction.
    pub fn fork(&mut self, key: &KeyTuple) -> Option<Dynamic<Option<Row>, ()>> {
        let entry = self.entries.get_mut(key)?;
        entry.evict_at = None;
        entry.master.fork().ok()
    }

    /// Reads the cached snapshot for a key without touching eviction state.
    pub fn peek(&self, key: &KeyTuple) -> Option<Option<Row>> {
        self.entries.get(key).and_then(|e| e.master.read().ok())
    }

    /// Advances eviction: entries referenced only by their master get a
    /// deadline; entries past their deadline are torn down. Resurrected
    /// entries (forked since the last sweep) lose their deadline.
    pub fn sweep(&mut self, now_ms: u64) {
        let grace = self.grace_ms;
        let mut expired: Vec<KeyTuple> = Vec::new();
        for (key, entry) in self.entries.iter_mut() {
            if entry.source.handle_count() > 1 {
                entry.evict_at = None;
            } else {
                match entry.evict_at {
                    None => entry.evict_at = Some(now_ms + grace),
                    Some(at) if now_ms >= at => expired.push(key.clone()),
                    Some(_) => {}
                }
            }
        }

        for key in expired {
            if let Some(entry) = self.entries.remove(&key) {
                tracing::debug!("evicting cached row dynamic");
                entry.group.unsubscribe(entry.group_sub);
                entry.source.complete();
            }
        }
    }
}
