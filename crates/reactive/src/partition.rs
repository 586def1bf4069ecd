//! Key-partitioned substreams over a shared upstream.
//!
//! `partition_by_key` splits one event stream into per-key replay-1
//! substreams plus a key-change stream announcing which keys are alive. The
//! partitioner attaches to the upstream lazily at first demand and tears the
//! shared subscription down when its last subscriber leaves; a key is alive
//! from its first routed item until its group completes.

use crate::stream::{EventBus, Observer, SubscriptionId};
use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use cambium_core::Error;
use core::cell::RefCell;
use core::hash::Hash;
use hashbrown::HashMap;

/// An addition or removal of alive keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyChange<K> {
    Add { keys: Vec<K> },
    Remove { keys: Vec<K> },
}

struct Group<T> {
    bus: EventBus<T>,
    alive: bool,
}

struct PartInner<T, K> {
    groups: HashMap<K, Group<T>>,
    /// Alive keys in first-seen order; drives bulk replay and completion order.
    alive_order: Vec<K>,
    key_changes: EventBus<KeyChange<K>>,
    upstream: EventBus<T>,
    upstream_sub: Option<SubscriptionId>,
    subscriber_count: usize,
    terminated: bool,
}

/// Splits an upstream into per-key substreams and a key-change stream.
pub struct Partition<T, K> {
    inner: Rc<RefCell<PartInner<T, K>>>,
    key_fn: Rc<dyn Fn(&T) -> K>,
}

impl<T, K> Clone for Partition<T, K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            key_fn: self.key_fn.clone(),
        }
    }
}

/// Creates a partition over the upstream with the given key function.
pub fn partition_by_key<T, K, F>(upstream: &EventBus<T>, key_fn: F) -> Partition<T, K>
where
    T: Clone + 'static,
    K: Clone + Eq + Hash + 'static,
    F: Fn(&T) -> K + 'static,
{
    Partition {
        inner: Rc::new(RefCell::new(PartInner {
            groups: HashMap::new(),
            alive_order: Vec::new(),
            key_changes: EventBus::new(),
            upstream: upstream.clone(),
            upstream_sub: None,
            subscriber_count: 0,
            terminated: false,
        })),
        key_fn: Rc::new(key_fn),
    }
}

impl<T, K> Partition<T, K>
where
    T: Clone + 'static,
    K: Clone + Eq + Hash + 'static,
{
    /// Returns a handle to the substream for one key.
    ///
    /// The group is created lazily; the key only becomes alive (and is
    /// announced on the key-change stream) when its first item is routed.
    pub fn substream(&self, key: &K) -> GroupHandle<T, K> {
        GroupHandle {
            partition: self.clone(),
            key: key.clone(),
        }
    }

    /// Returns a handle to the key-change stream.
    ///
    /// The first subscription replays all currently-alive keys as a single
    /// bulk `Add`.
    pub fn key_changes(&self) -> KeyChangesHandle<T, K> {
        KeyChangesHandle {
            partition: self.clone(),
        }
    }

    /// Returns the currently-alive keys in first-seen order.
    pub fn alive_keys(&self) -> Vec<K> {
        self.inner.borrow().alive_order.clone()
    }

    /// Completes one key's substream, announcing its removal synchronously.
    ///
    /// This is the hook a projection uses to end a group; a later item with
    /// the same key revives it as a fresh group.
    pub fn end_key(&self, key: &K) {
        let (bus, key_changes) = {
            let mut inner = self.inner.borrow_mut();
            let Some(group) = inner.groups.get_mut(key) else {
                return;
            };
            if !group.alive {
                return;
            }
            group.alive = false;
            let bus = group.bus.clone();
            inner.groups.remove(key);
            inner.alive_order.retain(|k| k != key);
            (bus, inner.key_changes.clone())
        };
        bus.complete();
        key_changes.publish(&KeyChange::Remove {
            keys: vec![key.clone()],
        });
    }

    fn group_bus(&self, key: &K) -> EventBus<T> {
        let (bus, terminated) = {
            let mut inner = self.inner.borrow_mut();
            if inner.terminated {
                (EventBus::replay_last(), true)
            } else {
                let bus = inner
                    .groups
                    .entry(key.clone())
                    .or_insert_with(|| Group {
                        bus: EventBus::replay_last(),
                        alive: false,
                    })
                    .bus
                    .clone();
                (bus, false)
            }
        };
        if terminated {
            bus.complete();
        }
        bus
    }

    fn add_demand(&self) {
        let attach = {
            let mut inner = self.inner.borrow_mut();
            inner.subscriber_count += 1;
            inner.subscriber_count == 1 && inner.upstream_sub.is_none() && !inner.terminated
        };
        if attach {
            self.attach_upstream();
        }
    }

    fn remove_demand(&self) {
        let detach = {
            let mut inner = self.inner.borrow_mut();
            inner.subscriber_count = inner.subscriber_count.saturating_sub(1);
            if inner.subscriber_count == 0 {
                inner.upstream_sub.take()
            } else {
                None
            }
        };
        if let Some(id) = detach {
            let upstream = self.inner.borrow().upstream.clone();
            upstream.unsubscribe(id);
        }
    }

    fn attach_upstream(&self) {
        let upstream = self.inner.borrow().upstream.clone();

        let on_next = {
            let weak = Rc::downgrade(&self.inner);
            let key_fn = self.key_fn.clone();
            move |item: &T| {
                if let Some(inner) = weak.upgrade() {
                    route(&inner, &key_fn, item);
                }
            }
        };
        let on_complete = {
            let weak = Rc::downgrade(&self.inner);
            move || {
                if let Some(inner) = weak.upgrade() {
                    finish(&inner, None);
                }
            }
        };
        let on_error = {
            let weak = Rc::downgrade(&self.inner);
            move |error: &Error| {
                if let Some(inner) = weak.upgrade() {
                    finish(&inner, Some(error));
                }
            }
        };

        let sub = upstream.subscribe(
            Observer::next(on_next)
                .with_complete(on_complete)
                .with_error(on_error),
        );
        let mut inner = self.inner.borrow_mut();
        if !inner.terminated {
            inner.upstream_sub = Some(sub);
        }
    }
}

/// Routes one upstream item into its group, announcing a fresh key first.
fn route<T, K>(inner: &Rc<RefCell<PartInner<T, K>>>, key_fn: &Rc<dyn Fn(&T) -> K>, item: &T)
where
    T: Clone + 'static,
    K: Clone + Eq + Hash + 'static,
{
    let key = key_fn(item);
    let (bus, announce, key_changes) = {
        let mut inner = inner.borrow_mut();
        if inner.terminated {
            return;
        }
        let group = inner.groups.entry(key.clone()).or_insert_with(|| Group {
            bus: EventBus::replay_last(),
            alive: false,
        });
        let announce = !group.alive;
        group.alive = true;
        let bus = group.bus.clone();
        if announce {
            inner.alive_order.push(key.clone());
        }
        (bus, announce, inner.key_changes.clone())
    };

    bus.publish(item);
    if announce {
        key_changes.publish(&KeyChange::Add { keys: vec![key] });
    }
}

/// Terminates the partition: completes (or fails) every alive group, emits
/// the matching removals, then terminates the key-change stream.
fn finish<T, K>(inner: &Rc<RefCell<PartInner<T, K>>>, error: Option<&Error>)
where
    T: Clone + 'static,
    K: Clone + Eq + Hash + 'static,
{
    let (groups, key_changes) = {
        let mut inner = inner.borrow_mut();
        if inner.terminated {
            return;
        }
        inner.terminated = true;
        inner.upstream_sub = None;
        let order = core::mem::take(&mut inner.alive_order);
        let mut groups = Vec::with_capacity(order.len());
        for key in order {
            if let Some(group) = inner.groups.remove(&key) {
                groups.push((key, group.bus));
            }
        }
        (groups, inner.key_changes.clone())
    };

    let mut propagated = false;
    for (key, bus) in groups {
        match error {
            // A remove precedes the forwarded error for each alive group.
            Some(e) => {
                key_changes.publish(&KeyChange::Remove {
                    keys: vec![key.clone()],
                });
                propagated |= bus.any_handles_error();
                bus.error(e.clone());
            }
            None => {
                bus.complete();
                key_changes.publish(&KeyChange::Remove {
                    keys: vec![key.clone()],
                });
            }
        }
    }

    match error {
        // The partitioner only errors when some group propagated the error.
        Some(e) if propagated => key_changes.error(e.clone()),
        _ => key_changes.complete(),
    }
}

/// A demand-counted handle to one key's substream.
pub struct GroupHandle<T, K> {
    partition: Partition<T, K>,
    key: K,
}

impl<T, K> GroupHandle<T, K>
where
    T: Clone + 'static,
    K: Clone + Eq + Hash + 'static,
{
    /// Subscribes to this key's substream. The last value is replayed.
    pub fn subscribe(&self, observer: Observer<T>) -> SubscriptionId {
        self.partition.add_demand();
        self.partition.group_bus(&self.key).subscribe(observer)
    }

    /// Removes a subscription; the last removal across the whole partition
    /// tears down the shared upstream subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.partition.group_bus(&self.key).unsubscribe(id);
        if removed {
            self.partition.remove_demand();
        }
        removed
    }

    /// Returns the key this handle routes.
    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }
}

/// A demand-counted handle to the key-change stream.
pub struct KeyChangesHandle<T, K> {
    partition: Partition<T, K>,
}

impl<T, K> KeyChangesHandle<T, K>
where
    T: Clone + 'static,
    K: Clone + Eq + Hash + 'static,
{
    /// Subscribes to key changes, replaying all alive keys as one bulk add.
    pub fn subscribe(&self, observer: Observer<KeyChange<K>>) -> SubscriptionId {
        self.partition.add_demand();
        let (bus, alive) = {
            let inner = self.partition.inner.borrow();
            (inner.key_changes.clone(), inner.alive_order.clone())
        };
        if !alive.is_empty() {
            // Bulk replay goes only to this subscriber.
            observer.notify(&KeyChange::Add { keys: alive });
        }
        bus.subscribe(observer)
    }

    /// Removes a key-change subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let bus = self.partition.inner.borrow().key_changes.clone();
        let removed = bus.unsubscribe(id);
        if removed {
            self.partition.remove_demand();
        }
        removed
    }
}
