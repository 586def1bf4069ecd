//! Dynamic live values: a snapshot plus a delta stream.
//!
//! A `DynamicSource` is the shared upstream of a family of `Dynamic` handles:
//! each pushed `(delta, value)` pair replaces every connected handle's
//! snapshot and re-emits the delta on its `updated` stream. Handles are
//! created with `dynamic()` or by forking an existing handle; the source
//! counts connected handles, which is what cache eviction reads.

use crate::stream::{EventBus, Observer, SubscriptionId};
use alloc::rc::{Rc, Weak};
use cambium_core::{Error, Result};
use core::cell::{Cell, RefCell};

/// The shared upstream of a family of Dynamics.
pub struct DynamicSource<V, D> {
    bus: EventBus<(D, V)>,
    handles: Rc<Cell<usize>>,
}

impl<V, D> Clone for DynamicSource<V, D> {
    fn clone(&self) -> Self {
        Self {
            bus: self.bus.clone(),
            handles: self.handles.clone(),
        }
    }
}

impl<V: Clone + 'static, D: Clone + 'static> Default for DynamicSource<V, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + 'static, D: Clone + 'static> DynamicSource<V, D> {
    /// Creates a new source with no connected handles.
    pub fn new() -> Self {
        Self {
            bus: EventBus::new(),
            handles: Rc::new(Cell::new(0)),
        }
    }

    /// Pushes a delta and the snapshot it produced to every connected handle.
    pub fn push(&self, delta: D, value: V) {
        self.bus.publish(&(delta, value));
    }

    /// Completes the upstream; every connected handle closes.
    pub fn complete(&self) {
        self.bus.complete();
    }

    /// Fails the upstream; every connected handle forwards the error and closes.
    pub fn error(&self, error: Error) {
        self.bus.error(error);
    }

    /// Returns the number of connected handles.
    ///
    /// This is the refcount the table cache reads: a cached master handle
    /// contributes one, every live fork contributes one more.
    #[inline]
    pub fn handle_count(&self) -> usize {
        self.handles.get()
    }

    /// Creates a connected handle seeded with the given snapshot.
    pub fn dynamic(&self, initial: V) -> Dynamic<V, D> {
        Dynamic::attach(self.clone(), initial)
    }
}

struct DynState<V, D> {
    value: V,
    closed: bool,
    upstream: Option<SubscriptionId>,
    updated: EventBus<D>,
}

/// A live value: current snapshot plus a stream of deltas.
///
/// Handles sharing one source are independent: disconnecting one leaves the
/// others reading and updating. `read` and `fork` raise
/// `DynamicDisconnected` once this handle is closed, and its `updated`
/// stream completes exactly once.
pub struct Dynamic<V, D> {
    state: Rc<RefCell<DynState<V, D>>>,
    source: DynamicSource<V, D>,
}

impl<V: Clone + 'static, D: Clone + 'static> Dynamic<V, D> {
    fn attach(source: DynamicSource<V, D>, initial: V) -> Self {
        let state = Rc::new(RefCell::new(DynState {
            value: initial,
            closed: false,
            upstream: None,
            updated: EventBus::new(),
        }));

        let on_next = {
            let weak = Rc::downgrade(&state);
            move |item: &(D, V)| {
                if let Some(state) = weak.upgrade() {
                    let updated = {
                        let mut s = state.borrow_mut();
                        if s.closed {
                            return;
                        }
                        s.value = item.1.clone();
                        s.updated.clone()
                    };
                    updated.publish(&item.0);
                }
            }
        };
        let on_complete = {
            let weak = Rc::downgrade(&state);
            let handles = source.handles.clone();
            move || close_state(&weak, &handles, None)
        };
        let on_error = {
            let weak = Rc::downgrade(&state);
            let handles = source.handles.clone();
            move |error: &Error| close_state(&weak, &handles, Some(error))
        };

        // Count the handle before subscribing: a terminated source delivers
        // its terminal synchronously, which closes the handle and decrements.
        source.handles.set(source.handles.get() + 1);
        let sub = source.bus.subscribe(
            Observer::next(on_next)
                .with_complete(on_complete)
                .with_error(on_error),
        );
        {
            let mut s = state.borrow_mut();
            if !s.closed {
                s.upstream = Some(sub);
            }
        }

        Self { state, source }
    }

    /// Returns the current snapshot.
    pub fn read(&self) -> Result<V> {
        let s = self.state.borrow();
        if s.closed {
            Err(Error::DynamicDisconnected)
        } else {
            Ok(s.value.clone())
        }
    }

    /// Subscribes to the delta stream; completes when this handle disconnects.
    pub fn subscribe(&self, observer: Observer<D>) -> SubscriptionId {
        let updated = self.state.borrow().updated.clone();
        updated.subscribe(observer)
    }

    /// Removes a delta subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let updated = self.state.borrow().updated.clone();
        updated.unsubscribe(id)
    }

    /// Returns the number of delta subscribers on this handle.
    pub fn subscriber_count(&self) -> usize {
        self.state.borrow().updated.subscriber_count()
    }

    /// Creates an independent handle with the current snapshot, sharing the
    /// upstream source.
    pub fn fork(&self) -> Result<Dynamic<V, D>> {
        let value = self.read()?;
        Ok(self.source.dynamic(value))
    }
}

impl<V, D> Dynamic<V, D> {
    /// Returns true while this handle is connected to its source.
    pub fn is_connected(&self) -> bool {
        !self.state.borrow().closed
    }

    /// Disconnects this handle: cancels its upstream subscription and
    /// completes `updated`. Idempotent; other handles are untouched.
    pub fn disconnect(&self) {
        let (updated, upstream) = {
            let mut s = self.state.borrow_mut();
            if s.closed {
                return;
            }
            s.closed = true;
            (s.updated.clone(), s.upstream.take())
        };
        if let Some(id) = upstream {
            self.source.bus.unsubscribe(id);
        }
        self.source
            .handles
            .set(self.source.handles.get().saturating_sub(1));
        updated.complete();
    }
}

impl<V, D> Drop for Dynamic<V, D> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn close_state<V, D>(
    weak: &Weak<RefCell<DynState<V, D>>>,
    handles: &Rc<Cell<usize>>,
    error: Option<&Error>,
) {
    let Some(state) = weak.upgrade() else {
        return;
    };
    let updated = {
        let mut s = state.borrow_mut();
        if s.closed {
            return;
        }
        s.closed = true;
        s.upstream = None;
        s.updated.clone()
    };
    handles.set(handles.get().saturating_sub(1));
    match error {
        Some(e) => updated.error(e.clone()),
        None => updated.complete(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    #[test]
    fn test_read_initial_and_updates() {
        let source: DynamicSource<i64, i64> = DynamicSource::new();
        let dynamic = source.dynamic(0);

        assert_eq!(dynamic.read().unwrap(), 0);

        source.push(1, 10);
        assert_eq!(dynamic.read().unwrap(), 10);

        source.push(2, 20);
        assert_eq!(dynamic.read().unwrap(), 20);
    }

    #[test]
    fn test_updated_stream_emits_deltas_only() {
        let source: DynamicSource<i64, i64> = DynamicSource::new();
        let dynamic = source.dynamic(0);

        let deltas = Rc::new(RefCell::new(Vec::new()));
        let d = deltas.clone();
        dynamic.subscribe(Observer::next(move |delta: &i64| {
            d.borrow_mut().push(*delta)
        }));

        source.push(1, 10);
        source.push(5, 50);

        assert_eq!(*deltas.borrow(), vec![1, 5]);
    }

    #[test]
    fn test_disconnect_semantics() {
        let source: DynamicSource<i64, i64> = DynamicSource::new();
        let dynamic = source.dynamic(0);

        let completed = Rc::new(RefCell::new(false));
        let c = completed.clone();
        dynamic.subscribe(
            Observer::next(|_: &i64| {}).with_complete(move || *c.borrow_mut() = true),
        );

        dynamic.disconnect();

        assert!(*completed.borrow());
        assert!(matches!(dynamic.read(), Err(Error::DynamicDisconnected)));
        assert!(dynamic.fork().is_err());
        assert!(!dynamic.is_connected());

        // Idempotent.
        dynamic.disconnect();
    }

    #[test]
    fn test_fork_shares_upstream() {
        let source: DynamicSource<i64, i64> = DynamicSource::new();
        let a = source.dynamic(0);
        source.push(1, 10);

        let b = a.fork().unwrap();
        assert_eq!(b.read().unwrap(), 10);

        source.push(2, 20);
        assert_eq!(a.read().unwrap(), 20);
        assert_eq!(b.read().unwrap(), 20);
    }

    #[test]
    fn test_fork_independence_on_disconnect() {
        let source: DynamicSource<i64, i64> = DynamicSource::new();
        let a = source.dynamic(0);
        let b = a.fork().unwrap();

        let b_deltas = Rc::new(RefCell::new(0));
        let bd = b_deltas.clone();
        b.subscribe(Observer::next(move |_: &i64| *bd.borrow_mut() += 1));

        a.disconnect();
        source.push(1, 10);

        assert!(a.read().is_err());
        assert_eq!(b.read().unwrap(), 10);
        assert_eq!(*b_deltas.borrow(), 1);
    }

    #[test]
    fn test_handle_count() {
        let source: DynamicSource<i64, i64> = DynamicSource::new();
        assert_eq!(source.handle_count(), 0);

        let a = source.dynamic(0);
        assert_eq!(source.handle_count(), 1);

        let b = a.fork().unwrap();
        assert_eq!(source.handle_count(), 2);

        a.disconnect();
        assert_eq!(source.handle_count(), 1);

        drop(b);
        assert_eq!(source.handle_count(), 0);
    }

    #[test]
    fn test_drop_disconnects() {
        let source: DynamicSource<i64, i64> = DynamicSource::new();
        {
            let _dynamic = source.dynamic(0);
            assert_eq!(source.handle_count(), 1);
        }
        assert_eq!(source.handle_count(), 0);
        // No observers left behind: pushing is harmless.
        source.push(1, 1);
    }

    #[test]
    fn test_upstream_complete_closes_handles() {
        let source: DynamicSource<i64, i64> = DynamicSource::new();
        let a = source.dynamic(0);
        let b = a.fork().unwrap();

        let completed = Rc::new(RefCell::new(0));
        let c1 = completed.clone();
        let c2 = completed.clone();
        a.subscribe(Observer::next(|_: &i64| {}).with_complete(move || *c1.borrow_mut() += 1));
        b.subscribe(Observer::next(|_: &i64| {}).with_complete(move || *c2.borrow_mut() += 1));

        source.complete();

        assert_eq!(*completed.borrow(), 2);
        assert!(a.read().is_err());
        assert!(b.read().is_err());
        assert_eq!(source.handle_count(), 0);
    }

    #[test]
    fn test_upstream_error_propagates() {
        let source: DynamicSource<i64, i64> = DynamicSource::new();
        let dynamic = source.dynamic(0);

        let errored = Rc::new(RefCell::new(false));
        let e = errored.clone();
        dynamic.subscribe(
            Observer::next(|_: &i64| {}).with_error(move |_| *e.borrow_mut() = true),
        );

        source.error(Error::backend("boom"));

        assert!(*errored.borrow());
        assert!(dynamic.read().is_err());
    }

    #[test]
    fn test_subscribe_after_disconnect_completes_immediately() {
        let source: DynamicSource<i64, i64> = DynamicSource::new();
        let dynamic = source.dynamic(0);
        dynamic.disconnect();

        let completed = Rc::new(RefCell::new(false));
        let c = completed.clone();
        dynamic.subscribe(
            Observer::next(|_: &i64| {}).with_complete(move || *c.borrow_mut() = true),
        );
        assert!(*completed.borrow());
    }
}
