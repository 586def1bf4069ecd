//! Hot event streams with subscription management.
//!
//! `EventBus` is the single-threaded subject every reactive piece is built
//! from: mutation event fan-out, Dynamic delta streams and the per-key
//! substreams of the partitioner. Delivery is synchronous in subscription
//! order; an optional replay-1 buffer hands the most recent item to late
//! subscribers.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use cambium_core::Error;
use core::cell::RefCell;

/// Unique identifier for a subscription.
pub type SubscriptionId = u64;

/// A subscriber: a next callback plus optional completion/error callbacks.
pub struct Observer<T> {
    on_next: Box<dyn Fn(&T)>,
    on_complete: Option<Box<dyn Fn()>>,
    on_error: Option<Box<dyn Fn(&Error)>>,
}

impl<T> Observer<T> {
    /// Creates an observer from a next callback.
    pub fn next<F>(f: F) -> Self
    where
        F: Fn(&T) + 'static,
    {
        Self {
            on_next: Box::new(f),
            on_complete: None,
            on_error: None,
        }
    }

    /// Attaches a completion callback.
    pub fn with_complete<F>(mut self, f: F) -> Self
    where
        F: Fn() + 'static,
    {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Attaches an error callback.
    pub fn with_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&Error) + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Returns whether this observer handles errors.
    #[inline]
    pub fn handles_error(&self) -> bool {
        self.on_error.is_some()
    }

    pub(crate) fn notify(&self, value: &T) {
        (self.on_next)(value);
    }

    pub(crate) fn complete(&self) {
        if let Some(f) = &self.on_complete {
            f();
        }
    }

    pub(crate) fn fail(&self, error: &Error) {
        if let Some(f) = &self.on_error {
            f(error);
        }
    }
}

#[derive(Clone, Debug)]
enum Terminal {
    Completed,
    Failed(Error),
}

struct BusInner<T> {
    subscribers: Vec<(SubscriptionId, Rc<Observer<T>>)>,
    next_id: SubscriptionId,
    terminal: Option<Terminal>,
    replay: Option<T>,
}

/// A hot, single-threaded event stream.
///
/// Cloning the bus clones the handle, not the stream: all clones share
/// subscribers and the terminal state.
pub struct EventBus<T> {
    inner: Rc<RefCell<BusInner<T>>>,
    replay_last: bool,
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            replay_last: self.replay_last,
        }
    }
}

impl<T: Clone> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> EventBus<T> {
    /// Creates a bus without replay.
    pub fn new() -> Self {
        Self::with_replay(false)
    }

    /// Creates a bus that replays the most recent item to late subscribers.
    pub fn replay_last() -> Self {
        Self::with_replay(true)
    }

    fn with_replay(replay_last: bool) -> Self {
        Self {
            inner: Rc::new(RefCell::new(BusInner {
                subscribers: Vec::new(),
                next_id: 1,
                terminal: None,
                replay: None,
            })),
            replay_last,
        }
    }

    /// Subscribes an observer, returning its subscription ID.
    ///
    /// On a replay bus the most recent item is delivered first. On a
    /// terminated bus the terminal signal is delivered immediately and the
    /// observer is not retained.
    pub fn subscribe(&self, observer: Observer<T>) -> SubscriptionId {
        let observer = Rc::new(observer);
        let (id, replayed, terminal) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            let replayed = if self.replay_last {
                inner.replay.clone()
            } else {
                None
            };
            let terminal = inner.terminal.clone();
            if terminal.is_none() {
                inner.subscribers.push((id, observer.clone()));
            }
            (id, replayed, terminal)
        };

        if let Some(value) = replayed {
            observer.notify(&value);
        }
        match terminal {
            Some(Terminal::Completed) => observer.complete(),
            Some(Terminal::Failed(error)) => observer.fail(&error),
            None => {}
        }
        id
    }

    /// Publishes a value to all current subscribers, in subscription order.
    ///
    /// No-op after termination. The subscriber list is snapshotted first, so
    /// observers may subscribe or unsubscribe reentrantly; a subscriber
    /// added during delivery sees only subsequent items.
    pub fn publish(&self, value: &T) {
        let observers: Vec<Rc<Observer<T>>> = {
            let mut inner = self.inner.borrow_mut();
            if inner.terminal.is_some() {
                return;
            }
            if self.replay_last {
                inner.replay = Some(value.clone());
            }
            inner.subscribers.iter().map(|(_, o)| o.clone()).collect()
        };
        for observer in observers {
            observer.notify(value);
        }
    }
}

impl<T> EventBus<T> {
    /// Removes a subscription by ID.
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sid, _)| *sid != id);
        inner.subscribers.len() < before
    }

    /// Completes the stream, notifying and dropping all subscribers.
    pub fn complete(&self) {
        let observers = self.terminate(Terminal::Completed);
        for observer in observers {
            observer.complete();
        }
    }

    /// Fails the stream, notifying and dropping all subscribers.
    pub fn error(&self, error: Error) {
        let observers = self.terminate(Terminal::Failed(error.clone()));
        for observer in observers {
            observer.fail(&error);
        }
    }

    fn terminate(&self, terminal: Terminal) -> Vec<Rc<Observer<T>>> {
        let mut inner = self.inner.borrow_mut();
        if inner.terminal.is_some() {
            return Vec::new();
        }
        inner.terminal = Some(terminal);
        core::mem::take(&mut inner.subscribers)
            .into_iter()
            .map(|(_, o)| o)
            .collect()
    }

    /// Returns the number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Returns whether any active subscriber handles errors.
    pub fn any_handles_error(&self) -> bool {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .any(|(_, o)| o.handles_error())
    }

    /// Returns true once the stream has completed or failed.
    pub fn is_terminated(&self) -> bool {
        self.inner.borrow().terminal.is_some()
    }
}
