//! Cambium Reactive - Reactive primitives for live table views.
//!
//! This crate implements the stream machinery the reactive table layer is
//! built on. When underlying data changes, subscribers are notified with the
//! deltas; lifetimes are driven by subscription counts.
//!
//! # Core Concepts
//!
//! - `EventBus`: A hot, single-threaded event stream with optional replay-1
//! - `Observer`: A next callback plus optional completion/error callbacks
//! - `Dynamic`: A live value — current snapshot plus a delta stream — with
//!   `fork` and `disconnect`
//! - `DynamicSource`: The shared upstream of a family of Dynamics, counting
//!   connected handles
//! - `partition_by_key`: Splits one stream into per-key replay-1 substreams
//!   plus an add/remove key-change stream
//!
//! # Example
//!
//! ```rust
//! use cambium_reactive::{DynamicSource, Observer};
//!
//! let source: DynamicSource<i64, i64> = DynamicSource::new();
//! let value = source.dynamic(0);
//!
//! value.subscribe(Observer::next(|delta: &i64| {
//!     assert_eq!(*delta, 5);
//! }));
//!
//! source.push(5, 5);
//! assert_eq!(value.read().unwrap(), 5);
//! ```

#![no_std]

extern crate alloc;

pub mod dynamic;
pub mod partition;
pub mod stream;

pub use dynamic::{Dynamic, DynamicSource};
pub use partition::{partition_by_key, GroupHandle, KeyChange, KeyChangesHandle, Partition};
pub use stream::{EventBus, Observer, SubscriptionId};
