#![forbid(unsafe_code)]

//! Observable state container with selector-scoped change notification.
//!
//! This crate provides two layered primitives:
//!
//! - [`Observer`]: the notification engine. Keeps an ordered list of
//!   subscriptions, each optionally paired with a derive function, and
//!   decides per subscription whether a notification round should fire it.
//! - [`Store`]: the state container. Owns the current snapshot and the only
//!   mutation entrypoint, [`Store::replace`], which drives the engine.
//!
//! [`Selection`] builds on both to keep a local mirror of one slice of a
//! store, the way a UI binding would.
//!
//! # Architecture
//!
//! Everything is single-threaded and synchronous. The engine stores its
//! subscriptions in `Rc<RefCell<..>>` and hands out [`Subscription`] handles
//! that hold a `Weak` back-reference, so a handle that outlives its engine is
//! inert. The store holds its value as an `Rc<T>` snapshot that is swapped,
//! never mutated.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order.
//! 2. The recipients of a round are fixed when the round starts; callbacks
//!    that subscribe or unsubscribe only affect later rounds.
//! 3. Registering never notifies.
//! 4. A scoped subscriber fires only when its derived value differs from the
//!    prior one under the engine's [`Equality`] policy.
//! 5. [`Store::replace`] always starts a round; the store itself never
//!    compares values.
//! 6. Unsubscribing is idempotent.

pub mod equality;
pub mod error;
pub mod maker;
pub mod observer;
pub mod selection;
pub mod store;

pub use equality::{Equality, SameValue, SameValueEq, Structural};
pub use error::{Result, StoreError};
pub use observer::{Observer, ObserverConfig, PanicPolicy, Subscription, SubscriptionId};
pub use selection::Selection;
pub use store::Store;
