#![forbid(unsafe_code)]

//! State container that owns one snapshot and drives an [`Observer`].
//!
//! # Design
//!
//! [`Store<T, E>`] holds its value as an `Rc<T>` snapshot. [`replace`]
//! swaps in a new snapshot and hands both snapshots to the engine, which
//! decides per listener whether to fire. The store never compares values
//! itself.
//!
//! The store composes an [`Observer`] rather than extending it: listener
//! registration and [`clear`](Store::clear) delegate to the engine, which
//! stays usable on its own.
//!
//! # Failure Modes
//!
//! - **Panicking initializer**: propagates from [`Store::new`] (no store is
//!   returned) or from [`Store::reset`] (the initializer runs before any
//!   state changes, so state and listeners are untouched).
//! - **Reset of a one-shot store**: [`StoreError::ResetUnsupported`].
//! - **[`seed`](Store::seed)**: bypasses notification, so scoped listeners
//!   that compare against their memo see a stale prior value afterwards.
//!
//! [`replace`]: Store::replace

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::equality::{Equality, SameValue};
use crate::error::{Result, StoreError};
use crate::maker::default_maker;
use crate::observer::{Observer, ObserverConfig, Subscription};

/// How the store regenerates its initial value.
enum Initializer<T> {
    Reusable(Box<dyn Fn() -> T>),
    OneShot,
}

/// An observable state container.
///
/// `T` is the state type; `E` is the equality policy used by scoped
/// listeners (default [`SameValue`]).
pub struct Store<T, E = SameValue> {
    state: RefCell<Rc<T>>,
    initializer: Initializer<T>,
    observer: Observer<T, E>,
    /// Number of `replace` calls, resets included.
    version: Cell<u64>,
    setup_done: Cell<bool>,
}

impl<T: fmt::Debug, E> fmt::Debug for Store<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state.borrow())
            .field("version", &self.version.get())
            .field("resettable", &matches!(self.initializer, Initializer::Reusable(_)))
            .field("observer", &self.observer)
            .finish()
    }
}

impl<T: 'static> Store<T> {
    /// Create a store from a reusable initializer.
    ///
    /// The initializer runs once now and once per [`reset`](Store::reset).
    /// No listener is notified.
    #[must_use]
    pub fn new(initializer: impl Fn() -> T + 'static) -> Self {
        Self::with_equality(initializer, SameValue)
    }

    /// Create a store from a one-shot value. [`reset`](Store::reset) on such
    /// a store fails with [`StoreError::ResetUnsupported`].
    #[must_use]
    pub fn from_value(value: T) -> Self {
        Self::from_value_with_config(value, SameValue, ObserverConfig::default())
    }
}

impl<T: Default + 'static> Store<T> {
    /// Create a resettable store initialized with `T::default()`.
    #[must_use]
    pub fn from_default() -> Self {
        Self::new(default_maker::<T>())
    }
}

impl<T: 'static, E: 'static> Store<T, E> {
    /// Create a store with a custom equality policy.
    #[must_use]
    pub fn with_equality(initializer: impl Fn() -> T + 'static, equality: E) -> Self {
        Self::with_config(initializer, equality, ObserverConfig::default())
    }

    /// Create a store with a custom equality policy and engine config.
    #[must_use]
    pub fn with_config(
        initializer: impl Fn() -> T + 'static,
        equality: E,
        config: ObserverConfig,
    ) -> Self {
        let state = initializer();
        Self::assemble(
            state,
            Initializer::Reusable(Box::new(initializer)),
            Observer::with_config(equality, config),
        )
    }

    /// One-shot counterpart of [`with_config`](Store::with_config).
    #[must_use]
    pub fn from_value_with_config(value: T, equality: E, config: ObserverConfig) -> Self {
        Self::assemble(
            value,
            Initializer::OneShot,
            Observer::with_config(equality, config),
        )
    }

    fn assemble(state: T, initializer: Initializer<T>, observer: Observer<T, E>) -> Self {
        Self {
            state: RefCell::new(Rc::new(state)),
            initializer,
            observer,
            version: Cell::new(0),
            setup_done: Cell::new(false),
        }
    }

    /// The live current snapshot. Not a copy; treat it as read-only.
    #[must_use]
    pub fn state(&self) -> Rc<T> {
        Rc::clone(&self.state.borrow())
    }

    /// Access the current snapshot by reference.
    ///
    /// The snapshot is pinned for the duration of `f`, so `f` may call
    /// [`replace`](Store::replace); it keeps seeing the old snapshot.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let snapshot = self.state();
        f(&*snapshot)
    }

    /// Replace the state and notify listeners.
    ///
    /// Always starts a notification round, even if `value` equals the
    /// current state. Scoped listeners compare `derive(value)` against
    /// `derive(previous)`.
    pub fn replace(&self, value: T) {
        let next = Rc::new(value);
        let previous = self.state.replace(Rc::clone(&next));
        self.version.set(self.version.get() + 1);
        self.observer.notify(&next, Some(&previous));
    }

    /// Replace the state with `f(current)`.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = self.with(f);
        self.replace(next);
    }

    /// Regenerate the initial value and [`replace`](Store::replace) with it.
    ///
    /// # Errors
    ///
    /// [`StoreError::ResetUnsupported`] if the store was built from a
    /// one-shot value. Nothing changes in that case.
    pub fn reset(&self) -> Result<()> {
        let Initializer::Reusable(make) = &self.initializer else {
            return Err(StoreError::ResetUnsupported);
        };
        let initial = make();
        debug!(
            version = self.version.get(),
            subscribers = self.observer.len(),
            "resetting store to initial value"
        );
        self.replace(initial);
        Ok(())
    }

    /// Overwrite the state without notifying anyone.
    ///
    /// Intended for initialization edge cases only. Listeners are not told,
    /// so a later [`replace`](Store::replace) compares against this value,
    /// while memo-based comparisons (`Observer::notify` with no prior value)
    /// still use whatever each listener last saw.
    pub fn seed(&self, value: T) -> &Self {
        *self.state.borrow_mut() = Rc::new(value);
        debug!(
            version = self.version.get(),
            "store seeded without notification"
        );
        self
    }

    /// Run `f` the first time `setup` is called; later calls do nothing.
    ///
    /// Returns whether `f` ran.
    pub fn setup(&self, f: impl FnOnce()) -> bool {
        if self.setup_done.replace(true) {
            return false;
        }
        f();
        true
    }

    /// Number of [`replace`](Store::replace) calls so far, resets included.
    /// [`seed`](Store::seed) does not count.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.get()
    }

    /// Whether [`reset`](Store::reset) is available.
    #[must_use]
    pub fn is_resettable(&self) -> bool {
        matches!(self.initializer, Initializer::Reusable(_))
    }

    /// Register a full-value listener. See [`Observer::subscribe`].
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.observer.subscribe(callback)
    }

    /// Register a scoped listener. See [`Observer::subscribe_with`].
    pub fn subscribe_with<D: 'static>(
        &self,
        derive: impl Fn(&T) -> D + 'static,
        callback: impl Fn(&D) + 'static,
    ) -> Subscription
    where
        E: Equality<D>,
    {
        self.observer.subscribe_with(derive, callback)
    }

    /// Remove every listener.
    pub fn clear(&self) {
        self.observer.clear();
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.observer.len()
    }

    /// The underlying engine.
    #[must_use]
    pub fn observer(&self) -> &Observer<T, E> {
        &self.observer
    }
}

impl<T: Default + 'static> Default for Store<T> {
    fn default() -> Self {
        Self::from_default()
    }
}
