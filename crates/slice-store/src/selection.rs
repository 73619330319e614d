#![forbid(unsafe_code)]

//! A local mirror of one derived slice of a [`Store`].
//!
//! [`Selection<S>`] follows the contract a UI binding has with a store:
//! seed a local value from the current state through a derive function,
//! register exactly once with that same derive function, and unregister
//! exactly once when going away (on drop).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::equality::Equality;
use crate::observer::Subscription;
use crate::store::Store;

struct Mirror<S> {
    value: RefCell<Rc<S>>,
    updates: Cell<u64>,
}

/// Local copy of `derive(store.state())`, kept current by a scoped
/// subscription.
pub struct Selection<S> {
    mirror: Rc<Mirror<S>>,
    subscription: Subscription,
}

impl<S: fmt::Debug> fmt::Debug for Selection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("value", &self.mirror.value.borrow())
            .field("updates", &self.mirror.updates.get())
            .field("subscription", &self.subscription)
            .finish()
    }
}

impl<S: Clone + 'static> Selection<S> {
    /// Seed from the store's current state and subscribe for changes.
    pub fn new<T: 'static, E: Equality<S> + 'static>(
        store: &Store<T, E>,
        derive: impl Fn(&T) -> S + 'static,
    ) -> Self {
        let mirror = Rc::new(Mirror {
            value: RefCell::new(Rc::new(store.with(|state| derive(state)))),
            updates: Cell::new(0),
        });

        let sink = Rc::clone(&mirror);
        let subscription = store.subscribe_with(
            move |state: &T| derive(state),
            move |next: &S| {
                *sink.value.borrow_mut() = Rc::new(next.clone());
                sink.updates.set(sink.updates.get() + 1);
            },
        );

        Self {
            mirror,
            subscription,
        }
    }

    /// A clone of the mirrored value.
    #[must_use]
    pub fn get(&self) -> S {
        S::clone(&self.mirror.value.borrow())
    }
}

impl<S> Selection<S> {
    /// Access the mirrored value by reference.
    ///
    /// `f` sees the snapshot current at the call; it may replace the store's
    /// state, which refreshes the mirror for later reads.
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let snapshot = Rc::clone(&self.mirror.value.borrow());
        f(&*snapshot)
    }

    /// How many times the mirror has been refreshed since creation.
    #[must_use]
    pub fn updates(&self) -> u64 {
        self.mirror.updates.get()
    }

    /// Whether the underlying subscription is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }
}

impl<S> Drop for Selection<S> {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}
