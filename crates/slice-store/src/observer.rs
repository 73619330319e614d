#![forbid(unsafe_code)]

//! Notification engine: ordered subscriptions with selector-scoped delivery.
//!
//! # Design
//!
//! [`Observer<T, E>`] keeps its subscriptions in shared, reference-counted
//! storage (`Rc<RefCell<..>>`) keyed by a [`SubscriptionId`] issued at
//! registration. Each subscription is either full-value (callback only) or
//! scoped (derive function + callback + memo of the last delivered derived
//! value). The equality policy `E` is fixed per engine.
//!
//! A notification round ([`notify`](Observer::notify)) clones the current
//! list of subscriptions, releases the borrow, then visits the clone. User
//! code (derive functions, callbacks, equality) never runs while the
//! registry is borrowed.
//!
//! # Invariants
//!
//! 1. Delivery order is registration order.
//! 2. The recipients of a round are the subscriptions registered when the
//!    round started.
//! 3. `subscribe*` never invokes a callback.
//! 4. A scoped callback fires only when the new derived value is not equal
//!    to the prior one; the memo is updated only when it fires.
//! 5. Removing a subscription discards its memo; removing twice is a no-op.
//!
//! # Failure Modes
//!
//! - **Panicking listener under [`PanicPolicy::Abort`]**: the panic unwinds
//!   out of `notify`; later recipients in that round are skipped.
//! - **Panicking listener under [`PanicPolicy::Isolate`]**: every recipient
//!   is attempted, then the first panic is resumed.
//! - **Impure derive function**: change detection becomes meaningless but
//!   nothing panics.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::equality::{Equality, SameValue};

/// Stable token identifying one subscription within its engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw token value. Tokens increase monotonically per engine.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// What a notification round does when a listener panics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PanicPolicy {
    /// Let the first panic unwind immediately; remaining recipients of the
    /// round are skipped.
    #[default]
    Abort,
    /// Attempt every recipient, logging each panic, then resume the first
    /// panic once the round is complete.
    Isolate,
}

impl PanicPolicy {
    /// Stable lowercase name, used as the `policy` field of round events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Abort => "abort",
            Self::Isolate => "isolate",
        }
    }
}

/// Configuration for an [`Observer`].
#[derive(Debug, Clone)]
pub struct ObserverConfig {
    /// Name attached to every log event of this engine.
    pub label: &'static str,
    /// Behavior when a listener panics during a round.
    pub panic_policy: PanicPolicy,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            label: "observer",
            panic_policy: PanicPolicy::Abort,
        }
    }
}

impl ObserverConfig {
    /// Set the log label.
    #[must_use]
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// Set the panic policy.
    #[must_use]
    pub fn with_panic_policy(mut self, policy: PanicPolicy) -> Self {
        self.panic_policy = policy;
        self
    }
}

/// A type-erased subscription entry.
trait Listener<T> {
    /// Run one delivery. Returns whether the callback was invoked.
    fn deliver(&self, value: &T, last: Option<&T>) -> bool;

    /// Drop the memoized derived value, if any.
    fn forget(&self);
}

/// Full-value interest: fires on every round.
struct FullValue<T> {
    callback: Box<dyn Fn(&T)>,
}

impl<T> Listener<T> for FullValue<T> {
    fn deliver(&self, value: &T, _last: Option<&T>) -> bool {
        (self.callback)(value);
        true
    }

    fn forget(&self) {}
}

/// Scoped interest: fires when `derive(value)` changes.
struct Scoped<T, D, E> {
    derive: Box<dyn Fn(&T) -> D>,
    callback: Box<dyn Fn(&D)>,
    equality: Rc<E>,
    /// Last delivered derived value. `None` until first delivery.
    memo: RefCell<Option<Rc<D>>>,
}

impl<T, D, E: Equality<D>> Scoped<T, D, E> {
    fn differs(&self, next: &D, prior: &D) -> bool {
        !self.equality.equal(next, prior)
    }
}

impl<T, D, E: Equality<D>> Listener<T> for Scoped<T, D, E> {
    fn deliver(&self, value: &T, last: Option<&T>) -> bool {
        let next = (self.derive)(value);
        let changed = match last {
            Some(previous) => {
                let prior = (self.derive)(previous);
                self.differs(&next, &prior)
            }
            None => {
                // Clone the Rc out so no borrow is held while comparing.
                let stored = self.memo.borrow().clone();
                stored.is_none_or(|prior| self.differs(&next, &prior))
            }
        };
        if !changed {
            return false;
        }

        let next = Rc::new(next);
        *self.memo.borrow_mut() = Some(Rc::clone(&next));
        (self.callback)(&next);
        true
    }

    fn forget(&self) {
        self.memo.borrow_mut().take();
    }
}

type Entry<T> = (SubscriptionId, Rc<dyn Listener<T>>);

/// Shared interior of an [`Observer`].
struct Registry<T> {
    entries: Vec<Entry<T>>,
    next_id: u64,
}

/// Removal seam used by [`Subscription`] handles, erasing the value type.
trait Detach {
    fn detach(&self, id: SubscriptionId) -> bool;
    fn contains(&self, id: SubscriptionId) -> bool;
}

impl<T> Detach for RefCell<Registry<T>> {
    fn detach(&self, id: SubscriptionId) -> bool {
        let removed = {
            let mut registry = self.borrow_mut();
            let index = registry
                .entries
                .iter()
                .position(|(entry_id, _)| *entry_id == id);
            index.map(|index| registry.entries.remove(index).1)
        };
        // Dropped outside the borrow: the listener's closures may own
        // handles that detach from this same registry.
        match removed {
            Some(listener) => {
                listener.forget();
                true
            }
            None => false,
        }
    }

    fn contains(&self, id: SubscriptionId) -> bool {
        self.borrow()
            .entries
            .iter()
            .any(|(entry_id, _)| *entry_id == id)
    }
}

/// Handle returned by registration.
///
/// Dropping the handle does **not** unsubscribe: the subscription lives
/// until [`unsubscribe`](Subscription::unsubscribe) is called or the engine
/// is cleared. The handle holds only a weak reference to its engine.
#[must_use = "dropping the handle leaves the subscription registered until the observer is cleared"]
pub struct Subscription {
    id: SubscriptionId,
    registry: Weak<dyn Detach>,
}

impl Subscription {
    /// Token of the subscription this handle controls.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the subscription and its memoized derived value.
    ///
    /// Idempotent: later calls, calls after [`Observer::clear`], and calls
    /// after the engine was dropped do nothing.
    pub fn unsubscribe(&self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        if registry.detach(self.id) {
            debug!(id = self.id.get(), "subscription removed");
        }
    }

    /// Whether the subscription is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.contains(self.id))
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// The notification engine.
///
/// `T` is the value type delivered on each round; `E` is the equality
/// policy applied to derived values (default [`SameValue`]).
pub struct Observer<T, E = SameValue> {
    registry: Rc<RefCell<Registry<T>>>,
    equality: Rc<E>,
    config: ObserverConfig,
}

impl<T, E> fmt::Debug for Observer<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("Observer")
            .field("label", &self.config.label)
            .field("panic_policy", &self.config.panic_policy)
            .field("subscriber_count", &registry.entries.len())
            .finish()
    }
}

impl<T: 'static, E: Default + 'static> Default for Observer<T, E> {
    fn default() -> Self {
        Self::with_config(E::default(), ObserverConfig::default())
    }
}

impl<T: 'static> Observer<T> {
    /// Create an engine with the [`SameValue`] policy and default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: 'static, E: 'static> Observer<T, E> {
    /// Create an engine with a custom equality policy.
    #[must_use]
    pub fn with_equality(equality: E) -> Self {
        Self::with_config(equality, ObserverConfig::default())
    }

    /// Create an engine with a custom equality policy and configuration.
    #[must_use]
    pub fn with_config(equality: E, config: ObserverConfig) -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                entries: Vec::new(),
                next_id: 0,
            })),
            equality: Rc::new(equality),
            config,
        }
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> &ObserverConfig {
        &self.config
    }

    /// The engine's equality policy.
    #[must_use]
    pub fn equality(&self) -> &E {
        &self.equality
    }

    /// Register a full-value listener, invoked on every round.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.insert(Rc::new(FullValue {
            callback: Box::new(callback),
        }))
    }

    /// Register a scoped listener.
    ///
    /// `derive` must be a pure function of the value. `callback` receives
    /// the derived value whenever it differs from the prior one under the
    /// engine's equality policy.
    pub fn subscribe_with<D: 'static>(
        &self,
        derive: impl Fn(&T) -> D + 'static,
        callback: impl Fn(&D) + 'static,
    ) -> Subscription
    where
        E: Equality<D>,
    {
        self.insert(Rc::new(Scoped {
            derive: Box::new(derive),
            callback: Box::new(callback),
            equality: Rc::clone(&self.equality),
            memo: RefCell::new(None),
        }))
    }

    fn insert(&self, listener: Rc<dyn Listener<T>>) -> Subscription {
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = SubscriptionId(registry.next_id);
            registry.next_id += 1;
            registry.entries.push((id, listener));
            id
        };
        debug!(label = self.config.label, id = id.get(), "subscription added");
        let registry = Rc::downgrade(&self.registry);
        let registry: Weak<dyn Detach> = registry;
        Subscription { id, registry }
    }

    /// Run one notification round.
    ///
    /// `last` is the value before the change. When it is given, scoped
    /// listeners compare `derive(value)` against `derive(last)`; otherwise
    /// they compare against their memo, and a listener with no memo fires.
    pub fn notify(&self, value: &T, last: Option<&T>) {
        let recipients: Vec<Entry<T>> = self.registry.borrow().entries.clone();
        let delivered = match self.config.panic_policy {
            PanicPolicy::Abort => {
                let mut delivered = 0;
                for (_, listener) in &recipients {
                    if listener.deliver(value, last) {
                        delivered += 1;
                    }
                }
                delivered
            }
            PanicPolicy::Isolate => self.notify_isolated(&recipients, value, last),
        };
        trace!(
            label = self.config.label,
            policy = self.config.panic_policy.as_str(),
            recipients = recipients.len(),
            delivered,
            "notification round complete"
        );
    }

    fn notify_isolated(&self, recipients: &[Entry<T>], value: &T, last: Option<&T>) -> usize {
        let mut delivered = 0;
        let mut first_panic: Option<Box<dyn Any + Send>> = None;
        for (id, listener) in recipients {
            match panic::catch_unwind(AssertUnwindSafe(|| listener.deliver(value, last))) {
                Ok(true) => delivered += 1,
                Ok(false) => {}
                Err(payload) => {
                    warn!(
                        label = self.config.label,
                        id = id.get(),
                        panic = panic_message(payload.as_ref()),
                        "listener panicked; continuing round"
                    );
                    if first_panic.is_none() {
                        first_panic = Some(payload);
                    }
                }
            }
        }
        if let Some(payload) = first_panic {
            trace!(
                label = self.config.label,
                recipients = recipients.len(),
                delivered,
                "resuming first listener panic"
            );
            panic::resume_unwind(payload);
        }
        delivered
    }

    /// Remove every subscription and memo. Held handles become no-ops.
    pub fn clear(&self) {
        let removed = std::mem::take(&mut self.registry.borrow_mut().entries);
        debug!(label = self.config.label, removed = removed.len(), "observer cleared");
        for (_, listener) in &removed {
            listener.forget();
        }
    }

    /// Number of registered subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.borrow().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "<non-string panic payload>"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
