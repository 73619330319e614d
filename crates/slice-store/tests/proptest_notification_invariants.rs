//! Property-based invariant tests for the notification engine and store.
//!
//! 1. Full-value listeners fire once per `replace` made after registration.
//! 2. A scoped listener fires exactly when its slice changed between
//!    consecutive states, and always receives the new slice.
//! 3. Unsubscribed listeners never fire again.
//! 4. Delivery order equals registration order for every round.
//! 5. `version` counts `replace` calls; `reset` restores the initial state.
//! 6. Same-value equality is reflexive for every float, `NaN` included.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use proptest::prelude::*;
use slice_store::{Equality, SameValue, Store};

#[derive(Debug, Clone, PartialEq)]
struct Pair {
    count: u8,
    name: u8,
}

// ── Strategies ────────────────────────────────────────────────────────────

fn pair_strategy() -> impl Strategy<Value = Pair> {
    // Small ranges so that consecutive states often share a slice.
    (0u8..4, 0u8..4).prop_map(|(count, name)| Pair { count, name })
}

fn states_strategy(max_len: usize) -> impl Strategy<Value = Vec<Pair>> {
    proptest::collection::vec(pair_strategy(), 0..=max_len)
}

// ── Properties ────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn full_value_fires_once_per_replace(
        before in states_strategy(10),
        after in states_strategy(20),
    ) {
        let store = Store::new(|| Pair { count: 0, name: 0 });
        for s in &before {
            store.replace(s.clone());
        }

        let calls = Rc::new(Cell::new(0usize));
        let calls_clone = Rc::clone(&calls);
        let _sub = store.subscribe(move |_| calls_clone.set(calls_clone.get() + 1));
        for s in &after {
            store.replace(s.clone());
        }
        prop_assert_eq!(calls.get(), after.len());
    }

    #[test]
    fn scoped_fires_exactly_on_slice_change(states in states_strategy(30)) {
        let initial = Pair { count: 0, name: 0 };
        let store = Store::new({
            let initial = initial.clone();
            move || initial.clone()
        });

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let _sub = store.subscribe_with(|p: &Pair| p.count, move |c| seen_clone.borrow_mut().push(*c));

        let mut expected = Vec::new();
        let mut prior = initial.count;
        for s in &states {
            if s.count != prior {
                expected.push(s.count);
            }
            prior = s.count;
            store.replace(s.clone());
        }
        prop_assert_eq!(&*seen.borrow(), &expected);
    }

    #[test]
    fn unsubscribed_listener_stays_silent(
        states in states_strategy(20),
        cut in 0usize..20,
    ) {
        let store = Store::new(|| Pair { count: 0, name: 0 });
        let calls = Rc::new(Cell::new(0usize));
        let calls_clone = Rc::clone(&calls);
        let sub = store.subscribe(move |_| calls_clone.set(calls_clone.get() + 1));

        let cut = cut.min(states.len());
        for s in &states[..cut] {
            store.replace(s.clone());
        }
        sub.unsubscribe();
        for s in &states[cut..] {
            store.replace(s.clone());
        }
        sub.unsubscribe();
        prop_assert_eq!(calls.get(), cut);
        prop_assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn delivery_order_is_registration_order(
        listeners in 1usize..8,
        rounds in states_strategy(6),
    ) {
        let store = Store::new(|| Pair { count: 0, name: 0 });
        let log = Rc::new(RefCell::new(Vec::new()));
        let subs: Vec<_> = (0..listeners)
            .map(|i| {
                let log = Rc::clone(&log);
                store.subscribe(move |_| log.borrow_mut().push(i))
            })
            .collect();
        prop_assert_eq!(subs.len(), listeners);

        for s in &rounds {
            log.borrow_mut().clear();
            store.replace(s.clone());
            let expected: Vec<usize> = (0..listeners).collect();
            prop_assert_eq!(&*log.borrow(), &expected);
        }
    }

    #[test]
    fn version_counts_replaces_and_reset_restores(states in states_strategy(15)) {
        let store = Store::new(|| Pair { count: 1, name: 1 });
        for s in &states {
            store.replace(s.clone());
        }
        prop_assert_eq!(store.version(), states.len() as u64);

        store.reset().expect("resettable store");
        prop_assert_eq!(store.version(), states.len() as u64 + 1);
        prop_assert_eq!(&*store.state(), &Pair { count: 1, name: 1 });
    }

    #[test]
    fn same_value_is_reflexive_for_floats(bits in any::<u64>()) {
        let x = f64::from_bits(bits);
        prop_assert!(SameValue.equal(&x, &x));
    }

    #[test]
    fn same_value_matches_partial_eq_for_non_zero_non_nan(a in any::<f64>(), b in any::<f64>()) {
        prop_assume!(!a.is_nan() && !b.is_nan() && a != 0.0 && b != 0.0);
        prop_assert_eq!(SameValue.equal(&a, &b), a == b);
    }
}
