#![forbid(unsafe_code)]

//! Comparison policies used to decide whether a derived value changed.
//!
//! # Design
//!
//! An [`Observer`](crate::Observer) owns exactly one policy value, chosen as
//! a type parameter at construction. A policy implements [`Equality<D>`] for
//! every derived type `D` it knows how to compare, so the engine can check at
//! registration time that each selector's output is comparable.
//!
//! | Policy         | Semantics                                              |
//! |----------------|--------------------------------------------------------|
//! | [`SameValue`]  | default; strict same-value check via [`SameValueEq`]   |
//! | [`Structural`] | `PartialEq`                                            |
//! | `Fn(&D, &D) -> bool` | caller-supplied predicate for a single `D`       |
//!
//! # Same-value semantics
//!
//! - Floats: `NaN` equals `NaN` (any payload), `+0.0` differs from `-0.0`.
//! - `Rc` / `Arc`: pointer identity, never the pointee.
//! - Other owned data: by value. A selector always returns a fresh owned
//!   value, so owned data has no identity to compare.
//! - Shared references (`&'static str`, `&T`): by the referenced value.
//!
//! Types of your own opt in through [`same_value_by_eq!`](crate::same_value_by_eq),
//! which compares them with `PartialEq`:
//!
//! ```
//! #[derive(Debug, Clone, PartialEq)]
//! enum Phase {
//!     Idle,
//!     Loading,
//! }
//! slice_store::same_value_by_eq!(Phase);
//!
//! use slice_store::{Equality, SameValue};
//! assert!(SameValue.equal(&Phase::Idle, &Phase::Idle));
//! assert!(!SameValue.equal(&Phase::Idle, &Phase::Loading));
//! ```

use std::rc::Rc;
use std::sync::Arc;

/// A comparison policy for derived values of type `D`.
pub trait Equality<D: ?Sized> {
    /// Returns `true` when `a` and `b` should be treated as unchanged.
    fn equal(&self, a: &D, b: &D) -> bool;
}

impl<D: ?Sized, F> Equality<D> for F
where
    F: Fn(&D, &D) -> bool,
{
    fn equal(&self, a: &D, b: &D) -> bool {
        self(a, b)
    }
}

/// Default policy: strict same-value comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SameValue;

impl<D: SameValueEq + ?Sized> Equality<D> for SameValue {
    fn equal(&self, a: &D, b: &D) -> bool {
        a.same_value(b)
    }
}

/// Structural policy: `PartialEq`.
///
/// Note that under this policy `NaN` never equals itself, so a selector
/// returning `NaN` fires on every round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Structural;

impl<D: PartialEq + ?Sized> Equality<D> for Structural {
    fn equal(&self, a: &D, b: &D) -> bool {
        a == b
    }
}

/// Types comparable under [`SameValue`].
pub trait SameValueEq {
    fn same_value(&self, other: &Self) -> bool;
}

/// Implement [`SameValueEq`] for types compared by `PartialEq`.
#[macro_export]
macro_rules! same_value_by_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::SameValueEq for $ty {
                #[inline]
                fn same_value(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

same_value_by_eq!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    str,
    String,
);

macro_rules! same_value_float {
    ($($ty:ty),*) => {
        $(
            impl SameValueEq for $ty {
                #[inline]
                fn same_value(&self, other: &Self) -> bool {
                    // Bit equality keeps signed zeros apart.
                    (self.is_nan() && other.is_nan()) || self.to_bits() == other.to_bits()
                }
            }
        )*
    };
}

same_value_float!(f32, f64);

impl<T: SameValueEq + ?Sized> SameValueEq for &T {
    fn same_value(&self, other: &Self) -> bool {
        (**self).same_value(&**other)
    }
}

impl<T: SameValueEq> SameValueEq for Option<T> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_value(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: SameValueEq> SameValueEq for [T] {
    fn same_value(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.same_value(b))
    }
}

impl<T: SameValueEq, const N: usize> SameValueEq for [T; N] {
    fn same_value(&self, other: &Self) -> bool {
        self.as_slice().same_value(other.as_slice())
    }
}

impl<T: SameValueEq> SameValueEq for Vec<T> {
    fn same_value(&self, other: &Self) -> bool {
        self.as_slice().same_value(other.as_slice())
    }
}

impl<T: SameValueEq + ?Sized> SameValueEq for Box<T> {
    fn same_value(&self, other: &Self) -> bool {
        (**self).same_value(&**other)
    }
}

impl<T: ?Sized> SameValueEq for Rc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> SameValueEq for Arc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

macro_rules! same_value_tuple {
    ($(($($name:ident : $idx:tt),+)),* $(,)?) => {
        $(
            impl<$($name: SameValueEq),+> SameValueEq for ($($name,)+) {
                fn same_value(&self, other: &Self) -> bool {
                    $(self.$idx.same_value(&other.$idx))&&+
                }
            }
        )*
    };
}

same_value_tuple!(
    (A: 0),
    (A: 0, B: 1),
    (A: 0, B: 1, C: 2),
    (A: 0, B: 1, C: 2, D: 3),
);
