#![forbid(unsafe_code)]

//! Producer adapters for [`Store`](crate::Store) initializers.
//!
//! A store only knows one kind of initializer: a zero-argument `Fn() -> T`.
//! These helpers build one from other construction styles.

/// Producer backed by `T::default`.
#[must_use]
pub fn default_maker<T: Default>() -> fn() -> T {
    T::default
}

/// Producer that clones a template value on every call.
pub fn value_maker<T: Clone>(template: T) -> impl Fn() -> T {
    move || template.clone()
}
