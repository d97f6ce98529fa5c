//! Lazily computed, memoized values and the small wrappers that travel with
//! them.
//!
//! [`Deferred`] owns its cache cell, [`Indirect`] publishes into a cell owned
//! by someone else. Both hand out `Arc<T>`, so two reads of a warm cache can
//! be compared with [`Arc::ptr_eq`].

use std::sync::Arc;

pub mod deferred;
pub mod indirect;
pub mod wrapper;

pub use deferred::Deferred;
pub use indirect::{
  Indirect,
  Slot,
};
pub use wrapper::{
  Constant,
  Identity,
  Opaque,
};

/// Something that can hand out a shared value on demand.
///
/// Code that only needs "a `T` when asked" should take a `Supplier` so that a
/// [`Constant`] can be swapped in for a lazy cache, e.g. in tests.
pub trait Supplier<T: ?Sized> {
  fn get(&self) -> Arc<T>;
}

impl<T: ?Sized, S: Supplier<T> + ?Sized> Supplier<T> for &S {
  fn get(&self) -> Arc<T> {
    (**self).get()
  }
}

impl<T: ?Sized, S: Supplier<T> + ?Sized> Supplier<T> for Arc<S> {
  fn get(&self) -> Arc<T> {
    (**self).get()
  }
}
