//! Wrappers that pick the equality and printing semantics of a shared value.
//!
//! - [`Constant`] compares by value and is a ready-made [`Supplier`].
//! - [`Identity`] compares by allocation, not by contents.
//! - [`Opaque`] compares by value but never prints its contents.

use std::{
  any::type_name,
  fmt,
  hash::{
    Hash,
    Hasher,
  },
  ops::Deref,
  sync::Arc,
};

use crate::Supplier;

/// An already computed value with value semantics.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Constant<T: ?Sized>(Arc<T>);

impl<T> Constant<T> {
  pub fn new(value: T) -> Self {
    Self(Arc::new(value))
  }
}

impl<T: ?Sized> Constant<T> {
  pub fn from_arc(value: Arc<T>) -> Self {
    Self(value)
  }

  pub fn as_arc(&self) -> &Arc<T> {
    &self.0
  }
}

impl<T: ?Sized> Clone for Constant<T> {
  fn clone(&self) -> Self {
    Self(Arc::clone(&self.0))
  }
}

impl<T: ?Sized> Deref for Constant<T> {
  type Target = T;

  fn deref(&self) -> &T {
    &self.0
  }
}

impl<T> From<T> for Constant<T> {
  fn from(value: T) -> Self {
    Self::new(value)
  }
}

impl<T: ?Sized> Supplier<T> for Constant<T> {
  fn get(&self) -> Arc<T> {
    Arc::clone(&self.0)
  }
}

impl<T: fmt::Debug + ?Sized> fmt::Debug for Constant<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Constant").field(&&*self.0).finish()
  }
}

fn address<T: ?Sized>(value: &Arc<T>) -> usize {
  Arc::as_ptr(value) as *const () as usize
}

/// A shared value with reference semantics: two `Identity`s are equal only
/// when they point at the same allocation, whatever the contents.
///
/// The hash is taken from the address once, at construction, so `T` does not
/// need to be `Hash` and hashing never touches the value.
pub struct Identity<T: ?Sized> {
  value: Arc<T>,
  id:    usize,
}

impl<T> Identity<T> {
  pub fn new(value: T) -> Self {
    Self::from_arc(Arc::new(value))
  }
}

impl<T: ?Sized> Identity<T> {
  pub fn from_arc(value: Arc<T>) -> Self {
    let id = address(&value);
    Self { value, id }
  }

  /// Opaque tag identifying the allocation. Stable for the lifetime of the
  /// value, reusable after it is dropped.
  pub fn id(&self) -> usize {
    self.id
  }

  pub fn as_arc(&self) -> &Arc<T> {
    &self.value
  }
}

impl<T: ?Sized> Clone for Identity<T> {
  fn clone(&self) -> Self {
    Self {
      value: Arc::clone(&self.value),
      id:    self.id,
    }
  }
}

impl<T: ?Sized> PartialEq for Identity<T> {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.value, &other.value)
  }
}

impl<T: ?Sized> Eq for Identity<T> {}

impl<T: ?Sized> Hash for Identity<T> {
  fn hash<H: Hasher>(&self, state: &mut H) {
    state.write_usize(self.id);
  }
}

impl<T: ?Sized> Deref for Identity<T> {
  type Target = T;

  fn deref(&self) -> &T {
    &self.value
  }
}

impl<T: ?Sized> Supplier<T> for Identity<T> {
  fn get(&self) -> Arc<T> {
    Arc::clone(&self.value)
  }
}

impl<T: fmt::Debug + ?Sized> fmt::Debug for Identity<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Identity")
      .field("id", &format_args!("{:#x}", self.id))
      .field("value", &&*self.value)
      .finish()
  }
}

/// A shared value that is never printed.
///
/// `Debug` and `Display` only show the type name and an identity tag, which
/// is enough to tell instances apart in logs without leaking secrets. The
/// contents are reachable through [`Opaque::expose`], so every read is
/// explicit at the call site.
pub struct Opaque<T: ?Sized>(Arc<T>);

impl<T> Opaque<T> {
  pub fn new(value: T) -> Self {
    Self(Arc::new(value))
  }
}

impl<T: ?Sized> Opaque<T> {
  pub fn from_arc(value: Arc<T>) -> Self {
    Self(value)
  }

  pub fn expose(&self) -> &T {
    &self.0
  }

  pub fn id(&self) -> usize {
    address(&self.0)
  }
}

impl<T: ?Sized> Clone for Opaque<T> {
  fn clone(&self) -> Self {
    Self(Arc::clone(&self.0))
  }
}

impl<T: PartialEq + ?Sized> PartialEq for Opaque<T> {
  fn eq(&self, other: &Self) -> bool {
    *self.0 == *other.0
  }
}

impl<T: Eq + ?Sized> Eq for Opaque<T> {}

impl<T: Hash + ?Sized> Hash for Opaque<T> {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.0.hash(state);
  }
}

impl<T: ?Sized> fmt::Display for Opaque<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Opaque<{}>@{:x}", type_name::<T>(), self.id())
  }
}

impl<T: ?Sized> fmt::Debug for Opaque<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(self, f)
  }
}
