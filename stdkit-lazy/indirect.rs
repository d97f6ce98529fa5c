//! A lazy cache that publishes into a cell owned by the caller.

use std::{
  any::type_name,
  convert::Infallible,
  fmt,
  sync::{
    Arc,
    atomic::{
      AtomicBool,
      Ordering,
    },
  },
};

use arc_swap::ArcSwapOption;
use parking_lot::{
  Mutex,
  RwLock,
};

use crate::Supplier;

/// A settable cell that can hold a shared value or nothing.
pub trait Slot<T> {
  fn load(&self) -> Option<Arc<T>>;
  fn store(&self, value: Option<Arc<T>>);
}

impl<T> Slot<T> for ArcSwapOption<T> {
  fn load(&self) -> Option<Arc<T>> {
    self.load_full()
  }

  fn store(&self, value: Option<Arc<T>>) {
    ArcSwapOption::store(self, value);
  }
}

impl<T> Slot<T> for RwLock<Option<Arc<T>>> {
  fn load(&self) -> Option<Arc<T>> {
    self.read().clone()
  }

  fn store(&self, value: Option<Arc<T>>) {
    *self.write() = value;
  }
}

impl<T, S: Slot<T> + ?Sized> Slot<T> for &S {
  fn load(&self) -> Option<Arc<T>> {
    (**self).load()
  }

  fn store(&self, value: Option<Arc<T>>) {
    (**self).store(value)
  }
}

impl<T, S: Slot<T> + ?Sized> Slot<T> for Arc<S> {
  fn load(&self) -> Option<Arc<T>> {
    (**self).load()
  }

  fn store(&self, value: Option<Arc<T>>) {
    (**self).store(value)
  }
}

type ComputeFn<T, E> = Box<dyn Fn() -> Result<T, E> + Send + Sync>;

/// Like [`Deferred`](crate::Deferred), but the memoized value lives in a
/// [`Slot`] that other code may read, fill or clear at any time.
///
/// The lock only serializes callers going through this `Indirect`. Anyone
/// else touching the slot bypasses it, so the guarantee is weaker: a read
/// that finds the slot empty computes and publishes a value, but two
/// concurrent reads may both end up computing. Whatever is in the slot when
/// a read looks at it is returned as is, including values stored by a third
/// party.
pub struct Indirect<T, S, E = Infallible> {
  slot:      S,
  compute:   ComputeFn<T, E>,
  lock:      Mutex<()>,
  // set once we publish, reset by our own invalidate
  published: AtomicBool,
}

impl<T, S: Slot<T>> Indirect<T, S> {
  pub fn new<F>(slot: S, compute: F) -> Self
  where
    F: Fn() -> T + Send + Sync + 'static,
  {
    Self::fallible(slot, move || Ok(compute()))
  }

  pub fn get(&self) -> Arc<T> {
    match self.try_get() {
      Ok(value) => value,
      Err(never) => match never {},
    }
  }
}

impl<T, S: Slot<T>, E> Indirect<T, S, E> {
  pub fn fallible<F>(slot: S, compute: F) -> Self
  where
    F: Fn() -> Result<T, E> + Send + Sync + 'static,
  {
    Self {
      slot,
      compute:   Box::new(compute),
      lock:      Mutex::new(()),
      published: AtomicBool::new(false),
    }
  }

  pub fn try_get(&self) -> Result<Arc<T>, E> {
    if let Some(value) = self.slot.load() {
      return Ok(value);
    }

    let _guard = self.lock.lock();
    if let Some(value) = self.slot.load() {
      return Ok(value);
    }

    if self.cleared_elsewhere() {
      log::trace!(
        "slot of indirect {} was cleared by another holder, recomputing",
        type_name::<T>()
      );
    } else {
      log::trace!("computing indirect {}", type_name::<T>());
    }
    let value = match (self.compute)() {
      Ok(value) => Arc::new(value),
      Err(err) => {
        log::debug!("failed to compute indirect {}", type_name::<T>());
        return Err(err);
      },
    };
    self.slot.store(Some(Arc::clone(&value)));
    self.published.store(true, Ordering::Release);
    Ok(value)
  }

  /// Whether a value this cache published has since been removed from the
  /// slot by someone other than [`Indirect::invalidate`].
  fn cleared_elsewhere(&self) -> bool {
    self.published.load(Ordering::Acquire) && self.slot.load().is_none()
  }

  /// Clears the slot. Other holders of the slot see the change too.
  pub fn invalidate(&self) {
    self.published.store(false, Ordering::Release);
    self.slot.store(None);
    log::trace!("invalidated indirect {}", type_name::<T>());
  }

  pub fn peek(&self) -> Option<Arc<T>> {
    self.slot.load()
  }

  pub fn is_computed(&self) -> bool {
    self.slot.load().is_some()
  }

  pub fn slot(&self) -> &S {
    &self.slot
  }
}

impl<T, S: Slot<T>> Supplier<T> for Indirect<T, S> {
  fn get(&self) -> Arc<T> {
    Indirect::get(self)
  }
}

impl<T: fmt::Debug, S: Slot<T>, E> fmt::Debug for Indirect<T, S, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Indirect")
      .field("value", &self.slot.load())
      .finish_non_exhaustive()
  }
}
