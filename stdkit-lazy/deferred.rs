//! A self-contained lazy cache.

use std::{
  any::type_name,
  convert::Infallible,
  fmt,
  sync::Arc,
};

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

use crate::Supplier;

type ComputeFn<T, E> = Box<dyn Fn() -> Result<T, E> + Send + Sync>;

/// A value computed on first access and memoized until [`invalidate`]d.
///
/// Reads of a warm cache are a single atomic load. A cold read takes a
/// per-instance lock, checks the cell again and only then runs the compute
/// function, so between two invalidations the function runs at most once no
/// matter how many threads race on the first read.
///
/// A failing (or panicking) compute function leaves the cell empty, the next
/// read simply tries again. An "empty" result such as `None` is a perfectly
/// good value and is cached like any other.
///
/// [`invalidate`]: Deferred::invalidate
pub struct Deferred<T, E = Infallible> {
  compute: ComputeFn<T, E>,
  cell:    ArcSwapOption<T>,
  lock:    Mutex<()>,
}

impl<T> Deferred<T> {
  pub fn new<F>(compute: F) -> Self
  where
    F: Fn() -> T + Send + Sync + 'static,
  {
    Self::fallible(move || Ok(compute()))
  }

  /// Returns the cached value, computing it first if needed.
  pub fn get(&self) -> Arc<T> {
    match self.try_get() {
      Ok(value) => value,
      Err(never) => match never {},
    }
  }
}

impl<T, E> Deferred<T, E> {
  /// Creates a cache around a compute function that may fail. Errors are
  /// handed back from [`Deferred::try_get`] and never cached.
  pub fn fallible<F>(compute: F) -> Self
  where
    F: Fn() -> Result<T, E> + Send + Sync + 'static,
  {
    Self {
      compute: Box::new(compute),
      cell:    ArcSwapOption::empty(),
      lock:    Mutex::new(()),
    }
  }

  pub fn try_get(&self) -> Result<Arc<T>, E> {
    if let Some(value) = self.cell.load_full() {
      return Ok(value);
    }

    let _guard = self.lock.lock();
    // somebody else may have published while we were waiting on the lock
    if let Some(value) = self.cell.load_full() {
      return Ok(value);
    }

    log::trace!("computing deferred {}", type_name::<T>());
    let value = match (self.compute)() {
      Ok(value) => Arc::new(value),
      Err(err) => {
        log::debug!("failed to compute deferred {}", type_name::<T>());
        return Err(err);
      },
    };
    self.cell.store(Some(Arc::clone(&value)));
    Ok(value)
  }

  /// Drops the cached value so the next read recomputes it.
  ///
  /// This does not wait for a computation that is already running; such a
  /// computation still publishes its result when it finishes.
  pub fn invalidate(&self) {
    if self.cell.swap(None).is_some() {
      log::trace!("invalidated deferred {}", type_name::<T>());
    }
  }

  /// Returns the cached value without computing anything.
  pub fn peek(&self) -> Option<Arc<T>> {
    self.cell.load_full()
  }

  pub fn is_computed(&self) -> bool {
    self.cell.load().is_some()
  }
}

impl<T> Supplier<T> for Deferred<T> {
  fn get(&self) -> Arc<T> {
    Deferred::get(self)
  }
}

impl<T: fmt::Debug, E> fmt::Debug for Deferred<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Deferred")
      .field("value", &self.cell.load_full())
      .finish_non_exhaustive()
  }
}
