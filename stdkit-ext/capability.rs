use std::{
  fmt,
  sync::atomic::{
    AtomicU64,
    Ordering,
  },
};

use kstring::KString;

use crate::{
  ExtensionsError,
  Result,
};

// 0 is reserved for capabilities compared by name
static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// An opaque marker an object can advertise through its
/// [`Extensions`](crate::Extensions).
///
/// Named capabilities compare by name, so independently created markers with
/// the same name are interchangeable. Unique capabilities compare by
/// identity: every call to [`Capability::unique`] mints a marker that only
/// equals its own clones.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Capability {
  name:     KString,
  instance: u64,
}

impl Capability {
  /// # Panics
  ///
  /// Panics if `name` is empty. Use [`Capability::try_named`] for names that
  /// are not known up front.
  pub fn named(name: &'static str) -> Self {
    assert_named(name);
    Self {
      name:     KString::from_static(name),
      instance: 0,
    }
  }

  /// Builds a named capability from a runtime string.
  pub fn try_named(name: impl AsRef<str>) -> Result<Self> {
    let name = name.as_ref();
    if name.is_empty() {
      return Err(ExtensionsError::EmptyName);
    }
    Ok(Self {
      name:     KString::from_ref(name),
      instance: 0,
    })
  }

  /// # Panics
  ///
  /// Panics if `name` is empty.
  pub fn unique(name: &'static str) -> Self {
    assert_named(name);
    Self {
      name:     KString::from_static(name),
      instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
    }
  }

  pub fn name(&self) -> &str {
    self.name.as_str()
  }

  pub fn is_unique(&self) -> bool {
    self.instance != 0
  }
}

fn assert_named(name: &str) {
  assert!(!name.is_empty(), "{}", ExtensionsError::EmptyName);
}

impl fmt::Debug for Capability {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_unique() {
      write!(f, "Capability({:?}#{})", self.name(), self.instance)
    } else {
      write!(f, "Capability({:?})", self.name())
    }
  }
}

impl fmt::Display for Capability {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}
