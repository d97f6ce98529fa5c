//! Immutable capability registries and the lookup adapter for objects that
//! may or may not carry one.

use std::{
  fmt,
  hash::{
    BuildHasher,
    Hash,
    Hasher,
  },
  sync::Arc,
};

use hashbrown::HashSet;
use once_cell::sync::Lazy;

use crate::{
  Capability,
  ExtensionsError,
  Result,
};

pub type TokenSet = HashSet<Capability, foldhash::fast::RandomState>;

static EMPTY: Lazy<Extensions> = Lazy::new(|| {
  Extensions {
    tokens: Arc::new(TokenSet::default()),
  }
});

/// The set of capabilities an object supports.
///
/// A registry never changes after construction. Cloning is cheap since the
/// set is shared; [`with`](Extensions::with) and
/// [`without`](Extensions::without) build new registries. Two registries are
/// equal when they hold the same tokens, and hash alike regardless of the
/// order the tokens were added in.
#[derive(Clone, PartialEq, Eq)]
pub struct Extensions {
  tokens: Arc<TokenSet>,
}

impl Extensions {
  /// Builds a registry from `tokens`, collapsing duplicates.
  pub fn new(tokens: impl IntoIterator<Item = Capability>) -> Self {
    Self {
      tokens: Arc::new(tokens.into_iter().collect()),
    }
  }

  /// Builds a registry from a token list that may have holes. A `None` entry
  /// rejects the whole list.
  pub fn try_from_tokens(tokens: impl IntoIterator<Item = Option<Capability>>) -> Result<Self> {
    let tokens = tokens
      .into_iter()
      .enumerate()
      .map(|(position, token)| token.ok_or(ExtensionsError::MissingToken { position }))
      .collect::<Result<TokenSet>>()?;
    Ok(Self {
      tokens: Arc::new(tokens),
    })
  }

  /// Adopts an existing set without copying it.
  pub fn shared(tokens: Arc<TokenSet>) -> Self {
    Self { tokens }
  }

  pub fn empty() -> &'static Extensions {
    &EMPTY
  }

  /// Returns the registry `object` declares, or the empty registry when it
  /// declares none or there is no object at all.
  pub fn of<'a, T: Extensible + ?Sized>(object: Option<&'a T>) -> &'a Extensions {
    match object.and_then(|object| object.extensions()) {
      Some(extensions) => extensions,
      None => {
        log::trace!("no extensions declared, using the empty registry");
        Self::empty()
      },
    }
  }

  pub fn present(&self, token: &Capability) -> bool {
    self.tokens.contains(token)
  }

  pub fn missing(&self, token: &Capability) -> bool {
    !self.present(token)
  }

  pub fn if_present(&self, token: &Capability, action: impl FnOnce()) -> &Self {
    if self.present(token) {
      action();
    }
    self
  }

  pub fn if_missing(&self, token: &Capability, action: impl FnOnce()) -> &Self {
    if self.missing(token) {
      action();
    }
    self
  }

  /// Runs `action` when `token` is missing and reports whether it ran.
  ///
  /// Useful as a guard: `if !extensions.not_present(&token, fallback) { .. }`
  /// runs the fallback or the body, never both.
  pub fn not_present(&self, token: &Capability, action: impl FnOnce()) -> bool {
    let missing = self.missing(token);
    if missing {
      action();
    }
    missing
  }

  /// Runs `action` when `token` is present and reports whether it ran.
  pub fn not_missing(&self, token: &Capability, action: impl FnOnce()) -> bool {
    let present = self.present(token);
    if present {
      action();
    }
    present
  }

  /// Runs `action` if every token is present. Vacuously true for no tokens.
  pub fn all_present<'t>(
    &self,
    tokens: impl IntoIterator<Item = &'t Capability>,
    action: impl FnOnce(),
  ) -> &Self {
    self.run_if(tokens.into_iter().all(|token| self.present(token)), action)
  }

  pub fn any_present<'t>(
    &self,
    tokens: impl IntoIterator<Item = &'t Capability>,
    action: impl FnOnce(),
  ) -> &Self {
    self.run_if(tokens.into_iter().any(|token| self.present(token)), action)
  }

  pub fn all_missing<'t>(
    &self,
    tokens: impl IntoIterator<Item = &'t Capability>,
    action: impl FnOnce(),
  ) -> &Self {
    self.run_if(tokens.into_iter().all(|token| self.missing(token)), action)
  }

  pub fn any_missing<'t>(
    &self,
    tokens: impl IntoIterator<Item = &'t Capability>,
    action: impl FnOnce(),
  ) -> &Self {
    self.run_if(tokens.into_iter().any(|token| self.missing(token)), action)
  }

  fn run_if(&self, holds: bool, action: impl FnOnce()) -> &Self {
    if holds {
      action();
    }
    self
  }

  /// A new registry with `token` added.
  pub fn with(&self, token: Capability) -> Self {
    if self.present(&token) {
      return self.clone();
    }
    let mut tokens = TokenSet::clone(&self.tokens);
    tokens.insert(token);
    Self::shared(Arc::new(tokens))
  }

  /// A new registry with `token` removed.
  pub fn without(&self, token: &Capability) -> Self {
    if self.missing(token) {
      return self.clone();
    }
    let mut tokens = TokenSet::clone(&self.tokens);
    tokens.remove(token);
    Self::shared(Arc::new(tokens))
  }

  pub fn len(&self) -> usize {
    self.tokens.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tokens.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Capability> {
    self.tokens.iter()
  }

  pub fn tokens(&self) -> &Arc<TokenSet> {
    &self.tokens
  }
}

impl Default for Extensions {
  fn default() -> Self {
    Self::empty().clone()
  }
}

impl FromIterator<Capability> for Extensions {
  fn from_iter<I: IntoIterator<Item = Capability>>(tokens: I) -> Self {
    Self::new(tokens)
  }
}

impl<'a> IntoIterator for &'a Extensions {
  type IntoIter = hashbrown::hash_set::Iter<'a, Capability>;
  type Item = &'a Capability;

  fn into_iter(self) -> Self::IntoIter {
    self.tokens.iter()
  }
}

impl Hash for Extensions {
  fn hash<H: Hasher>(&self, state: &mut H) {
    // set iteration order is arbitrary, so combine per-token hashes with a
    // commutative operation under a fixed seed
    let tokens = foldhash::fast::FixedState::with_seed(0);
    let combined = self
      .tokens
      .iter()
      .fold(0_u64, |acc, token| acc.wrapping_add(tokens.hash_one(token)));
    state.write_usize(self.tokens.len());
    state.write_u64(combined);
  }
}

impl fmt::Debug for Extensions {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_set().entries(self.tokens.iter()).finish()
  }
}

/// Implemented by types that may advertise capabilities.
///
/// The default says "none", so opting in without declaring anything is a
/// one-line `impl Extensible for Foo {}`.
pub trait Extensible {
  fn extensions(&self) -> Option<&Extensions> {
    None
  }
}

impl Extensible for Extensions {
  fn extensions(&self) -> Option<&Extensions> {
    Some(self)
  }
}

impl<T: Extensible + ?Sized> Extensible for &T {
  fn extensions(&self) -> Option<&Extensions> {
    (**self).extensions()
  }
}

impl<T: Extensible + ?Sized> Extensible for Box<T> {
  fn extensions(&self) -> Option<&Extensions> {
    (**self).extensions()
  }
}

impl<T: Extensible + ?Sized> Extensible for Arc<T> {
  fn extensions(&self) -> Option<&Extensions> {
    (**self).extensions()
  }
}

#[cfg(test)]
mod tests {
  use std::{
    cell::Cell,
    panic::{
      AssertUnwindSafe,
      catch_unwind,
    },
  };

  use super::*;

  fn abc() -> (Capability, Capability, Capability) {
    (
      Capability::named("a"),
      Capability::named("b"),
      Capability::named("c"),
    )
  }

  #[test]
  fn membership() {
    let (a, b, c) = abc();
    let extensions = Extensions::new([a.clone(), b.clone()]);

    assert!(extensions.present(&a));
    assert!(extensions.present(&b));
    assert!(!extensions.present(&c));
    assert!(extensions.missing(&c));
    assert_eq!(extensions.len(), 2);
  }

  #[test]
  fn duplicates_collapse() {
    let (a, ..) = abc();
    let twice = Extensions::new([a.clone(), a.clone()]);
    let once = Extensions::new([a]);
    assert_eq!(twice, once);
    assert_eq!(twice.len(), 1);
  }

  #[test]
  fn conditional_actions_chain() {
    let (a, _, c) = abc();
    let extensions = Extensions::new([a.clone()]);
    let ran = Cell::new(0);

    extensions
      .if_present(&a, || ran.set(ran.get() + 1))
      .if_present(&c, || ran.set(ran.get() + 10))
      .if_missing(&c, || ran.set(ran.get() + 100))
      .if_missing(&a, || ran.set(ran.get() + 1000));

    assert_eq!(ran.get(), 101);
  }

  #[test]
  fn inverse_guards_report_whether_action_ran() {
    let (a, _, c) = abc();
    let extensions = Extensions::new([a.clone()]);
    let ran = Cell::new(false);

    assert!(!extensions.not_present(&a, || ran.set(true)));
    assert!(!ran.get());
    assert!(extensions.not_present(&c, || ran.set(true)));
    assert!(ran.take());

    assert!(extensions.not_missing(&a, || ran.set(true)));
    assert!(ran.take());
    assert!(!extensions.not_missing(&c, || ran.set(true)));
    assert!(!ran.get());
  }

  #[test]
  fn quantifiers() {
    let (a, b, c) = abc();
    let extensions = Extensions::new([a.clone(), b.clone()]);
    let ran = Cell::new(false);

    extensions.all_present([&a, &b], || ran.set(true));
    assert!(ran.take());
    extensions.all_present([&a, &b, &c], || ran.set(true));
    assert!(!ran.take());
    extensions.any_present([&c], || ran.set(true));
    assert!(!ran.take());
    extensions.any_present([&c, &b], || ran.set(true));
    assert!(ran.take());
    extensions.any_missing([&c], || ran.set(true));
    assert!(ran.take());
    extensions.any_missing([&a, &b], || ran.set(true));
    assert!(!ran.take());
    extensions.all_missing([&c], || ran.set(true));
    assert!(ran.take());
    extensions.all_missing([&a, &c], || ran.set(true));
    assert!(!ran.take());
  }

  #[test]
  fn quantifiers_over_no_tokens() {
    let extensions = Extensions::empty();
    let ran = Cell::new(0);

    extensions
      .all_present([], || ran.set(ran.get() + 1))
      .all_missing([], || ran.set(ran.get() + 1))
      .any_present([], || ran.set(ran.get() + 10))
      .any_missing([], || ran.set(ran.get() + 10));

    assert_eq!(ran.get(), 2);
  }

  #[test]
  fn action_panics_propagate_unchanged() {
    let (a, b, _) = abc();
    let extensions = Extensions::new([a.clone(), b.clone()]);

    let payload = catch_unwind(AssertUnwindSafe(|| {
      extensions.if_present(&a, || panic!("action failed"));
    }))
    .unwrap_err();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"action failed"));

    let payload = catch_unwind(AssertUnwindSafe(|| {
      extensions.all_present([&a, &b], || std::panic::panic_any(7_u32));
    }))
    .unwrap_err();
    assert_eq!(payload.downcast_ref::<u32>(), Some(&7));

    assert!(extensions.present(&a) && extensions.present(&b));
    assert_eq!(extensions, Extensions::new([a, b]));
  }

  #[test]
  fn equal_registries_hash_alike() {
    let (a, b, c) = abc();
    let forward = Extensions::new([a.clone(), b.clone(), c.clone()]);
    let backward = Extensions::new([c.clone(), b.clone(), a.clone(), a.clone()]);
    let fewer = Extensions::new([a, b]);

    let set: HashSet<Extensions, foldhash::fast::RandomState> =
      [forward.clone(), backward, fewer.clone()].into_iter().collect();
    assert_eq!(set.len(), 2);
    assert!(set.contains(&forward) && set.contains(&fewer));
  }

  #[test]
  fn missing_token_is_rejected() {
    let (a, b, _) = abc();
    assert_eq!(
      Extensions::try_from_tokens([Some(a.clone()), None, Some(b.clone())]),
      Err(ExtensionsError::MissingToken { position: 1 })
    );
    assert_eq!(
      Extensions::try_from_tokens([Some(a.clone()), Some(b.clone())]).unwrap(),
      Extensions::new([a, b])
    );
  }

  #[test]
  fn shared_set_is_not_copied() {
    let (a, b, _) = abc();
    let set: Arc<TokenSet> = Arc::new([a, b].into_iter().collect());
    let extensions = Extensions::shared(Arc::clone(&set));
    assert!(Arc::ptr_eq(extensions.tokens(), &set));
    assert!(Arc::ptr_eq(extensions.clone().tokens(), &set));
  }

  #[test]
  fn with_and_without_build_new_registries() {
    let (a, b, _) = abc();
    let original = Extensions::new([a.clone()]);
    let grown = original.with(b.clone());
    let shrunk = grown.without(&a);

    assert!(original.missing(&b));
    assert!(grown.present(&a) && grown.present(&b));
    assert_eq!(shrunk, Extensions::new([b]));
    assert!(Arc::ptr_eq(original.with(a).tokens(), original.tokens()));
  }

  #[test]
  fn empty_is_a_singleton() {
    assert!(std::ptr::eq(Extensions::empty(), Extensions::empty()));
    assert!(Extensions::empty().is_empty());
    assert_eq!(Extensions::default(), *Extensions::empty());
  }

  struct Plain;

  impl Extensible for Plain {}

  struct Seekable {
    extensions: Extensions,
  }

  impl Extensible for Seekable {
    fn extensions(&self) -> Option<&Extensions> {
      Some(&self.extensions)
    }
  }

  #[test]
  fn lookup_falls_back_to_empty() {
    let (a, ..) = abc();
    let seekable = Seekable {
      extensions: Extensions::new([a.clone()]),
    };

    assert!(Extensions::of(Some(&seekable)).present(&a));
    assert!(std::ptr::eq(Extensions::of(Some(&Plain)), Extensions::empty()));
    assert!(std::ptr::eq(Extensions::of(None::<&Plain>), Extensions::empty()));
  }

  #[test]
  fn lookup_through_trait_objects() {
    let (a, ..) = abc();
    let objects: Vec<Box<dyn Extensible>> = vec![
      Box::new(Plain),
      Box::new(Seekable {
        extensions: Extensions::new([a.clone()]),
      }),
    ];

    let seekable: Vec<bool> = objects
      .iter()
      .map(|object| Extensions::of(Some(object)).present(&a))
      .collect();
    assert_eq!(seekable, [false, true]);
  }
}
