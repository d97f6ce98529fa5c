//! Capability registries: an object advertises what it supports as a fixed
//! set of [`Capability`] tokens, callers ask and branch on the answer.
//!
//! ```
//! use stdkit_ext::{
//!   Capability,
//!   Extensions,
//! };
//!
//! let seekable = Capability::named("seekable");
//! let writable = Capability::named("writable");
//! let extensions = Extensions::new([seekable.clone()]);
//!
//! let mut log = Vec::new();
//! extensions
//!   .if_present(&seekable, || log.push("seek"))
//!   .if_missing(&writable, || log.push("read-only"));
//! assert_eq!(log, ["seek", "read-only"]);
//! ```

mod capability;
mod error;
pub mod extensions;

pub use capability::Capability;
pub use error::{
  ExtensionsError,
  Result,
};
pub use extensions::{
  Extensible,
  Extensions,
  TokenSet,
};
