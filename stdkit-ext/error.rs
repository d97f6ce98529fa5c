use thiserror::Error;

/// Errors raised while building capabilities and registries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtensionsError {
  /// A token list contained a hole where a capability was expected
  #[error("missing capability token at position {position}")]
  MissingToken { position: usize },

  /// Capabilities must have a non-empty name
  #[error("capability name must not be empty")]
  EmptyName,
}

pub type Result<T> = std::result::Result<T, ExtensionsError>;
