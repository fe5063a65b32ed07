#![forbid(unsafe_code)]

//! Error type shared by every store operation.

/// Errors surfaced synchronously by [`PropertyStore`](crate::PropertyStore)
/// operations.
///
/// Validation failures are not errors: they are returned as
/// [`Violation`](crate::Violation) data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// An empty property name was passed to a store operation.
    #[error("invalid property name: {name:?}")]
    InvalidArgument { name: String },

    /// The owner's registry has no property with this name.
    #[error("unknown property '{name}' on {owner}")]
    UnknownProperty { name: String, owner: &'static str },

    /// Debug-only name verification found no registered property.
    #[error("invalid property name: {name} (not declared by {owner})")]
    MalformedAccessor { name: String, owner: &'static str },

    /// A typed read found a value stored under a different type.
    #[error("property '{name}' holds {found}, not {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Reject empty property names.
pub(crate) fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StoreError::InvalidArgument {
            name: name.to_owned(),
        });
    }
    Ok(())
}
