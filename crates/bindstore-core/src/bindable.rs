#![forbid(unsafe_code)]

//! Owner-side integration: the data-error contract.
//!
//! Types that embed a [`PropertyStore`] implement [`Bindable`] to expose the
//! per-field and object-level error strings a binding layer queries by name.

use crate::error::Result;
use crate::store::PropertyStore;

/// An object whose bindable state lives in a [`PropertyStore`].
///
/// Only [`properties`](Self::properties) is required. Override
/// [`on_validate`](Self::on_validate) to add checks beyond the registered
/// rule sets.
pub trait Bindable: Sized + Send + Sync + 'static {
    /// The embedded store.
    fn properties(&self) -> &PropertyStore<Self>;

    /// Error text for `property_name`: the first registered violation, or
    /// `""` when the value is valid.
    fn on_validate(&self, property_name: &str) -> Result<String> {
        self.properties().first_error(property_name)
    }

    /// Object-level error text. Always empty; consumers query per field.
    fn error(&self) -> String {
        String::new()
    }

    /// Per-field error text, as consumed by a binding layer.
    fn error_for(&self, property_name: &str) -> Result<String> {
        self.on_validate(property_name)
    }
}
