#![forbid(unsafe_code)]

//! Loosely typed property values and typed property keys.
//!
//! The store keeps every value as a `Box<dyn DynValue>`. Any
//! `'static + Clone + PartialEq + Debug + Send + Sync` type qualifies through
//! the blanket impl, so owners never implement [`DynValue`] by hand.
//!
//! # Equality
//!
//! [`DynValue::dyn_eq`] compares by `PartialEq` when both sides have the same
//! concrete type. Values of different types are never equal, so a write that
//! changes a property's type always counts as a change.

use std::any::{Any, type_name};
use std::fmt;
use std::marker::PhantomData;

/// Object-safe view of a stored property value.
pub trait DynValue: Any + Send + Sync + fmt::Debug {
    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Same-type `PartialEq`; `false` across types.
    fn dyn_eq(&self, other: &dyn DynValue) -> bool;

    /// Clone into a fresh box.
    fn clone_boxed(&self) -> Box<dyn DynValue>;

    /// `std::any::type_name` of the concrete type.
    fn type_name(&self) -> &'static str;
}

impl<T> DynValue for T
where
    T: Any + Clone + PartialEq + fmt::Debug + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn DynValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn clone_boxed(&self) -> Box<dyn DynValue> {
        Box::new(self.clone())
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }
}

impl dyn DynValue {
    /// Borrow the value as `T` if that is its concrete type.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Marker for types that can be stored and default-materialized.
///
/// Blanket-implemented; it only names the bound set used by typed reads.
pub trait PropertyValue: DynValue + Clone + PartialEq + Default {}

impl<T> PropertyValue for T where T: DynValue + Clone + PartialEq + Default {}

/// A property name bound to its value type.
///
/// Declare one constant per property so reads and writes cannot drift apart
/// through typos or mismatched types:
///
/// ```
/// use bindstore_core::PropertyKey;
///
/// const NAME: PropertyKey<String> = PropertyKey::new("Name");
/// assert_eq!(NAME.name(), "Name");
/// ```
pub struct PropertyKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PropertyKey<T> {
    /// Bind `name` to the value type `T`.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// The property name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

// Manual impls: `T` need not be Clone/Copy/Debug for the key to be.
impl<T> Clone for PropertyKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PropertyKey<T> {}

impl<T> fmt::Debug for PropertyKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyKey")
            .field("name", &self.name)
            .field("type", &type_name::<T>())
            .finish()
    }
}
