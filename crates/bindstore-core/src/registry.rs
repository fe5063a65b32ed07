#![forbid(unsafe_code)]

//! Static property registration.
//!
//! An owner type declares its public properties once, with a typed accessor
//! for each and an optional [`RuleSet`]. The store uses the registry to read
//! a property it has not cached yet, to validate by name without knowing the
//! value type, and (in debug builds) to verify that notified names exist.
//!
//! ```
//! use bindstore_core::{PropertyKey, PropertyRegistry, Required, RuleSet};
//!
//! struct Person {
//!     name: String,
//! }
//!
//! const NAME: PropertyKey<String> = PropertyKey::new("Name");
//!
//! let registry = PropertyRegistry::<Person>::new()
//!     .validated(NAME, |p| p.name.clone(), RuleSet::new().with(Required::new()));
//! assert!(registry.contains("Name"));
//! ```

use std::any::type_name;
use std::fmt;

use rustc_hash::FxHashMap;

use crate::validation::{RuleSet, Violation};
use crate::value::{DynValue, PropertyKey};

type ReadFn<O> = dyn Fn(&O) -> Box<dyn DynValue> + Send + Sync;
type ValidateFn = dyn Fn(&str, &dyn DynValue) -> Vec<Violation> + Send + Sync;

/// One registered property.
pub struct PropertyDescriptor<O> {
    name: &'static str,
    value_type: &'static str,
    read: Box<ReadFn<O>>,
    validate: Option<Box<ValidateFn>>,
}

impl<O> PropertyDescriptor<O> {
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// `type_name` of the declared value type.
    #[must_use]
    pub fn value_type(&self) -> &'static str {
        self.value_type
    }

    /// Read the owner's current value through the accessor.
    #[must_use]
    pub fn read(&self, owner: &O) -> Box<dyn DynValue> {
        (self.read)(owner)
    }

    /// Run the attached rules. No rules, or a value of another type, yields
    /// no violations.
    #[must_use]
    pub fn validate(&self, value: &dyn DynValue) -> Vec<Violation> {
        self.validate
            .as_ref()
            .map(|validate| validate(self.name, value))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn has_rules(&self) -> bool {
        self.validate.is_some()
    }
}

impl<O> fmt::Debug for PropertyDescriptor<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .field("has_rules", &self.has_rules())
            .finish()
    }
}

/// The set of public properties declared by owner type `O`.
pub struct PropertyRegistry<O> {
    descriptors: FxHashMap<&'static str, PropertyDescriptor<O>>,
}

impl<O: 'static> PropertyRegistry<O> {
    /// An empty registry. Stores with an empty registry skip name
    /// verification and have no fallback reads.
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptors: FxHashMap::default(),
        }
    }

    /// Declare a property readable through `read`.
    #[must_use]
    pub fn property<T, F>(self, key: PropertyKey<T>, read: F) -> Self
    where
        T: DynValue,
        F: Fn(&O) -> T + Send + Sync + 'static,
    {
        self.insert(key, read, None)
    }

    /// Declare a property with validation rules.
    #[must_use]
    pub fn validated<T, F>(self, key: PropertyKey<T>, read: F, rules: RuleSet<T>) -> Self
    where
        T: DynValue,
        F: Fn(&O) -> T + Send + Sync + 'static,
    {
        let validate: Box<ValidateFn> = Box::new(move |name: &str, value: &dyn DynValue| {
            value
                .as_any()
                .downcast_ref::<T>()
                .map(|value| rules.validate(name, value))
                .unwrap_or_default()
        });
        self.insert(key, read, Some(validate))
    }

    fn insert<T, F>(
        mut self,
        key: PropertyKey<T>,
        read: F,
        validate: Option<Box<ValidateFn>>,
    ) -> Self
    where
        T: DynValue,
        F: Fn(&O) -> T + Send + Sync + 'static,
    {
        let descriptor = PropertyDescriptor {
            name: key.name(),
            value_type: type_name::<T>(),
            read: Box::new(move |owner: &O| Box::new(read(owner)) as Box<dyn DynValue>),
            validate,
        };
        // Re-declaring a name replaces the earlier descriptor.
        self.descriptors.insert(key.name(), descriptor);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropertyDescriptor<O>> {
        self.descriptors.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.descriptors.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl<O: 'static> Default for PropertyRegistry<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> fmt::Debug for PropertyRegistry<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyRegistry")
            .field("owner", &type_name::<O>())
            .field("properties", &self.descriptors.len())
            .finish()
    }
}
