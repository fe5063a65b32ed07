#![forbid(unsafe_code)]

//! The observable property store.
//!
//! # Design
//!
//! A [`PropertyStore<O>`] lives inside its owner `O` and keeps the owner's
//! bindable state as a name-keyed map of type-erased values behind a
//! reader/writer lock. Writes compare against the stored value and only a
//! real change produces a notification; the comparison and the store happen
//! under one write lock, so exactly one notification fires per write that
//! reports a change.
//!
//! Notifications never run under a store lock. If the writer is already on
//! the affinity context, observers run inline; otherwise the delivery is
//! submitted to the context and the writer returns immediately.
//!
//! ```text
//!  worker thread                      affinity thread
//!  ─────────────                      ───────────────
//!  set_value("Name", v)
//!   ├─ write lock: compare + store
//!   └─ on_property_changed ──submit──▶ upgrade owner
//!                                      └─ observers(owner, "Name")
//! ```
//!
//! # Invariants
//!
//! 1. A name, once written or read, always has a value; there is no unset.
//! 2. Writing a value equal to the stored one is a no-op (returns `false`).
//! 3. The first write of a name to `T::default()` is stored but not
//!    notified (bootstrap write).
//! 4. Observers only run on the affinity context, in subscription order.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Empty name | `StoreError::InvalidArgument`, nothing stored |
//! | Typed read of another type | `StoreError::TypeMismatch` |
//! | Owner dropped before delivery | Delivery skipped with `warn!` |
//! | Unregistered name (debug, registry non-empty) | `error!` or `MalformedAccessor` per config |

use std::any::type_name;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::affinity::AffinityContext;
use crate::config::StoreConfig;
use crate::error::{Result, StoreError, check_name};
use crate::observers::{ObserverList, Subscription};
use crate::registry::PropertyRegistry;
use crate::validation::{RuleSet, Violation};
use crate::value::{DynValue, PropertyKey, PropertyValue};

/// Thread-safe named property storage with change notification.
///
/// `O` is the owning type. The store keeps only a `Weak` reference to it,
/// so owners are normally built with [`Arc::new_cyclic`]:
///
/// ```
/// use std::sync::Arc;
/// use bindstore_core::{ImmediateContext, PropertyRegistry, PropertyStore};
///
/// struct Counter {
///     props: PropertyStore<Counter>,
/// }
///
/// let counter = Arc::new_cyclic(|owner| Counter {
///     props: PropertyStore::new(owner.clone(), Arc::new(ImmediateContext)),
/// });
/// assert!(counter.props.set_value("Count", 3u32).unwrap());
/// assert_eq!(counter.props.get_value::<u32>("Count").unwrap(), 3);
/// ```
pub struct PropertyStore<O: Send + Sync + 'static> {
    values: RwLock<FxHashMap<String, Box<dyn DynValue>>>,
    owner: Weak<O>,
    context: Arc<dyn AffinityContext>,
    observers: Arc<ObserverList<O>>,
    registry: Arc<PropertyRegistry<O>>,
    config: StoreConfig,
}

impl<O: Send + Sync + 'static> PropertyStore<O> {
    /// A store with an empty registry and default configuration.
    #[must_use]
    pub fn new(owner: Weak<O>, context: Arc<dyn AffinityContext>) -> Self {
        Self::with_registry(owner, context, Arc::new(PropertyRegistry::new()))
    }

    /// A store backed by the owner type's registry.
    #[must_use]
    pub fn with_registry(
        owner: Weak<O>,
        context: Arc<dyn AffinityContext>,
        registry: Arc<PropertyRegistry<O>>,
    ) -> Self {
        Self {
            values: RwLock::new(FxHashMap::default()),
            owner,
            context,
            observers: Arc::new(ObserverList::new()),
            registry,
            config: StoreConfig::default(),
        }
    }

    /// Replace the configuration (builder style, at construction).
    #[must_use]
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &PropertyRegistry<O> {
        &self.registry
    }

    /// Whether `name` has a stored value.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.read().contains_key(name)
    }

    /// Number of stored properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    // ── Writes ────────────────────────────────────────────────────────────

    /// Store `value` under `name`, notifying observers on change.
    ///
    /// Returns `Ok(false)` when the stored value already equals `value`.
    /// The first write of `T::default()` to a new name is stored and returns
    /// `Ok(true)` without notifying.
    pub fn set_value<T: PropertyValue>(&self, name: &str, value: T) -> Result<bool> {
        check_name(name)?;
        self.verify_property_name(name)?;

        let notify = {
            let mut values = self.values.write();
            match values.get_mut(name) {
                Some(current) if current.dyn_eq(&value) => return Ok(false),
                Some(current) => {
                    *current = Box::new(value);
                    true
                }
                None => {
                    let bootstrap = value == T::default();
                    values.insert(name.to_owned(), Box::new(value));
                    if bootstrap {
                        trace!(property = name, "bootstrap write; notification suppressed");
                    }
                    !bootstrap
                }
            }
        };

        if notify {
            self.dispatch_changed(name);
        }
        Ok(true)
    }

    /// Typed-key form of [`set_value`](Self::set_value).
    pub fn set<T: PropertyValue>(&self, key: PropertyKey<T>, value: T) -> Result<bool> {
        self.set_value(key.name(), value)
    }

    /// Write a field-backed property.
    ///
    /// Compares against `storage` rather than the map; on change it assigns
    /// the field, mirrors the value into the store and notifies (including
    /// the first write, unlike [`set_value`](Self::set_value)).
    pub fn set_property<T: PropertyValue>(
        &self,
        storage: &mut T,
        value: T,
        name: &str,
    ) -> Result<bool> {
        check_name(name)?;
        self.verify_property_name(name)?;
        if *storage == value {
            return Ok(false);
        }
        *storage = value.clone();
        self.values.write().insert(name.to_owned(), Box::new(value));
        self.dispatch_changed(name);
        Ok(true)
    }

    // ── Reads ─────────────────────────────────────────────────────────────

    /// Current value of `name`, materializing `T::default()` (without
    /// notifying) when it has never been written.
    pub fn get_value<T: PropertyValue>(&self, name: &str) -> Result<T> {
        check_name(name)?;
        if let Some(value) = self.values.read().get(name) {
            return downcast(name, value.as_ref());
        }
        let mut values = self.values.write();
        // Another writer may have won the race between the two locks.
        let value = values
            .entry(name.to_owned())
            .or_insert_with(|| Box::new(T::default()));
        downcast(name, value.as_ref())
    }

    /// Typed-key form of [`get_value`](Self::get_value).
    pub fn get<T: PropertyValue>(&self, key: PropertyKey<T>) -> Result<T> {
        self.get_value(key.name())
    }

    /// Current value of `name` without knowing its type.
    ///
    /// Values not yet stored are read from the owner through the registry
    /// accessor and cached.
    pub fn get_value_via_owner(&self, name: &str) -> Result<Box<dyn DynValue>> {
        check_name(name)?;
        if let Some(value) = self.values.read().get(name) {
            return Ok(value.clone_boxed());
        }

        let descriptor = self.registry.get(name).ok_or_else(|| StoreError::UnknownProperty {
            name: name.to_owned(),
            owner: type_name::<O>(),
        })?;
        let owner = self.owner.upgrade().ok_or_else(|| StoreError::UnknownProperty {
            name: name.to_owned(),
            owner: type_name::<O>(),
        })?;

        // The accessor may itself read this store; no lock is held here.
        let fresh = descriptor.read(&owner);
        let mut values = self.values.write();
        let value = values.entry(name.to_owned()).or_insert(fresh);
        Ok(value.clone_boxed())
    }

    // ── Notification ──────────────────────────────────────────────────────

    /// Subscribe to property changes. Callbacks run on the affinity context
    /// and receive the owner and the property name.
    pub fn subscribe(&self, callback: impl Fn(&O, &str) + Send + Sync + 'static) -> Subscription {
        self.observers.subscribe(callback)
    }

    /// Registered subscriber entries (dead entries are pruned on notify).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.observers.len()
    }

    /// Raise a change notification for `name` through the affinity context.
    pub fn on_property_changed(&self, name: &str) -> Result<()> {
        check_name(name)?;
        self.verify_property_name(name)?;
        self.dispatch_changed(name);
        Ok(())
    }

    /// Deliver a notification on the calling thread, ignoring affinity.
    ///
    /// Returns how many observers ran; `0` if the owner is gone.
    pub fn raise_property_changed_unsafe(&self, name: &str) -> usize {
        deliver(&self.owner, &self.observers, name)
    }

    fn dispatch_changed(&self, name: &str) {
        if self.context.is_current() {
            deliver(&self.owner, &self.observers, name);
            return;
        }

        let owner = self.owner.clone();
        let observers = Arc::clone(&self.observers);
        let property = name.to_owned();
        debug!(
            property = name,
            priority = ?self.config.notify_priority,
            "marshaling change notification to affinity context"
        );
        self.context.submit(
            Box::new(move || {
                deliver(&owner, &observers, &property);
            }),
            self.config.notify_priority,
        );
    }

    // ── Validation ────────────────────────────────────────────────────────

    /// Run `rules` against the current value of `name` (materializing the
    /// default if unset) and return every violation.
    pub fn validate_property<T: PropertyValue>(
        &self,
        name: &str,
        rules: &RuleSet<T>,
    ) -> Result<Vec<Violation>> {
        let value = self.get_value::<T>(name)?;
        Ok(rules.validate(name, &value))
    }

    /// Whether the current value of `name` satisfies every rule.
    pub fn is_property_valid<T: PropertyValue>(
        &self,
        name: &str,
        rules: &RuleSet<T>,
    ) -> Result<bool> {
        Ok(self.validate_property(name, rules)?.is_empty())
    }

    /// Violations from the rules registered for `name`, reading the value
    /// through [`get_value_via_owner`](Self::get_value_via_owner).
    pub fn registered_violations(&self, name: &str) -> Result<Vec<Violation>> {
        let value = self.get_value_via_owner(name)?;
        let descriptor = self.registry.get(name).ok_or_else(|| StoreError::UnknownProperty {
            name: name.to_owned(),
            owner: type_name::<O>(),
        })?;
        Ok(descriptor.validate(value.as_ref()))
    }

    /// First registered violation message for `name`, or `""` when valid.
    pub fn first_error(&self, name: &str) -> Result<String> {
        Ok(self
            .registered_violations(name)?
            .into_iter()
            .next()
            .map(|violation| violation.message)
            .unwrap_or_default())
    }

    // ── Debugging ─────────────────────────────────────────────────────────

    /// Check that `name` is a registered property of `O`.
    ///
    /// Debug builds only, and only when the registry declares at least one
    /// property. An unknown name is logged as an error, or returned as
    /// [`StoreError::MalformedAccessor`] when
    /// [`StoreConfig::throw_on_invalid_property_name`] is set. Release builds
    /// always return `Ok(())`.
    pub fn verify_property_name(&self, name: &str) -> Result<()> {
        #[cfg(debug_assertions)]
        {
            if self.registry.is_empty() || self.registry.contains(name) {
                return Ok(());
            }
            if self.config.throw_on_invalid_property_name {
                return Err(StoreError::MalformedAccessor {
                    name: name.to_owned(),
                    owner: type_name::<O>(),
                });
            }
            tracing::error!(
                property = name,
                owner = type_name::<O>(),
                "invalid property name"
            );
        }
        #[cfg(not(debug_assertions))]
        let _ = name;
        Ok(())
    }
}

fn downcast<T: PropertyValue>(name: &str, value: &dyn DynValue) -> Result<T> {
    value
        .as_any()
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| StoreError::TypeMismatch {
            name: name.to_owned(),
            expected: type_name::<T>(),
            found: value.type_name(),
        })
}

fn deliver<O: Send + Sync + 'static>(
    owner: &Weak<O>,
    observers: &ObserverList<O>,
    name: &str,
) -> usize {
    match owner.upgrade() {
        Some(owner) => observers.notify(&owner, name),
        None => {
            warn!(property = name, "owner dropped before delivery; notification skipped");
            0
        }
    }
}

impl<O: Send + Sync + 'static> fmt::Debug for PropertyStore<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyStore")
            .field("owner", &type_name::<O>())
            .field("values", &*self.values.read())
            .field("observers", &self.observers)
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affinity::{DispatchPriority, ImmediateContext, PumpedContext};
    use crate::validation::{Check, Length, Range, Required};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const NAME: PropertyKey<String> = PropertyKey::new("Name");
    const AGE: PropertyKey<u32> = PropertyKey::new("Age");

    struct Person {
        props: PropertyStore<Person>,
    }

    impl Person {
        fn new(context: Arc<dyn AffinityContext>) -> Arc<Self> {
            Arc::new_cyclic(|owner| Person {
                props: PropertyStore::new(owner.clone(), context),
            })
        }

        fn registered(context: Arc<dyn AffinityContext>, config: StoreConfig) -> Arc<Self> {
            let registry = PropertyRegistry::new()
                .validated(
                    NAME,
                    |p: &Person| p.props.get(NAME).unwrap_or_default(),
                    RuleSet::new().with(Required::new()).with(Length::max(8)),
                )
                .property(AGE, |p: &Person| p.props.get(AGE).unwrap_or_default());
            Arc::new_cyclic(|owner| Person {
                props: PropertyStore::with_registry(owner.clone(), context, Arc::new(registry))
                    .with_config(config),
            })
        }
    }

    fn counting(person: &Person) -> (Arc<AtomicUsize>, Subscription) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let sub = person.props.subscribe(move |_, _| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        (hits, sub)
    }

    #[test]
    fn distinct_writes_each_notify() {
        let person = Person::new(Arc::new(ImmediateContext));
        let (hits, _sub) = counting(&person);

        assert!(person.props.set(NAME, "Ada".into()).unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(person.props.set(NAME, "Grace".into()).unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(person.props.get(NAME).unwrap(), "Grace");
    }

    #[test]
    fn equal_write_is_suppressed() {
        let person = Person::new(Arc::new(ImmediateContext));
        let (hits, _sub) = counting(&person);

        assert!(person.props.set(AGE, 36).unwrap());
        assert!(!person.props.set(AGE, 36).unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bootstrap_default_write_is_silent() {
        let person = Person::new(Arc::new(ImmediateContext));
        let (hits, _sub) = counting(&person);

        assert!(person.props.set(AGE, 0).unwrap());
        assert!(person.props.contains("Age"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(!person.props.set(AGE, 0).unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn later_default_write_notifies() {
        let person = Person::new(Arc::new(ImmediateContext));
        let (hits, _sub) = counting(&person);

        person.props.set(AGE, 5).unwrap();
        assert!(person.props.set(AGE, 0).unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn get_materializes_default() {
        let person = Person::new(Arc::new(ImmediateContext));
        let (hits, _sub) = counting(&person);

        assert!(!person.props.contains("Name"));
        assert_eq!(person.props.get(NAME).unwrap(), "");
        assert!(person.props.contains("Name"));
        assert!(!person.props.set(NAME, String::new()).unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_name_is_rejected_everywhere() {
        let person = Person::new(Arc::new(ImmediateContext));
        let invalid = StoreError::InvalidArgument {
            name: String::new(),
        };
        assert_eq!(person.props.set_value("", 1u8), Err(invalid.clone()));
        assert_eq!(person.props.get_value::<u8>(""), Err(invalid.clone()));
        assert_eq!(person.props.on_property_changed(""), Err(invalid.clone()));
        assert_eq!(
            person
                .props
                .validate_property::<u8>("", &RuleSet::new())
                .unwrap_err(),
            invalid
        );
        assert!(matches!(
            person.props.get_value_via_owner(""),
            Err(StoreError::InvalidArgument { .. })
        ));
        assert!(person.props.is_empty());
    }

    #[test]
    fn typed_read_of_other_type_fails() {
        let person = Person::new(Arc::new(ImmediateContext));
        person.props.set_value("Age", 7u32).unwrap();
        let err = person.props.get_value::<String>("Age").unwrap_err();
        assert!(matches!(
            err,
            StoreError::TypeMismatch { expected, found, .. }
                if expected == type_name::<String>() && found == "u32"
        ));
    }

    #[test]
    fn type_change_counts_as_change() {
        let person = Person::new(Arc::new(ImmediateContext));
        let (hits, _sub) = counting(&person);
        person.props.set_value("X", 1u32).unwrap();
        assert!(person.props.set_value("X", 1u64).unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn observer_receives_owner_and_name() {
        let person = Person::new(Arc::new(ImmediateContext));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _sub = person.props.subscribe(move |owner: &Person, name| {
            let age = owner.props.get(AGE).unwrap();
            s.lock().push(format!("{name}={age}"));
        });
        person.props.set(AGE, 41).unwrap();
        assert_eq!(*seen.lock(), vec!["Age=41"]);
    }

    #[test]
    fn off_context_write_waits_for_pump() {
        let pump = PumpedContext::new();
        let person = Person::new(Arc::new(pump.clone()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _sub = person.props.subscribe(move |_, name| {
            s.lock().push((name.to_owned(), std::thread::current().id()));
        });

        let writer = Arc::clone(&person);
        std::thread::spawn(move || {
            writer.props.set(NAME, "Ada".into()).unwrap();
            writer.props.set(AGE, 3).unwrap();
        })
        .join()
        .unwrap();

        assert!(seen.lock().is_empty());
        assert_eq!(pump.pending(), 2);
        assert_eq!(pump.run_pending(), 2);

        let me = std::thread::current().id();
        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], ("Name".to_owned(), me));
        assert_eq!(seen[1], ("Age".to_owned(), me));
    }

    #[test]
    fn on_context_write_delivers_inline() {
        let pump = PumpedContext::new();
        let person = Person::new(Arc::new(pump.clone()));
        let (hits, _sub) = counting(&person);
        person.props.set(AGE, 9).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(pump.pending(), 0);
    }

    #[test]
    fn marshaled_delivery_uses_configured_priority() {
        let pump = PumpedContext::new();
        let registry = Arc::new(PropertyRegistry::new());
        let person = Arc::new_cyclic(|owner| Person {
            props: PropertyStore::with_registry(
                owner.clone(),
                Arc::new(pump.clone()),
                Arc::clone(&registry),
            )
            .with_config(StoreConfig::default().with_notify_priority(DispatchPriority::Background)),
        });
        let log = Arc::new(Mutex::new(Vec::new()));
        let l = Arc::clone(&log);
        let _sub = person.props.subscribe(move |_, name| l.lock().push(name.to_owned()));

        let writer = Arc::clone(&person);
        let urgent = pump.clone();
        let l = Arc::clone(&log);
        std::thread::spawn(move || {
            writer.props.set(AGE, 1).unwrap();
            urgent.submit(
                Box::new(move || l.lock().push("urgent".to_owned())),
                DispatchPriority::Send,
            );
        })
        .join()
        .unwrap();

        pump.run_pending();
        assert_eq!(*log.lock(), vec!["urgent", "Age"]);
    }

    #[test]
    fn dropped_owner_skips_delivery() {
        let pump = PumpedContext::new();
        let person = Person::new(Arc::new(pump.clone()));
        let (hits, _sub) = counting(&person);

        let writer = Arc::clone(&person);
        std::thread::spawn(move || writer.props.set(AGE, 2).unwrap())
            .join()
            .unwrap();
        drop(person);

        assert_eq!(pump.run_pending(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn raise_unsafe_ignores_affinity() {
        let pump = PumpedContext::new();
        let person = Person::new(Arc::new(pump.clone()));
        let (hits, _sub) = counting(&person);

        let remote = Arc::clone(&person);
        let ran = std::thread::spawn(move || remote.props.raise_property_changed_unsafe("Age"))
            .join()
            .unwrap();
        assert_eq!(ran, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(pump.pending(), 0);
    }

    #[test]
    fn set_property_tracks_field() {
        let person = Person::new(Arc::new(ImmediateContext));
        let (hits, _sub) = counting(&person);
        let mut title = String::new();

        assert!(person.props.set_property(&mut title, "Dr".to_owned(), "Title").unwrap());
        assert_eq!(title, "Dr");
        assert_eq!(person.props.get_value::<String>("Title").unwrap(), "Dr");
        assert!(!person.props.set_property(&mut title, "Dr".to_owned(), "Title").unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn validate_collects_all_violations() {
        let person = Person::new(Arc::new(ImmediateContext));
        person.props.set(AGE, 200).unwrap();
        let rules = RuleSet::new()
            .with(Range::new(0u32, 150))
            .with(Check::new("Age must be even.", |a: &u32| a % 2 == 0))
            .with(Check::new("Age must be below 100.", |a: &u32| *a < 100));

        let violations = person.props.validate_property("Age", &rules).unwrap();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].message, "The field Age must be between 0 and 150.");
        assert_eq!(violations[1].message, "Age must be below 100.");
        assert!(!person.props.is_property_valid("Age", &rules).unwrap());
    }

    #[test]
    fn validate_materializes_unset_value() {
        let person = Person::new(Arc::new(ImmediateContext));
        let rules = RuleSet::<String>::new().with(Required::new());
        let violations = person.props.validate_property("Name", &rules).unwrap();
        assert_eq!(violations[0].message, "The Name field is required.");
        assert!(person.props.contains("Name"));
    }

    #[test]
    fn owner_fallback_reads_and_caches() {
        let person = Person::registered(Arc::new(ImmediateContext), StoreConfig::default());
        let value = person.props.get_value_via_owner("Age").unwrap();
        assert_eq!(value.downcast_ref::<u32>(), Some(&0));
        assert!(person.props.contains("Age"));

        assert_eq!(
            person.props.get_value_via_owner("Height").unwrap_err(),
            StoreError::UnknownProperty {
                name: "Height".into(),
                owner: type_name::<Person>(),
            }
        );
    }

    #[test]
    fn first_error_uses_registered_rules() {
        let person = Person::registered(Arc::new(ImmediateContext), StoreConfig::default());
        assert_eq!(
            person.props.first_error("Name").unwrap(),
            "The Name field is required."
        );
        person.props.set(NAME, "Ada".into()).unwrap();
        assert_eq!(person.props.first_error("Name").unwrap(), "");
        person.props.set(NAME, "Ada Lovelace".into()).unwrap();
        assert_eq!(
            person.props.first_error("Name").unwrap(),
            "The field Name must be a string with a maximum length of 8."
        );
        assert_eq!(person.props.first_error("Age").unwrap(), "");
    }

    #[cfg(debug_assertions)]
    #[test]
    fn unknown_name_fails_when_configured() {
        let person = Person::registered(
            Arc::new(ImmediateContext),
            StoreConfig::default().with_throw_on_invalid_property_name(true),
        );
        assert!(matches!(
            person.props.set_value("Nmae", "typo".to_owned()),
            Err(StoreError::MalformedAccessor { .. })
        ));
        assert!(!person.props.contains("Nmae"));
        assert!(matches!(
            person.props.on_property_changed("Nmae"),
            Err(StoreError::MalformedAccessor { .. })
        ));
    }

    #[cfg(debug_assertions)]
    #[tracing_test::traced_test]
    #[test]
    fn unknown_name_is_logged_by_default() {
        let person = Person::registered(Arc::new(ImmediateContext), StoreConfig::default());
        assert!(person.props.set_value("Nmae", "typo".to_owned()).unwrap());
        assert!(logs_contain("invalid property name"));
    }

    #[test]
    fn empty_registry_skips_verification() {
        let person = Arc::new_cyclic(|owner| Person {
            props: PropertyStore::new(owner.clone(), Arc::new(ImmediateContext))
                .with_config(StoreConfig::default().with_throw_on_invalid_property_name(true)),
        });
        assert!(person.props.verify_property_name("Anything").is_ok());
        assert!(person.props.set_value("Anything", 1i32).unwrap());
    }

    #[test]
    fn dropped_subscriptions_are_pruned_on_notify() {
        let person = Person::new(Arc::new(ImmediateContext));
        let (_hits, keep) = counting(&person);
        let (_other, dropped) = counting(&person);
        assert_eq!(person.props.subscriber_count(), 2);

        drop(dropped);
        person.props.set(AGE, 3).unwrap();
        assert_eq!(person.props.subscriber_count(), 1);
        drop(keep);
    }

    #[test]
    fn exposes_config_and_registry() {
        let person = Person::registered(
            Arc::new(ImmediateContext),
            StoreConfig::default().with_notify_priority(DispatchPriority::Normal),
        );
        assert_eq!(person.props.config().notify_priority, DispatchPriority::Normal);
        assert_eq!(person.props.registry().names(), vec!["Age", "Name"]);
    }

    #[test]
    fn debug_lists_values() {
        let person = Person::new(Arc::new(ImmediateContext));
        person.props.set(AGE, 7).unwrap();
        let dbg = format!("{:?}", person.props);
        assert!(dbg.contains("PropertyStore"));
        assert!(dbg.contains("Age"));
    }
}
