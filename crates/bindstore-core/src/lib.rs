#![forbid(unsafe_code)]

//! Observable property store with affinity-context change notification.
//!
//! # Role
//! `bindstore-core` is the state layer behind bindable objects. An owner
//! embeds a [`PropertyStore`]; worker threads read and write named properties
//! concurrently, while every change notification is delivered on one
//! designated [`AffinityContext`] (typically a UI event loop).
//!
//! # Primary pieces
//! - **PropertyStore**: name-keyed values, redundant-write suppression,
//!   bootstrap writes, notification, validation entry points.
//! - **AffinityContext**: where observers run. [`AffinityThread`],
//!   [`PumpedContext`] and [`ImmediateContext`] are provided.
//! - **PropertyRegistry**: statically declared accessors and rule sets per
//!   owner type, used for fallback reads, validation by name and debug
//!   name verification.
//! - **RuleSet**: validation rules collecting every [`Violation`].
//! - **Bindable**: the owner-facing data-error contract.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use bindstore_core::{Bindable, ImmediateContext, PropertyKey, PropertyStore};
//!
//! const TITLE: PropertyKey<String> = PropertyKey::new("Title");
//!
//! struct Document {
//!     props: PropertyStore<Document>,
//! }
//!
//! impl Bindable for Document {
//!     fn properties(&self) -> &PropertyStore<Self> {
//!         &self.props
//!     }
//! }
//!
//! let doc = Arc::new_cyclic(|owner| Document {
//!     props: PropertyStore::new(owner.clone(), Arc::new(ImmediateContext)),
//! });
//! let _sub = doc.props.subscribe(|_doc, name| println!("{name} changed"));
//! doc.props.set(TITLE, "Draft".to_owned())?;
//! assert_eq!(doc.props.get(TITLE)?, "Draft");
//! # Ok::<(), bindstore_core::StoreError>(())
//! ```

pub mod affinity;
pub mod bindable;
pub mod config;
pub mod error;
#[cfg(feature = "tracing-json")]
pub mod logging;
pub mod observers;
pub mod registry;
pub mod store;
pub mod validation;
pub mod value;

pub use affinity::{
    AffinityContext, AffinityThread, DispatchPriority, ImmediateContext, PumpedContext, Task,
};
pub use bindable::Bindable;
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use observers::{ChangedCallback, Subscription};
pub use registry::{PropertyDescriptor, PropertyRegistry};
pub use store::PropertyStore;
pub use validation::{Check, Length, Presence, Range, Required, Rule, RuleSet, Violation};
pub use value::{DynValue, PropertyKey, PropertyValue};
