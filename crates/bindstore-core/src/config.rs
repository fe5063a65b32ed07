#![forbid(unsafe_code)]

//! Store configuration.
//!
//! Defaults suit UI data binding: notifications are queued at
//! [`DispatchPriority::DataBind`] and a bad property name in a debug build is
//! logged rather than returned as an error.
//!
//! # Environment
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `BINDSTORE_NOTIFY_PRIORITY` | Priority name, e.g. `databind`, `normal` |
//! | `BINDSTORE_THROW_ON_INVALID_NAME` | `1`/`true`/`yes`/`on` makes name verification fail hard |

use crate::affinity::DispatchPriority;

/// Per-store settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Priority for notifications marshaled onto the affinity context.
    pub notify_priority: DispatchPriority,

    /// Debug builds only: when a notified or written name is not in the
    /// registry, return [`StoreError::MalformedAccessor`](crate::StoreError)
    /// instead of logging an error. Owner types used by tests typically turn
    /// this on.
    pub throw_on_invalid_property_name: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            notify_priority: DispatchPriority::DataBind,
            throw_on_invalid_property_name: false,
        }
    }
}

#[inline]
fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl StoreConfig {
    #[must_use]
    pub fn with_notify_priority(mut self, priority: DispatchPriority) -> Self {
        self.notify_priority = priority;
        self
    }

    #[must_use]
    pub fn with_throw_on_invalid_property_name(mut self, throw: bool) -> Self {
        self.throw_on_invalid_property_name = throw;
        self
    }

    /// Defaults overridden by the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Defaults overridden through a custom environment lookup.
    ///
    /// Unparseable values are ignored with a warning.
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = get_env("BINDSTORE_NOTIFY_PRIORITY") {
            match DispatchPriority::parse(&value) {
                Some(priority) => config.notify_priority = priority,
                None => tracing::warn!(
                    value = %value,
                    "BINDSTORE_NOTIFY_PRIORITY not recognized; keeping default"
                ),
            }
        }
        if let Some(value) = get_env("BINDSTORE_THROW_ON_INVALID_NAME") {
            config.throw_on_invalid_property_name = env_flag(&value);
        }
        config
    }
}
