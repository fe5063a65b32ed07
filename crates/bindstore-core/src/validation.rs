#![forbid(unsafe_code)]

//! Validation rules run against a single property value.
//!
//! A [`RuleSet`] runs every rule and collects every [`Violation`]; it never
//! stops at the first failure. Callers that only want one message (the
//! per-field error string of [`Bindable::error_for`](crate::Bindable::error_for))
//! take the first violation themselves.
//!
//! Built-in rules use the familiar data-annotation wording, with the member
//! name substituted, and accept a custom message via `with_message`:
//!
//! | Rule | Default message |
//! |------|-----------------|
//! | [`Required`] | `The {name} field is required.` |
//! | [`Range`] | `The field {name} must be between {min} and {max}.` |
//! | [`Length`] | `The field {name} must be a string with a minimum length of {min} and a maximum length of {max}.` |
//! | [`Check`] | caller supplied |

use std::fmt;

/// One failed rule for one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Property the rule was checked against.
    pub member_name: String,
    /// Human-readable message.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A single constraint on values of type `T`.
pub trait Rule<T: ?Sized>: Send + Sync {
    /// `None` when `value` satisfies the rule, otherwise the error message.
    fn check(&self, member_name: &str, value: &T) -> Option<String>;
}

/// An ordered collection of rules for one value type.
pub struct RuleSet<T: ?Sized> {
    rules: Vec<Box<dyn Rule<T>>>,
}

impl<T: ?Sized> RuleSet<T> {
    /// An empty rule set (every value is valid).
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule.
    #[must_use]
    pub fn with(mut self, rule: impl Rule<T> + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Run every rule and collect all violations, in rule order.
    #[must_use]
    pub fn validate(&self, member_name: &str, value: &T) -> Vec<Violation> {
        self.rules
            .iter()
            .filter_map(|rule| rule.check(member_name, value))
            .map(|message| Violation {
                member_name: member_name.to_owned(),
                message,
            })
            .collect()
    }
}

impl<T: ?Sized> Default for RuleSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for RuleSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("rules", &self.rules.len())
            .finish()
    }
}

fn render(custom: Option<&str>, default: impl FnOnce() -> String) -> String {
    custom.map_or_else(default, str::to_owned)
}

// ---------------------------------------------------------------------------
// Required
// ---------------------------------------------------------------------------

/// Values that can be "missing" for the purpose of [`Required`].
pub trait Presence {
    fn is_present(&self) -> bool;
}

impl Presence for String {
    fn is_present(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl Presence for str {
    fn is_present(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl<T> Presence for Option<T> {
    fn is_present(&self) -> bool {
        self.is_some()
    }
}

impl<T> Presence for Vec<T> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

/// Rejects empty / whitespace-only strings, `None`, and empty vectors.
#[derive(Debug, Clone, Default)]
pub struct Required {
    message: Option<String>,
}

impl Required {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T: Presence + ?Sized> Rule<T> for Required {
    fn check(&self, member_name: &str, value: &T) -> Option<String> {
        if value.is_present() {
            return None;
        }
        Some(render(self.message.as_deref(), || {
            format!("The {member_name} field is required.")
        }))
    }
}

// ---------------------------------------------------------------------------
// Range
// ---------------------------------------------------------------------------

/// Inclusive numeric (or any `PartialOrd`) range.
#[derive(Debug, Clone)]
pub struct Range<T> {
    min: T,
    max: T,
    message: Option<String>,
}

impl<T> Range<T> {
    #[must_use]
    pub fn new(min: T, max: T) -> Self {
        Self {
            min,
            max,
            message: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T> Rule<T> for Range<T>
where
    T: PartialOrd + fmt::Display + Send + Sync,
{
    fn check(&self, member_name: &str, value: &T) -> Option<String> {
        // NaN is outside every range.
        if *value >= self.min && *value <= self.max {
            return None;
        }
        Some(render(self.message.as_deref(), || {
            format!(
                "The field {member_name} must be between {} and {}.",
                self.min, self.max
            )
        }))
    }
}

// ---------------------------------------------------------------------------
// Length
// ---------------------------------------------------------------------------

/// Character-count bounds for strings.
#[derive(Debug, Clone)]
pub struct Length {
    min: usize,
    max: usize,
    message: Option<String>,
}

impl Length {
    #[must_use]
    pub fn new(min: usize, max: usize) -> Self {
        Self {
            min,
            max,
            message: None,
        }
    }

    /// Upper bound only.
    #[must_use]
    pub fn max(max: usize) -> Self {
        Self::new(0, max)
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn describe(&self, member_name: &str) -> String {
        if self.min == 0 {
            format!(
                "The field {member_name} must be a string with a maximum length of {}.",
                self.max
            )
        } else {
            format!(
                "The field {member_name} must be a string with a minimum length of {} and a maximum length of {}.",
                self.min, self.max
            )
        }
    }
}

impl Rule<String> for Length {
    fn check(&self, member_name: &str, value: &String) -> Option<String> {
        Rule::<str>::check(self, member_name, value.as_str())
    }
}

impl Rule<str> for Length {
    fn check(&self, member_name: &str, value: &str) -> Option<String> {
        let len = value.chars().count();
        if (self.min..=self.max).contains(&len) {
            return None;
        }
        Some(render(self.message.as_deref(), || self.describe(member_name)))
    }
}

// ---------------------------------------------------------------------------
// Check
// ---------------------------------------------------------------------------

/// Closure-backed rule with a fixed message.
pub struct Check<F> {
    predicate: F,
    message: String,
}

impl<F> Check<F> {
    /// `predicate` returns `true` for valid values.
    #[must_use]
    pub fn new(message: impl Into<String>, predicate: F) -> Self {
        Self {
            predicate,
            message: message.into(),
        }
    }
}

impl<T: ?Sized, F> Rule<T> for Check<F>
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn check(&self, _member_name: &str, value: &T) -> Option<String> {
        (!(self.predicate)(value)).then(|| self.message.clone())
    }
}

impl<F> fmt::Debug for Check<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}
