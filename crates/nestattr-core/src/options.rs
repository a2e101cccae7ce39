//! Reconciliation options and reject predicates
//!
//! Options are an immutable value handed to the reconciler at call time.
//! When they come from a configuration file they are parsed strictly:
//! unknown keys and mistyped values fail at setup, never during a write.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::coerce::all_blank;
use crate::errors::{ReconcileError, Result};
use crate::model::{json_type_name, AttributeBundle};

/// Option keys accepted in configuration
pub const OPTION_KEYS: [&str; 5] = [
    "allow_destroy",
    "reject_if",
    "limit",
    "update_only",
    "id_in_key",
];

/// Configuration name of the built-in [`RejectIf::AllBlank`] predicate
pub const ALL_BLANK: &str = "all_blank";

type GuardFn = dyn Fn() -> bool + Send + Sync;
type PredicateFn = dyn Fn(&AttributeBundle) -> bool + Send + Sync;

/// Decides whether a bundle is silently skipped
#[derive(Clone)]
pub enum RejectIf {
    /// Reject when every value in the bundle is blank
    AllBlank,
    /// Predicate that does not look at the bundle
    Guard(Arc<GuardFn>),
    /// Predicate over the bundle
    Predicate(Arc<PredicateFn>),
}

impl RejectIf {
    pub fn guard<F>(f: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        RejectIf::Guard(Arc::new(f))
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&AttributeBundle) -> bool + Send + Sync + 'static,
    {
        RejectIf::Predicate(Arc::new(f))
    }

    /// Evaluate against one bundle; called fresh for every bundle
    pub fn rejects(&self, bundle: &AttributeBundle) -> bool {
        match self {
            RejectIf::AllBlank => all_blank(bundle),
            RejectIf::Guard(f) => f(),
            RejectIf::Predicate(f) => f(bundle),
        }
    }
}

impl fmt::Debug for RejectIf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectIf::AllBlank => write!(f, "AllBlank"),
            RejectIf::Guard(_) => write!(f, "Guard(..)"),
            RejectIf::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

/// Named predicates a host entity offers to configuration files
///
/// `reject_if: "<name>"` in an options file is resolved against this set at
/// registration time.
#[derive(Clone, Default)]
pub struct PredicateSet {
    entries: HashMap<String, RejectIf>,
}

impl PredicateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a zero-argument predicate under `name`
    pub fn with_guard<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), RejectIf::guard(f));
        self
    }

    /// Register a bundle predicate under `name`
    pub fn with_predicate<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&AttributeBundle) -> bool + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), RejectIf::predicate(f));
        self
    }

    /// Resolve a configured name; `all_blank` is always available
    pub fn resolve(&self, name: &str) -> Option<RejectIf> {
        if name == ALL_BLANK {
            return Some(RejectIf::AllBlank);
        }
        self.entries.get(name).cloned()
    }
}

impl fmt::Debug for PredicateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("PredicateSet").field("names", &names).finish()
    }
}

/// Per-association reconciliation options
#[derive(Debug, Clone)]
pub struct ReconciliationOptions {
    /// Honor the `_destroy` flag on matched records
    pub allow_destroy: bool,
    /// One-to-one only: update the existing record regardless of id
    pub update_only: bool,
    /// Maximum number of bundles in a collection payload
    pub limit: Option<usize>,
    pub reject_if: Option<RejectIf>,
    /// Keyed payloads carry the record id in the key
    pub id_in_key: bool,
}

impl Default for ReconciliationOptions {
    fn default() -> Self {
        Self {
            allow_destroy: true,
            update_only: false,
            limit: None,
            reject_if: None,
            id_in_key: true,
        }
    }
}

impl ReconciliationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_destroy(mut self, allow: bool) -> Self {
        self.allow_destroy = allow;
        self
    }

    pub fn update_only(mut self, update_only: bool) -> Self {
        self.update_only = update_only;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn reject_if(mut self, reject_if: RejectIf) -> Self {
        self.reject_if = Some(reject_if);
        self
    }

    pub fn id_in_key(mut self, id_in_key: bool) -> Self {
        self.id_in_key = id_in_key;
        self
    }

    /// Whether the configured predicate rejects this bundle
    pub fn rejects(&self, bundle: &AttributeBundle) -> bool {
        self.reject_if
            .as_ref()
            .is_some_and(|reject_if| reject_if.rejects(bundle))
    }

    /// Parse options from a JSON object
    ///
    /// Absent keys keep their defaults. `null` for `limit` or `reject_if`
    /// means "not set".
    ///
    /// # Errors
    /// `Configuration` if the value is not an object, a key is not one of
    /// [`OPTION_KEYS`], a value has the wrong type, or `reject_if` names a
    /// predicate the set does not contain.
    pub fn from_json(value: &Value, predicates: &PredicateSet) -> Result<Self> {
        let map = match value {
            Value::Object(map) => map,
            Value::Null => return Ok(Self::default()),
            other => {
                return Err(ReconcileError::configuration(format!(
                    "options must be an object, got {}",
                    json_type_name(other)
                )))
            }
        };

        let mut unknown: Vec<&str> = map
            .keys()
            .map(String::as_str)
            .filter(|key| !OPTION_KEYS.contains(key))
            .collect();
        if !unknown.is_empty() {
            unknown.sort_unstable();
            return Err(ReconcileError::configuration(format!(
                "Unknown key(s): {}. Valid keys are: {}",
                unknown.join(", "),
                OPTION_KEYS.join(", ")
            )));
        }

        let mut options = Self::default();

        if let Some(v) = map.get("allow_destroy") {
            options.allow_destroy = expect_bool("allow_destroy", v)?;
        }
        if let Some(v) = map.get("update_only") {
            options.update_only = expect_bool("update_only", v)?;
        }
        if let Some(v) = map.get("id_in_key") {
            options.id_in_key = expect_bool("id_in_key", v)?;
        }
        match map.get("limit") {
            None | Some(Value::Null) => {}
            Some(v) => {
                let limit = v.as_u64().ok_or_else(|| {
                    ReconcileError::configuration(format!(
                        "limit must be a non-negative integer, got {}",
                        v
                    ))
                })?;
                options.limit = Some(usize::try_from(limit).map_err(|_| {
                    ReconcileError::configuration(format!("limit {} is out of range", limit))
                })?);
            }
        }
        match map.get("reject_if") {
            None | Some(Value::Null) => {}
            Some(Value::String(name)) => {
                let resolved = predicates.resolve(name).ok_or_else(|| {
                    ReconcileError::configuration(format!("Unknown reject_if predicate `{}`", name))
                })?;
                options.reject_if = Some(resolved);
            }
            Some(other) => {
                return Err(ReconcileError::configuration(format!(
                    "reject_if must be a predicate name, got {}",
                    json_type_name(other)
                )))
            }
        }

        Ok(options)
    }
}

fn expect_bool(key: &str, value: &Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| {
        ReconcileError::configuration(format!(
            "{} must be a boolean, got {}",
            key,
            json_type_name(value)
        ))
    })
}
