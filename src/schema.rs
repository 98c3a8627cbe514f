//! Flag schema, typed flag values, and the defaulting rules.
//!
//! A [`FlagSchema`] is the static definition of every known flag, its type, and its
//! default. It is built once at startup and shared read-only; all decoding funnels
//! through [`FlagSchema::defaulted_from_raw`], which replaces anything missing,
//! unknown, or mistyped with the schema default.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

/// A concrete flag value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Choice(String),
}

impl FlagValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Choice(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Bool(_) => None,
            Self::Choice(value) => Some(value),
        }
    }

    pub(crate) fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(value) => serde_json::Value::Bool(*value),
            Self::Choice(value) => serde_json::Value::String(value.clone()),
        }
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        Self::Choice(value.to_owned())
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        Self::Choice(value)
    }
}

/// The typed descriptor for a single flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagKind {
    Boolean { default: bool },
    Enum { allowed: Vec<String>, default: String },
}

impl FlagKind {
    pub fn default_value(&self) -> FlagValue {
        match self {
            Self::Boolean { default } => FlagValue::Bool(*default),
            Self::Enum { default, .. } => FlagValue::Choice(default.clone()),
        }
    }

    /// Whether `value` is acceptable for this flag.
    pub fn accepts(&self, value: &FlagValue) -> bool {
        match (self, value) {
            (Self::Boolean { .. }, FlagValue::Bool(_)) => true,
            (Self::Enum { allowed, .. }, FlagValue::Choice(choice)) => {
                allowed.iter().any(|candidate| candidate == choice)
            }
            _ => false,
        }
    }

    /// Validate a raw decoded JSON value against this descriptor.
    ///
    /// The rule set is closed: booleans must be JSON booleans, enum choices must be
    /// JSON strings drawn from the allowed set. Anything else is rejected and the
    /// caller falls back to the default.
    fn coerce(&self, raw: &serde_json::Value) -> Option<FlagValue> {
        let value = match raw {
            serde_json::Value::Bool(value) => FlagValue::Bool(*value),
            serde_json::Value::String(value) => FlagValue::Choice(value.clone()),
            _ => return None,
        };
        self.accepts(&value).then_some(value)
    }
}

/// The static, ordered definition of every known flag.
///
/// Extending the schema is backwards compatible: old cookies missing a newly added
/// flag simply default it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSchema {
    flags: Vec<(String, FlagKind)>,
}

impl FlagSchema {
    #[must_use]
    pub fn builder() -> FlagSchemaBuilder {
        FlagSchemaBuilder { flags: Vec::new() }
    }

    pub fn kind(&self, name: &str) -> Option<&FlagKind> {
        self.flags
            .iter()
            .find(|(flag_name, _)| flag_name == name)
            .map(|(_, kind)| kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlagKind)> {
        self.flags
            .iter()
            .map(|(name, kind)| (name.as_str(), kind))
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// The all-defaults flag set.
    pub fn defaulted(&self) -> SessionConfigFlags {
        self.defaulted_with([])
    }

    /// Build a flag set from typed overrides.
    ///
    /// Every schema flag is present in the result: an override is honored only if
    /// its name is known and its value passes the flag's type/allowed-value check,
    /// otherwise that flag takes its default. Overrides for unknown names are
    /// ignored. Never fails.
    pub fn defaulted_with<'a, I>(&self, overrides: I) -> SessionConfigFlags
    where
        I: IntoIterator<Item = (&'a str, FlagValue)>,
    {
        let overrides: BTreeMap<&str, FlagValue> = overrides.into_iter().collect();
        let values = self
            .flags
            .iter()
            .map(|(name, kind)| {
                let value = overrides
                    .get(name.as_str())
                    .filter(|value| kind.accepts(value))
                    .cloned()
                    .unwrap_or_else(|| kind.default_value());
                (name.clone(), value)
            })
            .collect();
        SessionConfigFlags { values }
    }

    /// Build a flag set from an untrusted decoded payload.
    ///
    /// Per-key degradation: an unknown key or an invalid value defaults that single
    /// flag and keeps the rest.
    pub(crate) fn defaulted_from_raw(
        &self,
        raw: &BTreeMap<String, serde_json::Value>,
    ) -> SessionConfigFlags {
        let values = self
            .flags
            .iter()
            .map(|(name, kind)| {
                let value = raw
                    .get(name)
                    .and_then(|raw_value| kind.coerce(raw_value))
                    .unwrap_or_else(|| kind.default_value());
                (name.clone(), value)
            })
            .collect();
        SessionConfigFlags { values }
    }
}

/// Builder for [`FlagSchema`]. Redefining a name replaces the earlier descriptor.
#[derive(Debug, Clone)]
pub struct FlagSchemaBuilder {
    flags: Vec<(String, FlagKind)>,
}

impl FlagSchemaBuilder {
    #[must_use]
    pub fn boolean<N: Into<String>>(self, name: N, default: bool) -> Self {
        self.flag(name.into(), FlagKind::Boolean { default })
    }

    /// An enum flag. `default` must be one of `allowed`; a default outside the
    /// allowed set still decodes (defaults bypass the allowed check) but can never
    /// round-trip from a client override.
    #[must_use]
    pub fn enumeration<N, A, V>(self, name: N, allowed: A, default: V) -> Self
    where
        N: Into<String>,
        A: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let kind = FlagKind::Enum {
            allowed: allowed.into_iter().map(Into::into).collect(),
            default: default.into(),
        };
        self.flag(name.into(), kind)
    }

    fn flag(mut self, name: String, kind: FlagKind) -> Self {
        if let Some(existing) = self
            .flags
            .iter_mut()
            .find(|(existing_name, _)| *existing_name == name)
        {
            existing.1 = kind;
        } else {
            self.flags.push((name, kind));
        }
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<FlagSchema> {
        Arc::new(FlagSchema { flags: self.flags })
    }
}

/// A complete, immutable flag set.
///
/// Invariant: contains exactly the schema's key set. Instances are only produced by
/// [`FlagSchema`] defaulting, so a missing or mistyped entry cannot be observed.
/// Deriving a changed set goes back through the schema; nothing mutates in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionConfigFlags {
    #[serde(flatten)]
    values: BTreeMap<String, FlagValue>,
}

impl SessionConfigFlags {
    pub fn get(&self, name: &str) -> Option<&FlagValue> {
        self.values.get(name)
    }

    /// The value of a boolean flag, or `false` if the name is not a boolean flag.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).and_then(FlagValue::as_bool).unwrap_or(false)
    }

    /// The value of an enum flag, or `None` if the name is not an enum flag.
    pub fn choice(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FlagValue::as_str)
    }

    /// Flags in canonical (sorted-name) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlagValue)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn to_raw(&self) -> BTreeMap<String, serde_json::Value> {
        self.values
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect()
    }
}
