//! Setting values and ordered settings maps.
//!
//! Settings flow from the simulation description to every instance, and from
//! instance to instance as per-iteration overlays. A [`Settings`] map keeps
//! its insertion order so that a round-tripped map reads back the way it was
//! written, but equality is order-insensitive: two maps are equal when they
//! bind the same keys to the same values.

use {
    crate::reference::Reference,
    serde::{Deserialize, Serialize},
    std::fmt,
    thiserror::Error,
};

/// Errors raised by settings lookup and typed access.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// The requested setting is bound in neither overlay nor base.
    #[error("no value set for setting '{0}'")]
    NotSet(String),

    /// The setting is bound, but to a value of a different type.
    #[error("setting holds a {actual}, expected a {expected}")]
    WrongType {
        /// The type the caller asked for.
        expected: &'static str,
        /// The type actually bound.
        actual: &'static str,
    },
}

/// The value of a single setting.
///
/// A closed union: scalars, a list of floats, or a list of lists of floats
/// (a common shape for boundary data and lookup tables).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// A text value.
    String(String),
    /// An integer value.
    Int(i64),
    /// A floating point value.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// A vector of floats.
    ListFloat(Vec<f64>),
    /// A matrix of floats.
    ListListFloat(Vec<Vec<f64>>),
}

impl SettingValue {
    /// A short name for the type of this value, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            SettingValue::String(_) => "string",
            SettingValue::Int(_) => "integer",
            SettingValue::Float(_) => "float",
            SettingValue::Bool(_) => "boolean",
            SettingValue::ListFloat(_) => "list of floats",
            SettingValue::ListListFloat(_) => "list of lists of floats",
        }
    }

    /// The string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The integer value, if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The float value, if this is a float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            SettingValue::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// The boolean value, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The float list, if this is a list of floats.
    pub fn as_list_float(&self) -> Option<&[f64]> {
        match self {
            SettingValue::ListFloat(v) => Some(v),
            _ => None,
        }
    }

    /// The float matrix, if this is a list of lists of floats.
    pub fn as_list_list_float(&self) -> Option<&[Vec<f64>]> {
        match self {
            SettingValue::ListListFloat(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::String(s) => write!(f, "'{s}'"),
            SettingValue::Int(i) => write!(f, "{i}"),
            SettingValue::Float(x) => write!(f, "{x}"),
            SettingValue::Bool(b) => write!(f, "{b}"),
            SettingValue::ListFloat(v) => write!(f, "{v:?}"),
            SettingValue::ListListFloat(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<&str> for SettingValue {
    fn from(s: &str) -> Self {
        SettingValue::String(s.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(s: String) -> Self {
        SettingValue::String(s)
    }
}

impl From<i64> for SettingValue {
    fn from(i: i64) -> Self {
        SettingValue::Int(i)
    }
}

impl From<f64> for SettingValue {
    fn from(x: f64) -> Self {
        SettingValue::Float(x)
    }
}

impl From<bool> for SettingValue {
    fn from(b: bool) -> Self {
        SettingValue::Bool(b)
    }
}

impl From<Vec<f64>> for SettingValue {
    fn from(v: Vec<f64>) -> Self {
        SettingValue::ListFloat(v)
    }
}

impl From<Vec<Vec<f64>>> for SettingValue {
    fn from(v: Vec<Vec<f64>>) -> Self {
        SettingValue::ListListFloat(v)
    }
}

// Typed extraction, used by `Instance::get_setting_as`.

macro_rules! impl_try_from_setting_value {
    ($target:ty, $variant:ident, $expected:literal) => {
        impl TryFrom<SettingValue> for $target {
            type Error = SettingsError;

            fn try_from(value: SettingValue) -> Result<Self, Self::Error> {
                match value {
                    SettingValue::$variant(inner) => Ok(inner),
                    other => Err(SettingsError::WrongType {
                        expected: $expected,
                        actual: other.type_name(),
                    }),
                }
            }
        }
    };
}

impl_try_from_setting_value!(String, String, "string");
impl_try_from_setting_value!(i64, Int, "integer");
impl_try_from_setting_value!(f64, Float, "float");
impl_try_from_setting_value!(bool, Bool, "boolean");
impl_try_from_setting_value!(Vec<f64>, ListFloat, "list of floats");
impl_try_from_setting_value!(Vec<Vec<f64>>, ListListFloat, "list of lists of floats");

/// An ordered mapping from setting name to value.
///
/// Iteration yields entries in insertion order; overwriting a key keeps its
/// original position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    entries: Vec<(Reference, SettingValue)>,
}

impl Settings {
    /// Create an empty settings map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bound settings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no settings are bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `key` is bound.
    pub fn contains(&self, key: &Reference) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// The value bound to `key`, if any.
    pub fn get(&self, key: &Reference) -> Option<&SettingValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Bind `key` to `value`, overwriting in place if already bound.
    pub fn set(&mut self, key: Reference, value: SettingValue) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Reference, &SettingValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl PartialEq for Settings {
    /// Order-insensitive: equal iff the same keys bind the same values.
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self.entries.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl FromIterator<(Reference, SettingValue)> for Settings {
    fn from_iter<I: IntoIterator<Item = (Reference, SettingValue)>>(iter: I) -> Self {
        let mut settings = Settings::new();
        for (key, value) in iter {
            settings.set(key, value);
        }
        settings
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        f.write_str("}")
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
