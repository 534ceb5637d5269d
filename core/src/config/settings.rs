use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single widget option after type coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl SettingValue {
    /// Turns the literal texts `"true"` and `"false"` into booleans.
    ///
    /// Everything else, numeric-looking text included, is returned unchanged.
    pub fn coerce(self) -> Self {
        match self {
            SettingValue::Text(text) if text == "true" => SettingValue::Bool(true),
            SettingValue::Text(text) if text == "false" => SettingValue::Bool(false),
            other => other,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{b}"),
            SettingValue::Number(n) => write!(f, "{n}"),
            SettingValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Text(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::Text(value)
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

/// Effective widget options, keyed by option name (`bot_name`, `name`,
/// `theme`, `minimize`, `origin`, `apiServer`, ...).
///
/// Built once per session by [`resolve_config`](super::resolve_config) and
/// read-only afterwards. Every value has gone through [`SettingValue::coerce`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Settings(BTreeMap<String, SettingValue>);

impl Settings {
    /// Builds settings from raw pairs, coercing each value. Later pairs
    /// replace earlier ones with the same key.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<SettingValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Settings(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into().coerce()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(SettingValue::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(SettingValue::as_bool)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn bot_name(&self) -> Option<&str> {
        self.get_str("bot_name")
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    pub fn minimize(&self) -> bool {
        self.get_bool("minimize").unwrap_or(false)
    }

    /// Trusted target origin for cross-frame notifications.
    pub fn origin(&self) -> Option<&str> {
        self.get_str("origin")
    }

    pub fn api_server(&self) -> Option<&str> {
        self.get_str("apiServer")
    }
}
