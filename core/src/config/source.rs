use serde::{Deserialize, Serialize};
use url::Url;

use super::settings::SettingValue;

/// Locale used when neither the host nor the URL names one.
pub const DEFAULT_LOCALE: &str = "en";

/// Configuration object injected by the host page in static mode.
///
/// Absent fields are left out of the resolved settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_name: Option<SettingValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<SettingValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<SettingValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimize: Option<SettingValue>,
}

/// Where the widget runs relative to the host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameContext {
    /// A reference to the top-level window exists.
    pub has_top: bool,
    /// The widget's own window is the top-level window.
    pub is_top: bool,
}

impl FrameContext {
    /// Loaded directly, not inside a frame.
    pub fn top_level() -> Self {
        Self { has_top: true, is_top: true }
    }

    /// Loaded inside a parent page's frame.
    pub fn embedded() -> Self {
        Self { has_top: true, is_top: false }
    }

    pub fn is_embedded(&self) -> bool {
        self.has_top && !self.is_top
    }
}

impl Default for FrameContext {
    fn default() -> Self {
        Self::top_level()
    }
}

/// Everything [`resolve_config`](super::resolve_config) reads from the embedding context.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSource {
    /// The page's query string, with or without the leading `?`.
    pub query: String,
    pub static_mode: bool,
    pub static_config: Option<StaticConfig>,
    pub static_theme: Option<String>,
    pub static_locale: Option<String>,
    pub frame: FrameContext,
    /// Deployment-chosen fallback locale.
    pub default_locale: String,
    /// The page the widget was loaded from, when known.
    pub page: Option<Url>,
}

impl ConfigSource {
    /// Query-mode source for a top-level page.
    pub fn from_query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            static_mode: false,
            static_config: None,
            static_theme: None,
            static_locale: None,
            frame: FrameContext::default(),
            default_locale: DEFAULT_LOCALE.to_string(),
            page: None,
        }
    }

    /// Query-mode source taking the query string of a full page URL.
    pub fn from_url(url: &Url) -> Self {
        Self {
            page: Some(url.clone()),
            ..Self::from_query(url.query().unwrap_or_default())
        }
    }

    /// Switches to static mode with the host-provided configuration.
    #[must_use]
    pub fn with_static_config(mut self, config: StaticConfig) -> Self {
        self.static_mode = true;
        self.static_config = Some(config);
        self
    }

    #[must_use]
    pub fn with_static_theme(mut self, theme: impl Into<String>) -> Self {
        self.static_theme = Some(theme.into());
        self
    }

    #[must_use]
    pub fn with_static_locale(mut self, locale: impl Into<String>) -> Self {
        self.static_locale = Some(locale.into());
        self
    }

    #[must_use]
    pub fn with_frame(mut self, frame: FrameContext) -> Self {
        self.frame = frame;
        self
    }

    #[must_use]
    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = locale.into();
        self
    }
}

/// Decoded URL query parameters, in order of appearance.
#[derive(Debug, Clone, Default)]
pub(crate) struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub(crate) fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        QueryParams(url::form_urlencoded::parse(query.as_bytes()).into_owned().collect())
    }

    /// First value for `key`, if any.
    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// First value for `key`, treating the empty string as absent.
    pub(crate) fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub(crate) fn has(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub(crate) fn into_pairs(self) -> Vec<(String, String)> {
        self.0
    }
}
