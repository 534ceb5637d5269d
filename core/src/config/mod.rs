//! Runtime configuration of the widget.
//!
//! The widget is configured either by a host-provided object ("static mode")
//! or by URL query parameters ("query mode"). [`resolve_config`] turns a
//! [`ConfigSource`] snapshot of the embedding context into an immutable
//! [`RuntimeConfig`] once at startup; nothing downstream reads ambient state.
//!
//! # Query mode
//!
//! The `config` parameter carries a base64-encoded query string, e.g.
//! `config=bmFtZT1BdmEmbWluaW1pemU9dHJ1ZQ` for `name=Ava&minimize=true`.
//! `origin` and `apiServer` parameters are folded into the decoded settings.
//!
//! # Precedence
//!
//! * `api_server`: URL `apiServer` > `apiServer` in settings > `None` (the HTTP
//!   client then falls back to the environment default).
//! * `theme`: static theme > `theme` parameter > `"default"`.
//! * `locale`: static locale > `locale` parameter > [`ConfigSource::default_locale`].

use base64::{
    Engine,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use serde::Serialize;
use tracing::{debug, instrument, warn};

mod settings;
mod source;

pub use settings::{SettingValue, Settings};
pub use source::{ConfigSource, DEFAULT_LOCALE, FrameContext, StaticConfig};

use source::QueryParams;

/// Theme used when neither the host nor the URL names one.
pub const DEFAULT_THEME: &str = "default";

/// Accepts padded and unpadded input; the alphabet is normalized beforehand.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Which source the settings were read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigMode {
    Static,
    Query,
}

/// Effective configuration for one widget session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeConfig {
    pub mode: ConfigMode,
    pub settings: Settings,
    /// API base override, if any was configured.
    pub api_server: Option<String>,
    pub theme: String,
    pub locale: String,
    pub is_preview: bool,
    pub is_only_chatbot: bool,
    pub hide_bot_name: bool,
    pub auto_open: bool,
    /// Embedded in a parent frame and allowed to notify it.
    pub is_integrated: bool,
}

impl RuntimeConfig {
    /// Target origin for cross-frame notifications.
    pub fn origin(&self) -> Option<&str> {
        self.settings.origin()
    }
}

/// Derives the effective configuration from a snapshot of the embedding context.
#[instrument(level = "debug", skip(source), fields(static_mode = source.static_mode))]
pub fn resolve_config(source: &ConfigSource) -> RuntimeConfig {
    let params = QueryParams::parse(&source.query);

    let (mode, settings) = match source.static_config.as_ref().filter(|_| source.static_mode) {
        Some(config) => (ConfigMode::Static, settings_from_static(config)),
        None => (ConfigMode::Query, settings_from_query(&params)),
    };

    let api_server = params
        .get_non_empty("apiServer")
        .or_else(|| settings.api_server().filter(|s| !s.is_empty()))
        .map(str::to_string);

    let theme = static_value(source, &source.static_theme)
        .or_else(|| params.get_non_empty("theme"))
        .unwrap_or(DEFAULT_THEME)
        .to_string();

    let locale = static_value(source, &source.static_locale)
        .or_else(|| params.get_non_empty("locale"))
        .unwrap_or(source.default_locale.as_str())
        .to_string();

    let is_preview = params.has("preview");
    let is_only_chatbot = params.has("only-chatbot");
    let is_integrated = source.frame.is_embedded() && !is_preview && !is_only_chatbot;

    let config = RuntimeConfig {
        mode,
        settings,
        api_server,
        theme,
        locale,
        is_preview,
        is_only_chatbot,
        hide_bot_name: params.has("hide-bot-name"),
        auto_open: params.has("auto-open"),
        is_integrated,
    };
    debug!(
        target: "ava::config",
        mode = ?config.mode,
        settings = config.settings.len(),
        api_server = ?config.api_server,
        theme = %config.theme,
        locale = %config.locale,
        integrated = config.is_integrated,
        "Resolved runtime configuration"
    );
    config
}

fn static_value<'a>(source: &ConfigSource, value: &'a Option<String>) -> Option<&'a str> {
    if !source.static_mode {
        return None;
    }
    value.as_deref().filter(|v| !v.is_empty())
}

fn settings_from_static(config: &StaticConfig) -> Settings {
    let fields = [
        ("bot_name", &config.bot_name),
        ("name", &config.name),
        ("theme", &config.theme),
        ("minimize", &config.minimize),
    ];
    Settings::from_pairs(
        fields
            .into_iter()
            .filter_map(|(key, value)| value.clone().map(|value| (key, value))),
    )
}

fn settings_from_query(params: &QueryParams) -> Settings {
    let blob = params.get("config").unwrap_or_default();
    let mut pairs = decode_config_blob(blob);

    // Explicit parameters win over keys of the same name inside the blob.
    for key in ["origin", "apiServer"] {
        if let Some(value) = params.get(key) {
            pairs.retain(|(k, _)| k != key);
            pairs.push((key.to_string(), value.to_string()));
        }
    }

    Settings::from_pairs(pairs)
}

/// Decodes the `config` parameter into key/value pairs.
///
/// For repeated keys the first occurrence wins. An undecodable blob yields no
/// pairs.
fn decode_config_blob(blob: &str) -> Vec<(String, String)> {
    if blob.is_empty() {
        return Vec::new();
    }

    // Form decoding of the URL turns `+` into a space; undo that and accept
    // the URL-safe alphabet too.
    let normalized: String = blob
        .chars()
        .filter_map(|c| match c {
            ' ' | '-' => Some('+'),
            '_' => Some('/'),
            c if c.is_whitespace() => None,
            c => Some(c),
        })
        .collect();

    let bytes = match LENIENT_BASE64.decode(normalized.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(target: "ava::config", error = %e, "Ignoring undecodable config parameter");
            return Vec::new();
        }
    };
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!(target: "ava::config", error = %e, "Ignoring config parameter that is not UTF-8");
            return Vec::new();
        }
    };

    let mut pairs: Vec<(String, String)> = Vec::new();
    for (key, value) in QueryParams::parse(&text).into_pairs() {
        if !pairs.iter().any(|(k, _)| *k == key) {
            pairs.push((key, value));
        }
    }
    pairs
}
