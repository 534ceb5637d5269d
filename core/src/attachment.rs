//! Compact attachment encoding carried inside chat message bodies.
//!
//! An attachment travels as a percent-encoded JSON object, e.g.
//! `%7B%22name%22%3A%22a.png%22%7D` for `{"name":"a.png"}`. Decoding is
//! fail-soft: anything that does not decode to a JSON object yields
//! [`AttachmentDescriptor::sentinel`], so a broken attachment never breaks
//! message rendering.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

/// Percent-encoded `{"`.
const ENCODED_PREFIX: &str = "%7B%22";
/// Percent-encoded `"}`.
const ENCODED_SUFFIX: &str = "%22%7D";

/// Fields of the placeholder returned when an attachment cannot be decoded.
pub const SENTINEL_NAME: &str = "-";
pub const SENTINEL_HREF: &str = "#";
pub const SENTINEL_TYPE: &str = "null";
pub const SENTINEL_VERSION: &str = "0.0.1";

/// JSON keys owned by the named descriptor fields.
const NAMED_FIELDS: [&str; 4] = ["name", "href", "type", "version"];

/// Describes a file attached to a chat message.
///
/// Fields missing from an otherwise valid JSON object default to the empty
/// string. Unknown fields are kept in `extra` so that re-encoding is lossless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub href: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub version: String,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl AttachmentDescriptor {
    pub fn new(
        name: impl Into<String>,
        href: impl Into<String>,
        kind: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            href: href.into(),
            kind: kind.into(),
            version: version.into(),
            extra: Map::new(),
        }
    }

    /// The fixed placeholder `{ name: "-", href: "#", type: "null", version: "0.0.1" }`.
    pub fn sentinel() -> Self {
        Self::new(SENTINEL_NAME, SENTINEL_HREF, SENTINEL_TYPE, SENTINEL_VERSION)
    }

    pub fn is_sentinel(&self) -> bool {
        *self == Self::sentinel()
    }

    /// Decodes `text` if it looks like an encoded attachment, `None` for plain text.
    pub fn from_message(text: &str) -> Option<Self> {
        is_attachment(text).then(|| decode_attachment_text(text))
    }

    /// Shorthand for [`encode_attachment`].
    pub fn encode(&self) -> String {
        encode_attachment(self)
    }
}

/// Cheap shape check: does `text` look like a percent-encoded JSON object?
///
/// This does not parse anything; adversarial input may fool it either way.
pub fn is_attachment(text: &str) -> bool {
    !text.is_empty() && text.starts_with(ENCODED_PREFIX) && text.ends_with(ENCODED_SUFFIX)
}

/// Percent-decodes `text` and parses it as an [`AttachmentDescriptor`].
///
/// Never fails: malformed escapes, invalid UTF-8, invalid JSON or a JSON value
/// that is not a descriptor object all produce [`AttachmentDescriptor::sentinel`].
pub fn decode_attachment_text(text: &str) -> AttachmentDescriptor {
    if has_malformed_escape(text) {
        debug!(target: "ava::attachment", "Malformed percent escape, using sentinel");
        return AttachmentDescriptor::sentinel();
    }

    let decoded = match urlencoding::decode(text) {
        Ok(decoded) => decoded,
        Err(e) => {
            debug!(target: "ava::attachment", error = %e, "Attachment is not valid UTF-8, using sentinel");
            return AttachmentDescriptor::sentinel();
        }
    };

    match serde_json::from_str::<AttachmentDescriptor>(&decoded) {
        Ok(descriptor) => descriptor,
        Err(e) => {
            debug!(target: "ava::attachment", error = %e, "Attachment is not a descriptor object, using sentinel");
            AttachmentDescriptor::sentinel()
        }
    }
}

/// Serializes `descriptor` to JSON and percent-encodes it the way
/// `encodeURIComponent` would for the characters JSON produces.
///
/// Entries of `extra` that shadow a named field are dropped; the named field wins.
pub fn encode_attachment(descriptor: &AttachmentDescriptor) -> String {
    let json = if descriptor.extra.keys().any(|key| NAMED_FIELDS.contains(&key.as_str())) {
        let mut descriptor = descriptor.clone();
        descriptor.extra.retain(|key, _| !NAMED_FIELDS.contains(&key.as_str()));
        serde_json::to_string(&descriptor)
    } else {
        serde_json::to_string(descriptor)
    };
    // Serializing a struct of strings plus a JSON map cannot fail.
    let json = json.unwrap_or_default();
    urlencoding::encode(&json).into_owned()
}

// `decodeURIComponent` rejects a `%` that is not followed by two hex digits.
fn has_malformed_escape(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|pair| pair.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return true;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shape_check() {
        assert!(is_attachment("%7B%22a%22%7D"));
        assert!(!is_attachment("plain text"));
        assert!(!is_attachment(""));
        assert!(!is_attachment("%7B%22"));
        assert!(!is_attachment("{\"a\"}"));
    }

    #[test]
    fn decodes_partial_descriptor() {
        let descriptor = decode_attachment_text("%7B%22name%22%3A%22a.png%22%7D");
        assert_eq!(descriptor.name, "a.png");
        assert_eq!(descriptor.href, "");
        assert!(descriptor.extra.is_empty());
    }

    #[test]
    fn extra_keys_cannot_shadow_named_fields() {
        let mut descriptor = AttachmentDescriptor::new("a.png", "/f/1", "image/png", "1.0");
        descriptor.extra.insert("name".into(), json!("shadow"));
        descriptor.extra.insert("type".into(), json!(42));
        descriptor.extra.insert("size".into(), json!(1024));

        let decoded = decode_attachment_text(&encode_attachment(&descriptor));
        assert!(!decoded.is_sentinel());
        assert_eq!(decoded.name, "a.png");
        assert_eq!(decoded.kind, "image/png");
        assert_eq!(decoded.extra.len(), 1);
        assert_eq!(decoded.extra["size"], json!(1024));
    }

    #[test]
    fn garbage_yields_sentinel() {
        for input in ["not json", "", "%ZZ", "%7B%22name%22", "%5B1%2C2%5D", "%E0%A4%A", "%FF"] {
            assert!(decode_attachment_text(input).is_sentinel(), "input: {input:?}");
        }
    }

    #[test]
    fn plus_is_not_a_space() {
        let descriptor = decode_attachment_text("%7B%22name%22%3A%22a+b%22%7D");
        assert_eq!(descriptor.name, "a+b");
    }

    #[test]
    fn round_trip_keeps_extra_fields() {
        let mut descriptor = AttachmentDescriptor::new(
            "report 2024.pdf",
            "https://files.example.com/r?id=1&x=%",
            "application/pdf",
            "1.0.0",
        );
        descriptor.extra.insert("size".into(), json!(1024));

        let encoded = encode_attachment(&descriptor);
        assert!(encoded.starts_with(ENCODED_PREFIX));
        assert_eq!(decode_attachment_text(&encoded), descriptor);
    }

    #[test]
    fn encoded_descriptor_passes_shape_check() {
        let descriptor = AttachmentDescriptor::new("a.png", "/files/a.png", "image/png", "0.0.1");
        let encoded = descriptor.encode();
        assert!(is_attachment(&encoded));
        assert_eq!(AttachmentDescriptor::from_message(&encoded), Some(descriptor));
        assert_eq!(AttachmentDescriptor::from_message("hello"), None);
    }

    #[test]
    fn sentinel_serializes_with_type_key() {
        let value = serde_json::to_value(AttachmentDescriptor::sentinel()).unwrap();
        assert_eq!(value, json!({ "name": "-", "href": "#", "type": "null", "version": "0.0.1" }));
    }
}
