//! Data-access layer of the Ava embeddable chat widget.
//!
//! * [`config`] resolves the widget's runtime configuration once per session.
//! * [`http`] sends JSON requests and normalizes every outcome into an envelope.
//! * [`service`] implements the chat operations on top of it.
//! * [`attachment`] encodes and decodes attachments embedded in messages.
//! * [`bridge`] notifies the host page when the widget is embedded in a frame.

pub mod attachment;
pub mod bridge;
pub mod config;
pub mod http;
pub mod service;

pub use attachment::{AttachmentDescriptor, decode_attachment_text, encode_attachment, is_attachment};
pub use bridge::{HostBridge, NoopBridge, OutboundMessage, PostMessageBridge, host_bridge};
pub use config::{ConfigSource, RuntimeConfig, Settings, resolve_config};
pub use http::{ApiClient, ApiFailure, ApiSuccess, ClientConfig, Envelope, Headers, RequestOptions};
pub use service::{ChatService, Endpoints, OutgoingMessage, UploadError, UploadFile};
