//! Outbound notifications to the page that embeds the widget.
//!
//! The real cross-frame transport (`postMessage` on the parent window) lives
//! outside this crate. [`PostMessageBridge`] hands stringified notifications to
//! it over a channel; [`NoopBridge`] stands in when the widget is not
//! integrated.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace, warn};

use crate::config::RuntimeConfig;

/// Capability to notify the host page.
pub trait HostBridge: Send + Sync {
    fn notify(&self, value: &str);
}

/// Bridge used when the widget is not integrated: every notification is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBridge;

impl HostBridge for NoopBridge {
    fn notify(&self, value: &str) {
        trace!(target: "ava::bridge", %value, "Not integrated, dropping notification");
    }
}

/// A notification addressed to the parent frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub payload: String,
    /// Origin the parent frame must have for the message to be delivered.
    pub target_origin: Option<String>,
}

/// Forwards notifications to the cross-frame transport.
#[derive(Debug, Clone)]
pub struct PostMessageBridge {
    target_origin: Option<String>,
    sender: UnboundedSender<OutboundMessage>,
}

impl PostMessageBridge {
    pub fn new(target_origin: Option<String>, sender: UnboundedSender<OutboundMessage>) -> Self {
        Self { target_origin, sender }
    }

    pub fn target_origin(&self) -> Option<&str> {
        self.target_origin.as_deref()
    }
}

impl HostBridge for PostMessageBridge {
    fn notify(&self, value: &str) {
        let message = OutboundMessage {
            payload: value.to_string(),
            target_origin: self.target_origin.clone(),
        };
        debug!(target: "ava::bridge", origin = ?self.target_origin, "Posting notification to host");
        if self.sender.send(message).is_err() {
            warn!(target: "ava::bridge", "Host transport is gone, notification dropped");
        }
    }
}

/// Picks the bridge for this session: posts to the configured origin when
/// integrated, does nothing otherwise.
pub fn host_bridge(
    config: &RuntimeConfig,
    sender: UnboundedSender<OutboundMessage>,
) -> Arc<dyn HostBridge> {
    if config.is_integrated {
        Arc::new(PostMessageBridge::new(config.origin().map(str::to_string), sender))
    } else {
        Arc::new(NoopBridge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigSource, FrameContext, resolve_config};
    use tokio::sync::mpsc;

    #[test]
    fn integrated_widget_posts_to_origin() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let source = ConfigSource::from_query("origin=https%3A%2F%2Fhost.example")
            .with_frame(FrameContext::embedded());
        let bridge = host_bridge(&resolve_config(&source), tx);

        bridge.notify("open");
        bridge.notify(&42.to_string());

        let first = rx.try_recv().unwrap();
        assert_eq!(first.payload, "open");
        assert_eq!(first.target_origin.as_deref(), Some("https://host.example"));
        assert_eq!(rx.try_recv().unwrap().payload, "42");
    }

    #[test]
    fn standalone_widget_is_silent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let config = resolve_config(&ConfigSource::from_query("origin=https%3A%2F%2Fhost.example"));
        host_bridge(&config, tx).notify("open");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn preview_disables_bridge() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let source = ConfigSource::from_query("preview").with_frame(FrameContext::embedded());
        host_bridge(&resolve_config(&source), tx).notify("open");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_transport_does_not_panic() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        PostMessageBridge::new(None, tx).notify("open");
    }
}
