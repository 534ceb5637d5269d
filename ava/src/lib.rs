use std::sync::Arc;

use anyhow::{Context, Result};
use ava_core::bridge::{HostBridge, OutboundMessage, host_bridge};
use ava_core::config::{ConfigSource, FrameContext, RuntimeConfig, StaticConfig, resolve_config};
use ava_core::http::{ApiClient, ClientConfig, Headers};
use ava_core::service::ChatService;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use url::Url;

use crate::cli::WidgetArgs;

pub mod cli;
pub mod commands;

/// Everything a command needs, built once from the command line.
pub struct AppContext {
    pub runtime: RuntimeConfig,
    pub service: ChatService,
    pub auth_headers: Headers,
    pub bridge: Arc<dyn HostBridge>,
    /// Receives what the bridge would post to the parent frame.
    pub outbound: UnboundedReceiver<OutboundMessage>,
}

impl AppContext {
    pub async fn new(widget: &WidgetArgs, headers: &[(String, String)]) -> Result<Self> {
        let source = config_source(widget).await?;
        let runtime = resolve_config(&source);

        let client_config =
            ClientConfig::from_env(&runtime, source.page.as_ref()).context("Invalid API base URL")?;
        let api = ApiClient::new(client_config)?;

        let (sender, outbound) = mpsc::unbounded_channel();
        let bridge = host_bridge(&runtime, sender);

        Ok(Self {
            runtime,
            service: ChatService::new(api),
            auth_headers: headers.iter().cloned().collect(),
            bridge,
            outbound,
        })
    }
}

/// Builds the snapshot of the embedding context the widget would see.
pub async fn config_source(args: &WidgetArgs) -> Result<ConfigSource> {
    let mut source = match &args.widget_url {
        Some(raw) => {
            let url = Url::parse(raw).with_context(|| format!("Invalid widget URL '{raw}'"))?;
            ConfigSource::from_url(&url)
        }
        None => ConfigSource::from_query(""),
    };

    if let Some(path) = &args.static_config {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read static config {}", path.display()))?;
        let config: StaticConfig = serde_json::from_str(&text)
            .with_context(|| format!("Static config {} is not valid JSON", path.display()))?;
        source = source.with_static_config(config);
    }
    if let Some(theme) = &args.static_theme {
        source = source.with_static_theme(theme.clone());
    }
    if let Some(locale) = &args.static_locale {
        source = source.with_static_locale(locale.clone());
    }
    if args.embedded {
        source = source.with_frame(FrameContext::embedded());
    }
    Ok(source.with_default_locale(args.default_locale.clone()))
}
