use anyhow::{Context, Result};
use ava_core::attachment::{AttachmentDescriptor, decode_attachment_text, is_attachment};
use ava_core::service::{OutgoingMessage, UploadFile};
use console::style;
use serde_json::{Value as JsonValue, json};
use tracing::{info, warn};

use crate::AppContext;
use crate::cli::{DecodeArgs, EvaluateArgs, NotifyArgs, SendArgs, UploadArgs};

// --- Handler Functions ---

pub fn handle_config(cx: &AppContext) -> Result<()> {
    let mut value = serde_json::to_value(&cx.runtime)?;
    value["api_base"] = json!(cx.service.api().config().base().map(|url| url.as_str()));
    print_json(&value)
}

pub async fn handle_send(args: SendArgs, cx: &AppContext) -> Result<()> {
    let message = OutgoingMessage::new(args.sender, args.message);
    info!("Sending message as {}", message.sender);
    match cx
        .service
        .send_message(&cx.auth_headers, &message, &cx.runtime.settings)
        .await
    {
        Ok(success) => print_json(&serde_json::to_value(success)?),
        Err(failure) => {
            print_json(&serde_json::to_value(&failure)?)?;
            Err(failure).context("Message was not accepted")
        }
    }
}

pub async fn handle_evaluate(args: EvaluateArgs, cx: &AppContext) -> Result<()> {
    let data: JsonValue = serde_json::from_str(&args.data).context("Evaluation payload is not valid JSON")?;
    match cx.service.evaluate(data, &cx.auth_headers).await {
        Ok(success) => print_json(&serde_json::to_value(success)?),
        Err(failure) => {
            print_json(&serde_json::to_value(&failure)?)?;
            Err(failure).context("Evaluation was not accepted")
        }
    }
}

pub async fn handle_upload(args: UploadArgs, cx: &AppContext) -> Result<()> {
    let mut file = UploadFile::from_path(&args.path).await?;
    if let Some(raw) = &args.mime {
        let mime: mime::Mime = raw.parse().with_context(|| format!("Invalid MIME type '{raw}'"))?;
        file = file.with_mime(mime);
    }
    let descriptor = cx
        .service
        .upload_file(file, &cx.auth_headers, &args.chat_id)
        .await
        .with_context(|| format!("Failed to upload {}", args.path.display()))?;
    if descriptor.is_sentinel() {
        warn!("Server echoed an attachment that could not be decoded");
    }
    print_descriptor(&descriptor)
}

pub fn handle_decode(args: DecodeArgs) -> Result<()> {
    if !is_attachment(&args.text) {
        eprintln!("{}", style("Input does not look like an encoded attachment.").yellow());
    }
    print_descriptor(&decode_attachment_text(&args.text))
}

pub fn handle_notify(args: NotifyArgs, cx: &mut AppContext) -> Result<()> {
    cx.bridge.notify(&args.value);
    let mut posted = 0;
    while let Ok(message) = cx.outbound.try_recv() {
        posted += 1;
        print_json(&json!({
            "payload": message.payload,
            "targetOrigin": message.target_origin,
        }))?;
    }
    if posted == 0 {
        eprintln!("{}", style("Widget is not integrated; nothing was posted.").dim());
    }
    Ok(())
}

fn print_descriptor(descriptor: &AttachmentDescriptor) -> Result<()> {
    let mut value = serde_json::to_value(descriptor)?;
    value["encoded"] = json!(descriptor.encode());
    print_json(&value)
}

fn print_json(value: &JsonValue) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
