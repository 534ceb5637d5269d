use std::collections::BTreeMap;

use reqwest::Response;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use tracing::{debug, error, instrument};

use crate::attachment::{AttachmentDescriptor, decode_attachment_text};
use crate::config::Settings;
use crate::http::{ApiClient, ApiFailure, ApiSuccess, Headers, RequestOptions, merge_headers};

use super::error::UploadError;
use super::upload::UploadFile;

/// Backend paths, resolved against the client's base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub chat: String,
    pub evaluate: String,
    pub upload: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            chat: "/v1/chat".to_string(),
            evaluate: "/chat/api/message/evaluate".to_string(),
            upload: "/chat/api/message/file".to_string(),
        }
    }
}

/// A chat message as sent by the widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub sender: String,
    pub message: String,
}

impl OutgoingMessage {
    pub fn new(sender: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            message: message.into(),
        }
    }
}

/// The widget's backend operations: sending messages, rating answers and
/// uploading files.
#[derive(Clone, Debug)]
pub struct ChatService {
    api: ApiClient,
    endpoints: Endpoints,
}

impl ChatService {
    pub fn new(api: ApiClient) -> Self {
        Self::with_endpoints(api, Endpoints::default())
    }

    pub fn with_endpoints(api: ApiClient, endpoints: Endpoints) -> Self {
        Self { api, endpoints }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Posts `{sender, message}` to the chat endpoint.
    ///
    /// An error envelope is returned as `Err`, so callers can use `?`.
    #[instrument(skip_all, fields(sender = %message.sender))]
    pub async fn send_message(
        &self,
        auth_headers: &Headers,
        message: &OutgoingMessage,
        settings: &Settings,
    ) -> Result<ApiSuccess, ApiFailure> {
        debug!(
            target: "ava::service",
            bot_name = ?settings.bot_name(),
            settings = settings.len(),
            "Sending chat message"
        );
        let body = json!({ "sender": message.sender, "message": message.message });
        let options = RequestOptions::post().headers(auth_headers).body(body);
        self.api.request(&self.endpoints.chat, options).await
    }

    /// Sends a rating of a bot answer with PUT. Same error contract as
    /// [`send_message`](Self::send_message).
    #[instrument(skip_all)]
    pub async fn evaluate(&self, data: JsonValue, auth_headers: &Headers) -> Result<ApiSuccess, ApiFailure> {
        debug!(target: "ava::service", "Sending evaluation");
        let options = RequestOptions::put().headers(auth_headers).body(data);
        self.api.request(&self.endpoints.evaluate, options).await
    }

    /// Uploads `file` for `chat_id` as multipart form data and decodes the
    /// attachment the server echoes back in `dialog.input.send`.
    ///
    /// Only the authentication headers are sent; the multipart content type is
    /// set by the transport.
    #[instrument(skip(self, file, auth_headers), fields(file_name = %file.file_name()))]
    pub async fn upload_file(
        &self,
        file: UploadFile,
        auth_headers: &Headers,
        chat_id: &str,
    ) -> Result<AttachmentDescriptor, UploadError> {
        let url = self
            .api
            .resolve_url(&self.endpoints.upload)
            .map_err(|e| UploadError::InvalidUrl {
                path: self.endpoints.upload.clone(),
                source: e,
            })?;
        let headers = merge_headers(HeaderMap::new(), auth_headers).map_err(UploadError::InvalidHeader)?;

        let form = reqwest::multipart::Form::new()
            .part("file", file.into_part().await?)
            .text("chatId", chat_id.to_string());

        debug!(target: "ava::service::upload", url = %url, "Sending file upload request");
        let response = self
            .api
            .http_client()
            .post(url)
            .headers(headers)
            .multipart(form)
            .send()
            .await;

        let response = match response {
            Ok(resp) => resp,
            Err(e) => {
                error!(target: "ava::service::upload", error = %e, "File upload request failed");
                return Err(UploadError::RequestFailed(e));
            }
        };

        Self::handle_upload_response(response).await
    }

    #[instrument(skip(response), fields(status = response.status().as_u16()))]
    async fn handle_upload_response(response: Response) -> Result<AttachmentDescriptor, UploadError> {
        let status = response.status();

        if status.is_success() {
            let body: JsonValue = response.json().await.map_err(|e| {
                error!(target: "ava::service::upload", error = %e, "Upload response is not JSON");
                UploadError::MalformedResponse(format!("body is not JSON: {e}"))
            })?;
            let send = body
                .pointer("/dialog/input/send")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| {
                    error!(target: "ava::service::upload", "Upload response lacks dialog.input.send");
                    UploadError::MalformedResponse("missing text field dialog.input.send".to_string())
                })?;
            debug!(target: "ava::service::upload", "File upload successful");
            Ok(decode_attachment_text(send))
        } else {
            error!(target: "ava::service::upload", "File upload returned error status");
            let status_text = status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP status {}", status.as_u16()));
            let headers: BTreeMap<String, String> = response
                .headers()
                .iter()
                .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
                .collect();
            let body = response.text().await.unwrap_or_default();
            Err(UploadError::Status {
                status: status.as_u16(),
                status_text,
                headers,
                body,
            })
        }
    }
}
