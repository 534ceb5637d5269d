//! Chat backend operations built on [`ApiClient`](crate::http::ApiClient).

mod chat;
mod error;
mod upload;

pub use chat::{ChatService, Endpoints, OutgoingMessage};
pub use error::UploadError;
pub use upload::UploadFile;
