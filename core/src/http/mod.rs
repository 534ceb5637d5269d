//! JSON transport with a uniform result shape.
//!
//! Every call to [`ApiClient::request`] produces an [`Envelope`]: either
//! `Ok(ApiSuccess { data })` for a 2xx response, or `Err(ApiFailure { error,
//! response })` for everything else. Body decoding problems never surface as
//! errors; an unreadable body is read as `{}`.

mod client;
mod envelope;
mod error;
mod options;

pub use client::{API_BASE_URL_ENV, ApiClient, BaseUrlSource, ClientConfig};
pub use envelope::{ApiFailure, ApiSuccess, Envelope, FailureResponse, empty_body};
pub use error::ClientConfigError;
pub use options::{Headers, RequestOptions};

pub(crate) use options::merge_headers;
