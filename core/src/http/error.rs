use thiserror::Error;

/// Problems setting up an [`ApiClient`](super::ApiClient).
///
/// Request-time failures never use this type; they are reported through the
/// [`Envelope`](super::Envelope).
#[derive(Error, Debug)]
pub enum ClientConfigError {
    #[error("Invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Base URL '{0}' cannot be used as a base for relative paths")]
    NotABase(String),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}
