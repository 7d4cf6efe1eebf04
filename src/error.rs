use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The error type for request signing.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The secret key could not be used as an HMAC key.
    #[error("invalid signing key length")]
    InvalidKey,
    /// A signed header value contains characters HTTP does not allow.
    #[error("invalid header value for `{name}`")]
    InvalidHeader {
        name: &'static str,
        #[source]
        source: reqwest::header::InvalidHeaderValue,
    },
}

/// The error type for every call made against the storage provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Signing the request failed.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),
    /// Transport-level failure (connection, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The provider answered with a non-success status.
    #[error("S3 responded {status} {code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },
    /// The response body was not the expected XML document.
    #[error("malformed XML response: {0}")]
    Xml(#[from] quick_xml::DeError),
    /// The configured endpoint is not a usable URL.
    #[error("invalid endpoint `{0}`")]
    Url(String),
    /// Fetching the ACL of one bucket failed; the whole batch fails with it.
    #[error("could not fetch ACL of bucket `{bucket}`")]
    BucketAcl {
        bucket: String,
        #[source]
        source: Box<ProviderError>,
    },
}

/// The error type for writing the report artifact.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot open report file {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot write report file {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot finalize report file {}", path.display())]
    Finalize {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The terminal error of a report run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Render(#[from] RenderError),
    /// A pipeline only runs once.
    #[error("the pipeline has already run")]
    AlreadyRun,
}
