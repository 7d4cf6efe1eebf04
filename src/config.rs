use std::env;
use std::fmt;
use std::path::PathBuf;

/// Region used when `AWS_REGION` is not set.
pub const DEFAULT_REGION: &str = "eu-west-1";
/// Where the report lands, relative to the working directory.
pub const DEFAULT_OUTPUT_PATH: &str = "s3ACL.pdf";
/// Title written into the document information dictionary.
pub const DEFAULT_TITLE: &str = "AWS S3 List of Buckets and ACL";
/// Author written into the document information dictionary.
pub const DEFAULT_AUTHOR: &str = "s3-acl-report";

/// An AWS access key pair, with an optional session token for temporary credentials.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Credentials {
        Credentials {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Credentials {
        self.session_token = Some(token.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Run configuration, resolved once at startup and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub region: String,
    pub credentials: Credentials,
    /// Custom S3-compatible endpoint. When set, requests use path-style addressing.
    pub endpoint: Option<String>,
    pub output_path: PathBuf,
    pub title: String,
    pub author: String,
}

impl Config {
    /// Create a configuration for the given region and credentials, with default output settings.
    pub fn new(region: impl Into<String>, credentials: Credentials) -> Config {
        Config {
            region: region.into(),
            credentials,
            endpoint: None,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            title: DEFAULT_TITLE.to_string(),
            author: DEFAULT_AUTHOR.to_string(),
        }
    }

    /// Build the configuration from the process environment.
    ///
    /// Missing credentials are not an error here: they are sent as empty
    /// strings and the provider rejects the first request.
    pub fn from_env() -> Config {
        Config::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Config {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut credentials = Credentials::new(
            lookup("AWS_ACCESS_KEY_ID").unwrap_or_default(),
            lookup("AWS_SECRET_ACCESS_KEY").unwrap_or_default(),
        );
        credentials.session_token = non_empty("AWS_SESSION_TOKEN");

        let region = non_empty("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string());
        let mut config = Config::new(region, credentials);
        config.endpoint = non_empty("AWS_ENDPOINT_URL");
        config
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Config {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Config {
        self.output_path = path.into();
        self
    }
}
