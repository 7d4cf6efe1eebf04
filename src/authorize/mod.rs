use std::fmt;

use chrono::offset::Utc;
use chrono::DateTime;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Method, Url};
use sha2::{Digest, Sha256};

use crate::config::Credentials;
use crate::error::AuthError;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const TERMINATOR: &str = "aws4_request";

/// Service name S3 requests are scoped to.
pub(crate) const SERVICE: &str = "s3";

/// SHA-256 of the empty payload; every request this crate sends is body-less.
pub(crate) const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

type HmacSha256 = Hmac<Sha256>;

/// The credential scope of a signature: `<date>/<region>/<service>/aws4_request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Scope {
    date: String,
    region: String,
    service: String,
}

impl Scope {
    pub(crate) fn new(time: DateTime<Utc>, region: &str, service: &str) -> Scope {
        Scope {
            date: time.format("%Y%m%d").to_string(),
            region: region.to_string(),
            service: service.to_string(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.date, self.region, self.service, TERMINATOR)
    }
}

/// Signs requests with AWS Signature Version 4.
#[derive(Debug, Clone)]
pub(crate) struct Signer {
    credentials: Credentials,
    service: &'static str,
}

impl Signer {
    pub(crate) fn new(credentials: Credentials, service: &'static str) -> Signer {
        Signer {
            credentials,
            service,
        }
    }

    /// Compute the authentication headers for a body-less request.
    ///
    /// The returned map does not contain `host`; the HTTP client derives it
    /// from the URL, the same way it is derived here.
    pub(crate) fn sign(
        &self,
        method: &Method,
        url: &Url,
        region: &str,
        time: DateTime<Utc>,
    ) -> Result<HeaderMap, AuthError> {
        let amz_date = time.format("%Y%m%dT%H%M%SZ").to_string();

        let mut signed: Vec<(&'static str, String)> = vec![
            ("host", host_header(url)),
            ("x-amz-content-sha256", EMPTY_PAYLOAD_SHA256.to_string()),
            ("x-amz-date", amz_date.clone()),
        ];
        if let Some(ref token) = self.credentials.session_token {
            signed.push(("x-amz-security-token", token.clone()));
        }
        signed.sort_by(|a, b| a.0.cmp(b.0));

        let canonical = canonical_request(
            method.as_str(),
            url.path(),
            &canonical_query(url),
            &signed,
            EMPTY_PAYLOAD_SHA256,
        );
        let scope = Scope::new(time, region, self.service);
        let key = signing_key(&self.credentials.secret_access_key, &scope)?;
        let signature = hex::encode(hmac(&key, string_to_sign(&amz_date, &scope, &canonical).as_bytes())?);

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM,
            self.credentials.access_key_id,
            scope,
            signed_header_names(&signed),
            signature,
        );

        let mut headers = HeaderMap::new();
        for (name, value) in signed.into_iter().filter(|(name, _)| *name != "host") {
            headers.insert(HeaderName::from_static(name), header_value(name, &value)?);
        }
        headers.insert(AUTHORIZATION, header_value("authorization", &authorization)?);
        Ok(headers)
    }
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(value).map_err(|source| AuthError::InvalidHeader { name, source })
}

/// The `host` header as the HTTP client will send it: the port is only
/// included when it is not the scheme's default.
pub(crate) fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Percent-encode everything except RFC 3986 unreserved characters.
pub(crate) fn uri_encode(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// Query parameters encoded and sorted by name, then value. A bare `?acl`
/// becomes `acl=`.
pub(crate) fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k), uri_encode(&v)))
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn signed_header_names(headers: &[(&str, String)]) -> String {
    headers
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(";")
}

/// Headers must already be lowercase and sorted by name.
pub(crate) fn canonical_request(
    method: &str,
    path: &str,
    query: &str,
    headers: &[(&str, String)],
    payload_hash: &str,
) -> String {
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
        .collect();
    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method,
        if path.is_empty() { "/" } else { path },
        query,
        canonical_headers,
        signed_header_names(headers),
        payload_hash,
    )
}

pub(crate) fn string_to_sign(amz_date: &str, scope: &Scope, canonical_request: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        hex::encode(Sha256::digest(canonical_request.as_bytes())),
    )
}

pub(crate) fn signing_key(secret: &str, scope: &Scope) -> Result<Vec<u8>, AuthError> {
    let k_date = hmac(format!("AWS4{}", secret).as_bytes(), scope.date.as_bytes())?;
    let k_region = hmac(&k_date, scope.region.as_bytes())?;
    let k_service = hmac(&k_region, scope.service.as_bytes())?;
    hmac(&k_service, TERMINATOR.as_bytes())
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>, AuthError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| AuthError::InvalidKey)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
