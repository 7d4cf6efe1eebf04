use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::authorize::{Signer, SERVICE};
use crate::config::Config;
use crate::error::ProviderError;
use crate::storage::api::bucket::BucketResources;
use crate::storage::api::bucket_acl::BucketAclResource;
use crate::storage::api::error::ErrorResource;
use crate::storage::{Grant, ListedBucket, StorageProvider};

/// The S3 client, tied to one region and one set of credentials.
#[derive(Clone)]
pub struct Client {
    pub(crate) client: Arc<reqwest::Client>,
    pub(crate) signer: Arc<Signer>,
    pub(crate) region: String,
    pub(crate) endpoint: Option<Url>,
}

impl Client {
    pub(crate) const DOMAIN_NAME: &'static str = "amazonaws.com";
    /// Response header naming the region a bucket actually lives in.
    pub(crate) const BUCKET_REGION_HEADER: &'static str = "x-amz-bucket-region";

    /// Create a new client from the run configuration.
    ///
    /// No request is made here; bad credentials only show up on the first call.
    pub fn new(config: &Config) -> Result<Client, ProviderError> {
        let endpoint = match config.endpoint {
            Some(ref endpoint) => {
                Some(Url::parse(endpoint).map_err(|_| ProviderError::Url(endpoint.clone()))?)
            }
            None => None,
        };

        // Region redirects have to be re-signed, so they are handled here instead.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Client {
            client: Arc::new(client),
            signer: Arc::new(Signer::new(config.credentials.clone(), SERVICE)),
            region: config.region.clone(),
            endpoint,
        })
    }

    /// Region requests are signed for, unless a bucket redirects elsewhere.
    pub fn region(&self) -> &str {
        self.region.as_str()
    }

    fn parse(uri: String) -> Result<Url, ProviderError> {
        Url::parse(&uri).map_err(|_| ProviderError::Url(uri))
    }

    pub(crate) fn service_url(&self, region: &str) -> Result<Url, ProviderError> {
        match self.endpoint {
            Some(ref endpoint) => Ok(endpoint.clone()),
            None => Client::parse(format!("https://s3.{}.{}/", region, Client::DOMAIN_NAME)),
        }
    }

    /// Virtual-hosted style for AWS, path style for custom endpoints and for
    /// names that cannot be a host label (dots break the TLS wildcard, and
    /// legacy names with uppercase or `_` would be lowercased by the host).
    pub(crate) fn bucket_acl_url(&self, bucket: &str, region: &str) -> Result<Url, ProviderError> {
        let mut url = match self.endpoint {
            Some(ref endpoint) => {
                let mut url = endpoint.clone();
                let path = format!("{}/{}", endpoint.path().trim_end_matches('/'), bucket);
                url.set_path(&path);
                url
            }
            None if !is_dns_compatible(bucket) => Client::parse(format!(
                "https://s3.{}.{}/{}",
                region,
                Client::DOMAIN_NAME,
                bucket
            ))?,
            None => Client::parse(format!(
                "https://{}.s3.{}.{}/",
                bucket,
                region,
                Client::DOMAIN_NAME
            ))?,
        };
        url.set_query(Some("acl"));
        Ok(url)
    }

    async fn get(&self, url: Url, region: &str) -> Result<Response, ProviderError> {
        let headers = self.signer.sign(&Method::GET, &url, region, Utc::now())?;
        debug!(%url, region, "GET");
        let response = self.client.get(url).headers(headers).send().await?;
        Ok(response)
    }

    /// List all buckets owned by the account.
    pub async fn buckets(&self) -> Result<Vec<ListedBucket>, ProviderError> {
        let url = self.service_url(&self.region)?;
        let response = self.get(url, &self.region).await?;
        let resources = read_xml::<BucketResources>(response).await?;
        Ok(resources.into_buckets())
    }

    /// Get the ACL grants of a bucket.
    pub async fn bucket_acl(&self, name: &str) -> Result<Vec<Grant>, ProviderError> {
        let url = self.bucket_acl_url(name, &self.region)?;
        let mut response = self.get(url, &self.region).await?;

        if response.status().is_redirection() {
            let region = response
                .headers()
                .get(Client::BUCKET_REGION_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            if let Some(region) = region {
                debug!(bucket = name, %region, "bucket lives in another region");
                let url = self.bucket_acl_url(name, &region)?;
                response = self.get(url, &region).await?;
            }
        }

        let policy = read_xml::<BucketAclResource>(response).await?;
        Ok(policy.into_grants())
    }
}

#[async_trait]
impl StorageProvider for Client {
    async fn list_buckets(&self) -> Result<Vec<ListedBucket>, ProviderError> {
        self.buckets().await
    }

    async fn bucket_acl(&self, bucket: &str) -> Result<Vec<Grant>, ProviderError> {
        Client::bucket_acl(self, bucket).await
    }
}

/// Whether a bucket name can be used as a single DNS label.
fn is_dns_compatible(bucket: &str) -> bool {
    let edge = |ch: char| ch.is_ascii_lowercase() || ch.is_ascii_digit();
    (3..=63).contains(&bucket.len())
        && bucket.chars().all(|ch| edge(ch) || ch == '-')
        && bucket.starts_with(edge)
        && bucket.ends_with(edge)
}

async fn read_xml<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(service_error(status, &body));
    }
    Ok(quick_xml::de::from_str(&body)?)
}

fn service_error(status: StatusCode, body: &str) -> ProviderError {
    let resource = quick_xml::de::from_str::<ErrorResource>(body).unwrap_or_default();
    warn!(
        status = status.as_u16(),
        code = resource.code.as_deref().unwrap_or(""),
        request_id = resource.request_id.as_deref().unwrap_or(""),
        "S3 request failed"
    );
    ProviderError::Service {
        status: status.as_u16(),
        code: resource
            .code
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string()),
        message: resource.message.unwrap_or_default(),
    }
}
