//! Bucket inventory: the listing call, then every bucket's ACL at once.

use futures::future::join_all;
use tracing::{debug, info};

use crate::error::ProviderError;
use crate::storage::{ListedBucket, RawBucket, StorageProvider};

/// Fetches buckets and their grants through a [`StorageProvider`].
pub struct Inventory<'a, P: ?Sized> {
    provider: &'a P,
}

impl<'a, P: StorageProvider + ?Sized> Inventory<'a, P> {
    pub fn new(provider: &'a P) -> Inventory<'a, P> {
        Inventory { provider }
    }

    /// List every bucket, in the order the provider returns them.
    pub async fn list_buckets(&self) -> Result<Vec<ListedBucket>, ProviderError> {
        let buckets = self.provider.list_buckets().await?;
        info!(buckets = buckets.len(), "listed buckets");
        Ok(buckets)
    }

    /// Attach the ACL grants of every bucket.
    ///
    /// All requests are in flight together and every one of them settles
    /// before this returns. If any failed, the first failure in bucket order
    /// is returned and the other results are dropped.
    pub async fn attach_acl(
        &self,
        buckets: Vec<ListedBucket>,
    ) -> Result<Vec<RawBucket>, ProviderError> {
        let requests = buckets
            .iter()
            .map(|bucket| self.provider.bucket_acl(&bucket.name));
        let results = join_all(requests).await;

        let attached = buckets
            .into_iter()
            .zip(results)
            .map(|(bucket, result)| match result {
                Ok(grants) => {
                    debug!(bucket = %bucket.name, grants = grants.len(), "fetched ACL");
                    Ok(bucket.with_permissions(grants))
                }
                Err(source) => Err(ProviderError::BucketAcl {
                    bucket: bucket.name,
                    source: Box::new(source),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(buckets = attached.len(), "fetched bucket ACLs");
        Ok(attached)
    }
}
