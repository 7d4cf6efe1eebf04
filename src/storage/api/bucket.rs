use chrono::offset::Utc;
use chrono::DateTime;
use serde::{Deserialize, Serialize};

use super::OwnerResource;
use crate::storage::ListedBucket;

/// Body of a ListBuckets response (`ListAllMyBucketsResult`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketResources {
    #[serde(default)]
    pub owner: Option<OwnerResource>,
    #[serde(default)]
    pub buckets: BucketList,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketList {
    #[serde(rename = "Bucket", default)]
    pub items: Vec<BucketResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketResource {
    pub name: String,
    pub creation_date: DateTime<Utc>,
}

impl BucketResources {
    pub(crate) fn into_buckets(self) -> Vec<ListedBucket> {
        self.buckets
            .items
            .into_iter()
            .map(|resource| ListedBucket::new(resource.name, resource.creation_date))
            .collect()
    }
}
