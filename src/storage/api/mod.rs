//! XML resources of the S3 REST API.

pub(crate) mod bucket;
pub(crate) mod bucket_acl;
pub(crate) mod error;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerResource {
    #[serde(rename = "ID", default)]
    pub id: Option<String>,
    #[serde(rename = "DisplayName", default)]
    pub display_name: Option<String>,
}
