use serde::{Deserialize, Serialize};

use super::OwnerResource;
use crate::storage::{Grant, Permission};

/// Body of a GetBucketAcl response (`AccessControlPolicy`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketAclResource {
    #[serde(default)]
    pub owner: Option<OwnerResource>,
    #[serde(default)]
    pub access_control_list: BucketAclGrants,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketAclGrants {
    #[serde(rename = "Grant", default)]
    pub items: Vec<BucketAclGrant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketAclGrant {
    #[serde(default)]
    pub grantee: Option<BucketAclGrantee>,
    #[serde(default)]
    pub permission: Option<String>,
}

/// A canonical user, an e-mail grantee or a predefined group (identified by `URI`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketAclGrantee {
    #[serde(rename = "ID", default)]
    pub id: Option<String>,
    #[serde(rename = "DisplayName", default)]
    pub display_name: Option<String>,
    #[serde(rename = "EmailAddress", default)]
    pub email_address: Option<String>,
    #[serde(rename = "URI", default)]
    pub uri: Option<String>,
}

impl From<BucketAclGrant> for Grant {
    fn from(resource: BucketAclGrant) -> Grant {
        Grant {
            grantee: resource.grantee.and_then(|grantee| grantee.display_name),
            permission: Permission::from_code(resource.permission.as_deref().unwrap_or_default()),
        }
    }
}

impl BucketAclResource {
    pub(crate) fn into_grants(self) -> Vec<Grant> {
        self.access_control_list
            .items
            .into_iter()
            .map(Grant::from)
            .collect()
    }
}
