//! Amazon S3 access: bucket and grant types, and the REST client.

mod client;

pub(crate) mod api;

use std::fmt;

use async_trait::async_trait;
use chrono::offset::Utc;
use chrono::DateTime;

pub use self::client::Client;
use crate::aggregate::AggregatedGrant;
use crate::error::ProviderError;

/// A bucket, together with whatever permission data has been attached to it so far.
///
/// The permission slot moves through three shapes during a run: nothing
/// ([`ListedBucket`]), raw grants ([`RawBucket`]) and aggregated grants
/// ([`AggregatedBucket`]). Each step consumes the previous bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket<P = ()> {
    pub name: String,
    pub creation_date: DateTime<Utc>,
    pub permissions: P,
}

/// A bucket as returned by the listing call.
pub type ListedBucket = Bucket<()>;
/// A bucket with its raw ACL grants attached.
pub type RawBucket = Bucket<Vec<Grant>>;
/// A bucket whose grants have been grouped by grantee.
pub type AggregatedBucket = Bucket<Vec<AggregatedGrant>>;

impl Bucket {
    pub fn new(name: impl Into<String>, creation_date: DateTime<Utc>) -> Bucket {
        Bucket {
            name: name.into(),
            creation_date,
            permissions: (),
        }
    }
}

impl<P> Bucket<P> {
    /// Replace the permission data, keeping name and creation date.
    pub fn with_permissions<Q>(self, permissions: Q) -> Bucket<Q> {
        Bucket {
            name: self.name,
            creation_date: self.creation_date,
            permissions,
        }
    }
}

/// One access-control entry of a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    /// Display name of the grantee. `None` for group grantees such as "all users".
    pub grantee: Option<String>,
    pub permission: Permission,
}

impl Grant {
    pub fn new(grantee: Option<&str>, permission: impl Into<Permission>) -> Grant {
        Grant {
            grantee: grantee.map(str::to_string),
            permission: permission.into(),
        }
    }
}

/// An S3 ACL permission code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Permission {
    Read,
    Write,
    ReadAcp,
    WriteAcp,
    FullControl,
    /// Any code outside the documented set, kept verbatim.
    Unrecognized(String),
}

impl Permission {
    pub fn from_code(code: &str) -> Permission {
        match code {
            "READ" => Permission::Read,
            "WRITE" => Permission::Write,
            "READ_ACP" => Permission::ReadAcp,
            "WRITE_ACP" => Permission::WriteAcp,
            "FULL_CONTROL" => Permission::FullControl,
            other => Permission::Unrecognized(other.to_string()),
        }
    }

    /// The code as the provider spells it.
    pub fn code(&self) -> &str {
        match self {
            Permission::Read => "READ",
            Permission::Write => "WRITE",
            Permission::ReadAcp => "READ_ACP",
            Permission::WriteAcp => "WRITE_ACP",
            Permission::FullControl => "FULL_CONTROL",
            Permission::Unrecognized(code) => code.as_str(),
        }
    }

    /// Human-readable label used in the report. Unrecognized codes are shown as-is.
    pub fn label(&self) -> &str {
        match self {
            Permission::Read => "List",
            Permission::Write => "Upload/Delete",
            Permission::ReadAcp => "View Permissions",
            Permission::WriteAcp => "Edit permissions",
            Permission::FullControl => "Full Control",
            Permission::Unrecognized(code) => code.as_str(),
        }
    }
}

impl From<&str> for Permission {
    fn from(code: &str) -> Permission {
        Permission::from_code(code)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The two read-only calls the report needs from the storage service.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// List every bucket of the account, in provider order.
    async fn list_buckets(&self) -> Result<Vec<ListedBucket>, ProviderError>;

    /// Fetch the ACL grants of one bucket, in provider order.
    async fn bucket_acl(&self, bucket: &str) -> Result<Vec<Grant>, ProviderError>;
}
