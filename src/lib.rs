//! Audit report of Amazon S3 bucket ACLs.
//!
//! A run lists every bucket of the account, fetches all bucket ACLs
//! concurrently, groups each bucket's grants by grantee with readable
//! permission labels, and writes the result to a Legal-size PDF:
//!
//! ```text
//!                 [logs-bucket]
//! alice :  List,Upload/Delete
//! Everyone :  List
//! -------------------------------------------
//! ```
//!
//! ```no_run
//! use s3_acl_report::{Client, Config, Pipeline, Renderer};
//!
//! # async fn run() -> Result<(), s3_acl_report::Error> {
//! let config = Config::from_env();
//! let client = Client::new(&config)?;
//! let mut pipeline = Pipeline::new(client, Renderer::from_config(&config));
//! let summary = pipeline.run().await?;
//! println!("{} buckets written to {}", summary.buckets, summary.artifact.path.display());
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub(crate) mod authorize;
pub mod config;
pub mod error;
pub mod inventory;
pub mod pipeline;
pub mod report;
pub mod storage;

pub use crate::aggregate::{aggregate, AggregatedGrant, EVERYONE};
pub use crate::config::{Config, Credentials};
pub use crate::error::{AuthError, Error, ProviderError, RenderError};
pub use crate::inventory::Inventory;
pub use crate::pipeline::{Pipeline, RunSummary, Stage};
pub use crate::report::{
    Alignment, DocumentInfo, DocumentWriter, EncodedDocument, PdfDocument, Renderer,
    ReportArtifact,
};
pub use crate::storage::{
    AggregatedBucket, Bucket, Client, Grant, ListedBucket, Permission, RawBucket, StorageProvider,
};
