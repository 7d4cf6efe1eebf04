//! Report layout and the artifact it is written to.

pub mod pdf;

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::aggregate::AggregatedGrant;
use crate::config::Config;
use crate::error::RenderError;
use crate::storage::AggregatedBucket;

pub use self::pdf::PdfDocument;

/// Closes every bucket section.
pub const SEPARATOR: &str = "-------------------------------------------";

/// Horizontal placement of a line of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
}

/// Metadata set once, when the document is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub title: String,
    pub author: String,
}

/// A finished, encoded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedDocument {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

/// A rich-text document that accepts lines of text and flows them onto pages.
pub trait DocumentWriter {
    fn text(&mut self, text: &str, alignment: Alignment);

    /// Serialise everything written so far.
    fn finish(self) -> EncodedDocument;
}

/// What was written, handed back once the file is flushed to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub path: PathBuf,
    pub pages: usize,
    pub bytes: usize,
}

pub fn bucket_header(name: &str) -> String {
    format!("[{}]", name)
}

pub fn grantee_line(grant: &AggregatedGrant) -> String {
    format!("{} :  {}", grant.display_name, grant.permissions.join(","))
}

/// Lay out one section per bucket, in the given order.
pub fn write_report<W: DocumentWriter + ?Sized>(writer: &mut W, buckets: &[AggregatedBucket]) {
    for bucket in buckets {
        writer.text(&bucket_header(&bucket.name), Alignment::Center);
        for grant in &bucket.permissions {
            writer.text(&grantee_line(grant), Alignment::Left);
        }
        writer.text(SEPARATOR, Alignment::Left);
    }
}

/// Writes the report to a single file.
#[derive(Debug, Clone)]
pub struct Renderer {
    path: PathBuf,
    info: DocumentInfo,
}

impl Renderer {
    pub fn new(path: impl Into<PathBuf>, info: DocumentInfo) -> Renderer {
        Renderer {
            path: path.into(),
            info,
        }
    }

    pub fn from_config(config: &Config) -> Renderer {
        Renderer::new(
            config.output_path.clone(),
            DocumentInfo {
                title: config.title.clone(),
                author: config.author.clone(),
            },
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render the buckets as a Legal-size PDF.
    pub async fn render(&self, buckets: &[AggregatedBucket]) -> Result<ReportArtifact, RenderError> {
        self.render_with(buckets, PdfDocument::new(self.info.clone()))
            .await
    }

    /// Render the buckets with any document writer.
    ///
    /// Returns only after the file has been synced to disk. A failure after
    /// the file was opened can leave a truncated file behind.
    pub async fn render_with<W: DocumentWriter>(
        &self,
        buckets: &[AggregatedBucket],
        mut writer: W,
    ) -> Result<ReportArtifact, RenderError> {
        let mut file = File::create(&self.path)
            .await
            .map_err(|source| RenderError::Open {
                path: self.path.clone(),
                source,
            })?;

        write_report(&mut writer, buckets);
        let document = writer.finish();

        file.write_all(&document.bytes)
            .await
            .map_err(|source| RenderError::Write {
                path: self.path.clone(),
                source,
            })?;
        let finalize = |source: std::io::Error| RenderError::Finalize {
            path: self.path.clone(),
            source,
        };
        file.flush().await.map_err(finalize)?;
        file.sync_all().await.map_err(finalize)?;

        info!(
            path = %self.path.display(),
            pages = document.pages,
            bytes = document.bytes.len(),
            "report written"
        );
        Ok(ReportArtifact {
            path: self.path.clone(),
            pages: document.pages,
            bytes: document.bytes.len(),
        })
    }
}
