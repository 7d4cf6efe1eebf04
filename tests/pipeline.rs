use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use s3_acl_report::{
    Config, Credentials, Error, Grant, ListedBucket, Pipeline, ProviderError, Renderer, Stage,
    StorageProvider,
};
use tempfile::TempDir;
use tracing_subscriber::fmt::MakeWriter;

const SEPARATOR_OP: &str = "(-------------------------------------------) Tj";

/// In-memory provider with per-bucket grants, delays and failures.
#[derive(Default)]
struct FakeProvider {
    buckets: Vec<String>,
    grants: HashMap<String, Vec<Grant>>,
    delays: HashMap<String, u64>,
    failing_acl: Option<String>,
    failing_list: bool,
    list_calls: AtomicUsize,
    acl_calls: AtomicUsize,
}

impl FakeProvider {
    fn bucket(mut self, name: &str, grants: Vec<Grant>) -> FakeProvider {
        self.buckets.push(name.to_string());
        self.grants.insert(name.to_string(), grants);
        self
    }

    fn delay(mut self, name: &str, millis: u64) -> FakeProvider {
        self.delays.insert(name.to_string(), millis);
        self
    }

    fn access_denied() -> ProviderError {
        ProviderError::Service {
            status: 403,
            code: "AccessDenied".to_string(),
            message: "Access Denied".to_string(),
        }
    }
}

#[async_trait]
impl StorageProvider for FakeProvider {
    async fn list_buckets(&self) -> Result<Vec<ListedBucket>, ProviderError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_list {
            return Err(FakeProvider::access_denied());
        }
        Ok(self
            .buckets
            .iter()
            .map(|name| ListedBucket::new(name.as_str(), Utc::now()))
            .collect())
    }

    async fn bucket_acl(&self, bucket: &str) -> Result<Vec<Grant>, ProviderError> {
        self.acl_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(millis) = self.delays.get(bucket) {
            tokio::time::sleep(Duration::from_millis(*millis)).await;
        }
        if self.failing_acl.as_deref() == Some(bucket) {
            return Err(FakeProvider::access_denied());
        }
        Ok(self.grants.get(bucket).cloned().unwrap_or_default())
    }
}

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn pipeline(provider: FakeProvider, path: &Path) -> Pipeline<FakeProvider> {
    let config = Config::new("eu-west-1", Credentials::default()).with_output_path(path);
    Pipeline::new(provider, Renderer::from_config(&config))
}

fn output(dir: &TempDir) -> PathBuf {
    dir.path().join("s3ACL.pdf")
}

fn report_text(path: &Path) -> String {
    String::from_utf8_lossy(&std::fs::read(path).unwrap()).into_owned()
}

#[tokio::test]
async fn single_bucket_with_one_grantee() {
    let dir = tempfile::tempdir().unwrap();
    let provider = FakeProvider::default().bucket(
        "logs-bucket",
        vec![
            Grant::new(Some("alice"), "READ"),
            Grant::new(Some("alice"), "WRITE"),
        ],
    );
    let mut pipeline = pipeline(provider, &output(&dir));

    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.buckets, 1);
    assert_eq!(summary.artifact.path, output(&dir));
    assert_eq!(summary.artifact.pages, 1);
    let text = report_text(&output(&dir));
    let header = text.find("([logs-bucket]) Tj").unwrap();
    let line = text.find("(alice :  List,Upload/Delete) Tj").unwrap();
    let separator = text.find(SEPARATOR_OP).unwrap();
    assert!(header < line && line < separator);
    assert_eq!(pipeline.stage(), Stage::Done);
}

#[tokio::test]
async fn public_grant_is_reported_as_everyone() {
    let dir = tempfile::tempdir().unwrap();
    let provider =
        FakeProvider::default().bucket("public", vec![Grant::new(None, "FULL_CONTROL")]);
    let mut pipeline = pipeline(provider, &output(&dir));

    pipeline.run().await.unwrap();

    assert!(report_text(&output(&dir)).contains("(Everyone :  Full Control) Tj"));
}

#[tokio::test]
async fn non_latin_grantees_stay_distinct() {
    let dir = tempfile::tempdir().unwrap();
    let provider = FakeProvider::default().bucket(
        "team",
        vec![
            Grant::new(Some("田中"), "READ"),
            Grant::new(Some("Юлия"), "READ"),
        ],
    );
    let mut pipeline = pipeline(provider, &output(&dir));

    pipeline.run().await.unwrap();

    let text = report_text(&output(&dir));
    let tanaka = text.find("<75304E2D> Tj /F1 12 Tf ( :  List) Tj").unwrap();
    let yulia = text.find("<042E043B0438044F> Tj /F1 12 Tf ( :  List) Tj").unwrap();
    assert!(tanaka < yulia);
}

#[tokio::test]
async fn failures_are_not_logged_at_warn() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(logs.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let dir = tempfile::tempdir().unwrap();
    let provider = FakeProvider {
        failing_list: true,
        ..FakeProvider::default()
    };
    let mut pipeline = pipeline(provider, &output(&dir));

    assert!(pipeline.run().await.is_err());

    assert!(logs.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn stages_run_in_order_and_aggregation_once() {
    let dir = tempfile::tempdir().unwrap();
    let provider = FakeProvider::default()
        .bucket("a", vec![Grant::new(Some("alice"), "READ")])
        .bucket("b", vec![Grant::new(None, "READ")]);
    let mut pipeline = pipeline(provider, &output(&dir));

    pipeline.run().await.unwrap();

    assert_eq!(
        pipeline.transitions(),
        [
            Stage::FetchingList,
            Stage::FetchingAcl,
            Stage::Aggregating,
            Stage::Rendering,
            Stage::Done,
        ]
    );
    let aggregations = pipeline
        .transitions()
        .iter()
        .filter(|stage| **stage == Stage::Aggregating)
        .count();
    assert_eq!(aggregations, 1);
    assert_eq!(pipeline.provider().list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(pipeline.provider().acl_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn report_follows_listing_order_not_completion_order() {
    let dir = tempfile::tempdir().unwrap();
    let provider = FakeProvider::default()
        .bucket("first", vec![Grant::new(Some("alice"), "READ")])
        .bucket("second", vec![Grant::new(Some("bob"), "READ")])
        .bucket("third", vec![Grant::new(Some("carol"), "READ")])
        .delay("first", 60)
        .delay("second", 30);
    let mut pipeline = pipeline(provider, &output(&dir));

    pipeline.run().await.unwrap();

    let text = report_text(&output(&dir));
    let positions: Vec<usize> = ["([first]) Tj", "([second]) Tj", "([third]) Tj"]
        .iter()
        .map(|op| text.find(op).unwrap())
        .collect();
    assert!(positions[0] < positions[1] && positions[1] < positions[2]);
}

#[tokio::test]
async fn listing_failure_stops_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let provider = FakeProvider {
        failing_list: true,
        ..FakeProvider::default()
    }
    .bucket("logs-bucket", vec![Grant::new(Some("alice"), "READ")]);
    let mut pipeline = pipeline(provider, &output(&dir));

    let err = pipeline.run().await.unwrap_err();

    assert!(matches!(
        err,
        Error::Provider(ProviderError::Service { status: 403, .. })
    ));
    assert_eq!(pipeline.stage(), Stage::Failed);
    assert_eq!(pipeline.transitions(), [Stage::FetchingList, Stage::Failed]);
    assert_eq!(pipeline.provider().acl_calls.load(Ordering::SeqCst), 0);
    assert!(!output(&dir).exists());
}

#[tokio::test]
async fn listing_failure_leaves_previous_report_untouched() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(output(&dir), b"previous report").unwrap();
    let provider = FakeProvider {
        failing_list: true,
        ..FakeProvider::default()
    };
    let mut pipeline = pipeline(provider, &output(&dir));

    assert!(pipeline.run().await.is_err());

    assert_eq!(std::fs::read(output(&dir)).unwrap(), b"previous report");
}

#[tokio::test]
async fn one_failed_acl_fetch_fails_the_whole_run() {
    let dir = tempfile::tempdir().unwrap();
    let provider = FakeProvider {
        failing_acl: Some("second".to_string()),
        ..FakeProvider::default()
    }
    .bucket("first", vec![Grant::new(Some("alice"), "READ")])
    .bucket("second", vec![Grant::new(Some("bob"), "READ")])
    .bucket("third", vec![Grant::new(Some("carol"), "READ")])
    .delay("first", 20);
    let mut pipeline = pipeline(provider, &output(&dir));

    let err = pipeline.run().await.unwrap_err();

    match err {
        Error::Provider(ProviderError::BucketAcl { bucket, .. }) => assert_eq!(bucket, "second"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(
        pipeline.transitions(),
        [Stage::FetchingList, Stage::FetchingAcl, Stage::Failed]
    );
    assert_eq!(pipeline.provider().acl_calls.load(Ordering::SeqCst), 3);
    assert!(!output(&dir).exists());
}

#[tokio::test]
async fn unwritable_output_fails_in_rendering() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-such-dir").join("s3ACL.pdf");
    let provider = FakeProvider::default().bucket("a", Vec::new());
    let mut pipeline = pipeline(provider, &path);

    let err = pipeline.run().await.unwrap_err();

    assert!(matches!(err, Error::Render(_)));
    assert_eq!(
        pipeline.transitions(),
        [
            Stage::FetchingList,
            Stage::FetchingAcl,
            Stage::Aggregating,
            Stage::Rendering,
            Stage::Failed,
        ]
    );
}

#[tokio::test]
async fn empty_account_renders_an_empty_report() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = pipeline(FakeProvider::default(), &output(&dir));

    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.buckets, 0);
    assert_eq!(summary.artifact.pages, 1);
    assert!(report_text(&output(&dir)).starts_with("%PDF-1.4"));
}

#[tokio::test]
async fn a_pipeline_runs_only_once() {
    let dir = tempfile::tempdir().unwrap();
    let provider = FakeProvider::default().bucket("a", Vec::new());
    let mut pipeline = pipeline(provider, &output(&dir));

    pipeline.run().await.unwrap();
    let err = pipeline.run().await.unwrap_err();

    assert!(matches!(err, Error::AlreadyRun));
    assert_eq!(pipeline.stage(), Stage::Done);
    assert_eq!(pipeline.provider().list_calls.load(Ordering::SeqCst), 1);
}
