//! Sequencing of a report run: list, fetch ACLs, aggregate, render.

use std::fmt;

use tracing::{debug, info};

use crate::aggregate::aggregate;
use crate::error::Error;
use crate::inventory::Inventory;
use crate::report::{ReportArtifact, Renderer};
use crate::storage::StorageProvider;

/// Where a run currently is. `Failed` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    FetchingList,
    FetchingAcl,
    Aggregating,
    Rendering,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::FetchingList => "fetching bucket list",
            Stage::FetchingAcl => "fetching bucket ACLs",
            Stage::Aggregating => "aggregating grants",
            Stage::Rendering => "rendering report",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub artifact: ReportArtifact,
    pub buckets: usize,
}

/// Runs the report once against a storage provider.
pub struct Pipeline<P> {
    provider: P,
    renderer: Renderer,
    stage: Stage,
    transitions: Vec<Stage>,
}

impl<P: StorageProvider> Pipeline<P> {
    pub fn new(provider: P, renderer: Renderer) -> Pipeline<P> {
        Pipeline {
            provider,
            renderer,
            stage: Stage::Idle,
            transitions: Vec::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Every stage entered so far, in order, excluding the initial `Idle`.
    pub fn transitions(&self) -> &[Stage] {
        &self.transitions
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    fn enter(&mut self, stage: Stage) {
        info!(from = %self.stage, to = %stage, "pipeline stage");
        self.stage = stage;
        self.transitions.push(stage);
    }

    /// Run every stage. The first failure moves the pipeline to
    /// [`Stage::Failed`] and is returned; nothing is retried.
    pub async fn run(&mut self) -> Result<RunSummary, Error> {
        if self.stage != Stage::Idle {
            return Err(Error::AlreadyRun);
        }

        match self.stages().await {
            Ok(summary) => {
                self.enter(Stage::Done);
                Ok(summary)
            }
            Err(err) => {
                debug!(stage = %self.stage, error = %err, "pipeline failed");
                self.enter(Stage::Failed);
                Err(err)
            }
        }
    }

    async fn stages(&mut self) -> Result<RunSummary, Error> {
        self.enter(Stage::FetchingList);
        let buckets = Inventory::new(&self.provider).list_buckets().await?;

        self.enter(Stage::FetchingAcl);
        let buckets = Inventory::new(&self.provider).attach_acl(buckets).await?;

        self.enter(Stage::Aggregating);
        let buckets = aggregate(buckets);

        self.enter(Stage::Rendering);
        let artifact = self.renderer.render(&buckets).await?;

        Ok(RunSummary {
            artifact,
            buckets: buckets.len(),
        })
    }
}
