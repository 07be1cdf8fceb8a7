//! Loading pipelines from the backend and deploying edits back

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use trellis_core::{DeploySnapshot, PipelineEditor};

use crate::api::{ApiError, PipelineApi};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no pipeline is open")]
    NoPipeline,

    #[error("could not load pipeline {pipeline}: {error}")]
    Fetch {
        pipeline: String,
        #[source]
        error: ApiError,
    },

    #[error("deploy of pipeline {pipeline} failed: {error}")]
    Deploy {
        pipeline: String,
        #[source]
        error: ApiError,
    },
}

/// Summary of a finished deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployReport {
    pub pipeline_id: String,
    pub nodes: usize,
    pub edges: usize,
    /// Change entries the deploy accounted for
    pub applied: usize,
    /// Entries recorded while the deploy was in flight
    pub still_pending: usize,
    pub refetched: bool,
}

/// Moves graphs between a [`PipelineEditor`] and the backend.
pub struct Syncer {
    api: Arc<dyn PipelineApi>,
    refetch_after_deploy: bool,
}

impl Syncer {
    pub fn new(api: Arc<dyn PipelineApi>) -> Self {
        Self {
            api,
            refetch_after_deploy: false,
        }
    }

    pub fn with_refetch(mut self, refetch: bool) -> Self {
        self.refetch_after_deploy = refetch;
        self
    }

    pub fn api(&self) -> &Arc<dyn PipelineApi> {
        &self.api
    }

    /// Fetch `pipeline_id` and make it the editor's baseline.
    pub async fn open(&self, editor: &mut PipelineEditor, pipeline_id: &str) -> Result<(), SyncError> {
        let graph = self.fetch(pipeline_id).await?;
        editor.hydrate(graph);

        let mut meta = editor.meta().clone();
        meta.pipeline_id = Some(pipeline_id.to_string());
        editor.set_meta(meta);
        Ok(())
    }

    /// Deploy the pipeline recorded in the editor's session.
    pub async fn deploy_current(&self, editor: &mut PipelineEditor) -> Result<DeployReport, SyncError> {
        let pipeline_id = editor.meta().pipeline_id.clone().ok_or(SyncError::NoPipeline)?;
        self.deploy(editor, &pipeline_id).await
    }

    /// Send the whole graph to the backend. On success the change log is
    /// cleared of everything the payload covered; on failure it is kept.
    pub async fn deploy(&self, editor: &mut PipelineEditor, pipeline_id: &str) -> Result<DeployReport, SyncError> {
        let snapshot = editor.begin_deploy();
        let result = self.api.replace_graph(pipeline_id, &snapshot.payload).await;
        let report = settle(editor, pipeline_id, snapshot, result)?;

        if self.should_refetch(&report, editor) {
            return Ok(self.refetch_into(editor, report).await);
        }
        Ok(report)
    }

    /// Like [`deploy`](Self::deploy) for an editor shared between tasks.
    /// The lock is not held while the request is outstanding, so other
    /// tasks can keep editing.
    pub async fn deploy_shared(
        &self,
        editor: &RwLock<PipelineEditor>,
        pipeline_id: &str,
    ) -> Result<DeployReport, SyncError> {
        let snapshot = editor.write().await.begin_deploy();
        let result = self.api.replace_graph(pipeline_id, &snapshot.payload).await;
        let (report, refetch) = {
            let mut guard = editor.write().await;
            let report = settle(&mut guard, pipeline_id, snapshot, result)?;
            let refetch = self.should_refetch(&report, &guard);
            (report, refetch)
        };
        if !refetch {
            return Ok(report);
        }

        let graph = match self.api.fetch_graph(pipeline_id).await {
            Ok(graph) => graph,
            Err(e) => {
                warn!("Deploy succeeded but refetch of {} failed: {}", pipeline_id, e);
                return Ok(report);
            }
        };
        let mut guard = editor.write().await;
        if guard.has_pending_changes() || guard.deploy_in_flight() {
            info!("Skipping refetch of {}: edits arrived meanwhile", pipeline_id);
            return Ok(report);
        }
        guard.hydrate(graph);
        Ok(DeployReport {
            refetched: true,
            ..report
        })
    }

    async fn fetch(&self, pipeline_id: &str) -> Result<trellis_core::WireGraph, SyncError> {
        self.api
            .fetch_graph(pipeline_id)
            .await
            .map_err(|error| SyncError::Fetch {
                pipeline: pipeline_id.to_string(),
                error,
            })
    }

    /// Refetching replaces the store, so only do it when nothing local
    /// would be lost: no pending entries and no other deploy outstanding.
    fn should_refetch(&self, report: &DeployReport, editor: &PipelineEditor) -> bool {
        self.refetch_after_deploy && report.still_pending == 0 && !editor.deploy_in_flight()
    }

    async fn refetch_into(&self, editor: &mut PipelineEditor, report: DeployReport) -> DeployReport {
        match self.api.fetch_graph(&report.pipeline_id).await {
            Ok(graph) => {
                editor.hydrate(graph);
                DeployReport {
                    refetched: true,
                    ..report
                }
            }
            Err(e) => {
                warn!(
                    "Deploy succeeded but refetch of {} failed: {}",
                    report.pipeline_id, e
                );
                report
            }
        }
    }
}

fn settle(
    editor: &mut PipelineEditor,
    pipeline_id: &str,
    snapshot: DeploySnapshot,
    result: Result<(), ApiError>,
) -> Result<DeployReport, SyncError> {
    let nodes = snapshot.payload.nodes.len();
    let edges = snapshot.payload.edges.len();
    let applied = snapshot.pending;

    match result {
        Ok(()) => {
            let still_pending = editor.finish_deploy(snapshot, true);
            info!(
                "Deployed {} ({} nodes, {} edges)",
                pipeline_id, nodes, edges
            );
            Ok(DeployReport {
                pipeline_id: pipeline_id.to_string(),
                nodes,
                edges,
                applied,
                still_pending,
                refetched: false,
            })
        }
        Err(error) => {
            editor.finish_deploy(snapshot, false);
            error!("Deploy of {} failed: {}", pipeline_id, error);
            Err(SyncError::Deploy {
                pipeline: pipeline_id.to_string(),
                error,
            })
        }
    }
}
