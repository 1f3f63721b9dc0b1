use crate::{
    Error, Result,
    error::ApiError,
    model::{InferenceModel, ModelBundle, ModelIdentity, validate},
    resolve::{InputResolver, InputSpec, Manifest},
    workspace::{Workspace, WorkspaceManager},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub output: Value,
    pub model: ModelIdentity,
    pub timestamp: DateTime<Utc>,
    /// Seconds spent resolving, validating and running the model.
    pub processing_time: f64,
}

enum Submission {
    Inputs(Vec<InputSpec>),
    Manifest(Manifest),
}

/// Runs one prediction per call, each in its own workspace. Shared across
/// request handlers without locking.
pub struct PredictionPipeline {
    workspaces: WorkspaceManager,
    resolver: InputResolver,
    bundle: Arc<ModelBundle>,
    model: Arc<dyn InferenceModel>,
}

impl PredictionPipeline {
    pub fn new(
        workspaces: WorkspaceManager,
        resolver: InputResolver,
        bundle: Arc<ModelBundle>,
        model: Arc<dyn InferenceModel>,
    ) -> Self {
        Self {
            workspaces,
            resolver,
            bundle,
            model,
        }
    }

    pub async fn predict(
        &self,
        inputs: Vec<InputSpec>,
    ) -> std::result::Result<PredictionResult, ApiError> {
        self.execute(Submission::Inputs(inputs)).await
    }

    pub async fn predict_manifest(
        &self,
        manifest: Manifest,
    ) -> std::result::Result<PredictionResult, ApiError> {
        self.execute(Submission::Manifest(manifest)).await
    }

    async fn execute(
        &self,
        submission: Submission,
    ) -> std::result::Result<PredictionResult, ApiError> {
        let mut workspace = self.workspaces.acquire().await.map_err(|e| {
            error!("Failed to acquire workspace: {}", e);
            ApiError::from(e)
        })?;
        let request_id = workspace.id();

        let outcome = self.run(submission, &mut workspace).await;
        workspace.release().await;

        match outcome {
            Ok(result) => {
                info!(
                    "Prediction {} finished in {:.3}s",
                    request_id, result.processing_time
                );
                Ok(result)
            }
            Err(e) => {
                warn!("Prediction {} failed: {}", request_id, e);
                Err(ApiError::from(e))
            }
        }
    }

    async fn run(
        &self,
        submission: Submission,
        workspace: &mut Workspace,
    ) -> Result<PredictionResult> {
        let started = Instant::now();

        let resolved = match submission {
            Submission::Inputs(inputs) => self.resolver.resolve(inputs, workspace).await?,
            Submission::Manifest(manifest) => {
                self.resolver.resolve_manifest(manifest, workspace).await?
            }
        };

        validate(&resolved, self.bundle.schema())?;

        let output = self.model.infer(&resolved).await.map_err(|e| match e {
            Error::Inference(_) => e,
            other => Error::inference(other.to_string()),
        })?;

        Ok(PredictionResult {
            output,
            model: self.bundle.identity().clone(),
            timestamp: Utc::now(),
            processing_time: started.elapsed().as_secs_f64(),
        })
    }
}
