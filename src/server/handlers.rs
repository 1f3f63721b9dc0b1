use super::types::{HealthResponse, PredictSampleQuery, PredictUrlQuery, ThumbnailResponse};
use crate::{
    Error, Result,
    archive::{ArchiveBuilder, ArchiveReader},
    config::Config,
    error::{ApiError, ErrorKind},
    fetch::Fetcher,
    media,
    model::{InferenceModel, ModelBundle, ModelIo},
    pipeline::{PredictionPipeline, PredictionResult},
    resolve::{DEFAULT_ROLE, InputResolver, InputSpec, Manifest},
    workspace::WorkspaceManager,
};
use axum::{
    body::{Body, Bytes},
    extract::{Host, Multipart, OriginalUri, Path, Query, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Json, Response},
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub bundle: Arc<ModelBundle>,
    pub pipeline: Arc<PredictionPipeline>,
    pub workspaces: WorkspaceManager,
    pub archiver: ArchiveBuilder,
    pub upload_limit: usize,
}

impl AppState {
    pub async fn new(
        config: &Config,
        model: Arc<dyn InferenceModel>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self> {
        let bundle = Arc::new(ModelBundle::load(&config.model).await?);
        let workspaces = WorkspaceManager::new(&config.workspace.root);
        let resolver = InputResolver::new(fetcher, bundle.samples_dir())
            .with_manifests(bundle.schema().is_multi_input());
        let pipeline =
            PredictionPipeline::new(workspaces.clone(), resolver, bundle.clone(), model);

        Ok(Self {
            bundle,
            pipeline: Arc::new(pipeline),
            workspaces,
            archiver: ArchiveBuilder::new(),
            upload_limit: config.server.max_upload_bytes,
        })
    }
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn get_config(State(state): State<AppState>) -> Json<Value> {
    Json(state.bundle.config().clone())
}

pub async fn get_legal(State(state): State<AppState>) -> std::result::Result<Json<Value>, ApiError> {
    Ok(Json(state.bundle.legal().await?))
}

pub async fn get_model_io(State(state): State<AppState>) -> Json<ModelIo> {
    Json(state.bundle.model_io().clone())
}

pub async fn get_samples(
    State(state): State<AppState>,
    Host(host): Host,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> std::result::Result<Json<Vec<String>>, ApiError> {
    let base = base_url(&headers, &host, uri.path(), "get_samples");
    let samples = state
        .bundle
        .sample_names()
        .await?
        .into_iter()
        .map(|name| format!("{}samples/{}", base, name))
        .collect();
    Ok(Json(samples))
}

pub async fn sample_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> std::result::Result<Response, ApiError> {
    let path = state.bundle.sample_file(&name).await?;
    file_response(path).await
}

pub async fn get_thumbnail(
    State(state): State<AppState>,
    Host(host): Host,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> std::result::Result<Json<ThumbnailResponse>, ApiError> {
    let name = state.bundle.thumbnail_name().await?;
    let base = base_url(&headers, &host, uri.path(), "get_thumbnail");
    Ok(Json(ThumbnailResponse {
        thumbnail: format!("{}thumbnail/{}", base, name),
    }))
}

pub async fn thumbnail_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> std::result::Result<Response, ApiError> {
    let path = state.bundle.thumbnail_file(&name).await?;
    file_response(path).await
}

pub async fn get_model_files(
    State(state): State<AppState>,
) -> std::result::Result<Response, ApiError> {
    let archive_name = state.bundle.archive_name();
    let mut workspace = state.workspaces.acquire().await?;

    let path = match state
        .archiver
        .build_archive(state.bundle.model_dir(), &mut workspace, &archive_name)
        .await
    {
        Ok(path) => path,
        Err(e) => {
            workspace.release().await;
            error!("Failed to package model files: {}", e);
            return Err(e.into());
        }
    };

    // the reader owns the workspace, which goes away with the response body
    let reader = ArchiveReader::open(&path, workspace).await.map_err(|e| {
        error!("Failed to open {}: {}", path.display(), e);
        ApiError::from(e)
    })?;

    info!("Streaming {}.zip ({} bytes)", archive_name, reader.len());

    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (header::CONTENT_LENGTH, reader.len().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.zip\"", archive_name),
        ),
    ];
    Ok((headers, Body::from_stream(ReaderStream::new(reader))).into_response())
}

pub async fn predict_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> std::result::Result<Json<PredictionResult>, ApiError> {
    let mut inputs = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let role = match field.name() {
            None | Some("file") => DEFAULT_ROLE.to_string(),
            Some(name) => name.to_string(),
        };
        let data = field.bytes().await.map_err(multipart_error)?;
        inputs.push(InputSpec::upload(role, file_name, data)?);
    }

    if inputs.is_empty() {
        return Err(ApiError::new(ErrorKind::NotFound, "no file was uploaded"));
    }

    info!("Received prediction upload with {} files", inputs.len());
    Ok(Json(state.pipeline.predict(inputs).await?))
}

pub async fn predict_url(
    State(state): State<AppState>,
    Query(query): Query<PredictUrlQuery>,
) -> std::result::Result<Json<PredictionResult>, ApiError> {
    let url = query
        .fileurl
        .ok_or_else(|| ApiError::new(ErrorKind::Download, "missing 'fileurl' parameter"))?;

    info!("Received prediction request for url: {}", url);
    let spec = InputSpec::remote(DEFAULT_ROLE, url)?;
    Ok(Json(state.pipeline.predict(vec![spec]).await?))
}

pub async fn predict_manifest(
    State(state): State<AppState>,
    body: Bytes,
) -> std::result::Result<Json<PredictionResult>, ApiError> {
    let manifest = Manifest::from_slice(&body)?;

    info!(
        "Received prediction manifest with roles [{}]",
        manifest.roles().collect::<Vec<_>>().join(", ")
    );
    Ok(Json(state.pipeline.predict_manifest(manifest).await?))
}

pub async fn predict_sample(
    State(state): State<AppState>,
    Query(query): Query<PredictSampleQuery>,
) -> std::result::Result<Json<PredictionResult>, ApiError> {
    let filename = query
        .filename
        .ok_or_else(|| ApiError::new(ErrorKind::NotFound, "missing 'filename' parameter"))?;

    info!("Received prediction request for sample: {}", filename);
    let spec = InputSpec::sample(DEFAULT_ROLE, filename)?;
    Ok(Json(state.pipeline.predict(vec![spec]).await?))
}

/// URL of the API root as seen by the client, ending in `/`.
fn base_url(headers: &HeaderMap, host: &str, path: &str, route: &str) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("http");
    let prefix = path.strip_suffix(route).unwrap_or(path);
    format!("{}://{}{}", scheme, host, prefix)
}

async fn file_response(path: PathBuf) -> std::result::Result<Response, ApiError> {
    let bytes = tokio::fs::read(&path).await.map_err(Error::from)?;
    let content_type = media::content_type_for(&path);
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::new(
        ErrorKind::Internal,
        format!("invalid multipart body: {}", e),
    )
}
