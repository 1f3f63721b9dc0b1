mod manifest;
mod types;

pub use manifest::Manifest;
pub use types::*;

use crate::{
    Error, Result,
    fetch::{Fetcher, safe_join},
    media,
    workspace::Workspace,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// How many manifests may be followed from a request. A manifest entry that
/// turns out to be a manifest itself is rejected.
pub const MAX_MANIFEST_DEPTH: usize = 1;

/// `.json` inputs larger than this are treated as data, never as manifests.
const MAX_MANIFEST_BYTES: u64 = 1024 * 1024;

pub struct InputResolver {
    fetcher: Arc<dyn Fetcher>,
    samples_dir: PathBuf,
    expand_manifests: bool,
}

impl InputResolver {
    pub fn new(fetcher: Arc<dyn Fetcher>, samples_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            samples_dir: samples_dir.into(),
            expand_manifests: true,
        }
    }

    /// Whether `.json` inputs holding an object are expanded as manifests.
    /// Models taking a single input get JSON documents as plain data.
    pub fn with_manifests(mut self, enabled: bool) -> Self {
        self.expand_manifests = enabled;
        self
    }

    /// Materializes request inputs. A single input that is a manifest is
    /// expanded into its roles.
    pub async fn resolve(
        &self,
        inputs: Vec<InputSpec>,
        workspace: &mut Workspace,
    ) -> Result<Vec<ResolvedInput>> {
        self.resolve_at(inputs, workspace, 0).await
    }

    /// Materializes a manifest submitted directly by the client.
    pub async fn resolve_manifest(
        &self,
        manifest: Manifest,
        workspace: &mut Workspace,
    ) -> Result<Vec<ResolvedInput>> {
        self.resolve_at(manifest.into_specs(), workspace, 1).await
    }

    async fn resolve_at(
        &self,
        inputs: Vec<InputSpec>,
        workspace: &mut Workspace,
        depth: usize,
    ) -> Result<Vec<ResolvedInput>> {
        let mut pending: VecDeque<(InputSpec, usize)> =
            inputs.into_iter().map(|spec| (spec, depth)).collect();
        let mut resolved = Vec::with_capacity(pending.len());

        while let Some((spec, depth)) = pending.pop_front() {
            let role = spec.role.clone();
            let input = self
                .materialize(spec, workspace)
                .await
                .map_err(|e| e.in_role(&role))?;

            let manifest = if self.expand_manifests {
                read_manifest(&input).await.map_err(|e| e.in_role(&role))?
            } else {
                None
            };

            match manifest {
                None => {
                    debug!(
                        "Resolved input '{}' to {} ({} bytes)",
                        role,
                        input.path.display(),
                        input.size
                    );
                    resolved.push(input);
                }
                Some(manifest) if depth < MAX_MANIFEST_DEPTH => {
                    debug!(
                        "Input '{}' is a manifest with {} roles",
                        role,
                        manifest.len()
                    );
                    for spec in manifest.into_specs().into_iter().rev() {
                        pending.push_front((spec, depth + 1));
                    }
                }
                Some(_) => {
                    return Err(Error::invalid_manifest(format!(
                        "input '{}' is itself a manifest; nested manifests are not supported",
                        role
                    )));
                }
            }
        }

        Ok(resolved)
    }

    async fn materialize(&self, spec: InputSpec, workspace: &mut Workspace) -> Result<ResolvedInput> {
        let InputSpec { role, source } = spec;
        let origin = source.kind();

        let path = match source {
            InputSource::LocalUpload(upload) => {
                let slot = workspace.next_slot().await?;
                let target = safe_join(&slot, upload_base_name(&upload.file_name)).map_err(|_| {
                    Error::unsupported_file_type(format!(
                        "invalid upload file name '{}'",
                        upload.file_name
                    ))
                })?;
                tokio::fs::write(&target, &upload.data).await?;
                workspace.track(&target);
                target
            }
            InputSource::RemoteUrl(url) => {
                let slot = workspace.next_slot().await?;
                let target = self.fetcher.fetch(&url, &slot).await?;
                workspace.track(&target);
                target
            }
            InputSource::BundledSample(name) => resolve_within(&self.samples_dir, &name).await?,
        };

        let size = tokio::fs::metadata(&path).await?.len();

        Ok(ResolvedInput {
            role,
            extension: media::detect_extension(&path),
            path,
            size,
            origin,
        })
    }
}

/// Browsers may send a full client-side path as the upload name.
fn upload_base_name(file_name: &str) -> &str {
    file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
}

async fn read_manifest(input: &ResolvedInput) -> Result<Option<Manifest>> {
    if input.extension.as_deref() != Some(".json") || input.size > MAX_MANIFEST_BYTES {
        return Ok(None);
    }

    let bytes = tokio::fs::read(&input.path).await?;
    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|e| Error::invalid_manifest(format!("malformed JSON: {}", e)))?;

    match value {
        Value::Object(_) => Manifest::from_value(value).map(Some),
        _ => Ok(None),
    }
}

/// Resolves `name` to an existing file inside `root`. Absolute names are
/// accepted only when they already point inside `root`.
pub async fn resolve_within(root: &Path, name: &str) -> Result<PathBuf> {
    let root = tokio::fs::canonicalize(root)
        .await
        .map_err(|e| Error::not_found(format!("directory {}: {}", root.display(), e)))?;

    let candidate = Path::new(name);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };

    let path = tokio::fs::canonicalize(&joined)
        .await
        .map_err(|_| Error::not_found(format!("file '{}' does not exist", name)))?;

    if !path.starts_with(&root) || !path.is_file() {
        return Err(Error::not_found(format!("file '{}' does not exist", name)));
    }

    Ok(path)
}
