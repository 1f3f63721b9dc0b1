use super::schema::ModelSchema;
use crate::{Error, Result, config::ModelConfig, resolve::resolve_within};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const THUMBNAIL_CANDIDATES: [&str; 2] = ["thumbnail.jpg", "thumbnail.png"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelIdentity {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelIo {
    pub input: Value,
    #[serde(default)]
    pub output: Value,
}

#[derive(Debug, Deserialize)]
struct DescriptorFields {
    id: String,
    meta: MetaFields,
    model: ModelFields,
}

#[derive(Debug, Deserialize)]
struct MetaFields {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ModelFields {
    io: ModelIo,
}

/// Parsed `config.json` of a contributed model. The raw document is kept for
/// the config route; the fields the server relies on are checked up front.
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    identity: ModelIdentity,
    io: ModelIo,
    raw: Value,
}

impl ModelDescriptor {
    pub fn from_value(raw: Value) -> Result<Self> {
        let fields: DescriptorFields = serde_json::from_value(raw.clone())
            .map_err(|e| Error::config(format!("invalid model config.json: {}", e)))?;

        if fields.meta.name.trim().is_empty() {
            return Err(Error::config("model config.json has an empty meta.name"));
        }
        if fields.model.io.input.is_null() {
            return Err(Error::config("model config.json has no model.io.input"));
        }

        Ok(Self {
            identity: ModelIdentity {
                id: fields.id,
                name: fields.meta.name,
            },
            io: fields.model.io,
            raw,
        })
    }

    pub fn identity(&self) -> &ModelIdentity {
        &self.identity
    }

    pub fn io(&self) -> &ModelIo {
        &self.io
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// Read-only view of the contributed model directory, shared by all requests.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    descriptor: ModelDescriptor,
    schema: ModelSchema,
    model_dir: PathBuf,
    samples_dir: PathBuf,
    legal_path: PathBuf,
}

impl ModelBundle {
    pub async fn load(config: &ModelConfig) -> Result<Self> {
        let model_dir = config.model_path();
        let config_path = model_dir.join("config.json");

        debug!("Loading model config from: {}", config_path.display());

        let contents = tokio::fs::read(&config_path).await.map_err(|e| {
            Error::config(format!("cannot read {}: {}", config_path.display(), e))
        })?;
        let raw: Value = serde_json::from_slice(&contents)
            .map_err(|e| Error::config(format!("{} is not valid JSON: {}", config_path.display(), e)))?;

        let bundle = Self::new(
            ModelDescriptor::from_value(raw)?,
            model_dir,
            config.samples_path(),
            config.legal_path(),
        )?;

        info!(
            "Loaded model '{}' ({}) with inputs [{}]",
            bundle.identity().name,
            bundle.identity().id,
            bundle
                .schema
                .roles()
                .iter()
                .map(|r| r.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(bundle)
    }

    pub fn new(
        descriptor: ModelDescriptor,
        model_dir: impl Into<PathBuf>,
        samples_dir: impl Into<PathBuf>,
        legal_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let schema = ModelSchema::from_io(&descriptor.io().input)?;
        Ok(Self {
            descriptor,
            schema,
            model_dir: model_dir.into(),
            samples_dir: samples_dir.into(),
            legal_path: legal_path.into(),
        })
    }

    pub fn config(&self) -> &Value {
        self.descriptor.raw()
    }

    pub fn identity(&self) -> &ModelIdentity {
        self.descriptor.identity()
    }

    pub fn model_io(&self) -> &ModelIo {
        self.descriptor.io()
    }

    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn samples_dir(&self) -> &Path {
        &self.samples_dir
    }

    /// Base name of the downloadable bundle archive.
    pub fn archive_name(&self) -> String {
        format!("{}_model", self.identity().name.to_lowercase())
    }

    pub async fn legal(&self) -> Result<Value> {
        let contents = tokio::fs::read(&self.legal_path).await.map_err(|_| {
            Error::not_found(format!("legal file {} not found", self.legal_path.display()))
        })?;
        Ok(serde_json::from_slice(&contents)?)
    }

    /// Names of the bundled sample files, sorted.
    pub async fn sample_names(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.samples_dir).await.map_err(|e| {
            Error::not_found(format!(
                "sample directory {}: {}",
                self.samples_dir.display(),
                e
            ))
        })?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub async fn sample_file(&self, name: &str) -> Result<PathBuf> {
        reject_nested(name)?;
        resolve_within(&self.samples_dir, name).await
    }

    /// The thumbnail file name, preferring jpg over png.
    pub async fn thumbnail_name(&self) -> Result<&'static str> {
        for candidate in THUMBNAIL_CANDIDATES {
            if tokio::fs::metadata(self.model_dir.join(candidate))
                .await
                .is_ok_and(|m| m.is_file())
            {
                return Ok(candidate);
            }
        }
        Err(Error::not_found("model has no thumbnail.jpg or thumbnail.png"))
    }

    pub async fn thumbnail_file(&self, name: &str) -> Result<PathBuf> {
        reject_nested(name)?;
        if !THUMBNAIL_CANDIDATES.iter().any(|candidate| *candidate == name) {
            return Err(Error::not_found(format!("thumbnail '{}' does not exist", name)));
        }
        resolve_within(&self.model_dir, name).await
    }
}

fn reject_nested(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name == ".." || name == "." {
        return Err(Error::not_found(format!("file '{}' does not exist", name)));
    }
    Ok(())
}
