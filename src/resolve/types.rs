use crate::{Error, Result};
use axum::body::Bytes;
use serde::Serialize;
use std::path::PathBuf;

/// Role used by single-input models.
pub const DEFAULT_ROLE: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    LocalUpload,
    RemoteUrl,
    BundledSample,
}

#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub data: Bytes,
}

#[derive(Debug, Clone)]
pub enum InputSource {
    LocalUpload(Upload),
    RemoteUrl(String),
    BundledSample(String),
}

impl InputSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::LocalUpload(_) => SourceKind::LocalUpload,
            Self::RemoteUrl(_) => SourceKind::RemoteUrl,
            Self::BundledSample(_) => SourceKind::BundledSample,
        }
    }

    /// Classifies a manifest locator: http(s) URLs are remote, anything else names a sample.
    pub fn from_locator(locator: &str) -> Result<Self> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(Error::invalid_manifest("empty locator"));
        }

        let lower = locator.to_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(Self::RemoteUrl(locator.to_string()))
        } else {
            Ok(Self::BundledSample(locator.to_string()))
        }
    }
}

/// One declared input of a prediction request.
#[derive(Debug, Clone)]
pub struct InputSpec {
    pub role: String,
    pub source: InputSource,
}

impl InputSpec {
    pub fn upload(role: impl Into<String>, file_name: impl Into<String>, data: Bytes) -> Result<Self> {
        let file_name = file_name.into();
        if file_name.trim().is_empty() {
            return Err(Error::not_found("uploaded file has no name"));
        }
        Ok(Self {
            role: role.into(),
            source: InputSource::LocalUpload(Upload { file_name, data }),
        })
    }

    pub fn remote(role: impl Into<String>, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(Error::download("no file url given"));
        }
        Ok(Self {
            role: role.into(),
            source: InputSource::RemoteUrl(url),
        })
    }

    pub fn sample(role: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::not_found("no sample file name given"));
        }
        Ok(Self {
            role: role.into(),
            source: InputSource::BundledSample(name),
        })
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source.kind()
    }
}

/// An input materialized as a local file.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedInput {
    pub role: String,
    pub path: PathBuf,
    pub extension: Option<String>,
    pub size: u64,
    pub origin: SourceKind,
}

impl ResolvedInput {
    pub fn extension_or_unknown(&self) -> &str {
        self.extension.as_deref().unwrap_or("(none)")
    }
}
