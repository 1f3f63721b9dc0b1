use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("{0}")]
    UnsupportedFileType(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Address parse error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn download(msg: impl Into<String>) -> Self {
        Self::Download(msg.into())
    }

    pub fn invalid_manifest(msg: impl Into<String>) -> Self {
        Self::InvalidManifest(msg.into())
    }

    pub fn unsupported_file_type(msg: impl Into<String>) -> Self {
        Self::UnsupportedFileType(msg.into())
    }

    pub fn schema_mismatch(msg: impl Into<String>) -> Self {
        Self::SchemaMismatch(msg.into())
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Download(_) | Self::Network(_) => ErrorKind::Download,
            Self::InvalidManifest(_) => ErrorKind::InvalidManifest,
            Self::UnsupportedFileType(_) => ErrorKind::UnsupportedFileType,
            Self::SchemaMismatch(_) => ErrorKind::SchemaMismatch,
            Self::Inference(_) => ErrorKind::Inference,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Config(_)
            | Self::Archive(_)
            | Self::Serialization(_)
            | Self::Yaml(_)
            | Self::Io(_)
            | Self::AddrParse(_)
            | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Prefixes the message with the input role that failed, keeping the error kind.
    pub fn in_role(self, role: &str) -> Self {
        let label = |msg: String| format!("input '{}': {}", role, msg);
        match self {
            Self::Download(msg) => Self::Download(label(msg)),
            Self::InvalidManifest(msg) => Self::InvalidManifest(label(msg)),
            Self::UnsupportedFileType(msg) => Self::UnsupportedFileType(label(msg)),
            Self::SchemaMismatch(msg) => Self::SchemaMismatch(label(msg)),
            Self::NotFound(msg) => Self::NotFound(label(msg)),
            Self::Network(e) => Self::Download(label(e.to_string())),
            other => Self::Internal(label(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Download,
    InvalidManifest,
    UnsupportedFileType,
    SchemaMismatch,
    Inference,
    NotFound,
    Internal,
}

impl ErrorKind {
    /// Every kind is reported as a client error for now.
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::Download
            | Self::InvalidManifest
            | Self::UnsupportedFileType
            | Self::SchemaMismatch
            | Self::Inference
            | Self::NotFound
            | Self::Internal => StatusCode::BAD_REQUEST,
        }
    }
}

/// Error body returned by every REST route.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub kind: ErrorKind,
    #[serde(rename = "error")]
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self::new(error.kind(), error.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.kind.status_code(), Json(self)).into_response()
    }
}
