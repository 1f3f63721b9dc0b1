use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub logs: LogsConfig,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Where the contributed model lives and how to run it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_contrib_src")]
    pub contrib_src: PathBuf,
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
    #[serde(default = "default_samples_dir")]
    pub samples_dir: PathBuf,
    #[serde(default = "default_legal_file")]
    pub legal_file: PathBuf,
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    #[serde(default = "default_inference_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_workspace_root")]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

impl ModelConfig {
    /// Resolves a configured path against `contrib_src` unless it is already absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.contrib_src.join(path)
        }
    }

    pub fn model_path(&self) -> PathBuf {
        self.resolve(&self.model_dir)
    }

    pub fn samples_path(&self) -> PathBuf {
        self.resolve(&self.samples_dir)
    }

    pub fn legal_path(&self) -> PathBuf {
        self.resolve(&self.legal_file)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            logs: LogsConfig::default(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            contrib_src: default_contrib_src(),
            model_dir: default_model_dir(),
            samples_dir: default_samples_dir(),
            legal_file: default_legal_file(),
            command: default_command(),
            args: default_args(),
            timeout_secs: default_inference_timeout(),
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            max_redirects: default_max_redirects(),
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    80
}

fn default_max_upload_bytes() -> usize {
    512 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_contrib_src() -> PathBuf {
    PathBuf::from("/contrib_src")
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("model")
}

fn default_samples_dir() -> PathBuf {
    PathBuf::from("sample_data")
}

fn default_legal_file() -> PathBuf {
    PathBuf::from("legal.json")
}

fn default_command() -> String {
    "python3".to_string()
}

fn default_args() -> Vec<String> {
    vec!["inference.py".to_string()]
}

fn default_inference_timeout() -> u64 {
    300
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from("../working")
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_bytes() -> u64 {
    512 * 1024 * 1024
}
