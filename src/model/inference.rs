use crate::{Error, Result, config::ModelConfig, resolve::ResolvedInput};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// The model itself: takes resolved local inputs, returns its prediction as JSON.
#[async_trait]
pub trait InferenceModel: Send + Sync {
    async fn infer(&self, inputs: &[ResolvedInput]) -> Result<Value>;
}

/// Runs the contributed model as a subprocess.
///
/// Each input is passed as `--input <role>=<path>`; the process must print its
/// prediction as a single JSON document on stdout and exit with status 0.
pub struct CommandModel {
    command: String,
    args: Vec<String>,
    working_dir: PathBuf,
    timeout: Duration,
}

impl CommandModel {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            working_dir: config.contrib_src.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn build_command(&self, inputs: &[ResolvedInput]) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args);
        for input in inputs {
            cmd.arg("--input")
                .arg(format!("{}={}", input.role, input.path.display()));
        }
        cmd.current_dir(&self.working_dir);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl InferenceModel for CommandModel {
    async fn infer(&self, inputs: &[ResolvedInput]) -> Result<Value> {
        debug!(
            "Running model command {} with {} inputs",
            self.command,
            inputs.len()
        );

        let child = self.build_command(inputs).spawn().map_err(|e| {
            Error::inference(format!("Failed to spawn model process {}: {}", self.command, e))
        })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                Error::inference(format!(
                    "model did not finish within {} seconds",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| Error::inference(format!("Failed to wait for model process: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::inference(format!(
                "model exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::inference(format!("model output is not valid JSON: {}", e)))
    }
}
