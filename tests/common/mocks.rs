use async_trait::async_trait;
use modelhub_server::{Error, Result, model::InferenceModel, resolve::ResolvedInput};
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the mock model saw for one input.
#[derive(Debug, Clone)]
pub struct ObservedInput {
    pub role: String,
    pub path: PathBuf,
    pub content: Vec<u8>,
    /// Files next to the input at inference time.
    pub siblings: Vec<String>,
}

/// Mock inference model that echoes its inputs back.
#[derive(Debug, Default)]
pub struct MockModel {
    pub calls: Arc<Mutex<Vec<Vec<ObservedInput>>>>,
    pub error: Option<String>,
    pub delay: Option<Duration>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Vec<ObservedInput>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceModel for MockModel {
    async fn infer(&self, inputs: &[ResolvedInput]) -> Result<Value> {
        let mut observed = Vec::new();
        for input in inputs {
            let content = tokio::fs::read(&input.path).await?;
            let mut siblings = Vec::new();
            if let Some(parent) = input.path.parent() {
                let mut entries = tokio::fs::read_dir(parent).await?;
                while let Some(entry) = entries.next_entry().await? {
                    siblings.push(entry.file_name().to_string_lossy().to_string());
                }
            }
            observed.push(ObservedInput {
                role: input.role.clone(),
                path: input.path.clone(),
                content,
                siblings,
            });
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut echoed = Map::new();
        for input in &observed {
            echoed.insert(
                input.role.clone(),
                Value::String(String::from_utf8_lossy(&input.content).to_string()),
            );
        }
        self.calls.lock().unwrap().push(observed);

        if let Some(ref error) = self.error {
            return Err(Error::inference(error.clone()));
        }

        Ok(json!({
            "prediction": [
                {"label": "class_0", "probability": 0.3},
                {"label": "class_1", "probability": 0.7}
            ],
            "inputs": echoed
        }))
    }
}
