use super::mocks::MockModel;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use modelhub_server::{
    config::{self, Config},
    fetch::HttpFetcher,
    server::{AppState, router},
};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`

pub const MOCK_MODEL_TEXT: &str = "EMPTY MOCK MODEL FOR UNIT TESTING";
pub const RAMP_PNG: &str = "testimage_ramp_4x2.png";
pub const RAMP_JPG: &str = "testimage_ramp_4x2.jpg";
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nramp";
pub const JPG_BYTES: &[u8] = b"\xff\xd8\xff\xe0ramp";

const MULTIPART_BOUNDARY: &str = "modelhub-test-boundary";

/// A mock contributed model on disk plus the configuration pointing at it.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub config: Config,
}

impl TestEnv {
    pub fn new(name: &str, input_io: Value) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let contrib = temp_dir.path().join("contrib_src");
        let model_dir = contrib.join("model");
        let samples_dir = contrib.join("sample_data");
        std::fs::create_dir_all(&model_dir).unwrap();
        std::fs::create_dir_all(&samples_dir).unwrap();

        let descriptor = json!({
            "id": "b8a2e1f0-mock",
            "meta": {"name": name, "application_area": "unit testing"},
            "publication": {"title": "Mock model"},
            "model": {
                "description": "Mock model for tests",
                "io": {
                    "input": input_io,
                    "output": [{"name": "probabilities", "type": "label_list"}]
                }
            }
        });
        std::fs::write(
            model_dir.join("config.json"),
            serde_json::to_vec_pretty(&descriptor).unwrap(),
        )
        .unwrap();
        std::fs::write(model_dir.join("model.txt"), MOCK_MODEL_TEXT).unwrap();
        std::fs::write(model_dir.join("thumbnail.jpg"), JPG_BYTES).unwrap();

        std::fs::write(samples_dir.join(RAMP_PNG), PNG_BYTES).unwrap();
        std::fs::write(samples_dir.join(RAMP_JPG), JPG_BYTES).unwrap();

        std::fs::write(
            contrib.join("legal.json"),
            serde_json::to_vec(&json!({
                "model_license": "MIT",
                "sample_data_license": "CC-BY-4.0"
            }))
            .unwrap(),
        )
        .unwrap();

        let config_yaml = format!(
            r#"
server:
  host: "127.0.0.1"
  port: 8080
  logs:
    level: "debug"
model:
  contrib_src: "{contrib}"
workspace:
  root: "{working}"
fetch:
  timeout_secs: 5
  max_redirects: 5
  max_bytes: 1048576
"#,
            contrib = contrib.display(),
            working = temp_dir.path().join("working").display(),
        );
        let config = config::parse(&config_yaml).unwrap();

        Self { temp_dir, config }
    }

    /// Single-input model accepting png images.
    pub fn single_input() -> Self {
        Self::new(
            "MockNet",
            json!({
                "format": ["image/png"],
                "dim_limits": [{"min": 1, "max": 4}, {"min": 32}, {"min": 32}]
            }),
        )
    }

    /// Model needing four NIfTI volumes.
    pub fn four_nifti_inputs() -> Self {
        let env = Self::new(
            "MockNetFourInputs",
            json!({
                "format": ["application/json"],
                "t1": {"format": ["application/nii-gzip"]},
                "t1c": {"format": ["application/nii-gzip"]},
                "t2": {"format": ["application/nii-gzip"]},
                "flair": {"format": ["application/nii-gzip"]}
            }),
        );
        for role in ["t1", "t1c", "t2", "flair"] {
            env.write_sample(&format!("{}.nii.gz", role), role.as_bytes());
        }
        env
    }

    pub fn samples_dir(&self) -> PathBuf {
        self.config.model.samples_path()
    }

    pub fn model_dir(&self) -> PathBuf {
        self.config.model.model_path()
    }

    pub fn working_dir(&self) -> &Path {
        &self.config.workspace.root
    }

    pub fn write_sample(&self, name: &str, contents: &[u8]) {
        std::fs::write(self.samples_dir().join(name), contents).unwrap();
    }

    /// Entries left in the workspace root; the root may not exist before the first request.
    pub fn working_entries(&self) -> Vec<String> {
        match std::fs::read_dir(self.working_dir()) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub async fn app(&self, model: Arc<MockModel>) -> Router {
        let fetcher = Arc::new(HttpFetcher::new(&self.config.fetch).unwrap());
        let state = AppState::new(&self.config, model, fetcher).await.unwrap();
        router(state)
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::HOST, "localhost")
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::HOST, "localhost")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Builds a multipart upload with one file per `(field, file_name, bytes)`.
pub fn multipart_upload(uri: &str, files: &[(&str, &str, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (field, file_name, bytes) in files {
        body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::HOST, "localhost")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = send(app, request).await;
    let status = response.status();
    let body = body_bytes(response).await;
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

/// Assertion helper for the mock prediction payload.
pub fn assert_mock_prediction(result: &Value) {
    let prediction = result["output"]["prediction"]
        .as_array()
        .expect("prediction list");
    assert_eq!(prediction.len(), 2);
    assert_eq!(prediction[1]["label"], "class_1");
}

/// Assertion helper for the metadata the pipeline adds to every prediction.
pub fn assert_mock_meta_info(result: &Value, model_name: &str) {
    assert_eq!(result["model"]["id"], "b8a2e1f0-mock");
    assert_eq!(result["model"]["name"], model_name);
    assert!(result["timestamp"].is_string());
    assert!(result["processing_time"].as_f64().unwrap() >= 0.0);
}

pub fn assert_error_contains(body: &Value, expected: &str) {
    let message = body["error"].as_str().unwrap_or_default();
    assert!(
        message.contains(expected),
        "Expected error containing '{}', got: {}",
        expected,
        body
    );
}
