use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct PredictUrlQuery {
    #[serde(default)]
    pub fileurl: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PredictSampleQuery {
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ThumbnailResponse {
    pub thumbnail: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
