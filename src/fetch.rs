use crate::{Error, Result, config::FetchConfig, media};
use async_trait::async_trait;
use reqwest::{Url, header::CONTENT_TYPE, redirect::Policy};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Downloads `url` into `destination` and returns the local path.
    async fn fetch(&self, url: &str, destination: &Path) -> Result<PathBuf>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(Policy::limited(config.max_redirects))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            max_bytes: config.max_bytes,
        })
    }

    async fn download(&self, url: Url, target: &Path) -> Result<u64> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::download(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::download(format!(
                "{} returned status {}",
                url, status
            )));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                return Err(Error::download(format!(
                    "{} is {} bytes, larger than the {} byte limit",
                    url, length, self.max_bytes
                )));
            }
        }

        let mut file = tokio::fs::File::create(target).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::download(format!("reading {} failed: {}", url, e)))?
        {
            written += chunk.len() as u64;
            if written > self.max_bytes {
                return Err(Error::download(format!(
                    "{} exceeded the {} byte limit",
                    url, self.max_bytes
                )));
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        Ok(written)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<PathBuf> {
        let parsed =
            Url::parse(url).map_err(|e| Error::download(format!("invalid url '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::download(format!(
                "unsupported url scheme '{}'",
                parsed.scheme()
            )));
        }

        let file_name = match url_file_name(&parsed) {
            Some(name) => name,
            None => self.inferred_file_name(&parsed).await,
        };
        let target = safe_join(destination, &file_name)?;

        debug!("Downloading {} to {}", url, target.display());

        match self.download(parsed, &target).await {
            Ok(size) => {
                debug!("Downloaded {} bytes from {}", size, url);
                Ok(target)
            }
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(&target).await {
                    if remove_err.kind() != std::io::ErrorKind::NotFound {
                        warn!(
                            "Failed to remove partial download {}: {}",
                            target.display(),
                            remove_err
                        );
                    }
                }
                Err(e)
            }
        }
    }
}

impl HttpFetcher {
    /// Names a download whose URL has no usable file name, using the server's content type.
    async fn inferred_file_name(&self, url: &Url) -> String {
        let extension = match self.client.head(url.clone()).send().await {
            Ok(response) => response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .and_then(media::extension_for_content_type)
                .unwrap_or(""),
            Err(_) => "",
        };
        format!("download{}", extension)
    }
}

fn url_file_name(url: &Url) -> Option<String> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Joins a remote-supplied file name onto `destination`, refusing anything
/// that could land outside it.
pub fn safe_join(destination: &Path, file_name: &str) -> Result<PathBuf> {
    let invalid = file_name.is_empty()
        || file_name == "."
        || file_name == ".."
        || file_name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(Error::download(format!(
            "refusing to write file named '{}'",
            file_name
        )));
    }

    let target = destination.join(file_name);
    if target.parent() != Some(destination) {
        return Err(Error::download(format!(
            "refusing to write '{}' outside {}",
            file_name,
            destination.display()
        )));
    }
    Ok(target)
}
