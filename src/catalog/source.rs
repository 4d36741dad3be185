//! Catalog sources: where the raw catalog text is fetched from.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use super::CatalogError;

/// Asynchronous provider of raw catalog text.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self) -> Result<String, CatalogError>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

/// Catalog text held in memory.
#[derive(Debug, Clone)]
pub struct StaticCatalogSource {
    text: String,
}

impl StaticCatalogSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    async fn fetch(&self) -> Result<String, CatalogError> {
        Ok(self.text.clone())
    }

    fn describe(&self) -> String {
        format!("static({} bytes)", self.text.len())
    }
}

/// Catalog text read from a local file.
#[derive(Debug, Clone)]
pub struct FileCatalogSource {
    path: PathBuf,
}

impl FileCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogSource for FileCatalogSource {
    async fn fetch(&self) -> Result<String, CatalogError> {
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }

    fn describe(&self) -> String {
        format!("file({})", self.path.display())
    }
}

/// Catalog text fetched with an HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpCatalogSource {
    client: reqwest::Client,
    url: String,
}

impl HttpCatalogSource {
    pub fn new(url: impl Into<String>) -> Result<Self, CatalogError> {
        Self::with_timeout(url, Duration::from_secs(15))
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch(&self) -> Result<String, CatalogError> {
        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }
        Ok(resp.text().await?)
    }

    fn describe(&self) -> String {
        format!("http({})", self.url)
    }
}
