use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use hp_types::{DataError, HpResult};
use parking_lot::RwLock;
use serde::Deserialize;

/// Trait for dataset sources (OpenML, local fixtures, ...)
#[async_trait]
pub trait DatasetSource: Send + Sync + std::fmt::Debug {
    /// Fetch the raw ARFF text of a dataset
    async fn fetch(&self, id: u32) -> HpResult<String>;

    /// Get source name
    fn name(&self) -> &str;

    /// Get source configuration
    fn config(&self) -> serde_json::Value;
}

/// Dataset description returned by `/api/v1/json/data/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct OpenMlDescription {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub default_target_attribute: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DescriptionEnvelope {
    data_set_description: OpenMlDescription,
}

/// Fetches datasets from an OpenML server over HTTP
#[derive(Debug, Clone)]
pub struct OpenMlSource {
    pub name: String,
    pub base_url: String,
    client: reqwest::Client,
}

impl OpenMlSource {
    pub const DEFAULT_BASE_URL: &'static str = "https://www.openml.org";

    pub fn new() -> HpResult<Self> {
        Self::with_base_url(Self::DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> HpResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| DataError::Download {
                id: 0,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            name: "OpenML".to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub async fn describe(&self, id: u32) -> HpResult<OpenMlDescription> {
        let url = format!("{}/api/v1/json/data/{}", self.base_url, id);
        tracing::debug!("Fetching OpenML description: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| download_error(id, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND
            || status == reqwest::StatusCode::PRECONDITION_FAILED
        {
            return Err(DataError::DatasetNotFound { id }.into());
        }
        if !status.is_success() {
            return Err(DataError::Download {
                id,
                message: format!("description request returned {status}"),
            }
            .into());
        }

        let envelope: DescriptionEnvelope = response
            .json()
            .await
            .map_err(|e| DataError::InvalidFormat {
                message: format!("invalid description for dataset {id}: {e}"),
            })?;
        Ok(envelope.data_set_description)
    }
}

fn download_error(id: u32, e: reqwest::Error) -> DataError {
    DataError::Download {
        id,
        message: e.to_string(),
    }
}

#[async_trait]
impl DatasetSource for OpenMlSource {
    async fn fetch(&self, id: u32) -> HpResult<String> {
        let description = self.describe(id).await?;
        tracing::info!(
            "Downloading dataset {} ({}) from {}",
            id,
            description.name,
            description.url
        );

        let response = self
            .client
            .get(&description.url)
            .send()
            .await
            .map_err(|e| download_error(id, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataError::Download {
                id,
                message: format!("ARFF download returned {status}"),
            }
            .into());
        }

        response
            .text()
            .await
            .map_err(|e| download_error(id, e).into())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "openml",
            "base_url": self.base_url,
        })
    }
}

/// In-memory source serving fixed ARFF documents, for tests and offline runs
#[derive(Debug, Default)]
pub struct InMemorySource {
    pub name: String,
    documents: RwLock<HashMap<u32, String>>,
    fetches: RwLock<usize>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self {
            name: "In-memory".to_string(),
            ..Default::default()
        }
    }

    pub fn with_dataset(self, id: u32, arff: impl Into<String>) -> Self {
        self.documents.write().insert(id, arff.into());
        self
    }

    /// Number of `fetch` calls served so far.
    pub fn fetch_count(&self) -> usize {
        *self.fetches.read()
    }
}

#[async_trait]
impl DatasetSource for InMemorySource {
    async fn fetch(&self, id: u32) -> HpResult<String> {
        *self.fetches.write() += 1;
        self.documents
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| DataError::DatasetNotFound { id }.into())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> serde_json::Value {
        let mut ids: Vec<u32> = self.documents.read().keys().copied().collect();
        ids.sort_unstable();
        serde_json::json!({
            "type": "in_memory",
            "datasets": ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_envelope_parses() {
        let body = r#"{"data_set_description":{"id":"37","name":"diabetes","version":"1",
            "url":"https:\/\/api.openml.org\/data\/v1\/download\/37\/diabetes.arff",
            "default_target_attribute":"class","format":"ARFF"}}"#;
        let envelope: DescriptionEnvelope = serde_json::from_str(body).unwrap();
        let description = envelope.data_set_description;
        assert_eq!(description.name, "diabetes");
        assert_eq!(description.default_target_attribute.as_deref(), Some("class"));
        assert!(description.url.ends_with("diabetes.arff"));
    }

    #[test]
    fn base_url_is_normalized() {
        let source = OpenMlSource::with_base_url("https://example.org/").unwrap();
        assert_eq!(source.base_url, "https://example.org");
        assert_eq!(source.config()["type"], "openml");
    }

    #[tokio::test]
    async fn in_memory_source_serves_documents() {
        let source = InMemorySource::new().with_dataset(7, "@relation r");
        assert_eq!(source.fetch(7).await.unwrap(), "@relation r");
        assert!(source.fetch(8).await.is_err());
        assert_eq!(source.fetch_count(), 2);
        assert_eq!(source.config()["datasets"], serde_json::json!([7]));
    }
}
