//! HTTP access to historical samples and the node directory.
//!
//! History is only used to seed windows once per view. A failed fetch is not
//! fatal: [`HistoryClient::seed_for`] turns it into an empty [`SeedOutcome`]
//! carrying the error, and the view keeps running on live data alone.

use reqwest::{Client, Url};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::sample::{NodeIdentity, NodeResponse, RawSample};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("invalid server URL: {0}")]
    InvalidUrl(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned HTTP {status} for {url}")]
    Status { status: u16, url: String },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// `/api/recent/{id}` answers either with a bare array or wrapped in `data`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecentPayload {
    Bare(Vec<RawSample>),
    Wrapped {
        #[serde(default)]
        data: Option<Vec<RawSample>>,
    },
}

/// Decodes a recent-history body, oldest sample first.
pub fn parse_recent(body: &str) -> Result<Vec<RawSample>, serde_json::Error> {
    Ok(match serde_json::from_str::<RecentPayload>(body)? {
        RecentPayload::Bare(samples) => samples,
        RecentPayload::Wrapped { data } => data.unwrap_or_default(),
    })
}

/// Reads a JSON file of samples in either history shape.
pub fn load_samples_from_file(path: &Path) -> Result<Vec<RawSample>, HistoryError> {
    let body = std::fs::read_to_string(path).map_err(|source| HistoryError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_recent(&body)?)
}

/// Samples to seed a window with, plus the failure that emptied them.
#[derive(Debug, Default)]
pub struct SeedOutcome {
    pub samples: Vec<RawSample>,
    pub error: Option<HistoryError>,
}

impl SeedOutcome {
    pub fn ok(samples: Vec<RawSample>) -> Self {
        Self {
            samples,
            error: None,
        }
    }

    pub fn failed(error: HistoryError) -> Self {
        Self {
            samples: Vec::new(),
            error: Some(error),
        }
    }

    /// True when history could not be loaded.
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

impl From<Result<Vec<RawSample>, HistoryError>> for SeedOutcome {
    fn from(result: Result<Vec<RawSample>, HistoryError>) -> Self {
        match result {
            Ok(samples) => SeedOutcome::ok(samples),
            Err(e) => SeedOutcome::failed(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryClient {
    client: Client,
    base_url: Url,
}

impl HistoryClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, HistoryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, HistoryError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| HistoryError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(HistoryError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, HistoryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| HistoryError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_text(&self, url: Url) -> Result<String, HistoryError> {
        debug!(url = %url, "Fetching");
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HistoryError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }

    /// `GET /api/recent/{node_id}`, oldest sample first.
    pub async fn fetch_recent(&self, node_id: &str) -> Result<Vec<RawSample>, HistoryError> {
        let url = self.endpoint(&["api", "recent", node_id])?;
        let body = self.get_text(url).await?;
        let samples = parse_recent(&body)?;
        debug!(node = node_id, samples = samples.len(), "Recent history loaded");
        Ok(samples)
    }

    /// `GET /api/nodes`.
    pub async fn fetch_nodes(&self) -> Result<Vec<NodeIdentity>, HistoryError> {
        let url = self.endpoint(&["api", "nodes"])?;
        let body = self.get_text(url).await?;
        let response: NodeResponse = serde_json::from_str(&body)?;
        debug!(nodes = response.data.len(), "Node directory loaded");
        Ok(response.data)
    }

    /// Recent history for seeding; failures degrade to an empty seed.
    pub async fn seed_for(&self, node_id: &str) -> SeedOutcome {
        let outcome = SeedOutcome::from(self.fetch_recent(node_id).await);
        if let Some(e) = &outcome.error {
            warn!(node = node_id, error = %e, "History unavailable, continuing with live data only");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recent_shapes() {
        let bare = parse_recent(r#"[{"cpu":{"usage":1}},{"cpu":{"usage":2}}]"#).unwrap();
        assert_eq!(bare.len(), 2);
        assert_eq!(bare[1].cpu.usage, 2.0);

        let wrapped = parse_recent(r#"{"status":"success","data":[{"process":3}]}"#).unwrap();
        assert_eq!(wrapped.len(), 1);
        assert_eq!(wrapped[0].process, 3);

        let null_data = parse_recent(r#"{"status":"success","data":null}"#).unwrap();
        assert!(null_data.is_empty());

        assert!(parse_recent("not json").is_err());
    }

    #[test]
    fn test_endpoint_keeps_base_path_and_encodes_id() {
        let client = HistoryClient::with_client(Client::new(), "https://example.com/panel/").unwrap();
        let url = client.endpoint(&["api", "recent", "a b"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/panel/api/recent/a%20b");
    }

    #[test]
    fn test_rejects_non_http_base() {
        assert!(matches!(
            HistoryClient::with_client(Client::new(), "ws://example.com"),
            Err(HistoryError::InvalidUrl(_))
        ));
        assert!(HistoryClient::with_client(Client::new(), "nope").is_err());
    }

    #[test]
    fn test_seed_outcome_from_result() {
        let ok = SeedOutcome::from(Ok(vec![RawSample::default()]));
        assert!(!ok.is_degraded());
        assert_eq!(ok.samples.len(), 1);

        let failed = SeedOutcome::from(Err(HistoryError::InvalidUrl("x".into())));
        assert!(failed.is_degraded());
        assert!(failed.samples.is_empty());
    }
}
