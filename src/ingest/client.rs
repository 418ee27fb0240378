//! HTTP client for the odds-storage collaborator
//!
//! Every call carries independent connect/read timeouts. Snapshot-table
//! fetches are retried a bounded number of times; a retry after a timeout
//! shrinks the row limit and doubles the read timeout, since the heavy
//! history queries are the usual culprit.

use super::types::{EventSummary, QuoteSnapshot};
use super::SnapshotSource;
use crate::classify::FactorId;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Fetch failures from the storage collaborator
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request failed after the retry budget was exhausted
    #[error("fetch failed after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
    /// Collaborator answered with a non-success status
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    /// Response body did not match the expected shape
    #[error("unexpected response shape: {0}")]
    Shape(String),
}

/// Configuration for the HTTP source
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Max snapshot rows per table fetch
    pub table_limit: u32,
    /// Retries for a failed table fetch (0 = single attempt)
    pub table_retries: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            connect_timeout: Duration::from_secs(3),
            read_timeout: Duration::from_secs(10),
            table_limit: 2000,
            table_retries: 1,
        }
    }
}

/// HTTP implementation of [`SnapshotSource`]
pub struct HttpSnapshotSource {
    config: SourceConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    events: Vec<EventSummary>,
}

#[derive(Debug, Deserialize)]
struct SnapshotsResponse {
    #[serde(default)]
    rows: Vec<QuoteSnapshot>,
}

impl HttpSnapshotSource {
    pub fn new(config: SourceConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .build()?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        read_timeout: Duration,
    ) -> Result<T, reqwest::Error> {
        self.client
            .get(url)
            .query(query)
            .timeout(read_timeout)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn candidate_events(
        &self,
        hours: u32,
        min_pct_hint: Decimal,
    ) -> Result<Vec<EventSummary>, FetchError> {
        let url = self.url("/api/events");
        let query = [
            ("hours", hours.to_string()),
            ("min_pct", min_pct_hint.to_string()),
        ];
        tracing::debug!(url = %url, hours, "fetching candidate events");

        let resp: EventsResponse = self
            .get_json(&url, &query, self.config.read_timeout)
            .await
            .map_err(|source| FetchError::Exhausted { attempts: 1, source })?;
        Ok(resp.events)
    }

    async fn event_snapshots(
        &self,
        event_id: i64,
        hours: u32,
    ) -> Result<Vec<QuoteSnapshot>, FetchError> {
        let url = self.url(&format!("/api/event/{event_id}/snapshots"));
        let attempts = self.config.table_retries + 1;

        let mut limit = self.config.table_limit.max(1);
        let mut read_timeout = self.config.read_timeout;
        let mut last_err = None;

        for attempt in 0..attempts {
            let query = [("hours", hours.to_string()), ("limit", limit.to_string())];
            match self
                .get_json::<SnapshotsResponse>(&url, &query, read_timeout)
                .await
            {
                Ok(resp) => {
                    let mut rows = resp.rows;
                    rows.sort_by_key(|r| r.observed_at);
                    return Ok(rows);
                }
                Err(err) => {
                    tracing::warn!(
                        event_id,
                        attempt = attempt + 1,
                        limit,
                        error = %err,
                        "snapshot table fetch failed"
                    );
                    // reduced-scope retry: fewer rows, more patience
                    limit = ((limit as f64 * 0.6) as u32).max(200);
                    read_timeout *= 2;
                    last_err = Some(err);
                }
            }
        }

        Err(FetchError::Exhausted {
            attempts,
            source: last_err.expect("at least one attempt was made"),
        })
    }

    async fn catalog_records(
        &self,
        factor_ids: &[FactorId],
    ) -> Result<HashMap<FactorId, Value>, FetchError> {
        if factor_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let url = self.url("/api/catalog");
        let ids = factor_ids
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let query = [("factor_ids", ids)];

        let raw: Value = self
            .get_json(&url, &query, self.config.read_timeout)
            .await
            .map_err(|source| FetchError::Exhausted { attempts: 1, source })?;

        let obj = raw
            .as_object()
            .ok_or_else(|| FetchError::Shape("catalog response is not an object".to_string()))?;

        let mut out = HashMap::new();
        for (key, value) in obj {
            if let Ok(fid) = key.parse::<FactorId>() {
                out.insert(fid, value.clone());
            }
        }
        Ok(out)
    }

    async fn event_detail(&self, event_id: i64) -> Result<Value, FetchError> {
        let url = self.url(&format!("/api/event/{event_id}/detail"));
        self.get_json(&url, &[], self.config.read_timeout)
            .await
            .map_err(|source| FetchError::Exhausted { attempts: 1, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_config_default() {
        let config = SourceConfig::default();
        assert_eq!(config.table_limit, 2000);
        assert_eq!(config.table_retries, 1);
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_url_join() {
        let source = HttpSnapshotSource::new(SourceConfig {
            base_url: "http://host:5000/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(source.url("/api/events"), "http://host:5000/api/events");
    }

    #[test]
    fn test_events_response_shape() {
        let json = r#"{"events": [{"event_id": 42, "home": "A", "away": "B"}]}"#;
        let resp: EventsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.events.len(), 1);
        assert_eq!(resp.events[0].event_id, 42);
    }

    #[test]
    fn test_snapshots_response_shape_defaults() {
        let resp: SnapshotsResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.rows.is_empty());
    }
}
