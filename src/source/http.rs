//! REST implementation of the data source.

use super::{normalize_agency_list, normalize_list, DataSource};
use crate::error::{FetchError, Result};
use crate::models::{Agency, HistoricalData, TitleChange, WordCountResponse};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Settings for the HTTP data source.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    /// Date to request title word counts for (`date` query parameter).
    pub as_of_date: Option<String>,
    pub history_start_date: Option<String>,
    pub history_end_date: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_seconds: 60,
            as_of_date: None,
            history_start_date: None,
            history_end_date: None,
        }
    }
}

/// Data source backed by the analyzer's REST API.
pub struct HttpDataSource {
    config: SourceConfig,
    http_client: reqwest::Client,
}

impl HttpDataSource {
    /// Create a new source for the API at `config.base_url`.
    pub fn new(config: SourceConfig) -> Result<Self> {
        info!("Using data source at {}", config.base_url);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|source| FetchError::Transport {
                url: config.base_url.clone(),
                source,
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// GET a JSON document. A 404 is reported as `Ok(None)`.
    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Option<Value>> {
        let url = self.url(path);
        debug!("GET {} {:?}", url, query);

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout {
                        url: url.clone(),
                        seconds: self.config.timeout_seconds,
                    }
                } else if e.is_connect() {
                    FetchError::Connect { url: url.clone() }
                } else {
                    FetchError::Transport {
                        url: url.clone(),
                        source: e,
                    }
                }
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("{} returned 404", url);
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.clone(),
                source,
            })?;

        if text.trim().is_empty() {
            return Ok(Some(Value::Null));
        }

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| FetchError::Decode { url, source })
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn agencies(&self) -> Result<Vec<Arc<Agency>>> {
        let body = self.get_json("/api/agencies", &[]).await?;
        Ok(body.map(normalize_agency_list).unwrap_or_default())
    }

    async fn historical_word_counts(&self, agency_slug: &str) -> Result<Vec<HistoricalData>> {
        let mut query = vec![("agency", agency_slug)];
        if let Some(ref start) = self.config.history_start_date {
            query.push(("start_date", start.as_str()));
        }
        if let Some(ref end) = self.config.history_end_date {
            query.push(("end_date", end.as_str()));
        }

        let body = self
            .get_json("/api/historical-word-counts", &query)
            .await?;
        Ok(body.map(normalize_list).unwrap_or_default())
    }

    async fn agency_changes(&self, agency_slug: &str) -> Result<Vec<TitleChange>> {
        let path = format!("/api/agency/{}/changes", agency_slug);
        let body = self.get_json(&path, &[]).await?;
        Ok(body.map(normalize_list).unwrap_or_default())
    }

    async fn title_word_count(&self, title: u32) -> Result<WordCountResponse> {
        let path = format!("/api/title/{}/word-count", title);
        let query: Vec<(&str, &str)> = match self.config.as_of_date {
            Some(ref date) => vec![("date", date.as_str())],
            None => Vec::new(),
        };

        let url = self.url(&path);
        match self.get_json(&path, &query).await? {
            None | Some(Value::Null) => Err(FetchError::NoData { title }),
            Some(body) => {
                serde_json::from_value(body).map_err(|source| FetchError::Decode { url, source })
            }
        }
    }
}
