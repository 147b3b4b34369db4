//! HTTP client for the Ergast API.

use crate::config::ErgastSettings;
use crate::error::{F1Error, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Thin JSON client over the Ergast REST endpoints.
#[derive(Debug, Clone)]
pub struct ErgastClient {
    http: reqwest::Client,
    base_url: Url,
    page_limit: u32,
}

impl ErgastClient {
    /// Create a client from settings.
    pub fn new(settings: &ErgastSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Self::with_http_client(http, &settings.base_url, settings.page_limit)
    }

    pub fn with_http_client(
        http: reqwest::Client,
        base_url: &str,
        page_limit: u32,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(F1Error::Config(format!("Ergast base URL cannot be a base: {}", base_url)));
        }
        Ok(Self {
            http,
            base_url,
            page_limit,
        })
    }

    /// URL for a resource path such as `["2022", "3", "results"]`.
    ///
    /// The last segment gets the `.json` suffix and the page limit is set so
    /// a single request returns every row.
    pub fn url_for(&self, segments: &[String]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                F1Error::Config(format!("Invalid Ergast base URL: {}", self.base_url))
            })?;
            path.pop_if_empty();
            if let Some((last, rest)) = segments.split_last() {
                path.extend(rest);
                path.push(&format!("{}.json", last));
            }
        }
        url.query_pairs_mut()
            .append_pair("limit", &self.page_limit.to_string());
        Ok(url)
    }

    /// Fetch one resource as JSON.
    #[instrument(skip(self))]
    pub async fn get(&self, segments: &[String]) -> Result<Value> {
        let url = self.url_for(segments)?;
        debug!("GET {}", url);

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(F1Error::DataSource(format!("{} returned {}", url, status)));
        }

        let payload: Value = response.json().await?;
        Ok(payload)
    }
}
