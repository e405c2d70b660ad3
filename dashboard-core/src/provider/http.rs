use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::model::{Coordinates, WeatherReport};

use super::WeatherApi;

/// Client for the dashboard backend:
/// `GET {base}/{city}` and `GET {base}/coordinates?lat=..&lon=..`.
#[derive(Debug, Clone)]
pub struct HttpWeatherApi {
    base_url: Url,
    http: Client,
}

impl HttpWeatherApi {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid weather API base URL: {base_url}"))?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(anyhow!("Weather API base URL must be http(s): {base_url}"));
        }

        Ok(Self { base_url, http: Client::new() })
    }

    /// Base URL with one extra, percent-encoded path segment.
    fn endpoint(&self, segment: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Weather API base URL cannot take a path: {}", self.base_url))?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }

    async fn fetch(&self, url: Url, what: &str) -> Result<WeatherReport> {
        tracing::debug!("GET {url}");

        let res = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to send weather request for {what}"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read weather response body for {what}"))?;

        if !status.is_success() {
            return Err(anyhow!(
                "Weather request for {} failed with status {}: {}",
                what,
                status,
                truncate_body(&body),
            ));
        }

        serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse weather JSON for {what}"))
    }
}

#[async_trait]
impl WeatherApi for HttpWeatherApi {
    async fn get_by_city(&self, city: &str) -> Result<WeatherReport> {
        let url = self.endpoint(city)?;
        self.fetch(url, &format!("\"{city}\"")).await
    }

    async fn get_by_coordinates(&self, at: Coordinates) -> Result<WeatherReport> {
        let mut url = self.endpoint("coordinates")?;
        url.query_pairs_mut()
            .append_pair("lat", &at.latitude.to_string())
            .append_pair("lon", &at.longitude.to_string());

        self.fetch(url, &format!("({at})")).await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
