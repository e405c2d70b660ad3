use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url, header};
use serde::Deserialize;

use crate::model::Coordinates;

use super::{GeolocationError, GeolocationProvider, Position, PositionOptions};

/// Approximate position from the public IP address, via an ip-api compatible endpoint.
///
/// `enable_high_accuracy` has no effect here; IP lookups are city-level at best.
#[derive(Debug, Clone)]
pub struct IpGeolocation {
    lookup_url: Url,
    http: Client,
}

impl IpGeolocation {
    pub fn new(lookup_url: &str) -> Result<Self> {
        let lookup_url = Url::parse(lookup_url)
            .with_context(|| format!("Invalid geolocation lookup URL: {lookup_url}"))?;

        if !matches!(lookup_url.scheme(), "http" | "https") {
            return Err(anyhow!("Geolocation lookup URL must be http(s): {lookup_url}"));
        }

        Ok(Self { lookup_url, http: Client::new() })
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    message: Option<String>,
}

#[async_trait]
impl GeolocationProvider for IpGeolocation {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Position, GeolocationError> {
        let mut req = self.http.get(self.lookup_url.clone()).timeout(options.timeout);
        if options.maximum_age.is_zero() {
            req = req.header(header::CACHE_CONTROL, "no-cache");
        }

        let res = req.send().await.map_err(|err| {
            if err.is_timeout() {
                GeolocationError::Timeout
            } else {
                tracing::debug!("IP geolocation request failed: {err}");
                GeolocationError::PositionUnavailable
            }
        })?;

        let status = res.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(GeolocationError::PermissionDenied);
            }
            s if !s.is_success() => {
                return Err(GeolocationError::Other(format!("lookup returned status {s}")));
            }
            _ => {}
        }

        let body: IpApiResponse = res.json().await.map_err(|err| {
            if err.is_timeout() {
                GeolocationError::Timeout
            } else {
                tracing::debug!("IP geolocation response unreadable: {err}");
                GeolocationError::PositionUnavailable
            }
        })?;

        match body {
            IpApiResponse { status, lat: Some(lat), lon: Some(lon), .. } if status == "success" => {
                Ok(Position::now(Coordinates::new(lat, lon)))
            }
            IpApiResponse { message, .. } => {
                tracing::debug!(
                    "IP geolocation lookup failed: {}",
                    message.as_deref().unwrap_or("no reason given")
                );
                Err(GeolocationError::PositionUnavailable)
            }
        }
    }
}
