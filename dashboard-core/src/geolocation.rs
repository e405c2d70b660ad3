//! One-shot position lookup.
//!
//! Providers report failures with the classic geolocation codes
//! (1 = permission denied, 2 = position unavailable, 3 = timeout), which the
//! dashboard turns into user-facing messages.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{fmt::Debug, time::Duration};

use crate::model::Coordinates;

pub mod ip;

pub use ip::IpGeolocation;

/// Options for a single position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached position the caller accepts. Zero means always fresh.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub coordinates: Coordinates,
    pub accuracy_m: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

impl Position {
    pub fn now(coordinates: Coordinates) -> Self {
        Self { coordinates, accuracy_m: None, captured_at: Utc::now() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeolocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location unavailable")]
    PositionUnavailable,
    #[error("location request timed out")]
    Timeout,
    #[error("geolocation is not supported")]
    Unsupported,
    #[error("location error: {0}")]
    Other(String),
}

impl GeolocationError {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => GeolocationError::PermissionDenied,
            2 => GeolocationError::PositionUnavailable,
            3 => GeolocationError::Timeout,
            other => GeolocationError::Other(format!("error code {other}")),
        }
    }

    pub fn code(&self) -> Option<u16> {
        match self {
            GeolocationError::PermissionDenied => Some(1),
            GeolocationError::PositionUnavailable => Some(2),
            GeolocationError::Timeout => Some(3),
            GeolocationError::Unsupported | GeolocationError::Other(_) => None,
        }
    }

    /// Message shown before the dashboard falls back to `default_city`.
    pub fn user_message(&self, default_city: &str) -> String {
        match self {
            GeolocationError::PermissionDenied => {
                "Location access denied. Please search for a city manually.".to_string()
            }
            GeolocationError::PositionUnavailable => {
                format!("Location information is unavailable. Showing weather for {default_city}.")
            }
            GeolocationError::Timeout => {
                format!("Location request timed out. Showing weather for {default_city}.")
            }
            GeolocationError::Unsupported => {
                format!("Geolocation is not supported. Showing weather for {default_city}.")
            }
            GeolocationError::Other(_) => {
                format!("Unable to detect your location. Showing weather for {default_city}.")
            }
        }
    }
}

#[async_trait]
pub trait GeolocationProvider: Send + Sync + Debug {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Position, GeolocationError>;
}

/// A position given up front, e.g. from the command line or the config file.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

#[async_trait]
impl GeolocationProvider for FixedLocation {
    async fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<Position, GeolocationError> {
        Ok(Position::now(self.0))
    }
}

/// Used when no location source is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeolocation;

#[async_trait]
impl GeolocationProvider for NoGeolocation {
    async fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<Position, GeolocationError> {
        Err(GeolocationError::Unsupported)
    }
}
