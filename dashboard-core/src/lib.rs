//! Core library for the weather dashboard.
//!
//! This crate defines:
//! - Configuration handling
//! - The weather backend client and geolocation sources
//! - The dashboard state machine (search, presets, location detection)
//! - Display formatting for report fields
//!
//! It is used by `dashboard-cli`, but any front end can drive a [`Dashboard`]
//! and render its [`DashboardState`].

pub mod config;
pub mod dashboard;
pub mod display;
pub mod geolocation;
pub mod model;
pub mod provider;

pub use config::{Config, GeolocationConfig};
pub use dashboard::{Dashboard, DashboardSettings, DashboardState, Outcome};
pub use geolocation::{
    FixedLocation, GeolocationError, GeolocationProvider, IpGeolocation, NoGeolocation, Position,
    PositionOptions,
};
pub use model::{Coordinates, Query, WeatherReport};
pub use provider::{WeatherApi, http::HttpWeatherApi};

/// Pick the location source the config asks for: a fixed position wins over
/// IP lookup; with neither, geolocation is unsupported.
pub fn geolocation_from_config(
    config: &GeolocationConfig,
) -> anyhow::Result<Box<dyn GeolocationProvider>> {
    if let Some(at) = config.fixed_position() {
        return Ok(Box::new(FixedLocation(at)));
    }

    if config.ip_lookup {
        return Ok(Box::new(IpGeolocation::new(&config.lookup_url)?));
    }

    Ok(Box::new(NoGeolocation))
}

/// Wire up a dashboard from config.
pub fn dashboard_from_config(config: &Config) -> anyhow::Result<Dashboard> {
    let api = provider::api_from_config(config)?;
    let geolocation = geolocation_from_config(&config.geolocation)?;

    Ok(Dashboard::new(api, geolocation, DashboardSettings::from(config)))
}
