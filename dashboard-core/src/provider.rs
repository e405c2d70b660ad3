use crate::{
    Config, WeatherReport,
    model::{Coordinates, Query},
    provider::http::HttpWeatherApi,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod http;

/// The weather backend, looked up by city name or by coordinates.
#[async_trait]
pub trait WeatherApi: Send + Sync + Debug {
    async fn get_by_city(&self, city: &str) -> anyhow::Result<WeatherReport>;

    async fn get_by_coordinates(&self, at: Coordinates) -> anyhow::Result<WeatherReport>;

    async fn get(&self, query: &Query) -> anyhow::Result<WeatherReport> {
        match query {
            Query::City(city) => self.get_by_city(city).await,
            Query::Coordinates(at) => self.get_by_coordinates(*at).await,
        }
    }
}

/// Construct the HTTP backend client from config.
pub fn api_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherApi>> {
    Ok(Box::new(HttpWeatherApi::new(&config.api_base_url)?))
}
