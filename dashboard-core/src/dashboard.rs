//! The dashboard view model: search state, preset shortcuts and the three
//! request flows (city search, location detection, default-city fallback).
//!
//! Every request-start bumps a sequence number and hands out a ticket.
//! A completion is applied only while its ticket is still the latest one, so a
//! slow response can never overwrite the result of a newer request.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    Config,
    geolocation::{GeolocationError, GeolocationProvider, Position, PositionOptions},
    model::{Query, WeatherReport},
    provider::WeatherApi,
};

/// Snapshot of everything a front end needs to render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    /// Contents of the search field.
    pub query: String,
    pub weather: Option<WeatherReport>,
    pub loading: bool,
    pub detecting_location: bool,
    pub error: Option<String>,
    /// Sequence number of the latest dispatched request.
    pub request_seq: u64,
}

impl DashboardState {
    fn start(&mut self, detecting_location: bool, notice: Option<String>) -> Ticket {
        self.request_seq += 1;
        self.loading = true;
        self.detecting_location = detecting_location;
        self.error = notice;
        self.weather = None;
        Ticket(self.request_seq)
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        self.request_seq == ticket.0
    }
}

/// Identifies one dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ticket(u64);

/// How a dashboard operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The request settled and its result (weather or error) is in the state.
    Applied,
    /// Blank query; nothing was sent.
    Ignored,
    /// A newer request was started meanwhile; this result was dropped.
    Superseded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSettings {
    pub default_city: String,
    pub popular_cities: Vec<String>,
    pub position_options: PositionOptions,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for DashboardSettings {
    fn from(config: &Config) -> Self {
        let default_city = match config.default_city.trim() {
            "" => crate::config::DEFAULT_CITY.to_string(),
            city => city.to_string(),
        };

        Self {
            default_city,
            popular_cities: config.presets(),
            position_options: config.geolocation.position_options(),
        }
    }
}

#[derive(Debug)]
pub struct Dashboard {
    api: Box<dyn WeatherApi>,
    geolocation: Box<dyn GeolocationProvider>,
    settings: DashboardSettings,
    state: watch::Sender<DashboardState>,
}

impl Dashboard {
    pub fn new(
        api: Box<dyn WeatherApi>,
        geolocation: Box<dyn GeolocationProvider>,
        settings: DashboardSettings,
    ) -> Self {
        let (state, _) = watch::channel(DashboardState::default());
        Self { api, geolocation, settings, state }
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    pub fn popular_cities(&self) -> &[String] {
        &self.settings.popular_cities
    }

    pub fn state(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    /// Receiver notified after every applied state change.
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }

    /// Update the search field without sending anything.
    pub fn set_query(&self, text: &str) {
        self.state.send_if_modified(|s| {
            if s.query == text {
                return false;
            }
            s.query = text.to_string();
            true
        });
    }

    /// Submit whatever is in the search field.
    pub async fn submit(&self) -> Outcome {
        let query = self.state.borrow().query.clone();
        self.submit_city(&query).await
    }

    /// Preset shortcut: fill the search field, then search for it.
    pub async fn select_city(&self, name: &str) -> Outcome {
        self.set_query(name);
        self.submit_city(name).await
    }

    pub async fn submit_city(&self, name: &str) -> Outcome {
        let Some(Query::City(city)) = Query::city(name) else {
            debug!("Ignoring blank city query");
            return Outcome::Ignored;
        };

        let ticket = self.begin(false, None);
        self.fetch_city(ticket, &city).await
    }

    /// Start-up flow: show weather for wherever the user is.
    pub async fn start(&self) -> Outcome {
        self.detect_location().await
    }

    pub async fn detect_location(&self) -> Outcome {
        let ticket = self.begin(true, None);

        let position = match self.locate().await {
            Ok(position) => position,
            Err(err) => {
                warn!("Location detection failed: {err}");
                let notice = err.user_message(&self.settings.default_city);
                return self.fall_back(ticket, notice).await;
            }
        };

        if !self.is_current(ticket) {
            debug!("Location resolved after a newer request; dropping it");
            return Outcome::Superseded;
        }

        let at = position.coordinates;
        debug!("Detected location {at}");

        match self.api.get(&Query::Coordinates(at)).await {
            Ok(report) => self.finish(ticket, Ok(report)),
            Err(err) => {
                warn!("Weather lookup for ({at}) failed: {err:#}");
                let notice = format!(
                    "Could not fetch weather for your location. Showing weather for {}.",
                    self.settings.default_city
                );
                self.fall_back(ticket, notice).await
            }
        }
    }

    async fn locate(&self) -> Result<Position, GeolocationError> {
        let options = self.settings.position_options;

        // Enforced here as well so a provider that ignores the option still gives up.
        tokio::time::timeout(options.timeout, self.geolocation.current_position(&options))
            .await
            .unwrap_or(Err(GeolocationError::Timeout))
    }

    async fn fall_back(&self, ticket: Ticket, notice: String) -> Outcome {
        let Some(ticket) = self.hand_off(ticket, notice) else {
            debug!("Skipping default-city fallback; a newer request is in flight");
            return Outcome::Superseded;
        };

        let city = self.settings.default_city.clone();
        self.fetch_city(ticket, &city).await
    }

    async fn fetch_city(&self, ticket: Ticket, city: &str) -> Outcome {
        debug!("Fetching weather for \"{city}\"");

        let result = self.api.get(&Query::City(city.to_string())).await.map_err(|err| {
            warn!("Weather lookup for \"{city}\" failed: {err:#}");
            format!(
                "Could not fetch weather for \"{city}\". Please check the city name and try again."
            )
        });

        self.finish(ticket, result)
    }

    fn begin(&self, detecting_location: bool, notice: Option<String>) -> Ticket {
        let mut ticket = Ticket(0);
        self.state.send_modify(|s| ticket = s.start(detecting_location, notice));
        ticket
    }

    /// Replace `ticket` with a fresh one carrying `notice`, unless it is stale.
    fn hand_off(&self, ticket: Ticket, notice: String) -> Option<Ticket> {
        let mut next = None;
        self.state.send_if_modified(|s| {
            if !s.is_current(ticket) {
                return false;
            }
            next = Some(s.start(false, Some(notice)));
            true
        });
        next
    }

    fn finish(&self, ticket: Ticket, result: Result<WeatherReport, String>) -> Outcome {
        let applied = self.state.send_if_modified(|s| {
            if !s.is_current(ticket) {
                return false;
            }
            s.loading = false;
            s.detecting_location = false;
            match result {
                Ok(report) => {
                    info!("Showing weather for {}, {}", report.city, report.country);
                    s.weather = Some(report);
                }
                Err(message) => s.error = Some(message),
            }
            true
        });

        if applied {
            Outcome::Applied
        } else {
            debug!("Discarding stale response for request #{}", ticket.0);
            Outcome::Superseded
        }
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        self.state.borrow().is_current(ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geolocation::{FixedLocation, NoGeolocation},
        model::Coordinates,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Knows a fixed set of cities; coordinates resolve to `at_coordinates`.
    #[derive(Debug, Default)]
    struct FakeApi {
        cities: HashMap<String, WeatherReport>,
        at_coordinates: Option<WeatherReport>,
    }

    impl FakeApi {
        fn with(mut self, report: WeatherReport) -> Self {
            self.cities.insert(report.city.clone(), report);
            self
        }
    }

    #[async_trait]
    impl WeatherApi for FakeApi {
        async fn get_by_city(&self, city: &str) -> anyhow::Result<WeatherReport> {
            self.cities.get(city).cloned().ok_or_else(|| anyhow::anyhow!("404 for {city}"))
        }

        async fn get_by_coordinates(&self, _at: Coordinates) -> anyhow::Result<WeatherReport> {
            self.at_coordinates.clone().ok_or_else(|| anyhow::anyhow!("500"))
        }
    }

    fn report(city: &str) -> WeatherReport {
        WeatherReport {
            city: city.to_string(),
            country: "XX".to_string(),
            temperature: 21.4,
            feels_like: 20.9,
            humidity: 60,
            wind_speed: 3.2,
            pressure: 1012,
            description: "clear sky".to_string(),
            timestamp: 1_700_000_000,
        }
    }

    fn dashboard(api: FakeApi, geo: impl GeolocationProvider + 'static) -> Dashboard {
        Dashboard::new(Box::new(api), Box::new(geo), DashboardSettings::default())
    }

    #[test]
    fn settings_come_from_config() {
        let cfg = Config { default_city: "  ".into(), ..Default::default() };
        let settings = DashboardSettings::from(&cfg);

        assert_eq!(settings.default_city, "Mumbai");
        assert_eq!(settings.popular_cities.len(), 6);
        assert_eq!(settings.position_options, PositionOptions::default());
    }

    #[tokio::test]
    async fn blank_submission_changes_nothing() {
        let dash = dashboard(FakeApi::default().with(report("London")), NoGeolocation);
        assert_eq!(dash.submit_city("London").await, Outcome::Applied);
        let before = dash.state();

        assert_eq!(dash.submit_city("   ").await, Outcome::Ignored);
        dash.set_query("");
        assert_eq!(dash.submit().await, Outcome::Ignored);

        let after = dash.state();
        assert_eq!(after.weather, before.weather);
        assert_eq!(after.error, None);
        assert!(!after.loading);
    }

    #[tokio::test]
    async fn submit_uses_trimmed_query_field() {
        let dash = dashboard(FakeApi::default().with(report("London")), NoGeolocation);

        dash.set_query("  London  ");
        assert_eq!(dash.submit().await, Outcome::Applied);

        let state = dash.state();
        assert_eq!(state.query, "  London  ");
        assert_eq!(state.weather.map(|w| w.city).as_deref(), Some("London"));
    }

    #[tokio::test]
    async fn failed_search_names_the_city() {
        let dash = dashboard(FakeApi::default(), NoGeolocation);

        assert_eq!(dash.submit_city("Atlantis").await, Outcome::Applied);

        let state = dash.state();
        assert!(state.weather.is_none());
        assert!(!state.loading);
        assert!(state.error.as_deref().is_some_and(|e| e.contains("\"Atlantis\"")));
    }

    #[tokio::test]
    async fn new_search_clears_previous_error() {
        let dash = dashboard(FakeApi::default().with(report("Delhi")), NoGeolocation);

        dash.submit_city("Atlantis").await;
        assert!(dash.state().error.is_some());

        dash.submit_city("Delhi").await;
        let state = dash.state();
        assert_eq!(state.error, None);
        assert!(state.weather.is_some());
    }

    #[tokio::test]
    async fn preset_fills_the_search_field() {
        let dash = dashboard(FakeApi::default().with(report("Tokyo")), NoGeolocation);

        assert_eq!(dash.select_city("Tokyo").await, Outcome::Applied);

        let state = dash.state();
        assert_eq!(state.query, "Tokyo");
        assert_eq!(state.weather.map(|w| w.city).as_deref(), Some("Tokyo"));
    }

    #[tokio::test]
    async fn detected_location_weather_is_shown() {
        let api = FakeApi { at_coordinates: Some(report("Pune")), ..Default::default() };
        let dash = dashboard(api, FixedLocation(Coordinates::new(18.52, 73.85)));

        assert_eq!(dash.start().await, Outcome::Applied);

        let state = dash.state();
        assert_eq!(state.weather.map(|w| w.city).as_deref(), Some("Pune"));
        assert_eq!(state.error, None);
        assert!(!state.detecting_location);
    }

    #[tokio::test]
    async fn unsupported_geolocation_falls_back_with_notice() {
        let dash = dashboard(FakeApi::default().with(report("Mumbai")), NoGeolocation);

        assert_eq!(dash.detect_location().await, Outcome::Applied);

        let state = dash.state();
        assert_eq!(state.weather.map(|w| w.city).as_deref(), Some("Mumbai"));
        assert!(state.error.as_deref().is_some_and(|e| e.contains("not supported")));
        assert!(!state.loading);
        assert!(!state.detecting_location);
    }

    #[tokio::test]
    async fn coordinate_failure_falls_back_to_default_city() {
        let dash = dashboard(
            FakeApi::default().with(report("Mumbai")),
            FixedLocation(Coordinates::new(0.0, 0.0)),
        );

        dash.detect_location().await;

        let state = dash.state();
        assert_eq!(state.weather.map(|w| w.city).as_deref(), Some("Mumbai"));
        assert_eq!(
            state.error.as_deref(),
            Some("Could not fetch weather for your location. Showing weather for Mumbai.")
        );
    }

    #[tokio::test]
    async fn failed_fallback_reports_the_default_city() {
        let dash = dashboard(FakeApi::default(), NoGeolocation);

        dash.detect_location().await;

        let state = dash.state();
        assert!(state.weather.is_none());
        assert!(state.error.as_deref().is_some_and(|e| e.contains("\"Mumbai\"")));
    }

    #[tokio::test]
    async fn subscribers_see_the_settled_state() {
        let dash = dashboard(FakeApi::default().with(report("London")), NoGeolocation);
        let mut rx = dash.subscribe();

        dash.submit_city("London").await;

        assert!(rx.has_changed().expect("sender alive"));
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen, dash.state());
    }

    #[test]
    fn stale_tickets_are_not_applied() {
        let dash = dashboard(FakeApi::default(), NoGeolocation);

        let old = dash.begin(false, None);
        let new = dash.begin(false, None);

        assert_eq!(dash.finish(old, Ok(report("London"))), Outcome::Superseded);
        assert!(dash.state().loading);
        assert_eq!(dash.hand_off(old, "late".into()), None);

        assert_eq!(dash.finish(new, Ok(report("Tokyo"))), Outcome::Applied);
        let state = dash.state();
        assert!(!state.loading);
        assert_eq!(state.weather.map(|w| w.city).as_deref(), Some("Tokyo"));
    }
}
