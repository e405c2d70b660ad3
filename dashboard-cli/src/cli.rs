use std::{fmt, future::Future, path::PathBuf};

use anyhow::{Context, bail};
use clap::{ArgAction, Parser, Subcommand};
use dashboard_core::{
    Config, Coordinates, Dashboard, DashboardSettings, FixedLocation, HttpWeatherApi, Outcome,
    dashboard_from_config,
};
use inquire::{CustomType, InquireError, Select, Text};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-dashboard", version, about = "Current weather for any city")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Weather API base URL, overriding the config file.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Read configuration from this file instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive dashboard: detect location, then search or pick presets. (default)
    Dashboard,

    /// Show weather for a city.
    Show {
        /// City name, e.g. "London".
        city: String,
    },

    /// Show weather for the current location.
    Locate {
        /// Use this latitude instead of detecting the location.
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Use this longitude instead of detecting the location.
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },

    /// List the preset cities.
    Cities {
        /// Choose one interactively and show its weather.
        #[arg(long)]
        pick: bool,
    },

    /// Interactively set the API URL, default city and location source.
    Configure,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        if let Some(url) = &self.api_url {
            config.api_base_url = url.clone();
        }
        tracing::debug!("Using weather API at {}", config.api_base_url);

        match self.command.unwrap_or(Command::Dashboard) {
            Command::Dashboard => interactive(&dashboard_from_config(&config)?).await,
            Command::Show { city } => {
                let dash = dashboard_from_config(&config)?;
                run_rendered(&dash, dash.submit_city(&city)).await;
                exit_status(&dash)
            }
            Command::Locate { lat, lon } => {
                let dash = match lat.zip(lon) {
                    Some((lat, lon)) => Dashboard::new(
                        Box::new(HttpWeatherApi::new(&config.api_base_url)?),
                        Box::new(FixedLocation(Coordinates::new(lat, lon))),
                        DashboardSettings::from(&config),
                    ),
                    None => dashboard_from_config(&config)?,
                };
                run_rendered(&dash, dash.detect_location()).await;
                exit_status(&dash)
            }
            Command::Cities { pick: false } => {
                for (i, city) in config.presets().iter().enumerate() {
                    println!("{:>2}. {city}", i + 1);
                }
                Ok(())
            }
            Command::Cities { pick: true } => {
                let dash = dashboard_from_config(&config)?;
                let presets = dash.popular_cities().to_vec();
                let Some(city) = prompt(Select::new("City:", presets).prompt())? else {
                    return Ok(());
                };
                run_rendered(&dash, dash.select_city(&city)).await;
                exit_status(&dash)
            }
            Command::Configure => configure(config, self.config),
        }
    }
}

/// Drive `op`, printing the loading state as it appears and the settled state at the end.
async fn run_rendered(dash: &Dashboard, op: impl Future<Output = Outcome>) -> Outcome {
    let mut changes = dash.subscribe();
    tokio::pin!(op);

    loop {
        tokio::select! {
            outcome = &mut op => {
                if outcome != Outcome::Ignored {
                    print!("{}", render::state(&dash.state()));
                }
                return outcome;
            }
            Ok(()) = changes.changed() => {
                let state = changes.borrow_and_update().clone();
                if state.loading {
                    print!("{}", render::state(&state));
                }
            }
        }
    }
}

/// Non-zero exit when there is nothing but an error to show.
fn exit_status(dash: &Dashboard) -> anyhow::Result<()> {
    let state = dash.state();
    match (state.weather, state.error) {
        (None, Some(error)) => bail!(error),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone)]
enum Action {
    Search,
    Preset(String),
    UseMyLocation,
    Quit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Search => f.write_str("Search for a city"),
            Action::Preset(city) => write!(f, "{city}"),
            Action::UseMyLocation => f.write_str("Use my location"),
            Action::Quit => f.write_str("Quit"),
        }
    }
}

async fn interactive(dash: &Dashboard) -> anyhow::Result<()> {
    println!("Weather Dashboard");
    run_rendered(dash, dash.start()).await;

    let mut actions = vec![Action::Search];
    actions.extend(dash.popular_cities().iter().cloned().map(Action::Preset));
    actions.extend([Action::UseMyLocation, Action::Quit]);

    loop {
        println!();
        let Some(action) = prompt(Select::new("What next?", actions.clone()).prompt())? else {
            return Ok(());
        };

        match action {
            Action::Search => {
                let current = dash.state().query;
                let Some(text) = prompt(
                    Text::new("City:")
                        .with_initial_value(&current)
                        .with_placeholder("e.g. Mumbai, London")
                        .prompt(),
                )?
                else {
                    continue;
                };
                dash.set_query(&text);
                run_rendered(dash, dash.submit()).await;
            }
            Action::Preset(city) => {
                run_rendered(dash, dash.select_city(&city)).await;
            }
            Action::UseMyLocation => {
                run_rendered(dash, dash.detect_location()).await;
            }
            Action::Quit => return Ok(()),
        }
    }
}

/// Esc / Ctrl-C become `None`; anything else is a real error.
fn prompt<T>(answer: Result<T, InquireError>) -> anyhow::Result<Option<T>> {
    match answer {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(err) => Err(err).context("Prompt failed"),
    }
}

const SOURCE_IP: &str = "Detect from IP address";
const SOURCE_FIXED: &str = "Fixed coordinates";
const SOURCE_NONE: &str = "Disabled (always use the default city)";

fn configure(mut config: Config, path: Option<PathBuf>) -> anyhow::Result<()> {
    let Some(api_base_url) =
        prompt(Text::new("Weather API base URL:").with_default(&config.api_base_url).prompt())?
    else {
        return Ok(());
    };
    HttpWeatherApi::new(&api_base_url)?;
    config.api_base_url = api_base_url;

    let Some(default_city) =
        prompt(Text::new("Default city:").with_default(&config.default_city).prompt())?
    else {
        return Ok(());
    };
    config.default_city = default_city.trim().to_string();

    let sources = vec![SOURCE_IP, SOURCE_FIXED, SOURCE_NONE];
    let Some(source) = prompt(Select::new("Location source:", sources).prompt())? else {
        return Ok(());
    };

    let geo = &mut config.geolocation;
    match source {
        SOURCE_FIXED => {
            let Some(lat) = prompt(CustomType::<f64>::new("Latitude:").prompt())? else {
                return Ok(());
            };
            let Some(lon) = prompt(CustomType::<f64>::new("Longitude:").prompt())? else {
                return Ok(());
            };
            geo.latitude = Some(lat);
            geo.longitude = Some(lon);
        }
        other => {
            geo.latitude = None;
            geo.longitude = None;
            geo.ip_lookup = other == SOURCE_IP;
        }
    }

    let saved_to = match path {
        Some(path) => {
            config.save_to(&path)?;
            path
        }
        None => config.save()?,
    };
    println!("Configuration saved to {}", saved_to.display());

    Ok(())
}
