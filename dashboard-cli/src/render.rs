use dashboard_core::{DashboardState, WeatherReport, display};

/// Text rendering of the dashboard: error banner, then spinner or weather card.
pub fn state(state: &DashboardState) -> String {
    let mut out = String::new();

    if let Some(error) = &state.error {
        out.push_str(&format!("! {error}\n"));
    }

    if state.loading {
        if state.detecting_location {
            out.push_str("Detecting your location...\n");
        } else {
            out.push_str("Fetching weather data...\n");
        }
    } else if let Some(weather) = &state.weather {
        out.push_str(&card(weather));
    }

    out
}

pub fn card(w: &WeatherReport) -> String {
    let rows = [
        ("Feels Like", display::temperature(w.feels_like)),
        ("Humidity", display::humidity(w.humidity)),
        ("Wind Speed", display::wind_speed(w.wind_speed)),
        ("Pressure", display::pressure(w.pressure)),
    ];

    let mut out = format!(
        "\n{}, {}\n{}  {}\n\n",
        w.city,
        w.country,
        display::temperature(w.temperature),
        w.description,
    );
    for (label, value) in rows {
        out.push_str(&format!("  {label:<11} {value}\n"));
    }
    out.push_str(&format!("\nLast updated: {}\n", display::timestamp(w.timestamp)));

    out
}
