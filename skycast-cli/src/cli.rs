use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};
use skycast_core::{Config, ForecastDay, WeatherGateway, WeatherSnapshot};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skycast", version, about = "Weather fetch-and-broadcast CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the weather API key and an optional default place.
    Configure,

    /// Show current conditions for a place.
    Current {
        /// Place name or "lat,lon"; falls back to the configured default.
        #[arg(allow_hyphen_values = true)]
        place: Option<String>,
    },

    /// Show a multi-day forecast starting today.
    Forecast {
        /// Place name or "lat,lon"; falls back to the configured default.
        #[arg(allow_hyphen_values = true)]
        place: Option<String>,

        /// Calendar days to request; large values are clamped by the remote API.
        #[arg(long, default_value_t = 5)]
        days: u32,
    },

    /// Show the composed window: two past days plus a 3-day forecast.
    Range {
        /// Place name or "lat,lon"; falls back to the configured default.
        #[arg(allow_hyphen_values = true)]
        place: Option<String>,
    },

    /// Search for locations matching a query.
    Search {
        /// Free-text location query, e.g. "Melb".
        query: String,
    },

    /// Re-fetch periodically and print each update as it is broadcast.
    Watch {
        /// Place name or "lat,lon"; falls back to the configured default.
        #[arg(allow_hyphen_values = true)]
        place: Option<String>,

        /// Seconds between fetches.
        #[arg(long, default_value_t = 600)]
        interval: u64,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Current { place } => {
                let (gateway, config) = gateway_from_config()?;
                let place = config.resolve_place(place.as_deref())?;
                let snapshot = gateway.fetch_current(place).await?;
                print_snapshot(&snapshot);
                Ok(())
            }
            Command::Forecast { place, days } => {
                let (gateway, config) = gateway_from_config()?;
                let place = config.resolve_place(place.as_deref())?;
                let forecast = gateway.fetch_forecast(place, days).await?;
                println!("Forecast for {place}:");
                print_days(&forecast);
                Ok(())
            }
            Command::Range { place } => {
                let (gateway, config) = gateway_from_config()?;
                let place = config.resolve_place(place.as_deref())?;
                let range = gateway.fetch_five_day_range(place).await?;

                let label = range
                    .location
                    .map(|loc| format!("{}, {}", loc.name, loc.country))
                    .unwrap_or_else(|| place.to_string());
                println!("Five-day window for {label}:");
                print_days(&range.forecast);
                Ok(())
            }
            Command::Search { query } => {
                let (gateway, _) = gateway_from_config()?;
                let matches = gateway.search_places(&query).await?;

                if matches.is_empty() {
                    println!("No matching locations found.");
                    return Ok(());
                }
                for place in matches {
                    println!(
                        "{}, {}, {}  ({:.2},{:.2})",
                        place.name, place.region, place.country, place.latitude, place.longitude
                    );
                }
                Ok(())
            }
            Command::Watch { place, interval } => {
                let (gateway, config) = gateway_from_config()?;
                let place = config.resolve_place(place.as_deref())?.to_string();
                watch(gateway, place, Duration::from_secs(interval)).await
            }
        }
    }
}

/// Interactive configuration, persisted next to other platform config.
fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("Weather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if !api_key.trim().is_empty() {
        config.api_key = Some(api_key.trim().to_string());
    }

    let default_place = Text::new("Default place (leave empty for none):")
        .with_initial_value(config.default_place.as_deref().unwrap_or(""))
        .prompt()
        .context("Failed to read default place")?;
    let default_place = default_place.trim();
    config.default_place =
        if default_place.is_empty() { None } else { Some(default_place.to_string()) };

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn gateway_from_config() -> anyhow::Result<(WeatherGateway, Config)> {
    let config = Config::load()?;
    let api_key = config.require_api_key()?.to_string();
    Ok((WeatherGateway::new(api_key), config))
}

/// Periodic re-fetch: output flows through broadcaster subscriptions, not
/// through the fetch return value, so this doubles as a live demonstration
/// of the update fan-out.
async fn watch(gateway: WeatherGateway, place: String, interval: Duration) -> anyhow::Result<()> {
    let updates = gateway.updates();

    let _weather_sub = updates.on_weather_ready(|snapshot| {
        print_snapshot(snapshot);
        Ok(())
    });
    let _season_sub = updates.on_season_changed(|season| {
        tracing::debug!(%season, "season broadcast");
        Ok(())
    });

    println!("Watching {place} every {}s (ctrl-c to stop)", interval.as_secs());

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = gateway.fetch_current(&place).await {
                    // A failed cycle is reported and the watch keeps going.
                    eprintln!("fetch failed: {err}");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Stopped.");
                return Ok(());
            }
        }
    }
}

fn print_snapshot(snapshot: &WeatherSnapshot) {
    let location = &snapshot.location;
    let weather = &snapshot.weather;
    let phase = if snapshot.time.is_night { "night" } else { "day" };

    println!("{}, {} ({})", location.name, location.country, location.local_time);
    println!(
        "  {:.0}°C  {}  wind {:.0} kph  humidity {}%",
        weather.temperature_c, weather.condition, weather.wind_kph, weather.humidity_pct
    );
    println!("  season: {} ({})", snapshot.season, phase);
}

fn print_days(days: &[ForecastDay]) {
    for day in days {
        println!(
            "  {}  {:>5.1}°C  ({:.1} to {:.1})  {}",
            friendly_date(&day.date),
            day.avg_temp_c,
            day.min_temp_c,
            day.max_temp_c,
            day.condition
        );
    }
}

/// "2024-01-15" as "Mon 15 Jan"; unparseable dates print as-is.
fn friendly_date(date: &str) -> String {
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%a %d %b").to_string())
        .unwrap_or_else(|_| date.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_current_with_place() {
        let cli = Cli::try_parse_from(["skycast", "current", "Melbourne"]).expect("parse");
        match cli.command {
            Command::Current { place } => assert_eq!(place.as_deref(), Some("Melbourne")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn forecast_days_defaults_to_five() {
        let cli = Cli::try_parse_from(["skycast", "forecast", "Oslo"]).expect("parse");
        match cli.command {
            Command::Forecast { days, .. } => assert_eq!(days, 5),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn coordinates_are_accepted_as_a_place() {
        let cli = Cli::try_parse_from(["skycast", "current", "-37.8,144.96"]).expect("parse");
        match cli.command {
            Command::Current { place } => assert_eq!(place.as_deref(), Some("-37.8,144.96")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn watch_interval_is_configurable() {
        let cli = Cli::try_parse_from(["skycast", "watch", "Oslo", "--interval", "30"])
            .expect("parse");
        match cli.command {
            Command::Watch { interval, .. } => assert_eq!(interval, 30),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
