//! The one component that talks to the remote weather API.
//!
//! Owns the API key and request construction, normalizes responses into
//! [`WeatherSnapshot`]s and [`ForecastDay`]s, and pushes every successful
//! current reading through the [`UpdateBroadcaster`].

use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::{
    broadcast::UpdateBroadcaster,
    climate,
    error::{GatewayError, Result, truncate_body},
    model::{
        CurrentConditions, FiveDayRange, ForecastDay, LocationInfo, PlaceMatch, TimeInfo,
        WeatherSnapshot,
    },
};

const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1";

/// Gateway to the remote weather API.
///
/// `place` arguments accept either a free-text location name or a
/// `"lat,lon"` pair (the form a geolocation provider produces).
#[derive(Clone)]
pub struct WeatherGateway {
    api_key: String,
    base_url: String,
    http: Client,
    updates: Arc<UpdateBroadcaster>,
}

impl WeatherGateway {
    /// Gateway with its own private broadcaster.
    pub fn new(api_key: String) -> Self {
        Self::with_broadcaster(api_key, Arc::new(UpdateBroadcaster::new()))
    }

    /// Gateway publishing into a shared broadcaster.
    pub fn with_broadcaster(api_key: String, updates: Arc<UpdateBroadcaster>) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
            updates,
        }
    }

    /// Point the gateway at a different API root. Used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The broadcaster this gateway publishes into.
    pub fn updates(&self) -> Arc<UpdateBroadcaster> {
        Arc::clone(&self.updates)
    }

    /// The single retained latest snapshot, if any fetch has succeeded yet.
    pub fn latest_snapshot(&self) -> Option<Arc<WeatherSnapshot>> {
        self.updates.latest_weather()
    }

    /// Fetch current conditions, normalize them, replace the retained latest
    /// snapshot and broadcast it.
    ///
    /// Publishes exactly once per topic per successful call, in order:
    /// `weather_ready`, `temperature_changed`, `season_changed`.
    pub async fn fetch_current(&self, place: &str) -> Result<Arc<WeatherSnapshot>> {
        let parsed: WaCurrentResponse = self.get_json("current.json", &[("q", place)]).await?;
        let snapshot = Arc::new(normalize_current(parsed)?);

        self.updates.publish_weather_ready(Arc::clone(&snapshot));
        self.updates.publish_temperature_changed(snapshot.weather.temperature_c);
        self.updates.publish_season_changed(snapshot.season);

        tracing::debug!(
            place,
            temp_c = snapshot.weather.temperature_c,
            season = %snapshot.season,
            "current conditions fetched"
        );

        Ok(snapshot)
    }

    /// Fetch `days` calendar entries starting today.
    ///
    /// `days` is passed through as-is; the remote API clamps it to what the
    /// account allows. A failure leaves the retained snapshot untouched.
    pub async fn fetch_forecast(&self, place: &str, days: u32) -> Result<Vec<ForecastDay>> {
        let days = days.to_string();
        let parsed: WaForecastResponse =
            self.get_json("forecast.json", &[("q", place), ("days", days.as_str())]).await?;

        Ok(parsed.forecast.forecastday.into_iter().map(ForecastDay::from).collect())
    }

    /// Compose a chronological 4–5 day window: two single-date history legs
    /// (day before yesterday, yesterday) plus a 3-day forward forecast.
    ///
    /// Every leg is independently fallible. A failed history day is logged
    /// and omitted; a failed forecast leg degrades the result to whatever
    /// history survived. Only a wholly-empty result is an error.
    pub async fn fetch_five_day_range(&self, place: &str) -> Result<FiveDayRange> {
        let today = Local::now().date_naive();
        let day_before_yesterday = today - Duration::days(2);
        let yesterday = today - Duration::days(1);

        // Both history legs go out together; completions are awaited
        // individually so one failure cannot sink the other.
        let (first, second) = tokio::join!(
            self.fetch_history_day(place, day_before_yesterday),
            self.fetch_history_day(place, yesterday),
        );

        let mut forecast = Vec::new();
        for (date, leg) in [(day_before_yesterday, first), (yesterday, second)] {
            match leg {
                Ok(day) => forecast.push(day),
                Err(err) => {
                    tracing::warn!(place, date = %date, error = %err, "history day fetch failed, omitting day");
                }
            }
        }

        match self.fetch_forecast(place, 3).await {
            Ok(days) => forecast.extend(days),
            Err(err) => {
                tracing::warn!(place, error = %err, "forecast leg failed, keeping history days only");
            }
        }

        if forecast.is_empty() {
            return Err(GatewayError::NoData(place.to_string()));
        }

        Ok(FiveDayRange {
            location: self.latest_snapshot().map(|snapshot| snapshot.location.clone()),
            forecast,
        })
    }

    /// Look up locations matching a free-text query.
    pub async fn search_places(&self, query: &str) -> Result<Vec<PlaceMatch>> {
        let parsed: Vec<WaSearchEntry> = self.get_json("search.json", &[("q", query)]).await?;

        Ok(parsed
            .into_iter()
            .map(|entry| PlaceMatch {
                name: entry.name,
                region: entry.region,
                country: entry.country,
                latitude: entry.lat,
                longitude: entry.lon,
            })
            .collect())
    }

    async fn fetch_history_day(&self, place: &str, date: NaiveDate) -> Result<ForecastDay> {
        let dt = date.format("%Y-%m-%d").to_string();
        let parsed: WaForecastResponse =
            self.get_json("history.json", &[("q", place), ("dt", dt.as_str())]).await?;

        let entry = parsed.forecast.forecastday.into_iter().next().ok_or_else(|| {
            GatewayError::MalformedResponse(format!(
                "history response for {dt} contained no forecastday"
            ))
        })?;

        Ok(entry.into())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{endpoint}", self.base_url);
        tracing::debug!(endpoint, "requesting weather data");

        let res = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(GatewayError::Api { status, body: truncate_body(&body) });
        }

        serde_json::from_str(&body).map_err(|err| GatewayError::MalformedResponse(err.to_string()))
    }
}

impl std::fmt::Debug for WeatherGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The API key stays out of debug output.
        f.debug_struct("WeatherGateway").field("base_url", &self.base_url).finish_non_exhaustive()
    }
}

/// Turn a raw current-conditions response into a snapshot, deriving season
/// and day/night phase from latitude and local time.
fn normalize_current(parsed: WaCurrentResponse) -> Result<WeatherSnapshot> {
    let (month, hour) = climate::parse_localtime(&parsed.location.localtime).ok_or_else(|| {
        GatewayError::MalformedResponse(format!(
            "unusable location.localtime: {:?}",
            parsed.location.localtime
        ))
    })?;

    let season = climate::season_for(parsed.location.lat, month);
    let is_night = climate::is_night(hour, parsed.current.is_day);

    Ok(WeatherSnapshot {
        location: LocationInfo {
            name: parsed.location.name,
            region: parsed.location.region,
            country: parsed.location.country,
            latitude: parsed.location.lat,
            longitude: parsed.location.lon,
            local_time: parsed.location.localtime.clone(),
            timezone_id: parsed.location.tz_id,
        },
        time: TimeInfo { local_time: parsed.location.localtime, is_night },
        weather: CurrentConditions {
            temperature_c: parsed.current.temp_c,
            condition: parsed.current.condition.text,
            wind_kph: parsed.current.wind_kph,
            humidity_pct: parsed.current.humidity,
        },
        season,
    })
}

impl From<WaForecastDayEntry> for ForecastDay {
    fn from(entry: WaForecastDayEntry) -> Self {
        Self {
            date: entry.date,
            condition: entry.day.condition.text,
            icon_url: entry.day.condition.icon,
            avg_temp_c: entry.day.avgtemp_c,
            max_temp_c: entry.day.maxtemp_c,
            min_temp_c: entry.day.mintemp_c,
            wind_kph: entry.day.maxwind_kph,
            humidity_pct: entry.day.avghumidity.round() as u8,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    region: String,
    country: String,
    lat: f64,
    lon: f64,
    localtime: String,
    tz_id: String,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    condition: WaCondition,
    wind_kph: f64,
    humidity: u8,
    is_day: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WaCurrentResponse {
    location: WaLocation,
    current: WaCurrent,
}

#[derive(Debug, Deserialize)]
struct WaDay {
    condition: WaCondition,
    avgtemp_c: f64,
    maxtemp_c: f64,
    mintemp_c: f64,
    maxwind_kph: f64,
    avghumidity: f64,
}

#[derive(Debug, Deserialize)]
struct WaForecastDayEntry {
    date: String,
    day: WaDay,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    forecastday: Vec<WaForecastDayEntry>,
}

#[derive(Debug, Deserialize)]
struct WaForecastResponse {
    #[allow(dead_code)]
    location: WaLocation,
    forecast: WaForecast,
}

#[derive(Debug, Deserialize)]
struct WaSearchEntry {
    name: String,
    region: String,
    country: String,
    lat: f64,
    lon: f64,
}
