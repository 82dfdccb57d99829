use serde::{Deserialize, Serialize};

/// Derived climate phase for a place and month. Never fetched; always computed
/// from latitude and local month (see [`crate::climate::season_for`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
    Wet,
    Dry,
}

impl Season {
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
            Season::Winter => "winter",
            Season::Wet => "wet",
            Season::Dry => "dry",
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the reading was taken, as reported by the remote API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationInfo {
    pub name: String,
    pub region: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Local wall-clock time at the location, e.g. "2024-01-15 14:00".
    pub local_time: String,
    /// IANA timezone id, e.g. "Australia/Melbourne".
    pub timezone_id: String,
}

/// Local-time facts derived for the reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeInfo {
    pub local_time: String,
    pub is_night: bool,
}

/// Current conditions, passed through unrounded from the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_c: f64,
    pub condition: String,
    pub wind_kph: f64,
    pub humidity_pct: u8,
}

/// One complete, immutable, normalized weather reading for a place and time.
///
/// Created once per successful current fetch and shared as
/// `Arc<WeatherSnapshot>`; the next successful fetch replaces it wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location: LocationInfo,
    pub time: TimeInfo,
    pub weather: CurrentConditions,
    pub season: Season,
}

/// One calendar day of a forecast or history response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastDay {
    /// ISO date, "YYYY-MM-DD".
    pub date: String,
    pub condition: String,
    pub icon_url: String,
    pub avg_temp_c: f64,
    pub max_temp_c: f64,
    pub min_temp_c: f64,
    pub wind_kph: f64,
    pub humidity_pct: u8,
}

/// Composed 4–5 day window around today: surviving history days followed by
/// the forward forecast, chronological.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiveDayRange {
    /// Location of the latest retained snapshot, if one exists. The caller
    /// already knows the place string it asked for.
    pub location: Option<LocationInfo>,
    pub forecast: Vec<ForecastDay>,
}

/// One row of a location-search response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceMatch {
    pub name: String,
    pub region: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}
