//! Kartverket tide predictions (https://api.sehavniva.no/).
//!
//! The service is asked for its tab-separated format and the rows are
//! reshaped into the same `Feature`/`timeseries` layout the MET products use.
//! When the service cannot be reached the synthetic tide model stands in.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde_json::{Value, json};

use super::{FetchRequest, SourceId, WeatherSource, http};
use crate::{
    Config, NormalizedResponse,
    error::FetchError,
    model::{Coordinates, JsonMap, TimeseriesEntry, timestamp_now},
    synthetic::{SEA_LEVEL_KEY, sample_tide_response},
};

const TIDE_URL: &str = "https://api.sehavniva.no/tideapi.php";
const API_NAME: &str = "Kartverket Tide API";
const QUERY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Permanent water level stations along the coast.
const STATIONS: &[(&str, &str)] = &[
    ("bergen", "BGO"),
    ("stavanger", "SVG"),
    ("oslo", "OSL"),
    ("trondheim", "TRD"),
    ("tromso", "TOS"),
    ("kristiansand", "KRS"),
    ("alesund", "AES"),
    ("bodo", "BOO"),
    ("haugesund", "HAU"),
    ("andenes", "AND"),
];

/// Station code for a named station, case-insensitive.
pub fn tide_station_code(name: &str) -> Option<&'static str> {
    let name = name.trim().to_lowercase();
    STATIONS
        .iter()
        .find(|(station, _)| *station == name)
        .map(|(_, code)| *code)
}

pub fn station_names() -> impl Iterator<Item = &'static str> {
    STATIONS.iter().map(|(name, _)| *name)
}

/// Station details pulled out of the tab body.
#[derive(Debug, Clone, PartialEq)]
pub struct TideTable {
    pub station_name: String,
    pub entries: Vec<TimeseriesEntry>,
}

/// Parse the service's `datatype=tab` body.
///
/// Comment lines (`#`), the column header (`time ...`) and blank lines are
/// skipped; a `Location:` comment names the station. Data rows are
/// `time<TAB>value`, rows whose value is not a number are dropped.
pub fn parse_tab_format(raw: &str) -> Result<TideTable, FetchError> {
    let raw = raw.trim();
    if raw.starts_with('<') {
        return Err(FetchError::Tide("expected tab-separated data, got markup".into()));
    }

    let mut station_name = String::from("Unknown");
    let mut entries = Vec::new();

    for line in raw.lines() {
        if line.starts_with('#') || line.starts_with("time") || line.trim().is_empty() {
            if let Some((_, name)) = line.split_once("Location:") {
                station_name = name.trim().to_string();
            }
            continue;
        }

        let mut parts = line.split('\t');
        let (Some(time), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };

        match value.trim().parse::<f64>() {
            Ok(height) => {
                entries.push(TimeseriesEntry::new(time.trim()).with_detail(SEA_LEVEL_KEY, height))
            }
            Err(_) => tracing::debug!(line, "skipping unparsable tide row"),
        }
    }

    Ok(TideTable {
        station_name,
        entries,
    })
}

impl TideTable {
    /// The GeoJSON-like payload the renderers expect.
    pub fn into_payload(self, coords: Coordinates) -> Value {
        let timeseries: Vec<Value> = self.entries.iter().map(TimeseriesEntry::to_json).collect();

        json!({
            "type": "Feature",
            "geometry": {
                "type": "Point",
                "coordinates": [coords.lon, coords.lat]
            },
            "properties": {
                "meta": {
                    "updated_at": timestamp_now(),
                    "station_name": self.station_name,
                    "station_code": "N/A",
                    "units": { SEA_LEVEL_KEY: "cm" }
                },
                "timeseries": timeseries
            }
        })
    }
}

#[derive(Debug, Clone)]
pub struct KartverketTide {
    http: Client,
    station: Option<String>,
    base_url: String,
}

impl KartverketTide {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        Ok(Self {
            http: http::build_client(&config.user_agent, config.tide_timeout())?,
            station: None,
            base_url: TIDE_URL.to_string(),
        })
    }

    /// Record a named station in the response metadata.
    pub fn with_station(mut self, station: impl Into<String>) -> Self {
        self.station = Some(station.into());
        self
    }

    pub fn query(coords: Coordinates, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<(&'static str, String)> {
        vec![
            ("lat", coords.lat.to_string()),
            ("lon", coords.lon.to_string()),
            ("fromtime", from.format(QUERY_TIME_FORMAT).to_string()),
            ("totime", to.format(QUERY_TIME_FORMAT).to_string()),
            ("datatype", "tab".into()),
            ("refcode", "cd".into()),
            ("place", String::new()),
            ("file", String::new()),
            ("lang", "en".into()),
            ("interval", "60".into()),
            ("dst", "0".into()),
        ]
    }

    fn metadata(&self, request: &FetchRequest) -> JsonMap {
        let coords = request.location;
        let mut meta = JsonMap::new();
        meta.insert("fetched_at".into(), json!(timestamp_now()));
        meta.insert("location".into(), json!(format!("Coordinates: {coords}")));
        meta.insert("coordinates".into(), json!(coords));
        meta.insert(
            "station".into(),
            json!(self.station.as_deref().unwrap_or("auto")),
        );
        meta.insert("api".into(), json!(API_NAME));
        meta.insert("forecast_period_days".into(), json!(request.days_ahead));
        meta
    }
}

/// End of a prediction window `days` after `from`, if the calendar reaches that far.
pub fn window_end(from: DateTime<Utc>, days: u32) -> Result<DateTime<Utc>, FetchError> {
    Duration::try_days(i64::from(days))
        .and_then(|span| from.checked_add_signed(span))
        .ok_or_else(|| FetchError::InvalidRequest(format!("a {days}-day tide window is out of range")))
}

/// Anything that kept us from getting an answer, as opposed to a bad answer.
fn is_unavailable(err: &FetchError) -> bool {
    matches!(err, FetchError::Http(_) | FetchError::Status { .. })
}

#[async_trait]
impl WeatherSource for KartverketTide {
    fn id(&self) -> SourceId {
        SourceId::Tide
    }

    async fn fetch(&self, request: &FetchRequest) -> NormalizedResponse {
        let from = Utc::now();
        let to = match window_end(from, request.days_ahead) {
            Ok(to) => to,
            Err(err) => {
                tracing::warn!(error = %err, "tide request rejected");
                return NormalizedResponse::error_response(API_NAME, err.to_string());
            }
        };
        let query = Self::query(request.location, from, to);

        let result = match http::get_text(&self.http, &self.base_url, &query, None).await {
            Ok(body) => parse_tab_format(&body),
            Err(err) => Err(err),
        };

        match result {
            Ok(table) => {
                tracing::debug!(rows = table.entries.len(), station = %table.station_name, "tide data parsed");
                let mut resp = NormalizedResponse::from_payload(table.into_payload(request.location));
                resp.set_metadata(self.metadata(request));
                resp
            }
            Err(err) if is_unavailable(&err) => {
                tracing::warn!(error = %err, "tide service unavailable, generating sample data");
                sample_tide_response(request.location, from, to, request.days_ahead)
            }
            Err(err) => {
                tracing::warn!(error = %err, "tide response rejected");
                NormalizedResponse::error_response(API_NAME, err.to_string())
            }
        }
    }
}
