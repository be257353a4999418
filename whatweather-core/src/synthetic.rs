//! # Synthetic Tide Model
//!
//! Fallback sea-level series for when the Kartverket tide service cannot be
//! reached. It is a two-constituent semi-diurnal approximation:
//!
//! - **M2** (principal lunar): period 12.42 h, full weight
//! - **S2** (principal solar): period 12.00 h, weight 0.3
//!
//! The curve oscillates around the midpoint of mean high and mean low water and
//! is driven only by the hours elapsed since the start of the window, so a
//! fixed `(from, to)` pair always yields the same series.
//!
//! The default water levels (150 cm / 50 cm) are a rough figure for the
//! Norwegian coast, not a station-specific harmonic prediction.

use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use std::f64::consts::PI;

use crate::model::{Coordinates, JsonMap, NormalizedResponse, TimeseriesEntry, timestamp_now};

/// Detail key carried by every generated entry.
pub const SEA_LEVEL_KEY: &str = "sea_surface_height_above_chart_datum";

const M2_PERIOD_HOURS: f64 = 12.42;
const S2_PERIOD_HOURS: f64 = 12.0;
const S2_WEIGHT: f64 = 0.3;

/// Water-level constants for the synthetic curve, in centimetres above chart datum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TideModel {
    pub mean_high_water_cm: f64,
    pub mean_low_water_cm: f64,
}

impl Default for TideModel {
    fn default() -> Self {
        Self {
            mean_high_water_cm: 150.0,
            mean_low_water_cm: 50.0,
        }
    }
}

impl TideModel {
    pub fn mean_tide(&self) -> f64 {
        (self.mean_high_water_cm + self.mean_low_water_cm) / 2.0
    }

    pub fn tidal_range(&self) -> f64 {
        self.mean_high_water_cm - self.mean_low_water_cm
    }

    /// Height in cm, rounded to one decimal, `hours` after the window start.
    pub fn height_at(&self, hours: f64) -> f64 {
        let m2 = (2.0 * PI * hours / M2_PERIOD_HOURS).sin();
        let s2 = S2_WEIGHT * (2.0 * PI * hours / S2_PERIOD_HOURS).sin();
        let height = self.mean_tide() + (self.tidal_range() / 2.0) * (m2 + s2);
        (height * 10.0).round() / 10.0
    }

    /// One entry per whole hour from `from` to `to`, both ends inclusive.
    ///
    /// An inverted window yields an empty series.
    pub fn series(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<TimeseriesEntry> {
        let step = Duration::hours(1);
        let mut entries = Vec::new();
        let mut current = from;

        while current <= to {
            let hours = (current - from).num_seconds() as f64 / 3600.0;
            entries.push(
                TimeseriesEntry::new(current.format("%Y-%m-%dT%H:%M:%S+00:00").to_string())
                    .with_detail(SEA_LEVEL_KEY, self.height_at(hours)),
            );
            match current.checked_add_signed(step) {
                Some(next) => current = next,
                None => break,
            }
        }

        entries
    }
}

/// Hourly synthetic tide heights using the default water levels.
pub fn generate_tide_series(from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<TimeseriesEntry> {
    TideModel::default().series(from, to)
}

/// A complete tide response built from the synthetic model.
///
/// Shaped like a parsed Kartverket answer (`Feature` with `[lon, lat]`
/// coordinates, `properties.meta.units` and `properties.timeseries`) so every
/// renderer treats it exactly like live data.
pub fn sample_tide_response(
    coords: Coordinates,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    days_ahead: u32,
) -> NormalizedResponse {
    let timeseries: Vec<Value> = generate_tide_series(from, to)
        .iter()
        .map(TimeseriesEntry::to_json)
        .collect();

    let mut resp = NormalizedResponse::from_payload(json!({
        "type": "Feature",
        "geometry": {
            "type": "Point",
            "coordinates": [coords.lon, coords.lat]
        },
        "properties": {
            "meta": {
                "updated_at": timestamp_now(),
                "station_name": "Sample Data (API Unavailable)",
                "station_code": "SAMPLE",
                "data_source": "Generated sample tide predictions",
                "units": { SEA_LEVEL_KEY: "cm" }
            },
            "timeseries": timeseries
        }
    }));

    let mut meta = JsonMap::new();
    meta.insert("fetched_at".into(), json!(timestamp_now()));
    meta.insert("location".into(), json!(format!("Coordinates: {coords}")));
    meta.insert("coordinates".into(), json!(coords));
    meta.insert("station".into(), json!("sample"));
    meta.insert("api".into(), json!("Kartverket Tide API (Sample Data)"));
    meta.insert("forecast_period_days".into(), json!(days_ahead));
    meta.insert("note".into(), json!("Sample data generated - API unavailable"));
    resp.set_metadata(meta);

    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn three_hour_window_yields_three_entries() {
        let series = generate_tide_series(at(0), at(2));

        let times: Vec<_> = series.iter().filter_map(|e| e.time.as_deref()).collect();
        assert_eq!(
            times,
            vec![
                "2024-01-01T00:00:00+00:00",
                "2024-01-01T01:00:00+00:00",
                "2024-01-01T02:00:00+00:00",
            ]
        );
        assert_eq!(series[0].detail(SEA_LEVEL_KEY), Some(100.0));
    }

    #[test]
    fn each_entry_carries_only_the_sea_level_key() {
        for entry in generate_tide_series(at(0), at(5)) {
            assert_eq!(entry.details.len(), 1);
            assert!(entry.details.contains_key(SEA_LEVEL_KEY));
            assert!(entry.next_1_hours.is_none());
        }
    }

    #[test]
    fn entry_count_matches_whole_hours_plus_one() {
        let from = at(0);
        for minutes in [0, 59, 60, 61, 7 * 24 * 60, 7 * 24 * 60 + 30] {
            let to = from + Duration::minutes(minutes);
            let expected = (minutes / 60) as usize + 1;
            assert_eq!(generate_tide_series(from, to).len(), expected, "minutes={minutes}");
        }
    }

    #[test]
    fn heights_stay_in_band_and_times_increase() {
        let from = Utc.with_ymd_and_hms(2024, 3, 10, 7, 13, 0).unwrap();
        let series = generate_tide_series(from, from + Duration::days(7));

        for pair in series.windows(2) {
            let a = DateTime::parse_from_rfc3339(pair[0].time.as_deref().unwrap()).unwrap();
            let b = DateTime::parse_from_rfc3339(pair[1].time.as_deref().unwrap()).unwrap();
            assert!(a < b);
        }
        for entry in &series {
            let h = entry.detail(SEA_LEVEL_KEY).unwrap();
            assert!((0.0..=200.0).contains(&h), "height {h} out of range");
        }
    }

    #[test]
    fn identical_windows_are_bit_identical() {
        let a = generate_tide_series(at(3), at(23));
        let b = generate_tide_series(at(3), at(23));
        assert_eq!(a, b);
    }

    #[test]
    fn heights_are_rounded_to_one_decimal() {
        let model = TideModel::default();
        for h in 0..48 {
            let v = model.height_at(h as f64);
            assert!(((v * 10.0).round() - v * 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn quarter_period_is_near_high_water() {
        // sin(pi/2) for M2 plus a small S2 contribution
        let v = TideModel::default().height_at(M2_PERIOD_HOURS / 4.0);
        assert!(v > 140.0 && v < 170.0, "got {v}");
    }

    #[test]
    fn inverted_window_is_empty() {
        assert!(generate_tide_series(at(5), at(1)).is_empty());
    }

    #[test]
    fn sample_response_is_timeseries_shaped() {
        let coords = Coordinates::new(60.39, 5.32);
        let resp = sample_tide_response(coords, at(0), at(3), 7);

        let ts = resp.get("properties").unwrap()["timeseries"].as_array().unwrap();
        assert_eq!(ts.len(), 4);
        assert_eq!(resp.get("geometry").unwrap()["coordinates"], json!([5.32, 60.39]));
        assert_eq!(
            resp.get("properties").unwrap()["meta"]["units"][SEA_LEVEL_KEY],
            json!("cm")
        );
        let meta = resp.metadata().unwrap();
        assert_eq!(meta["station"], json!("sample"));
        assert_eq!(meta["forecast_period_days"], json!(7));
        assert!(resp.error().is_none());
    }
}
