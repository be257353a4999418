//! Nominatim geocoding (https://nominatim.openstreetmap.org/).
//!
//! The public instance allows one request per second per client; every call
//! goes through a [`Throttle`].

use reqwest::Client;
use serde_json::{Value, json};

use super::http;
use crate::{
    Config, NormalizedResponse,
    error::FetchError,
    model::{Coordinates, JsonMap, timestamp_now},
    throttle::Throttle,
};

const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";
const SEARCH_API: &str = "Nominatim Geocoding";
const REVERSE_API: &str = "Nominatim Reverse Geocoding";

#[derive(Debug)]
pub struct Nominatim {
    http: Client,
    throttle: Throttle,
    base_url: String,
}

impl Nominatim {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        Ok(Self {
            http: http::build_client(&config.user_agent, config.request_timeout())?,
            throttle: Throttle::new(config.nominatim_rate_limit()),
            base_url: NOMINATIM_BASE_URL.to_string(),
        })
    }

    /// Forward geocoding: place name to candidate locations.
    pub async fn search(&self, query: &str, limit: u32) -> NormalizedResponse {
        self.throttle.wait().await;

        let url = format!("{}/search", self.base_url);
        let params = [
            ("q", query.to_string()),
            ("format", "json".to_string()),
            ("limit", limit.to_string()),
            ("addressdetails", "1".to_string()),
        ];

        match http::get_json(&self.http, &url, &params, None).await {
            Ok(results) => search_response(query, results, timestamp_now()),
            Err(err) => {
                tracing::warn!(api = SEARCH_API, query, error = %err, "geocoding failed");
                NormalizedResponse::error_response(SEARCH_API, err.to_string())
            }
        }
    }

    /// Reverse geocoding: coordinates to the nearest address.
    pub async fn reverse(&self, coords: Coordinates) -> NormalizedResponse {
        self.throttle.wait().await;

        let url = format!("{}/reverse", self.base_url);
        let params = [
            ("lat", coords.lat.to_string()),
            ("lon", coords.lon.to_string()),
            ("format", "json".to_string()),
            ("addressdetails", "1".to_string()),
        ];

        match http::get_json(&self.http, &url, &params, None).await {
            Ok(result) => reverse_response(coords, result, timestamp_now()),
            Err(err) => {
                tracing::warn!(api = REVERSE_API, %coords, error = %err, "reverse geocoding failed");
                NormalizedResponse::error_response(REVERSE_API, err.to_string())
            }
        }
    }
}

fn search_response(query: &str, results: Value, fetched_at: String) -> NormalizedResponse {
    let count = results.as_array().map_or(0, Vec::len);

    let mut meta = JsonMap::new();
    meta.insert("fetched_at".into(), json!(fetched_at));
    meta.insert("api".into(), json!(SEARCH_API));
    meta.insert("result_count".into(), json!(count));

    let mut resp = NormalizedResponse::new();
    resp.insert("query", json!(query));
    resp.insert("results", results);
    resp.set_metadata(meta);
    resp
}

fn reverse_response(coords: Coordinates, result: Value, fetched_at: String) -> NormalizedResponse {
    let mut meta = JsonMap::new();
    meta.insert("fetched_at".into(), json!(fetched_at));
    meta.insert("api".into(), json!(REVERSE_API));

    let mut resp = NormalizedResponse::new();
    resp.insert("coordinates", json!(coords));
    resp.insert("result", result);
    resp.set_metadata(meta);
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::METADATA_KEY;

    #[test]
    fn search_wraps_results_with_count() {
        let results = json!([
            { "display_name": "Bergen, Vestland, Norge", "lat": "60.3943", "lon": "5.3259" },
            { "display_name": "Bergen, Noord-Holland", "lat": "52.6696", "lon": "4.6989" }
        ]);
        let resp = search_response("Bergen, Norway", results, "t".into());

        assert_eq!(resp.get("query").unwrap(), "Bergen, Norway");
        assert_eq!(resp.metadata().unwrap()["result_count"], 2);
        assert_eq!(resp.metadata().unwrap()["api"], SEARCH_API);

        let keys: Vec<_> = resp.as_map().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["query", "results", METADATA_KEY]);
    }

    #[test]
    fn non_list_search_body_counts_as_empty() {
        let resp = search_response("x", json!({ "error": "bad" }), "t".into());
        assert_eq!(resp.metadata().unwrap()["result_count"], 0);
    }

    #[test]
    fn reverse_keeps_requested_coordinates() {
        let resp = reverse_response(
            Coordinates::new(60.0, 5.0),
            json!({ "display_name": "Stolmen, Austevoll" }),
            "t".into(),
        );
        assert_eq!(resp.get("coordinates").unwrap(), &json!({ "lat": 60.0, "lon": 5.0 }));
        assert_eq!(resp.get("result").unwrap()["display_name"], "Stolmen, Austevoll");
        assert_eq!(resp.metadata().unwrap()["api"], REVERSE_API);
    }

    #[tokio::test]
    async fn unreachable_server_yields_error_response() {
        let cfg = Config {
            request_timeout_secs: 2,
            nominatim_rate_limit_secs: 0.0,
            ..Config::default()
        };
        let mut client = Nominatim::new(&cfg).unwrap();
        // Port 9 (discard) on loopback refuses connections.
        client.base_url = "http://127.0.0.1:9".to_string();

        let resp = client.search("Bergen", 1).await;
        assert!(resp.is_error());
        assert_eq!(resp.get("api").unwrap(), SEARCH_API);
        assert!(resp.get("timestamp").is_some());
    }
}
