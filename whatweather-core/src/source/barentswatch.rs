//! BarentsWatch coastal data.
//!
//! The API needs a bearer token. Without one configured the source still
//! answers, with a static description of what the service offers.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::{FetchRequest, SourceId, WeatherSource, http};
use crate::{
    Config, NormalizedResponse,
    error::FetchError,
    model::{JsonMap, timestamp_now},
};

const FISHING_FACILITY_URL: &str = "https://www.barentswatch.no/bwapi/v1/geodata/download/fishingfacility";
const API_NAME: &str = "BarentsWatch";
const DOCUMENTATION_URL: &str = "https://www.barentswatch.no/en/articles/api-documentation/";

const FEATURES: &[&str] = &[
    "Ship traffic data (AIS)",
    "Fishing vessel positions",
    "Weather observations",
    "Sea temperature",
    "Wave height and direction",
    "Coastal zone information",
];

#[derive(Clone)]
pub struct BarentsWatch {
    http: Client,
    api_key: Option<String>,
}

// Keeps the token out of logs.
impl std::fmt::Debug for BarentsWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarentsWatch")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl BarentsWatch {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        Ok(Self {
            http: http::build_client(&config.user_agent, config.request_timeout())?,
            api_key: config.barentswatch_api_key.clone(),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// What the source returns when no key is configured.
    pub fn demo_response() -> NormalizedResponse {
        let mut meta = JsonMap::new();
        meta.insert("fetched_at".into(), json!(timestamp_now()));
        meta.insert("api".into(), json!(API_NAME));
        meta.insert("note".into(), json!("API key required for real data access"));

        let mut resp = NormalizedResponse::new();
        resp.set_metadata(meta);
        resp.insert(
            "info",
            json!("BarentsWatch API provides coastal and marine data for Norway"),
        );
        resp.insert("features", json!(FEATURES));
        resp.insert("documentation", json!(DOCUMENTATION_URL));
        resp.insert(
            "note",
            json!("This is a demo response. Real implementation requires API authentication."),
        );
        resp
    }

    async fn fetch_fishing_facilities(&self, token: &str) -> Result<NormalizedResponse, FetchError> {
        let payload = http::get_json(&self.http, FISHING_FACILITY_URL, &[], Some(token)).await?;

        let mut meta = JsonMap::new();
        meta.insert("fetched_at".into(), json!(timestamp_now()));
        meta.insert("api".into(), json!(API_NAME));

        let mut resp = NormalizedResponse::from_payload(payload);
        resp.set_metadata(meta);
        Ok(resp)
    }
}

#[async_trait]
impl WeatherSource for BarentsWatch {
    fn id(&self) -> SourceId {
        SourceId::BarentsWatch
    }

    async fn fetch(&self, _request: &FetchRequest) -> NormalizedResponse {
        let Some(token) = self.api_key.as_deref() else {
            tracing::info!("no BarentsWatch API key configured, returning demo response");
            return Self::demo_response();
        };

        match self.fetch_fishing_facilities(token).await {
            Ok(resp) => resp,
            Err(err) => {
                tracing::warn!(api = API_NAME, error = %err, "fetch failed");
                let mut resp = NormalizedResponse::error_response(API_NAME, err.to_string());
                resp.insert("note", json!("API key authentication required"));
                resp
            }
        }
    }
}
