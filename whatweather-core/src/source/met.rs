//! MET Norway weather API products.
//!
//! All four products are a single GET with a handful of query parameters;
//! they differ only in endpoint, parameters and the metadata recorded.
//! API docs: https://api.met.no/weatherapi/

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use super::{FetchRequest, SourceId, WeatherSource, http};
use crate::{
    Config, NormalizedResponse,
    error::FetchError,
    model::{JsonMap, timestamp_now},
};

const MET_BASE_URL: &str = "https://api.met.no/weatherapi";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetProduct {
    Oceanforecast,
    Locationforecast,
    Textforecast,
    Nowcast,
}

impl MetProduct {
    pub fn url(&self) -> String {
        let path = match self {
            MetProduct::Oceanforecast => "oceanforecast/2.0/complete",
            MetProduct::Locationforecast => "locationforecast/2.0/compact",
            MetProduct::Textforecast => "textforecast/2.0/landoverview",
            MetProduct::Nowcast => "nowcast/2.0/complete",
        };
        format!("{MET_BASE_URL}/{path}")
    }

    pub fn api_name(&self) -> &'static str {
        match self {
            MetProduct::Oceanforecast => "Oceanforecast 2.0",
            MetProduct::Locationforecast => "Locationforecast 2.0",
            MetProduct::Textforecast => "Textforecast 2.0",
            MetProduct::Nowcast => "Nowcast 2.0",
        }
    }

    pub fn source_id(&self) -> SourceId {
        match self {
            MetProduct::Oceanforecast => SourceId::Oceanforecast,
            MetProduct::Locationforecast => SourceId::Locationforecast,
            MetProduct::Textforecast => SourceId::Textforecast,
            MetProduct::Nowcast => SourceId::Nowcast,
        }
    }

    pub fn query(&self, request: &FetchRequest) -> Vec<(&'static str, String)> {
        let coords = || {
            vec![
                ("lat", request.location.lat.to_string()),
                ("lon", request.location.lon.to_string()),
            ]
        };

        match self {
            MetProduct::Textforecast => vec![("language", request.language.clone())],
            MetProduct::Locationforecast => {
                let mut q = coords();
                if let Some(altitude) = request.altitude {
                    q.push(("altitude", altitude.to_string()));
                }
                q
            }
            MetProduct::Oceanforecast | MetProduct::Nowcast => coords(),
        }
    }

    pub fn metadata(&self, request: &FetchRequest, fetched_at: String) -> JsonMap {
        let mut meta = JsonMap::new();
        meta.insert("fetched_at".into(), json!(fetched_at));

        match self {
            MetProduct::Textforecast => {
                meta.insert("language".into(), json!(request.language));
            }
            MetProduct::Locationforecast => {
                meta.insert(
                    "coordinates".into(),
                    json!({
                        "lat": request.location.lat,
                        "lon": request.location.lon,
                        "altitude": request.altitude,
                    }),
                );
            }
            MetProduct::Oceanforecast | MetProduct::Nowcast => {
                meta.insert("coordinates".into(), json!(request.location));
            }
        }

        meta.insert("api".into(), json!(self.api_name()));
        meta
    }

    /// Textforecast may answer with XML; anything that isn't JSON is kept as text.
    fn decode(&self, body: String) -> Result<Value, FetchError> {
        match self {
            MetProduct::Textforecast => {
                Ok(serde_json::from_str(&body).unwrap_or_else(|_| json!({ "text": body })))
            }
            _ => Ok(serde_json::from_str(&body)?),
        }
    }
}

/// Client for one MET Norway product.
#[derive(Debug, Clone)]
pub struct MetForecast {
    product: MetProduct,
    http: Client,
}

impl MetForecast {
    pub fn new(product: MetProduct, config: &Config) -> Result<Self, FetchError> {
        Ok(Self {
            product,
            http: http::build_client(&config.user_agent, config.request_timeout())?,
        })
    }

    pub fn product(&self) -> MetProduct {
        self.product
    }

    async fn try_fetch(&self, request: &FetchRequest) -> Result<NormalizedResponse, FetchError> {
        let body = http::get_text(&self.http, &self.product.url(), &self.product.query(request), None).await?;
        let payload = self.product.decode(body)?;

        let mut resp = NormalizedResponse::from_payload(payload);
        resp.set_metadata(self.product.metadata(request, timestamp_now()));
        Ok(resp)
    }
}

#[async_trait]
impl WeatherSource for MetForecast {
    fn id(&self) -> SourceId {
        self.product.source_id()
    }

    async fn fetch(&self, request: &FetchRequest) -> NormalizedResponse {
        match self.try_fetch(request).await {
            Ok(resp) => resp,
            Err(err) => {
                tracing::warn!(api = self.product.api_name(), error = %err, "fetch failed");
                NormalizedResponse::error_response(self.product.api_name(), err.to_string())
            }
        }
    }
}
