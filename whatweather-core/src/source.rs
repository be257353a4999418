use crate::{
    Config, NormalizedResponse,
    error::FetchError,
    model::Coordinates,
    source::{barentswatch::BarentsWatch, met::MetForecast, met::MetProduct, tide::KartverketTide},
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod barentswatch;
pub(crate) mod http;
pub mod met;
pub mod nominatim;
pub mod tide;

/// The per-location data sources the collector knows about.
///
/// Geocoding is not in here: it takes a free-text query rather than a
/// [`FetchRequest`] and lives in [`nominatim`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceId {
    Oceanforecast,
    Locationforecast,
    Textforecast,
    Nowcast,
    Tide,
    BarentsWatch,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Oceanforecast => "oceanforecast",
            SourceId::Locationforecast => "locationforecast",
            SourceId::Textforecast => "textforecast",
            SourceId::Nowcast => "nowcast",
            SourceId::Tide => "tide",
            SourceId::BarentsWatch => "barentswatch",
        }
    }

    /// Human-readable title used as the heading of every rendering.
    pub fn title(&self) -> &'static str {
        match self {
            SourceId::Oceanforecast => "MET Norway Oceanforecast 2.0",
            SourceId::Locationforecast => "MET Norway Locationforecast 2.0",
            SourceId::Textforecast => "MET Norway Textforecast 2.0",
            SourceId::Nowcast => "MET Norway Nowcast 2.0",
            SourceId::Tide => "Kartverket Tide Predictions",
            SourceId::BarentsWatch => "BarentsWatch Coastal Data",
        }
    }

    /// Whether the source answers with a `properties.timeseries` body.
    pub fn is_timeseries(&self) -> bool {
        matches!(
            self,
            SourceId::Oceanforecast | SourceId::Locationforecast | SourceId::Nowcast | SourceId::Tide
        )
    }

    /// Collection order.
    pub const fn all() -> &'static [SourceId] {
        &[
            SourceId::Oceanforecast,
            SourceId::Locationforecast,
            SourceId::Textforecast,
            SourceId::Nowcast,
            SourceId::Tide,
            SourceId::BarentsWatch,
        ]
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for SourceId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        SourceId::all()
            .iter()
            .copied()
            .find(|id| id.as_str() == lower)
            .ok_or_else(|| {
                let names: Vec<_> = SourceId::all().iter().map(SourceId::as_str).collect();
                anyhow::anyhow!(
                    "Unknown source '{value}'. Supported sources: {}.",
                    names.join(", ")
                )
            })
    }
}

/// Parameters shared by the per-location sources. Each source reads what it needs.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub location: Coordinates,
    /// Metres above sea level; only Locationforecast uses it.
    pub altitude: Option<i32>,
    /// Textforecast language code.
    pub language: String,
    /// Tide prediction window.
    pub days_ahead: u32,
}

impl FetchRequest {
    pub fn from_config(config: &Config) -> Self {
        Self {
            location: config.default_location,
            altitude: None,
            language: config.text_forecast_language.clone(),
            days_ahead: config.tide_days_ahead,
        }
    }

    pub fn at(mut self, location: Coordinates) -> Self {
        self.location = location;
        self
    }
}

/// A data source that always produces a response.
///
/// Failures are not returned as `Err`: the source folds them into an error
/// response so the caller can render it like any other result.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    fn id(&self) -> SourceId;

    async fn fetch(&self, request: &FetchRequest) -> NormalizedResponse;
}

/// Construct a source from config and explicit SourceId.
pub fn source_from_config(id: SourceId, config: &Config) -> Result<Box<dyn WeatherSource>, FetchError> {
    let boxed: Box<dyn WeatherSource> = match id {
        SourceId::Oceanforecast => Box::new(MetForecast::new(MetProduct::Oceanforecast, config)?),
        SourceId::Locationforecast => {
            Box::new(MetForecast::new(MetProduct::Locationforecast, config)?)
        }
        SourceId::Textforecast => Box::new(MetForecast::new(MetProduct::Textforecast, config)?),
        SourceId::Nowcast => Box::new(MetForecast::new(MetProduct::Nowcast, config)?),
        SourceId::Tide => Box::new(KartverketTide::new(config)?),
        SourceId::BarentsWatch => Box::new(BarentsWatch::new(config)?),
    };

    Ok(boxed)
}

/// Every source, in collection order.
pub fn all_sources(config: &Config) -> Result<Vec<Box<dyn WeatherSource>>, FetchError> {
    SourceId::all()
        .iter()
        .map(|id| source_from_config(*id, config))
        .collect()
}
