//! Core library for the `whatweather` collector.
//!
//! This crate defines:
//! - Configuration handling
//! - Clients for the MET Norway, Kartverket, BarentsWatch and Nominatim APIs
//! - The normalized response shape and a synthetic tide generator
//! - Renderers turning a response into JSON, HTML, XLSX, YAML or plain text
//!
//! It is used by `whatweather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod model;
pub mod render;
pub mod source;
pub mod synthetic;
pub mod throttle;

pub use config::Config;
pub use error::{FetchError, RenderError};
pub use model::{Coordinates, NormalizedResponse, TimeseriesEntry};
pub use render::{Format, render};
pub use source::{FetchRequest, SourceId, WeatherSource, nominatim::Nominatim, source_from_config};
pub use synthetic::{TideModel, generate_tide_series, sample_tide_response};
