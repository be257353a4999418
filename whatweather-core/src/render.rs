//! Rendering of a [`NormalizedResponse`] into the four output formats.
//!
//! Every backend follows the same outline: metadata block, error block (when
//! the fetch failed), then the body. Only the spreadsheet backend looks at the
//! *shape* of the body: a MET-style timeseries becomes a table, anything else a
//! JSON blob. That decision is made once, by [`Payload::classify`].

use serde_json::Value;
use std::collections::BTreeSet;

use crate::error::RenderError;
use crate::model::{NormalizedResponse, TimeseriesEntry};

pub mod html;
pub mod sheet;
pub mod text;
pub mod yaml;

pub use html::{to_html, to_html_at};
pub use sheet::{to_xlsx, workbook_layout};
pub use text::{to_text, to_text_at};
pub use yaml::{to_yaml, to_yaml_at};

pub const SYMBOL_HEADER: &str = "Next 1hr Symbol";
pub const PRECIP_HEADER: &str = "Next 1hr Precip (mm)";

/// Output formats the collector can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    Html,
    Xlsx,
    Yaml,
    Text,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Html => "html",
            Format::Xlsx => "xlsx",
            Format::Yaml => "yaml",
            Format::Text => "text",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Format::Text => "txt",
            other => other.as_str(),
        }
    }

    /// Output subdirectory for this format.
    pub fn subdir(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Html => "html",
            Format::Xlsx => "excel",
            Format::Yaml => "yaml",
            Format::Text => "txt",
        }
    }

    pub const fn all() -> &'static [Format] {
        &[
            Format::Json,
            Format::Html,
            Format::Xlsx,
            Format::Yaml,
            Format::Text,
        ]
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Format {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "html" => Ok(Format::Html),
            "xlsx" | "excel" => Ok(Format::Xlsx),
            "yaml" | "yml" => Ok(Format::Yaml),
            "text" | "txt" => Ok(Format::Text),
            _ => Err(anyhow::anyhow!(
                "Unknown format '{value}'. Supported formats: json, html, xlsx, yaml, text."
            )),
        }
    }
}

/// Render `resp` into the bytes of the given format.
pub fn render(format: Format, resp: &NormalizedResponse, title: &str) -> Result<Vec<u8>, RenderError> {
    let bytes = match format {
        Format::Json => serde_json::to_string_pretty(resp)?.into_bytes(),
        Format::Html => to_html(resp, title).into_bytes(),
        Format::Xlsx => to_xlsx(resp, title)?,
        Format::Yaml => to_yaml(resp)?.into_bytes(),
        Format::Text => to_text(resp, title).into_bytes(),
    };
    Ok(bytes)
}

/// What the body of a response looks like, for backends that care.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Generic,
    Timeseries(TimeseriesTable),
}

impl Payload {
    /// A response is timeseries-shaped when `properties.timeseries` is an array.
    /// Units and coordinates are optional and simply omitted when absent.
    pub fn classify(resp: &NormalizedResponse) -> Self {
        let Some(properties) = resp.get("properties") else {
            return Payload::Generic;
        };
        let Some(raw) = properties.get("timeseries").and_then(Value::as_array) else {
            return Payload::Generic;
        };

        let entries = raw.iter().filter_map(TimeseriesEntry::from_json).collect();

        let mut units: Vec<(String, String)> = properties
            .pointer("/meta/units")
            .and_then(Value::as_object)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), display_value(v))).collect())
            .unwrap_or_default();
        units.sort_by(|a, b| a.0.cmp(&b.0));

        // geometry.coordinates is [lon, lat]; shown as "lat, lon"
        let location = resp
            .get("geometry")
            .and_then(|g| g.get("coordinates"))
            .and_then(Value::as_array)
            .filter(|c| c.len() >= 2)
            .map(|c| format!("{}, {}", display_value(&c[1]), display_value(&c[0])));

        Payload::Timeseries(TimeseriesTable {
            location,
            units,
            entries,
        })
    }

    pub fn is_timeseries(&self) -> bool {
        matches!(self, Payload::Timeseries(_))
    }
}

/// A timeseries body ready for tabular rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeseriesTable {
    /// `"lat, lon"` taken from `geometry.coordinates`.
    pub location: Option<String>,
    /// Parameter → unit, sorted by parameter.
    pub units: Vec<(String, String)>,
    pub entries: Vec<TimeseriesEntry>,
}

impl TimeseriesTable {
    /// Union of detail keys over the whole series, sorted.
    pub fn detail_columns(&self) -> Vec<String> {
        self.entries
            .iter()
            .flat_map(|e| e.details.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn has_symbol_column(&self) -> bool {
        self.entries
            .first()
            .and_then(|e| e.next_1_hours.as_ref())
            .is_some_and(|n| n.symbol_code.is_some())
    }

    pub fn has_precip_column(&self) -> bool {
        self.entries
            .first()
            .and_then(|e| e.next_1_hours.as_ref())
            .is_some_and(|n| n.precipitation_amount.is_some())
    }

    /// Header row: `Time`, sorted detail keys, then the optional next-hour columns.
    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec!["Time".to_string()];
        headers.extend(self.detail_columns());
        if self.has_symbol_column() {
            headers.push(SYMBOL_HEADER.to_string());
        }
        if self.has_precip_column() {
            headers.push(PRECIP_HEADER.to_string());
        }
        headers
    }
}

/// Display form of a scalar: strings unquoted, everything else as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Metadata as ordered `(key, display value)` pairs.
pub(crate) fn metadata_pairs(resp: &NormalizedResponse) -> Option<Vec<(String, String)>> {
    resp.metadata()
        .map(|meta| meta.iter().map(|(k, v)| (k.clone(), display_value(v))).collect())
}

/// Two-space indented JSON of the whole response.
pub(crate) fn pretty_body(resp: &NormalizedResponse) -> String {
    serde_json::to_string_pretty(resp.as_map()).unwrap_or_default()
}
