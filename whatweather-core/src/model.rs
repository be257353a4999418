use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::borrow::Cow;
use std::collections::BTreeMap;

pub type JsonMap = Map<String, Value>;

/// Key under which every fetch attaches its bookkeeping fields.
pub const METADATA_KEY: &str = "_metadata";
/// Key carrying a pass-through failure message from the fetch layer.
pub const ERROR_KEY: &str = "error";

/// A point on the map, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl Default for Coordinates {
    /// Stolmen, off the coast south of Bergen.
    fn default() -> Self {
        Self::new(60.00, 5.00)
    }
}

/// `"60.0, 5.0"`: whole degrees keep their decimal point.
impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}, {:?}", self.lat, self.lon)
    }
}

/// Current local time as an RFC 3339 string, used for `fetched_at` and friends.
pub fn timestamp_now() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// The shape every fetch produces and every formatter consumes.
///
/// This is a loosely-typed JSON object: the raw API payload plus an optional
/// `_metadata` mapping and an optional `error` string. Key insertion order is
/// preserved so metadata renders in the order the fetch layer wrote it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedResponse(JsonMap);

impl NormalizedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a decoded API body. Non-object bodies are kept under `response`.
    pub fn from_payload(payload: Value) -> Self {
        match payload {
            Value::Object(map) => Self(map),
            other => {
                let mut map = JsonMap::new();
                map.insert("response".to_string(), other);
                Self(map)
            }
        }
    }

    /// The `{error, api, timestamp}` response a source returns on failure.
    pub fn error_response(api: &str, message: impl Into<String>) -> Self {
        let mut map = JsonMap::new();
        map.insert(ERROR_KEY.to_string(), Value::String(message.into()));
        map.insert("api".to_string(), Value::String(api.to_string()));
        map.insert("timestamp".to_string(), Value::String(timestamp_now()));
        Self(map)
    }

    pub fn as_map(&self) -> &JsonMap {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Replace (or add) the `_metadata` block. It is appended after the payload.
    pub fn set_metadata(&mut self, metadata: JsonMap) {
        self.0.insert(METADATA_KEY.to_string(), Value::Object(metadata));
    }

    pub fn metadata(&self) -> Option<&JsonMap> {
        self.0.get(METADATA_KEY).and_then(Value::as_object)
    }

    /// The `error` entry, whatever its type. Non-strings come back as compact JSON.
    pub fn error(&self) -> Option<Cow<'_, str>> {
        self.0.get(ERROR_KEY).map(|value| match value {
            Value::String(s) => Cow::Borrowed(s.as_str()),
            other => Cow::Owned(other.to_string()),
        })
    }

    pub fn is_error(&self) -> bool {
        self.error().is_some()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<JsonMap> for NormalizedResponse {
    fn from(map: JsonMap) -> Self {
        Self(map)
    }
}

/// The `data.next_1_hours` block of a MET-style timeseries entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NextHour {
    pub symbol_code: Option<String>,
    pub precipitation_amount: Option<f64>,
}

/// One timestamped record in a MET-style `properties.timeseries` array.
///
/// `time` is kept exactly as the API wrote it and is `None` when the entry has
/// no string `time`. Detail values are kept as raw JSON so a non-numeric value
/// can still be shown instead of dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeseriesEntry {
    pub time: Option<String>,
    pub details: BTreeMap<String, Value>,
    pub next_1_hours: Option<NextHour>,
}

impl TimeseriesEntry {
    pub fn new(time: impl Into<String>) -> Self {
        Self {
            time: Some(time.into()),
            details: BTreeMap::new(),
            next_1_hours: None,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Numeric value of a detail parameter, if present and numeric.
    pub fn detail(&self, key: &str) -> Option<f64> {
        self.details.get(key).and_then(Value::as_f64)
    }

    /// Read an entry out of the raw JSON. Only non-objects are rejected;
    /// every missing piece, `time` included, is simply left empty.
    pub fn from_json(value: &Value) -> Option<Self> {
        value.as_object()?;
        let time = value.get("time").and_then(Value::as_str).map(str::to_string);
        let data = value.get("data");

        let details = data
            .and_then(|d| d.pointer("/instant/details"))
            .and_then(Value::as_object)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        let next_1_hours = data.and_then(|d| d.get("next_1_hours")).map(|next| NextHour {
            symbol_code: next
                .pointer("/summary/symbol_code")
                .and_then(Value::as_str)
                .map(str::to_string),
            precipitation_amount: next
                .pointer("/details/precipitation_amount")
                .and_then(Value::as_f64),
        });

        Some(Self {
            time,
            details,
            next_1_hours,
        })
    }

    /// Back to the nested `{time, data: {instant: {details}}}` shape.
    pub fn to_json(&self) -> Value {
        let details: JsonMap = self
            .details
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut data = JsonMap::new();
        data.insert("instant".to_string(), json!({ "details": details }));

        if let Some(next) = &self.next_1_hours {
            let mut block = JsonMap::new();
            if let Some(symbol) = &next.symbol_code {
                block.insert("summary".to_string(), json!({ "symbol_code": symbol }));
            }
            if let Some(amount) = next.precipitation_amount {
                block.insert("details".to_string(), json!({ "precipitation_amount": amount }));
            }
            data.insert("next_1_hours".to_string(), Value::Object(block));
        }

        let mut entry = JsonMap::new();
        if let Some(time) = &self.time {
            entry.insert("time".to_string(), json!(time));
        }
        entry.insert("data".to_string(), Value::Object(data));
        Value::Object(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_and_error_accessors() {
        let resp = NormalizedResponse::from_payload(json!({
            "error": "timeout",
            "_metadata": { "api": "Nowcast 2.0" }
        }));

        assert_eq!(resp.error().as_deref(), Some("timeout"));
        assert!(resp.is_error());
        let meta = resp.metadata().expect("metadata present");
        assert_eq!(meta.get("api"), Some(&json!("Nowcast 2.0")));
    }

    #[test]
    fn non_string_error_is_still_an_error() {
        let resp = NormalizedResponse::from_payload(json!({
            "error": { "code": 503, "message": "unavailable" }
        }));
        assert!(resp.is_error());
        assert_eq!(
            resp.error().as_deref(),
            Some(r#"{"code":503,"message":"unavailable"}"#)
        );

        let resp = NormalizedResponse::from_payload(json!({ "error": 404 }));
        assert_eq!(resp.error().as_deref(), Some("404"));
    }

    #[test]
    fn coordinates_display_keeps_decimal_point() {
        assert_eq!(Coordinates::new(60.0, 5.0).to_string(), "60.0, 5.0");
        assert_eq!(Coordinates::new(60.39, -5.32).to_string(), "60.39, -5.32");
    }

    #[test]
    fn non_object_payload_is_wrapped() {
        let resp = NormalizedResponse::from_payload(json!([1, 2, 3]));
        assert_eq!(resp.get("response"), Some(&json!([1, 2, 3])));
        assert!(resp.metadata().is_none());
    }

    #[test]
    fn error_response_has_api_and_timestamp() {
        let resp = NormalizedResponse::error_response("Oceanforecast 2.0", "connection refused");
        assert_eq!(resp.error().as_deref(), Some("connection refused"));
        assert_eq!(resp.get("api"), Some(&json!("Oceanforecast 2.0")));
        let ts = resp.get("timestamp").and_then(Value::as_str).unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[test]
    fn metadata_keeps_insertion_order() {
        let mut meta = JsonMap::new();
        meta.insert("zeta".into(), json!(1));
        meta.insert("alpha".into(), json!(2));
        let mut resp = NormalizedResponse::new();
        resp.set_metadata(meta);

        let keys: Vec<_> = resp.metadata().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn timeseries_entry_reads_met_shape() {
        let raw = json!({
            "time": "2024-06-01T12:00:00Z",
            "data": {
                "instant": { "details": { "air_temperature": 12.5, "wind_speed": 5.2 } },
                "next_1_hours": {
                    "summary": { "symbol_code": "cloudy" },
                    "details": { "precipitation_amount": 0.3 }
                }
            }
        });

        let entry = TimeseriesEntry::from_json(&raw).expect("valid entry");
        assert_eq!(entry.time.as_deref(), Some("2024-06-01T12:00:00Z"));
        assert_eq!(entry.detail("air_temperature"), Some(12.5));
        let next = entry.next_1_hours.as_ref().unwrap();
        assert_eq!(next.symbol_code.as_deref(), Some("cloudy"));
        assert_eq!(next.precipitation_amount, Some(0.3));

        assert_eq!(entry.to_json(), raw);
    }

    #[test]
    fn timeseries_entry_without_time_keeps_its_details() {
        let raw = json!({ "data": { "instant": { "details": { "b": 2 } } } });
        let entry = TimeseriesEntry::from_json(&raw).expect("object entry");
        assert!(entry.time.is_none());
        assert_eq!(entry.detail("b"), Some(2.0));
        assert_eq!(entry.to_json(), raw);

        let entry = TimeseriesEntry::from_json(&json!({ "time": 5 })).unwrap();
        assert!(entry.time.is_none());
    }

    #[test]
    fn non_object_timeseries_entry_is_rejected() {
        assert!(TimeseriesEntry::from_json(&json!("t0")).is_none());
        assert!(TimeseriesEntry::from_json(&Value::Null).is_none());
    }

    #[test]
    fn timeseries_entry_tolerates_missing_data() {
        let entry = TimeseriesEntry::from_json(&json!({ "time": "t0" })).unwrap();
        assert!(entry.details.is_empty());
        assert!(entry.next_1_hours.is_none());
    }
}
