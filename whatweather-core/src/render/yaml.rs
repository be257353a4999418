use chrono::{DateTime, Local, SecondsFormat};
use serde_json::Value;

use crate::error::RenderError;
use crate::model::{JsonMap, NormalizedResponse};

/// YAML dump of `{generated_at, data}` with the response under `data`.
pub fn to_yaml(resp: &NormalizedResponse) -> Result<String, RenderError> {
    to_yaml_at(resp, Local::now())
}

/// [`to_yaml`] with an explicit `generated_at`.
pub fn to_yaml_at(resp: &NormalizedResponse, generated: DateTime<Local>) -> Result<String, RenderError> {
    let mut envelope = JsonMap::new();
    envelope.insert(
        "generated_at".to_string(),
        Value::String(generated.to_rfc3339_opts(SecondsFormat::Micros, false)),
    );
    envelope.insert("data".to_string(), resp.to_value());

    Ok(serde_yaml::to_string(&envelope)?)
}
