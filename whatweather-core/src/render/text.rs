use chrono::{DateTime, Local};

use super::{metadata_pairs, pretty_body};
use crate::model::NormalizedResponse;

const WIDTH: usize = 80;

/// Plain-text report for a response.
pub fn to_text(resp: &NormalizedResponse, title: &str) -> String {
    to_text_at(resp, title, Local::now())
}

/// [`to_text`] with an explicit generation time in the footer.
pub fn to_text_at(resp: &NormalizedResponse, title: &str, generated: DateTime<Local>) -> String {
    let heavy = "=".repeat(WIDTH);
    let light = "-".repeat(WIDTH);

    let mut lines = vec![
        heavy.clone(),
        format!("{title:^WIDTH$}"),
        heavy.clone(),
        String::new(),
    ];

    if let Some(pairs) = metadata_pairs(resp) {
        lines.push("METADATA".to_string());
        lines.push(light.clone());
        lines.extend(pairs.into_iter().map(|(k, v)| format!("  {k}: {v}")));
        lines.push(String::new());
    }

    if let Some(error) = resp.error() {
        lines.push("ERROR".to_string());
        lines.push(light.clone());
        lines.push(format!("  {error}"));
        lines.push(String::new());
    }

    lines.push("FULL RESPONSE DATA".to_string());
    lines.push(light.clone());
    lines.push(pretty_body(resp));
    lines.push(String::new());

    lines.push(light);
    lines.push(format!("Generated: {}", generated.format("%Y-%m-%d %H:%M:%S")));
    lines.push(heavy);

    lines.join("\n")
}
