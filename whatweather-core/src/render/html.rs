use chrono::{DateTime, Local};
use std::fmt::Write;

use super::{metadata_pairs, pretty_body};
use crate::model::NormalizedResponse;

const STYLE: &str = r#"        body {
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            max-width: 1200px;
            margin: 0 auto;
            padding: 20px;
            background-color: #f5f5f5;
        }
        .container {
            background-color: white;
            border-radius: 8px;
            padding: 30px;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
        }
        h1 {
            color: #2c3e50;
            border-bottom: 3px solid #3498db;
            padding-bottom: 10px;
        }
        h2 {
            color: #34495e;
            margin-top: 30px;
            border-left: 4px solid #3498db;
            padding-left: 15px;
        }
        .metadata {
            background-color: #ecf0f1;
            padding: 15px;
            border-radius: 5px;
            margin: 20px 0;
        }
        .metadata p {
            margin: 5px 0;
            color: #555;
        }
        .json-display {
            background-color: #2c3e50;
            color: #ecf0f1;
            padding: 20px;
            border-radius: 5px;
            overflow-x: auto;
            font-family: 'Courier New', monospace;
            font-size: 14px;
            line-height: 1.5;
        }
        .error {
            background-color: #e74c3c;
            color: white;
            padding: 15px;
            border-radius: 5px;
            margin: 20px 0;
        }
        .timestamp {
            color: #7f8c8d;
            font-size: 0.9em;
            margin-top: 30px;
        }
"#;

/// Escape the three characters that can open or break markup.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Standalone HTML page for a response.
pub fn to_html(resp: &NormalizedResponse, title: &str) -> String {
    to_html_at(resp, title, Local::now())
}

/// [`to_html`] with an explicit generation time in the footer.
pub fn to_html_at(resp: &NormalizedResponse, title: &str, generated: DateTime<Local>) -> String {
    let title = escape(title);
    let mut html = String::new();

    // writing into a String cannot fail
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
{STYLE}    </style>
</head>
<body>
    <div class="container">
        <h1>{title}</h1>
"#
    );

    if let Some(pairs) = metadata_pairs(resp) {
        html.push_str("\n        <div class=\"metadata\">\n            <h2>Metadata</h2>\n");
        for (key, value) in pairs {
            let _ = writeln!(
                html,
                "            <p><strong>{}:</strong> {}</p>",
                escape(&key),
                escape(&value)
            );
        }
        html.push_str("        </div>\n");
    }

    if let Some(error) = resp.error() {
        let _ = write!(
            html,
            "\n        <div class=\"error\">\n            <h2>Error</h2>\n            <p>{}</p>\n        </div>\n",
            escape(&error)
        );
    }

    let _ = write!(
        html,
        r#"
        <h2>Full Response Data</h2>
        <div class="json-display">
<pre>{}</pre>
        </div>
        <p class="timestamp">Generated: {}</p>
    </div>
</body>
</html>
"#,
        escape(&pretty_body(resp)),
        generated.format("%Y-%m-%d %H:%M:%S")
    );

    html
}
