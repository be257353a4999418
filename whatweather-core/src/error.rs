use thiserror::Error;

/// Failures while talking to one of the upstream APIs.
///
/// Source clients never hand these to their callers directly: they are
/// folded into an error response (see [`crate::NormalizedResponse::error_response`]).
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("request failed with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The body was not the JSON we asked for.
    #[error("invalid JSON in response: {0}")]
    Parse(#[from] serde_json::Error),

    /// The tide service answered but the tab-separated body was unusable.
    #[error("error parsing tide data: {0}")]
    Tide(String),

    /// The request itself cannot be sent, e.g. a window past the end of the calendar.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Failures of the binary/serialized encoders.
///
/// HTML and plain text rendering are infallible; only the spreadsheet and
/// YAML backends can report encoder-level faults.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("spreadsheet encoding failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
