use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::error::FetchError;

/// Build the shared client: every upstream here requires an identifying user agent.
pub(crate) fn build_client(user_agent: &str, timeout: Duration) -> Result<Client, FetchError> {
    Ok(Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()?)
}

/// GET `url` and return the body as text, failing on non-2xx.
pub(crate) async fn get_text(
    http: &Client,
    url: &str,
    query: &[(&str, String)],
    bearer: Option<&str>,
) -> Result<String, FetchError> {
    tracing::debug!(url, ?query, "GET");

    let mut request = http.get(url).query(query);
    if let Some(token) = bearer {
        request = request.bearer_auth(token);
    }

    let res = request.send().await?;
    let status = res.status();
    let body = res.text().await?;

    if !status.is_success() {
        return Err(FetchError::Status {
            status,
            body: truncate_body(&body),
        });
    }

    Ok(body)
}

/// GET `url` and decode the body as JSON.
pub(crate) async fn get_json(
    http: &Client,
    url: &str,
    query: &[(&str, String)],
    bearer: Option<&str>,
) -> Result<Value, FetchError> {
    let body = get_text(http, url, query, bearer).await?;
    Ok(serde_json::from_str(&body)?)
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
