use reqwest::StatusCode;
use thiserror::Error;

/// Failures a single gateway call can surface. None of them are retried.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport or connectivity failure before a response arrived.
    #[error("network error talking to the weather API: {0}")]
    Network(#[from] reqwest::Error),

    /// The remote API answered with a non-success status.
    #[error("weather API returned status {status}: {body}")]
    Api { status: StatusCode, body: String },

    /// JSON arrived but required fields were absent or unusable.
    #[error("malformed weather API response: {0}")]
    MalformedResponse(String),

    /// Every leg of a composed fetch failed, leaving nothing to return.
    #[error("no weather data available for \"{0}\"")]
    NoData(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Keep error messages readable when the API returns a long HTML error page.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
