use std::time::Duration;

use thiserror::Error;

/// Failure of one source for one query. Never fatal: the chain moves on.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("unexpected response: {0}")]
    Parse(String),
}

impl SourceError {
    /// 429, 5xx and timeouts are worth one retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Server { status, .. } => *status == 429 || *status >= 500,
            Self::Timeout(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Shortened error body for the attempt log.
    pub(crate) fn summary(&self) -> String {
        let mut text = self.to_string();
        if text.len() > 200 {
            let mut cut = 200;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
            text.push('…');
        }
        text
    }
}

/// Turn a non-success response into [`SourceError::Server`].
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, SourceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(SourceError::Server {
        status: status.as_u16(),
        body,
    })
}
