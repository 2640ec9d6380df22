use thiserror::Error;

/// Why an upstream fetch produced no data.
///
/// The dashboard still falls back to an empty table on any of these, but the
/// variant is kept so the status line (and tests) can tell an outage from a
/// slate with no markets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("ODDS_API_KEY missing")]
    MissingApiKey,

    #[error("network failure: {0}")]
    Network(String),

    #[error("http {status}: {snippet}")]
    Http { status: u16, snippet: String },

    #[error("malformed response: {0}")]
    Parse(String),
}

impl FetchError {
    pub fn short_label(&self) -> &'static str {
        match self {
            FetchError::MissingApiKey => "NO KEY",
            FetchError::Network(_) => "NETWORK",
            FetchError::Http { .. } => "HTTP",
            FetchError::Parse(_) => "PARSE",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

pub type FetchResult<T> = Result<T, FetchError>;
