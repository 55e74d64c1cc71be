use thiserror::Error;

/// Failures raised while fetching or reading bookstore pages.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("request failed: {url}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP status {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("malformed document: {0}")]
    Parse(String),

    /// Page structure deviates from the fixed layout the extractors expect.
    #[error("unexpected page structure: {0}")]
    Format(String),
}

impl ScrapeError {
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Unreachable host or non-success status.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Status { .. })
    }
}

pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;
