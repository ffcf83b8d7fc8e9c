use reqwest::StatusCode;

/// Everything that can go wrong talking to the ladder API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Network unreachable, DNS failure, connection dropped mid-body.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("malformed response from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("player record has no id, cannot address /players/{{id}}")]
    MissingId,
}

impl ApiError {
    /// URL of the request that failed, when one was made.
    #[allow(dead_code)]
    pub fn url(&self) -> Option<&str> {
        match self {
            ApiError::Transport { url, .. }
            | ApiError::Status { url, .. }
            | ApiError::Parse { url, .. }
            | ApiError::InvalidBaseUrl { url, .. } => Some(url),
            ApiError::MissingId => None,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
