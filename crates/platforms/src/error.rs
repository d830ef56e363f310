use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid channel login: {0}")]
    InvalidLogin(String),
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("missing credentials: {0}")]
    MissingCredentials(&'static str),
    #[error("other: {0}")]
    Other(String),
}

impl PlatformError {
    /// Whether the platform rejected our credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::UnexpectedStatus { status: 401, .. })
    }
}
