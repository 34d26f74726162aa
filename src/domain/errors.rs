use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid service url: {0}")]
    InvalidUrl(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("server returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("path escapes the project root: {0}")]
    OutsideRoot(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectionError {
    #[error("selection cancelled")]
    UserCancelled,

    #[error("{0} is not available in this environment")]
    UnsupportedCapability(&'static str),
}
