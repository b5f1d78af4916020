use thiserror::Error;

/// Fatal errors surfaced while loading parameters, constructing a model, or
/// writing reports. Engine-internal capacity violations are programmer errors
/// and abort at the allocation site instead of flowing through this type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("{0}")]
    Config(String),
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}
