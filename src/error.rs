/// Application-level error used by configuration, file handling and the CLI.
pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The result type of every operation that talks to the expense service.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Failures that can occur while synchronizing with the expense service.
///
/// The `Display` output of each variant is the message shown to the user.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum SyncError {
    /// The request could not complete, or its response could not be read.
    #[error("network failure: {0}")]
    Network(String),

    /// The service answered with a non-2xx status. `message` is the body's `error` field.
    #[error("{message}")]
    Service { status: u16, message: String },

    /// A required field was missing or malformed. Raised before any request is sent.
    #[error("{0}")]
    Validation(String),
}

impl SyncError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        SyncError::Validation(message.into())
    }

    pub(crate) fn service(status: u16, message: impl Into<String>) -> Self {
        SyncError::Service {
            status,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::Network(e.to_string())
    }
}
