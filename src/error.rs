//! The error type shared by every layer of the crate.

use thiserror::Error;

/// Everything that can go wrong while resolving filters, talking to the attendance service, or
/// reading the local store.
///
/// Empty results are never errors: an empty week or an empty roster is an `Ok` value that the
/// display layer renders as "no data".
#[derive(Debug, Error)]
pub enum Error {
    /// The selection is incomplete or out of range. Raised before any network call is made.
    #[error("incomplete selection: {0}")]
    Validation(String),

    /// The request never produced a usable response (connection, timeout, malformed body).
    #[error("request to {endpoint} failed: {source}")]
    Fetch {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("{endpoint} was rejected with status {status}: {message}")]
    Rejected {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("invalid service url: {0}")]
    Url(String),

    #[error("student {0} does not exist")]
    StudentNotFound(i64),

    #[error(transparent)]
    Database(#[from] diesel::result::Error),

    #[error(transparent)]
    Connection(#[from] diesel::ConnectionError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Notices were requested but the `[smtp]` settings or `SMTP_PASSWORD` are missing.
    #[error("mail is not configured: {0}")]
    MailSetup(String),

    #[error("mail could not be built: {0}")]
    MailMessage(#[from] lettre::error::Error),

    #[error("bad email address: {0}")]
    MailAddress(#[from] lettre::address::AddressError),

    #[error("mail could not be sent: {0}")]
    MailTransport(#[from] lettre::transport::smtp::Error),
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether this error was raised before anything was sent over the wire.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
