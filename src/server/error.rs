use axum::http::StatusCode;
use axum::response::IntoResponse;
use thiserror::Error;

/// Dispatcher-level failures. These never reach the JSON envelope; they
/// turn into plain-text HTTP responses.
#[derive(Error, Debug, PartialEq, Eq)]
pub(crate) enum Error {
    #[error("Unknown device type {0:?}")]
    UnknownDeviceType(String),
    #[error("Device telescope[{0}] not found")]
    UnknownDeviceIndex(String),
    #[error("Unknown operation {0:?}")]
    UnknownOperation(String),
    #[error("Invalid '{0}'")]
    BadTransactionParam(&'static str),
}

impl Error {
    pub(crate) fn status_code(&self) -> StatusCode {
        match self {
            Self::UnknownDeviceType(_)
            | Self::UnknownDeviceIndex(_)
            | Self::UnknownOperation(_) => StatusCode::NOT_FOUND,
            Self::BadTransactionParam(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

pub(crate) type Result<T> = std::result::Result<T, Error>;
