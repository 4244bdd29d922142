use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// The request body could not be buffered
    #[error("Failed to read request body: {0}")]
    Body(#[source] axum::Error),

    /// The request body is larger than the route accepts
    #[error("Request body exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    /// Request body is not valid JSON for the expected payload shape
    #[error("Invalid JSON payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// A header required by the route holds bytes that are not visible ASCII
    #[error("Invalid {name} header: {source}")]
    InvalidHeader {
        name: &'static str,
        #[source]
        source: axum::http::header::ToStrError,
    },

    /// A grant carried a status code that cannot be sent
    #[error("Invalid status code {status} in authentication grant")]
    InvalidStatus { status: u16 },

    /// Failure raised by a caller-supplied handler
    #[error(transparent)]
    Handler(#[from] anyhow::Error),

    /// Configuration failed validation
    #[error("Config validation: {message}")]
    Config { message: String },
}

impl Error {
    /// Classify a failure to buffer a body capped at `limit` bytes.
    pub(crate) fn from_body(err: axum::Error, limit: usize) -> Self {
        let mut source = std::error::Error::source(&err);
        while let Some(inner) = source {
            if inner.is::<LengthLimitError>() {
                return Error::PayloadTooLarge { limit };
            }
            source = inner.source();
        }
        Error::Body(err)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Body(_) | Error::InvalidPayload(_) | Error::InvalidHeader { .. } => StatusCode::BAD_REQUEST,
            Error::InvalidStatus { .. } | Error::Handler(_) | Error::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking handler internals
    pub fn user_message(&self) -> String {
        match self {
            Error::Body(_) => "Failed to read request body".to_string(),
            Error::PayloadTooLarge { .. } => self.to_string(),
            Error::InvalidPayload(_) => "Request body is not a valid JSON payload".to_string(),
            Error::InvalidHeader { name, .. } => format!("Invalid {name} header"),
            Error::InvalidStatus { .. } | Error::Handler(_) | Error::Config { .. } => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Handler(_) | Error::InvalidStatus { .. } | Error::Config { .. } => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Body(_) | Error::PayloadTooLarge { .. } | Error::InvalidPayload(_) | Error::InvalidHeader { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), self.user_message()).into_response()
    }
}

/// Type alias for webhook and auth operation results
pub type Result<T> = std::result::Result<T, Error>;
