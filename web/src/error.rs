use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use broker::{Error as BrokerError, ErrorKind};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(BrokerError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{}", self.0)
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::InvalidTopic => StatusCode::BAD_REQUEST,
            ErrorKind::UnknownTopic => StatusCode::NOT_FOUND,
            // The broker rejected our credentials, not the client's.
            ErrorKind::AuthFailed | ErrorKind::Transport => StatusCode::BAD_GATEWAY,
            ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Config => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Every failure here happens before the stream is opened, so a status code and a
// plain-text diagnostic can still be sent.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            warn!("Refusing SSE stream: {}", self.0);
        } else {
            debug!("Refusing SSE stream: {}", self.0);
        }
        (status, self.0.to_string()).into_response()
    }
}

impl<E> From<E> for Error
where
    E: Into<BrokerError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
