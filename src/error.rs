//! Error types.
//!
//! Two kinds of failure flow through tsu:
//!
//! - [`Error`] — infrastructure failures: binding to a port or accepting a
//!   connection. Returned by [`Server::serve`](crate::Server::serve).
//! - [`BoxError`] — anything a handler or middleware returns. The router
//!   passes it up the middleware chain untouched; the server turns it into a
//!   response at the very end. An [`HttpError`] inside it carries the status
//!   code to send.

use std::borrow::Cow;

use http::StatusCode;

use crate::response::{IntoResponse, Response};

/// A type-erased handler error.
///
/// Handlers may return any `E: Into<BoxError>`. A `BoxError` converts into
/// itself without re-boxing, so the value a handler returns is the value every
/// middleware above it observes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by tsu's fallible server operations.
#[derive(Debug, thiserror::Error)]
#[error("io: {0}")]
pub struct Error(#[from] std::io::Error);

/// A handler error that knows which HTTP status it maps to.
///
/// ```rust
/// use tsu_apm::{HttpError, StatusCode};
///
/// let err = HttpError::new(StatusCode::CONFLICT, "user already exists");
/// assert_eq!(err.status(), StatusCode::CONFLICT);
/// ```
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct HttpError {
    status: StatusCode,
    message: Cow<'static, str>,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self { status, message: message.into() }
    }

    /// `404 Not Found`. The router ends the chain with this when no route matches.
    pub fn not_found() -> Self {
        StatusCode::NOT_FOUND.into()
    }

    /// `405 Method Not Allowed`. The path exists, but not for this method.
    pub fn method_not_allowed() -> Self {
        StatusCode::METHOD_NOT_ALLOWED.into()
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn message(&self) -> &str { &self.message }
}

/// Uses the canonical reason phrase (`"Not Found"`) as the message.
impl From<StatusCode> for HttpError {
    fn from(status: StatusCode) -> Self {
        Self::new(status, status.canonical_reason().unwrap_or("Unknown Status"))
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        Response::builder().status(self.status).text(self.message)
    }
}

/// Renders whatever reached the top of the chain.
///
/// [`HttpError`]s keep their status and message. Anything else is a bug the
/// client has no business reading about: `500` with the reason phrase only.
pub(crate) fn error_response(err: &BoxError) -> Response {
    match err.downcast_ref::<HttpError>() {
        Some(http_err) => http_err.clone().into_response(),
        None => HttpError::from(StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_conversion_uses_reason_phrase() {
        let err = HttpError::from(StatusCode::NOT_FOUND);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Not Found");
    }

    #[test]
    fn http_error_renders_its_status() {
        let err: BoxError = HttpError::new(StatusCode::CONFLICT, "taken").into();
        let res = error_response(&err);
        assert_eq!(res.status_code(), StatusCode::CONFLICT);
        assert_eq!(res.body(), b"taken");
    }

    #[test]
    fn foreign_error_renders_as_500_without_details() {
        let err: BoxError = "database password is hunter2".into();
        let res = error_response(&err);
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body(), b"Internal Server Error");
    }
}
