//! Response interception.
//!
//! Sits on the path a response takes from the wrapped handler back to the
//! host and remembers its status. The response itself passes through
//! unchanged: same status, same headers, same body bytes.

use http::StatusCode;

use crate::response::Response;

/// Per-request status recorder.
///
/// Starts at `200 OK`, the status a transport sends when a handler never sets
/// one. If the handler panics or its future is dropped before producing a
/// response, that default is what gets reported.
#[derive(Debug)]
pub(crate) struct ResponseInterceptor {
    status: StatusCode,
}

impl ResponseInterceptor {
    pub(crate) fn new() -> Self {
        Self { status: StatusCode::OK }
    }

    /// Records the status of `response` and hands it back untouched.
    pub(crate) fn intercept(&mut self, response: Response) -> Response {
        self.record(response.status_code());
        response
    }

    pub(crate) fn record(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub(crate) fn status(&self) -> StatusCode {
        self.status
    }
}
