//! The fixed liveness response.

use http::StatusCode;

/// Immutable health response: status 200, empty body, `Content-Length: 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    content_length: usize,
}

/// Build the health response. Pure; a fresh value for every session.
pub fn build_health_response() -> Response {
    Response {
        status: StatusCode::OK,
        content_length: 0,
    }
}

impl Response {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_length(&self) -> usize {
        self.content_length
    }

    /// Serialize to HTTP/1.1 wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Length: {}\r\n\r\n",
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or_default(),
            self.content_length
        )
        .into_bytes()
    }
}
