//! Sessions and the request metadata that may precede them.
//!
//! A `Session` is one accepted connection as seen by a connection handler:
//! an opaque id, an outbound channel and an open/closed state. Transports
//! implement it; handlers only ever see `&mut dyn Session`.

use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use uuid::Uuid;

use crate::error::TransportError;

/// Lifecycle state of a session. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Opened,
    Closed,
}

pub trait Session: Send {
    /// Opaque identity, stable for the life of the session
    fn id(&self) -> Uuid;

    /// Queue bytes for the peer. Fails once the session is closed.
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Close the session. Closing an already closed session does nothing.
    fn close(&mut self);

    fn state(&self) -> SessionState;

    fn is_open(&self) -> bool {
        self.state() == SessionState::Opened
    }
}

/// Request line and headers received before the session was opened.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

/// End of an HTTP/1.x request head
pub const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

impl RequestHead {
    /// Best-effort parse of an HTTP/1.x request head.
    ///
    /// Returns `None` for anything that is not a well-formed head; callers
    /// treat that the same as having no request at all.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        let end = buf
            .windows(HEAD_TERMINATOR.len())
            .position(|w| w == HEAD_TERMINATOR)?;
        let text = std::str::from_utf8(&buf[..end]).ok()?;
        let mut lines = text.split("\r\n");

        let mut parts = lines.next()?.split(' ');
        let method = Method::from_bytes(parts.next()?.as_bytes()).ok()?;
        let uri: Uri = parts.next()?.parse().ok()?;
        let version = parts.next()?;
        if !version.starts_with("HTTP/1.") || parts.next().is_some() {
            return None;
        }

        let mut headers = HeaderMap::new();
        for line in lines {
            let (name, value) = line.split_once(':')?;
            let name = HeaderName::from_bytes(name.as_bytes()).ok()?;
            let value = HeaderValue::from_str(value.trim()).ok()?;
            headers.append(name, value);
        }

        Some(Self {
            method,
            uri,
            headers,
        })
    }
}
