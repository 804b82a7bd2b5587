//! Per-connection driver.
//!
//! Adapts a TCP stream to a `Session` and feeds it through the handler's
//! lifecycle: read the request head, open, flush, optionally relay further
//! data, close.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::TransportError;
use crate::health::ConnectionHandler;
use crate::session::{RequestHead, Session, SessionState, HEAD_TERMINATOR};

/// Read buffer size for each read call
const READ_CHUNK: usize = 1024;

/// Limits applied to a single connection
#[derive(Debug, Clone, Copy)]
pub struct ConnectionLimits {
    pub request_timeout: Duration,
    pub max_request_bytes: usize,
}

/// Session backed by an outbound buffer that the driver flushes to the socket.
///
/// `close` only marks the session; the driver writes whatever was queued
/// before it shuts the socket down.
#[derive(Debug)]
pub struct BufferedSession {
    id: Uuid,
    outbound: Vec<u8>,
    state: SessionState,
}

impl BufferedSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            outbound: Vec::new(),
            state: SessionState::Opened,
        }
    }

    fn take_outbound(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbound)
    }
}

impl Default for BufferedSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Session for BufferedSession {
    fn id(&self) -> Uuid {
        self.id
    }

    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if self.state == SessionState::Closed {
            return Err(TransportError::new("session is closed"));
        }
        self.outbound.extend_from_slice(data);
        Ok(())
    }

    fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    fn state(&self) -> SessionState {
        self.state
    }
}

/// Drive one accepted connection to completion.
pub async fn serve_connection<S>(
    stream: S,
    peer: SocketAddr,
    handler: &dyn ConnectionHandler,
    limits: ConnectionLimits,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut session = BufferedSession::new();
    let span = tracing::info_span!("session", session_id = %session.id(), %peer);

    drive(stream, &mut session, handler, limits)
        .instrument(span)
        .await
}

async fn drive<S>(
    mut stream: S,
    session: &mut BufferedSession,
    handler: &dyn ConnectionHandler,
    limits: ConnectionLimits,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    tracing::debug!("Connection accepted");

    let request = match read_request_head(&mut stream, limits).await {
        Ok(buf) => RequestHead::parse(&buf),
        Err(e) => {
            tracing::debug!(error = %e, "Failed reading request head");
            handler.on_error(session, e.into());
            handler.on_close(session);
            return;
        }
    };

    if let Some(head) = &request {
        tracing::debug!(method = %head.method, uri = %head.uri, "Request head received");
    }

    handler.on_open(session, request.as_ref());

    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        if let Err(e) = flush(&mut stream, session).await {
            handler.on_error(session, e.into());
            break;
        }

        if !session.is_open() {
            break;
        }

        match stream.read(&mut buf).await {
            Ok(0) => {
                session.close();
                break;
            }
            Ok(n) => handler.on_message(session, &buf[..n]),
            Err(e) => {
                handler.on_error(session, e.into());
                break;
            }
        }
    }

    // The handler may have closed the session without sending anything more.
    session.close();
    if let Err(e) = stream.shutdown().await {
        tracing::trace!(error = %e, "Socket shutdown failed");
    }

    handler.on_close(session);
    tracing::debug!("Connection closed");
}

async fn flush<S>(stream: &mut S, session: &mut BufferedSession) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let pending = session.take_outbound();
    if pending.is_empty() {
        return Ok(());
    }
    stream.write_all(&pending).await?;
    stream.flush().await
}

/// Read until the end of the request head, the byte limit, EOF or the timeout.
///
/// A timeout is not an error: whatever arrived so far is returned and the
/// session is opened anyway.
async fn read_request_head<S>(stream: &mut S, limits: ConnectionLimits) -> std::io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];

    let read = async {
        while buf.len() < limits.max_request_bytes {
            let want = chunk.len().min(limits.max_request_bytes - buf.len());
            let n = stream.read(&mut chunk[..want]).await?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if contains_head_terminator(&buf) {
                break;
            }
        }
        Ok::<_, std::io::Error>(())
    };

    let outcome = tokio::time::timeout(limits.request_timeout, read).await;
    match outcome {
        Ok(result) => result?,
        Err(_) => tracing::debug!(bytes = buf.len(), "Request head read timed out"),
    }

    Ok(buf)
}

fn contains_head_terminator(buf: &[u8]) -> bool {
    buf.windows(HEAD_TERMINATOR.len())
        .any(|w| w == HEAD_TERMINATOR)
}
