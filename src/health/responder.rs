use std::sync::Arc;

use crate::error::TransportError;
use crate::session::{RequestHead, Session};

use super::logger::{DiscardLogger, Logger};
use super::response::build_health_response;

/// Callbacks a transport invokes over the lifetime of each session.
///
/// `on_open` runs before any `on_message`. A connection that fails before
/// it can be opened gets `on_error` without `on_open`. Either way `on_close`
/// runs exactly once, after the session has ended.
pub trait ConnectionHandler: Send + Sync {
    fn on_open(&self, session: &mut dyn Session, request: Option<&RequestHead>);

    fn on_message(&self, session: &mut dyn Session, data: &[u8]);

    fn on_close(&self, session: &mut dyn Session);

    fn on_error(&self, session: &mut dyn Session, error: TransportError);
}

/// Connection handler that answers every session with the health response.
#[derive(Clone)]
pub struct HealthCheckResponder {
    logger: Arc<dyn Logger>,
}

impl Default for HealthCheckResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HealthCheckResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthCheckResponder").finish_non_exhaustive()
    }
}

impl HealthCheckResponder {
    /// Responder that discards its log output.
    pub fn new() -> Self {
        Self::with_logger(Arc::new(DiscardLogger))
    }

    pub fn with_logger(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

impl ConnectionHandler for HealthCheckResponder {
    fn on_open(&self, session: &mut dyn Session, _request: Option<&RequestHead>) {
        let response = build_health_response();
        match session.send(&response.to_bytes()) {
            Ok(()) => {
                tracing::debug!(session_id = %session.id(), "Health response queued");
                session.close();
            }
            Err(e) => self.on_error(session, e),
        }
    }

    fn on_message(&self, _session: &mut dyn Session, _data: &[u8]) {}

    fn on_close(&self, _session: &mut dyn Session) {}

    fn on_error(&self, session: &mut dyn Session, error: TransportError) {
        self.logger
            .log(&format!("An error has occurred: {}", error.message()));
        session.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;
    use std::sync::Mutex;
    use uuid::Uuid;

    const HEALTH_BYTES: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n";

    /// In-memory session recording everything sent and every close call
    struct MockSession {
        id: Uuid,
        sent: Vec<Vec<u8>>,
        state: SessionState,
        close_calls: usize,
        fail_send: bool,
    }

    impl MockSession {
        fn new() -> Self {
            Self {
                id: Uuid::new_v4(),
                sent: Vec::new(),
                state: SessionState::Opened,
                close_calls: 0,
                fail_send: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail_send: true,
                ..Self::new()
            }
        }
    }

    impl Session for MockSession {
        fn id(&self) -> Uuid {
            self.id
        }

        fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
            if self.fail_send {
                return Err(TransportError::new("broken pipe"));
            }
            if !self.is_open() {
                return Err(TransportError::new("session is closed"));
            }
            self.sent.push(data.to_vec());
            Ok(())
        }

        fn close(&mut self) {
            self.close_calls += 1;
            self.state = SessionState::Closed;
        }

        fn state(&self) -> SessionState {
            self.state
        }
    }

    #[derive(Default)]
    struct RecordingLogger {
        records: Mutex<Vec<String>>,
    }

    impl Logger for RecordingLogger {
        fn log(&self, message: &str) {
            self.records.lock().unwrap().push(message.to_string());
        }
    }

    fn upgrade_request() -> RequestHead {
        RequestHead::parse(
            b"GET /chat HTTP/1.1\r\nHost: example.com\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n",
        )
        .unwrap()
    }

    #[test]
    fn test_on_open_sends_exactly_one_health_response_and_closes() {
        let responder = HealthCheckResponder::new();
        let mut session = MockSession::new();

        responder.on_open(&mut session, Some(&upgrade_request()));

        assert_eq!(session.sent, vec![HEALTH_BYTES.to_vec()]);
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.close_calls, 1);
    }

    #[test]
    fn test_on_open_without_request_still_responds() {
        let responder = HealthCheckResponder::new();
        let mut session = MockSession::new();

        responder.on_open(&mut session, None);

        assert_eq!(session.sent, vec![HEALTH_BYTES.to_vec()]);
        assert!(!session.is_open());
    }

    #[test]
    fn test_on_open_ignores_request_content() {
        let responder = HealthCheckResponder::new();
        let requests = [
            "DELETE /admin HTTP/1.1\r\nAuthorization: Bearer nope\r\n\r\n",
            "OPTIONS * HTTP/1.0\r\n\r\n",
            "PATCH /books/42?x=1 HTTP/1.1\r\nContent-Length: 9999\r\n\r\n",
        ];
        for raw in requests {
            let head = RequestHead::parse(raw.as_bytes()).unwrap();
            let mut session = MockSession::new();
            responder.on_open(&mut session, Some(&head));
            assert_eq!(session.sent, vec![HEALTH_BYTES.to_vec()], "request: {raw}");
            assert!(!session.is_open());
        }
    }

    #[test]
    fn test_on_open_send_failure_closes_and_logs() {
        let logger = Arc::new(RecordingLogger::default());
        let responder = HealthCheckResponder::with_logger(logger.clone());
        let mut session = MockSession::failing();

        responder.on_open(&mut session, None);

        assert!(session.sent.is_empty());
        assert_eq!(session.close_calls, 1);
        let records = logger.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].contains("broken pipe"));
    }

    #[test]
    fn test_on_message_has_no_side_effects() {
        let responder = HealthCheckResponder::new();
        let large = vec![0xAB; 1024 * 1024];
        let payloads: [&[u8]; 3] = [b"", b"ping", &large];

        for payload in payloads {
            let mut session = MockSession::new();
            responder.on_message(&mut session, payload);
            assert!(session.sent.is_empty());
            assert_eq!(session.close_calls, 0);
            assert!(session.is_open());
        }
    }

    #[test]
    fn test_on_close_has_no_side_effects() {
        let responder = HealthCheckResponder::new();
        let mut session = MockSession::new();

        responder.on_close(&mut session);

        assert!(session.sent.is_empty());
        assert_eq!(session.close_calls, 0);
    }

    #[test]
    fn test_on_error_logs_message_and_closes() {
        let logger = Arc::new(RecordingLogger::default());
        let responder = HealthCheckResponder::with_logger(logger.clone());
        let mut session = MockSession::new();

        responder.on_error(&mut session, TransportError::new("boom"));

        assert_eq!(session.state(), SessionState::Closed);
        let records = logger.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].contains("boom"));
    }

    #[test]
    fn test_on_error_without_logger_still_closes() {
        let responder = HealthCheckResponder::default();
        let mut session = MockSession::new();

        responder.on_error(&mut session, TransportError::new("boom"));

        assert_eq!(session.close_calls, 1);
        assert!(session.sent.is_empty());
    }

    #[test]
    fn test_responder_shared_across_threads() {
        let logger = Arc::new(RecordingLogger::default());
        let responder = Arc::new(HealthCheckResponder::with_logger(logger.clone()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let responder = Arc::clone(&responder);
                std::thread::spawn(move || {
                    let mut session = MockSession::new();
                    responder.on_open(&mut session, None);
                    responder.on_error(&mut session, TransportError::new(format!("err {i}")));
                    session.sent
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), vec![HEALTH_BYTES.to_vec()]);
        }
        assert_eq!(logger.records.lock().unwrap().len(), 8);
    }
}
