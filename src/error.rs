use std::io;

/// Error reported by the connection layer for a single session.
///
/// Always absorbed by the connection handler: it is logged and the session
/// is closed. It never turns into a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        Self::new(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_message() {
        let err = TransportError::new("boom");
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn test_from_io_error_keeps_message() {
        let err: TransportError =
            io::Error::new(io::ErrorKind::ConnectionReset, "peer reset").into();
        assert!(err.message().contains("peer reset"));
    }
}
