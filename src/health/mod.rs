//! Liveness responder.
//!
//! Answers every connection with a fixed `200 OK` and closes it without
//! looking at the request. Transport errors are logged and close the session.

mod logger;
mod responder;
mod response;

pub use logger::{DiscardLogger, Logger, TracingLogger};
pub use responder::{ConnectionHandler, HealthCheckResponder};
pub use response::{build_health_response, Response};
