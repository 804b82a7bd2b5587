//! Bookshelf health listener
//!
//! A liveness probe target for the Bookshelf sample application: every
//! accepted connection receives `HTTP/1.1 200 OK` with `Content-Length: 0`
//! and is closed immediately.

pub mod config;
pub mod error;
pub mod health;
pub mod listener;
pub mod session;
pub mod telemetry;

pub use error::TransportError;
pub use health::{ConnectionHandler, HealthCheckResponder};
pub use listener::HealthListener;
