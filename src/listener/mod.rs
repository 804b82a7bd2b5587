//! TCP transport for connection handlers.
//!
//! The listener accepts connections on a tokio `TcpListener`, drives each one
//! through a `ConnectionHandler` in its own task, and drains in-flight
//! sessions on shutdown (SIGTERM/SIGINT).

mod connection;
mod server;
mod shutdown;

pub use connection::{serve_connection, BufferedSession, ConnectionLimits};
pub use server::{HealthListener, ServerError};
pub use shutdown::shutdown_signal;
