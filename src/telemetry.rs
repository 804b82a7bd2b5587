//! Tracing subscriber setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber with the given filter, as text or JSON.
///
/// Only the first call has an effect; later calls are ignored so tests can
/// call it freely.
pub fn init_tracing(filter: &str, json: bool) {
    let registry = tracing_subscriber::registry().with(EnvFilter::new(filter));

    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if result.is_err() {
        eprintln!("Unable to set global default subscriber");
    }
}
