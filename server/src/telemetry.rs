//! Telemetry for the TradeFair server
//!
//! Structured logging with tracing-subscriber. The filter defaults to
//! `info` for our code and the actix stack, `warn` for diesel, and can be
//! overridden with RUST_LOG.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// Call once at startup, before anything logs.
pub fn init_telemetry() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,actix_server=info,diesel=warn".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
