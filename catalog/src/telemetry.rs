//! Tracing subscriber initialization.
//!
//! Exporters (OTLP, Prometheus, etc.) are deliberately out of scope (§1);
//! this wires up `tracing-subscriber` only, with an env-filter and a
//! formatter chosen by `log.json`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

pub fn init(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,catalog=debug,enrichment=debug"));

    let registry = tracing_subscriber::registry().with(filter);

    if log.json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true).compact()).init();
    }
}
