//! Tracing setup for tools built on the loader.
//!
//! The library only emits events. Decoders log at `debug`/`trace`, anomalies
//! such as records after an end record at `warn`, and every error at the
//! point it is raised through [`log_error!`](crate::log_error). A binary picks
//! one of the installers below; `RUST_LOG` overrides the default filter.

use std::sync::Once;
use tracing::info;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "fwimage=info";

static INIT: Once = Once::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Human-readable output on stderr. Only the first installer call in a
/// process has any effect.
pub fn init_tracing() {
    INIT.call_once(|| {
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_line_number(true);

        // someone else's subscriber wins
        if tracing_subscriber::registry()
            .with(env_filter())
            .with(layer)
            .try_init()
            .is_ok()
        {
            info!(filter = DEFAULT_FILTER, "image loader tracing enabled");
        }
    });
}

/// One JSON object per event, for log collectors.
pub fn init_tracing_json() {
    INIT.call_once(|| {
        let layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true);

        if tracing_subscriber::registry()
            .with(env_filter())
            .with(layer)
            .try_init()
            .is_ok()
        {
            info!(filter = DEFAULT_FILTER, "image loader tracing enabled (json)");
        }
    });
}

/// Log an error where it is raised and hand it back, so call sites read
/// `return Err(log_error!(ImageError::Format(..)))`.
#[macro_export]
macro_rules! log_error {
    ($err:expr) => {{
        let e = $err;
        tracing::error!(error = %e, "image operation failed");
        e
    }};
    ($err:expr, $context:expr) => {{
        let e = $err;
        tracing::error!(error = %e, context = $context, "image operation failed");
        e
    }};
}
