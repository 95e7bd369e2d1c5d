//! Tracing setup and span constructors.

use crate::config::{LogConfig, LogFormat};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured filter.
pub fn init_tracing(config: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = match config.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(e) = result {
        eprintln!("tracing already initialized: {e}");
    }
}

/// Standardized span constructors for OperServ observability.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span for one inbound gateway event.
    pub fn event(name: &str) -> Span {
        info_span!("event", name = %name)
    }

    /// Span for a connect-time check of one user.
    pub fn check_user(uid: &str, nick: &str) -> Span {
        info_span!("check_user", uid = %uid, nick = %nick)
    }

    /// Span for an expiry sweep.
    pub fn expire(now: i64) -> Span {
        info_span!("expire", now = now)
    }
}
