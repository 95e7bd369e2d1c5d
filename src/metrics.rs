//! Prometheus metrics for X-line enforcement.
//!
//! - `operserv_xlines_matched_total{kind}` - users matched by a rule
//! - `operserv_xlines_propagated_total{kind,op}` - adds/removals sent to the uplink
//! - `operserv_xlines_expired_total{kind}` - rules removed by the expiry sweep
//! - `operserv_users_killed_total{kind}` - users disconnected by a rule
//! - `operserv_nick_collisions_total` - users collided off a banned nickname
//!
//! Recording before [`init`] is a no-op.

use crate::xline::XLineKind;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters
// ========================================================================

/// Users matched by an X-line, by category.
pub static XLINES_MATCHED: OnceLock<IntCounterVec> = OnceLock::new();

/// X-line adds and removals announced to the network.
pub static XLINES_PROPAGATED: OnceLock<IntCounterVec> = OnceLock::new();

/// X-lines removed because their lifetime ran out.
pub static XLINES_EXPIRED: OnceLock<IntCounterVec> = OnceLock::new();

/// Users killed by an X-line, by category.
pub static USERS_KILLED: OnceLock<IntCounterVec> = OnceLock::new();

/// Users collided off a banned nickname instead of being killed.
pub static NICK_COLLISIONS: OnceLock<IntCounter> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Call once at startup. Later calls leave the registered metrics in place.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            if $metric.get().is_none() {
                match $init {
                    Ok(m) => {
                        if let Err(e) = r.register(Box::new(m.clone())) {
                            tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                        }
                        let _ = $metric.set(m);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                    }
                }
            }
        };
    }

    register!(XLINES_MATCHED, IntCounterVec::new(Opts::new("operserv_xlines_matched_total", "Users matched by an X-line"), &["kind"]));
    register!(XLINES_PROPAGATED, IntCounterVec::new(Opts::new("operserv_xlines_propagated_total", "X-line changes sent to the uplink"), &["kind", "op"]));
    register!(XLINES_EXPIRED, IntCounterVec::new(Opts::new("operserv_xlines_expired_total", "X-lines removed on expiry"), &["kind"]));
    register!(USERS_KILLED, IntCounterVec::new(Opts::new("operserv_users_killed_total", "Users killed by an X-line"), &["kind"]));
    register!(NICK_COLLISIONS, IntCounter::new("operserv_nick_collisions_total", "Users collided off a banned nickname"));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

fn get_counter_vec(metric: &OnceLock<IntCounterVec>) -> Option<&IntCounterVec> {
    metric.get()
}

/// Record a user matching an X-line.
#[inline]
pub fn record_match(kind: XLineKind) {
    if let Some(c) = get_counter_vec(&XLINES_MATCHED) {
        c.with_label_values(&[kind.label()]).inc();
    }
}

/// Record an X-line add (`op = "add"`) or removal (`op = "del"`) sent upstream.
#[inline]
pub fn record_propagation(kind: XLineKind, op: &str) {
    if let Some(c) = get_counter_vec(&XLINES_PROPAGATED) {
        c.with_label_values(&[kind.label(), op]).inc();
    }
}

#[inline]
pub fn record_expired(kind: XLineKind) {
    if let Some(c) = get_counter_vec(&XLINES_EXPIRED) {
        c.with_label_values(&[kind.label()]).inc();
    }
}

#[inline]
pub fn record_kill(kind: XLineKind) {
    if let Some(c) = get_counter_vec(&USERS_KILLED) {
        c.with_label_values(&[kind.label()]).inc();
    }
}

#[inline]
pub fn record_collision() {
    if let Some(c) = NICK_COLLISIONS.get() {
        c.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_lifecycle() {
        init();
        init();

        record_match(XLineKind::Qline);
        record_propagation(XLineKind::Gline, "add");
        record_kill(XLineKind::Nline);
        record_collision();

        let output = gather_metrics();
        assert!(output.contains("operserv_xlines_matched_total"));
        assert!(output.contains("kind=\"qline\""));
        assert!(output.contains("op=\"add\""));
        assert!(output.contains("operserv_nick_collisions_total"));
    }
}
