//! Enforcement effects and the collaborators that carry them out.
//!
//! X-line managers never touch the network directly. They return a list of
//! [`XLineEffect`]s which [`apply_effects`] hands to the uplink, the user
//! directory, the nick collision service and the log sink.

use crate::metrics;
use crate::xline::{XLine, XLineKind};
use std::sync::Arc;
use tracing::{debug, info};

/// A single enforcement step produced by an X-line manager.
#[derive(Debug, Clone)]
pub enum XLineEffect {
    /// Announce the X-line to the network.
    Propagate {
        kind: XLineKind,
        xline: Arc<XLine>,
        /// The user whose match triggered the announcement, if any.
        target_uid: Option<String>,
    },

    /// Announce removal of the X-line to the network.
    PropagateDel { kind: XLineKind, xline: Arc<XLine> },

    /// Disconnect a user.
    Kill {
        kind: XLineKind,
        target_uid: String,
        reason: String,
    },

    /// Force a user off their nickname without disconnecting them.
    Collide { target_uid: String },

    /// Write a categorized log line.
    Log {
        category: &'static str,
        message: String,
    },
}

/// Outbound link to the rest of the network.
pub trait Uplink: Send + Sync {
    fn send_xline(&self, kind: XLineKind, xline: &XLine, target_uid: Option<&str>);

    fn send_xline_del(&self, kind: XLineKind, xline: &XLine);
}

/// Access to connected users.
pub trait UserDirectory: Send + Sync {
    fn kill(&self, target_uid: &str, source: &str, reason: &str);

    fn notice(&self, target_uid: &str, source: &str, text: &str);
}

/// Graceful nickname recovery (NickServ-style collide).
pub trait NickCollider: Send + Sync {
    fn collide(&self, target_uid: &str);
}

/// Destination for categorized service log lines.
pub trait LogSink: Send + Sync {
    fn log(&self, category: &str, message: &str);
}

/// Log sink writing to `tracing` under the `operserv` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, category: &str, message: &str) {
        info!(target: "operserv", category = %category, "{message}");
    }
}

/// Everything effects are applied to.
#[derive(Clone)]
pub struct Collaborators {
    pub uplink: Arc<dyn Uplink>,
    pub users: Arc<dyn UserDirectory>,
    /// Optional: without it, nickname bans on protocols lacking SQLINE
    /// fall back to killing.
    pub collider: Option<Arc<dyn NickCollider>>,
    pub log: Arc<dyn LogSink>,
}

impl Collaborators {
    pub fn new(uplink: Arc<dyn Uplink>, users: Arc<dyn UserDirectory>) -> Self {
        Self {
            uplink,
            users,
            collider: None,
            log: Arc::new(TracingLogSink),
        }
    }

    pub fn with_collider(mut self, collider: Arc<dyn NickCollider>) -> Self {
        self.collider = Some(collider);
        self
    }

    pub fn with_log_sink(mut self, log: Arc<dyn LogSink>) -> Self {
        self.log = log;
        self
    }
}

/// Summary of an [`apply_effects`] call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Applied {
    /// UIDs disconnected, in order.
    pub killed: Vec<String>,
    pub propagated: usize,
    pub removed: usize,
}

impl Applied {
    pub fn killed(&self, uid: &str) -> bool {
        self.killed.iter().any(|k| k == uid)
    }

    fn merge(&mut self, other: Applied) {
        self.killed.extend(other.killed);
        self.propagated += other.propagated;
        self.removed += other.removed;
    }
}

/// Apply effects in order. `source` is the service nick kills come from.
pub fn apply_effects(collab: &Collaborators, source: &str, effects: Vec<XLineEffect>) -> Applied {
    let mut applied = Applied::default();
    for effect in effects {
        applied.merge(apply_effect(collab, source, effect));
    }
    applied
}

/// Apply a single effect.
pub fn apply_effect(collab: &Collaborators, source: &str, effect: XLineEffect) -> Applied {
    let mut applied = Applied::default();

    match effect {
        XLineEffect::Propagate {
            kind,
            xline,
            target_uid,
        } => {
            collab
                .uplink
                .send_xline(kind, &xline, target_uid.as_deref());
            metrics::record_propagation(kind, "add");
            debug!(kind = %kind, mask = %xline.mask(), target = ?target_uid, "X-line propagated");
            applied.propagated += 1;
        }

        XLineEffect::PropagateDel { kind, xline } => {
            collab.uplink.send_xline_del(kind, &xline);
            metrics::record_propagation(kind, "del");
            debug!(kind = %kind, mask = %xline.mask(), "X-line removal propagated");
            applied.removed += 1;
        }

        XLineEffect::Kill {
            kind,
            target_uid,
            reason,
        } => {
            collab.users.kill(&target_uid, source, &reason);
            metrics::record_kill(kind);
            info!(uid = %target_uid, killer = %source, reason = %reason, "User killed by X-line");
            applied.killed.push(target_uid);
        }

        XLineEffect::Collide { target_uid } => match &collab.collider {
            Some(collider) => {
                collider.collide(&target_uid);
                metrics::record_collision();
                info!(uid = %target_uid, "User collided off banned nickname");
            }
            None => debug!(uid = %target_uid, "No collision service, skipping collide"),
        },

        XLineEffect::Log { category, message } => collab.log.log(category, &message),
    }

    applied
}
