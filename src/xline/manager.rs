//! The contract every X-line category implements.

use super::{XLine, XLineKind, XLineSet};
use crate::effect::XLineEffect;
use crate::user::User;
use serde::Deserialize;
use std::sync::Arc;

/// What the uplink protocol can enforce natively.
///
/// When a capability is missing, OperServ falls back to enforcing locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Capabilities {
    /// The protocol understands nickname bans (SQLINE).
    #[serde(default)]
    pub can_sqline: bool,
    /// The protocol accepts SQLINEs on `#channel` masks.
    #[serde(default)]
    pub can_sqline_channel: bool,
    /// The protocol understands realname bans (SGLINE/SNLINE).
    #[serde(default)]
    pub can_snline: bool,
}

/// Runtime state an enforcement decision depends on.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchContext {
    pub caps: Capabilities,
    /// A nick collision service is available for graceful nick recovery.
    pub collider_available: bool,
}

/// An X-line category: its rules, how they match, and how they are enforced.
///
/// Enforcement is expressed as [`XLineEffect`]s; the caller applies them.
/// This keeps every policy decision a pure function of its inputs.
pub trait XLineManager: Send + Sync {
    fn kind(&self) -> XLineKind;

    fn xlines(&self) -> &XLineSet;

    fn xlines_mut(&mut self) -> &mut XLineSet;

    /// Does `user` match `x`?
    fn check(&self, user: &User, x: &XLine) -> bool;

    /// Announce `x` to the network, and enforce it on `user` if given.
    fn send(&self, ctx: &MatchContext, user: Option<&User>, x: &Arc<XLine>) -> Vec<XLineEffect>;

    /// Announce the removal of `x` to the network.
    fn send_del(&self, ctx: &MatchContext, x: &Arc<XLine>) -> Vec<XLineEffect>;

    /// Called when `user` matched `x`.
    fn on_match(&self, ctx: &MatchContext, user: &User, x: &Arc<XLine>) -> Vec<XLineEffect> {
        self.send(ctx, Some(user), x)
    }

    /// Called once when `x` has run out its lifetime.
    fn on_expire(&self, x: &XLine) -> XLineEffect {
        XLineEffect::Log {
            category: expire_category(self.kind()),
            message: format!("{} on {} has expired", self.kind().name(), x.mask()),
        }
    }

    /// First active rule matching a channel name. Only nickname bans can
    /// target channels.
    fn check_channel(&self, _channel: &str, _now: i64) -> Option<Arc<XLine>> {
        None
    }

    /// First active rule in this set matching `user`.
    fn check_all_xlines(&self, user: &User, now: i64) -> Option<Arc<XLine>> {
        self.xlines()
            .find_active(now, |x| self.check(user, x))
            .cloned()
    }
}

fn expire_category(kind: XLineKind) -> &'static str {
    match kind {
        XLineKind::Gline => "expire/akill",
        XLineKind::Qline => "expire/nickban",
        XLineKind::Nline => "expire/realnameban",
    }
}
