//! G-lines (AKILLs): bans by host and identity.

use super::{MatchContext, XLine, XLineKind, XLineManager, XLineSet};
use crate::effect::XLineEffect;
use crate::matcher::{match_mask, regex_match, wildcard_match};
use crate::user::User;
use std::sync::Arc;

/// Manager for G-lines, the most severe category.
///
/// A match is enforced by announcing the AKILL; the uplink removes the user
/// network-wide, so there is no local kill here.
#[derive(Debug, Default)]
pub struct GlineManager {
    xlines: XLineSet,
}

impl GlineManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl XLineManager for GlineManager {
    fn kind(&self) -> XLineKind {
        XLineKind::Gline
    }

    fn xlines(&self) -> &XLineSet {
        &self.xlines
    }

    fn xlines_mut(&mut self) -> &mut XLineSet {
        &mut self.xlines
    }

    fn check(&self, user: &User, x: &XLine) -> bool {
        if let Some(re) = x.regex() {
            return regex_match(&user.user_host(), re) || regex_match(&user.full_mask(), re);
        }

        if !x.nick().is_empty() && !wildcard_match(&user.nick, x.nick()) {
            return false;
        }
        if !x.user().is_empty() && !wildcard_match(&user.ident, x.user()) {
            return false;
        }
        if !x.real().is_empty() && !match_mask(&user.realname, x.real(), true, false) {
            return false;
        }

        if let Some(net) = x.cidr() {
            return net.contains(&user.ip);
        }

        x.host().is_empty()
            || wildcard_match(&user.host, x.host())
            || wildcard_match(&user.ip.to_string(), x.host())
    }

    fn send(&self, _ctx: &MatchContext, user: Option<&User>, x: &Arc<XLine>) -> Vec<XLineEffect> {
        vec![XLineEffect::Propagate {
            kind: self.kind(),
            xline: Arc::clone(x),
            target_uid: user.map(|u| u.uid.clone()),
        }]
    }

    fn send_del(&self, _ctx: &MatchContext, x: &Arc<XLine>) -> Vec<XLineEffect> {
        vec![XLineEffect::PropagateDel {
            kind: self.kind(),
            xline: Arc::clone(x),
        }]
    }
}
