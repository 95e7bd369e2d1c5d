//! N-lines (SNLINEs): bans by realname.

use super::{MatchContext, XLine, XLineKind, XLineManager, XLineSet};
use crate::effect::XLineEffect;
use crate::matcher::{match_mask, regex_match};
use crate::user::User;
use std::sync::Arc;

/// Kill reason prefix for realname bans.
pub const NLINE_KILL_PREFIX: &str = "SNLined: ";

/// Manager for N-lines.
///
/// Matching users are always killed locally, even when the SNLINE is also
/// propagated: not every protocol acts on a realname ban it receives.
#[derive(Debug, Default)]
pub struct NlineManager {
    xlines: XLineSet,
}

impl NlineManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl XLineManager for NlineManager {
    fn kind(&self) -> XLineKind {
        XLineKind::Nline
    }

    fn xlines(&self) -> &XLineSet {
        &self.xlines
    }

    fn xlines_mut(&mut self) -> &mut XLineSet {
        &mut self.xlines
    }

    fn check(&self, user: &User, x: &XLine) -> bool {
        match x.regex() {
            Some(re) => regex_match(&user.realname, re),
            None => match_mask(&user.realname, x.mask(), false, true),
        }
    }

    fn send(&self, ctx: &MatchContext, user: Option<&User>, x: &Arc<XLine>) -> Vec<XLineEffect> {
        let mut effects = Vec::new();

        if ctx.caps.can_snline && !x.is_regex() {
            effects.push(XLineEffect::Propagate {
                kind: self.kind(),
                xline: Arc::clone(x),
                target_uid: user.map(|u| u.uid.clone()),
            });
        }

        if let Some(user) = user {
            effects.push(XLineEffect::Kill {
                kind: self.kind(),
                target_uid: user.uid.clone(),
                reason: format!("{NLINE_KILL_PREFIX}{}", x.reason()),
            });
        }

        effects
    }

    fn send_del(&self, ctx: &MatchContext, x: &Arc<XLine>) -> Vec<XLineEffect> {
        if ctx.caps.can_snline && !x.is_regex() {
            vec![XLineEffect::PropagateDel {
                kind: self.kind(),
                xline: Arc::clone(x),
            }]
        } else {
            Vec::new()
        }
    }
}
