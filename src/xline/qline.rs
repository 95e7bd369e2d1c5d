//! Q-lines (SQLINEs): bans by nickname, and by channel name for `#` masks.

use super::{MatchContext, XLine, XLineKind, XLineManager, XLineSet};
use crate::effect::XLineEffect;
use crate::matcher::{match_mask, regex_match, wildcard_match};
use crate::user::User;
use std::sync::Arc;

/// Kill reason prefix for nickname bans.
pub const QLINE_KILL_PREFIX: &str = "Q-Lined: ";

/// Manager for Q-lines.
#[derive(Debug, Default)]
pub struct QlineManager {
    xlines: XLineSet,
}

impl QlineManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn kill(&self, user: &User, x: &XLine) -> XLineEffect {
        XLineEffect::Kill {
            kind: self.kind(),
            target_uid: user.uid.clone(),
            reason: format!("{QLINE_KILL_PREFIX}{}", x.reason()),
        }
    }
}

/// Whether a Q-line mask targets channel names.
fn is_channel_mask(x: &XLine) -> bool {
    x.mask().starts_with('#')
}

impl XLineManager for QlineManager {
    fn kind(&self) -> XLineKind {
        XLineKind::Qline
    }

    fn xlines(&self) -> &XLineSet {
        &self.xlines
    }

    fn xlines_mut(&mut self) -> &mut XLineSet {
        &mut self.xlines
    }

    fn check(&self, user: &User, x: &XLine) -> bool {
        match x.regex() {
            Some(re) => regex_match(&user.nick, re),
            None => wildcard_match(&user.nick, x.mask()),
        }
    }

    fn send(&self, ctx: &MatchContext, user: Option<&User>, x: &Arc<XLine>) -> Vec<XLineEffect> {
        let mut effects = Vec::new();

        if !ctx.caps.can_sqline {
            if let Some(user) = user {
                if ctx.collider_available {
                    effects.push(XLineEffect::Collide {
                        target_uid: user.uid.clone(),
                    });
                } else {
                    effects.push(self.kill(user, x));
                }
            }
        } else if x.is_regex() {
            // Peers cannot be told about a regex; enforce locally only.
            if let Some(user) = user {
                effects.push(self.kill(user, x));
            }
        } else if !is_channel_mask(x) || ctx.caps.can_sqline_channel {
            effects.push(XLineEffect::Propagate {
                kind: self.kind(),
                xline: Arc::clone(x),
                target_uid: user.map(|u| u.uid.clone()),
            });
            // Opers are assumed to be walking it; everyone else is killed
            // on top of the SQLINE.
            if let Some(user) = user.filter(|u| !u.is_oper) {
                effects.push(self.kill(user, x));
            }
        }

        effects
    }

    fn send_del(&self, ctx: &MatchContext, x: &Arc<XLine>) -> Vec<XLineEffect> {
        if !ctx.caps.can_sqline || x.is_regex() {
            return Vec::new();
        }
        if is_channel_mask(x) && !ctx.caps.can_sqline_channel {
            return Vec::new();
        }
        vec![XLineEffect::PropagateDel {
            kind: self.kind(),
            xline: Arc::clone(x),
        }]
    }

    fn check_channel(&self, channel: &str, now: i64) -> Option<Arc<XLine>> {
        self.xlines
            .find_active(now, |x| match x.regex() {
                Some(re) => regex_match(channel, re),
                None => is_channel_mask(x) && match_mask(channel, x.mask(), false, true),
            })
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xline::Capabilities;

    fn user(nick: &str) -> User {
        User::new("001AAAAAC", nick, "ident", "host.example", "203.0.113.9".parse().unwrap())
    }

    fn ctx(can_sqline: bool, can_sqline_channel: bool, collider_available: bool) -> MatchContext {
        MatchContext {
            caps: Capabilities {
                can_sqline,
                can_sqline_channel,
                can_snline: false,
            },
            collider_available,
        }
    }

    fn rule(mask: &str) -> Arc<XLine> {
        Arc::new(XLine::new(mask, "reserved").unwrap())
    }

    fn is_kill(effect: &XLineEffect) -> bool {
        matches!(effect, XLineEffect::Kill { reason, .. } if reason == "Q-Lined: reserved")
    }

    #[test]
    fn test_check_nick() {
        let qm = QlineManager::new();
        assert!(qm.check(&user("BadUser"), &rule("bad*")));
        assert!(!qm.check(&user("gooduser"), &rule("bad*")));
        assert!(qm.check(&user("bot123"), &rule("/bot\\d+/")));
        assert!(!qm.check(&user("xbot123"), &rule("/bot\\d+/")));
    }

    #[test]
    fn test_no_native_support_kills_without_collider() {
        let qm = QlineManager::new();
        let effects = qm.on_match(&ctx(false, false, false), &user("baduser"), &rule("bad*"));
        assert_eq!(effects.len(), 1);
        assert!(is_kill(&effects[0]));
    }

    #[test]
    fn test_no_native_support_collides_when_available() {
        let qm = QlineManager::new();
        let effects = qm.on_match(&ctx(false, false, true), &user("baduser"), &rule("bad*"));
        assert!(matches!(effects.as_slice(), [XLineEffect::Collide { .. }]));

        // Nothing to do without a user.
        assert!(qm.send(&ctx(false, false, true), None, &rule("bad*")).is_empty());
    }

    #[test]
    fn test_regex_is_local_only() {
        let qm = QlineManager::new();
        let x = rule("/bad.*/");
        let effects = qm.on_match(&ctx(true, true, false), &user("baduser"), &x);
        assert_eq!(effects.len(), 1);
        assert!(is_kill(&effects[0]));
        assert!(qm.send(&ctx(true, true, false), None, &x).is_empty());
        assert!(qm.send_del(&ctx(true, true, false), &x).is_empty());
    }

    #[test]
    fn test_native_propagates_and_kills_non_opers() {
        let qm = QlineManager::new();
        let x = rule("bad*");

        let effects = qm.on_match(&ctx(true, false, false), &user("baduser"), &x);
        assert_eq!(effects.len(), 2);
        assert!(matches!(effects[0], XLineEffect::Propagate { .. }));
        assert!(is_kill(&effects[1]));

        let oper = user("baduser").with_oper(true);
        let effects = qm.on_match(&ctx(true, false, false), &oper, &x);
        assert!(matches!(effects.as_slice(), [XLineEffect::Propagate { .. }]));
    }

    #[test]
    fn test_channel_mask_needs_channel_support() {
        let qm = QlineManager::new();
        let x = rule("#evil*");

        assert!(qm.send(&ctx(true, false, false), None, &x).is_empty());
        assert!(qm.send_del(&ctx(true, false, false), &x).is_empty());

        assert_eq!(qm.send(&ctx(true, true, false), None, &x).len(), 1);
        assert_eq!(qm.send_del(&ctx(true, true, false), &x).len(), 1);
    }

    #[test]
    fn test_send_del_is_pure() {
        let qm = QlineManager::new();
        let x = rule("bad*");
        let c = ctx(true, false, false);
        assert_eq!(qm.send_del(&c, &x).len(), qm.send_del(&c, &x).len());
        assert!(qm.send_del(&ctx(false, true, false), &x).is_empty());
    }

    #[test]
    fn test_check_channel() {
        let mut qm = QlineManager::new();
        qm.xlines_mut().add(XLine::new("*evil*", "not a channel mask").unwrap());
        qm.xlines_mut().add(XLine::new("#Evil[chan]", "closed").unwrap());
        qm.xlines_mut().add(XLine::new("/#warez-.*/", "regex").unwrap());

        let found = qm.check_channel("#evil{CHAN}", 0).unwrap();
        assert_eq!(found.reason(), "closed");

        let found = qm.check_channel("#warez-movies", 0).unwrap();
        assert_eq!(found.reason(), "regex");

        assert!(qm.check_channel("#evilchan", 0).is_none());
        assert!(qm.check_channel("evilchan", 0).is_none());
    }

    #[test]
    fn test_on_expire_logs_nickban() {
        let qm = QlineManager::new();
        let effect = qm.on_expire(&XLine::new("bad*", "x").unwrap());
        assert!(matches!(effect, XLineEffect::Log { category: "expire/nickban", .. }));
    }
}
