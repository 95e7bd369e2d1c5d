//! OperServ core: ties the X-line managers to network events.
//!
//! Every event handler here is synchronous. Managers decide what should
//! happen as a list of [`XLineEffect`]s, and OperServ applies them to its
//! [`Collaborators`] with itself as the source.

use crate::config::{Config, ConfigError};
use crate::effect::{Applied, Collaborators, NickCollider, XLineEffect, apply_effects};
use crate::error::{XLineError, XLineResult};
use crate::matcher::irc_eq;
use crate::metrics;
use crate::telemetry::spans;
use crate::user::User;
use crate::xline::{
    AddCheck, Capabilities, MatchContext, XLine, XLineBuilder, XLineKind, XLineManager,
    XLineRegistry,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Text sent to non-operators who message OperServ while it is opers-only.
pub const ACCESS_DENIED: &str = "Access denied.";

/// Outcome of a channel join check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KickCheck {
    /// No rule objects; let the join proceed.
    Continue,
    /// A Q-line covers the channel.
    Deny { mask: String, reason: String },
}

/// Whether later handlers should still see an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventReturn {
    Continue,
    Stop,
}

/// A rule that matched a user, and what enforcing it did.
#[derive(Debug, Clone)]
pub struct XLineMatch {
    pub kind: XLineKind,
    pub xline: Arc<XLine>,
    pub applied: Applied,
}

/// The OperServ pseudo-client.
pub struct OperServ {
    client: String,
    opers_only: bool,
    caps: Capabilities,
    regex_case_insensitive: bool,
    registry: XLineRegistry,
    collab: Collaborators,
}

impl OperServ {
    pub fn new(config: &Config, registry: XLineRegistry, collab: Collaborators) -> Self {
        info!(
            client = %config.operserv.client,
            managers = registry.len(),
            "OperServ started"
        );
        Self {
            client: config.operserv.client.clone(),
            opers_only: config.operserv.opers_only,
            caps: config.protocol,
            regex_case_insensitive: config.xlines.regex_case_insensitive,
            registry,
            collab,
        }
    }

    /// Service nickname. Kills and notices are sent from it.
    pub fn client(&self) -> &str {
        &self.client
    }

    pub fn opers_only(&self) -> bool {
        self.opers_only
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    pub fn registry(&self) -> &XLineRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut XLineRegistry {
        &mut self.registry
    }

    /// Attach or detach the nick collision service.
    pub fn set_collider(&mut self, collider: Option<Arc<dyn NickCollider>>) {
        self.collab.collider = collider;
    }

    pub fn context(&self) -> MatchContext {
        MatchContext {
            caps: self.caps,
            collider_available: self.collab.collider.is_some(),
        }
    }

    /// Start building a rule with the configured regex options.
    pub fn xline_builder(&self, mask: impl Into<String>) -> XLineBuilder {
        XLine::builder(mask)
            .by(self.client.clone())
            .regex_case_insensitive(self.regex_case_insensitive)
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn apply(&self, effects: Vec<XLineEffect>) -> Applied {
        apply_effects(&self.collab, &self.client, effects)
    }

    fn log(&self, category: &str, message: &str) {
        self.collab.log.log(category, message);
    }

    // ========================================================================
    // User events
    // ========================================================================

    /// Check a newly connected user against every X-line category.
    pub fn on_user_connect(&self, user: &User, exempt: bool) -> Vec<XLineMatch> {
        if user.quitting || exempt {
            debug!(uid = %user.uid, quitting = user.quitting, exempt, "Skipping X-line check");
            return Vec::new();
        }
        self.check_all(user)
    }

    pub fn check_all(&self, user: &User) -> Vec<XLineMatch> {
        self.check_all_at(user, Self::now())
    }

    /// Walk the managers in priority order. Each category enforces its first
    /// matching rule; once the user is killed the rest are skipped.
    pub fn check_all_at(&self, user: &User, now: i64) -> Vec<XLineMatch> {
        let _span = spans::check_user(&user.uid, &user.nick).entered();
        let ctx = self.context();
        let mut matches = Vec::new();

        for manager in self.registry.iter() {
            let Some(m) = self.enforce(manager, &ctx, user, now) else {
                continue;
            };
            let killed = m.applied.killed(&user.uid);
            matches.push(m);
            if killed {
                debug!(uid = %user.uid, "User killed, skipping remaining X-line categories");
                break;
            }
        }

        matches
    }

    fn enforce(
        &self,
        manager: &dyn XLineManager,
        ctx: &MatchContext,
        user: &User,
        now: i64,
    ) -> Option<XLineMatch> {
        let xline = manager.check_all_xlines(user, now)?;
        let kind = manager.kind();
        metrics::record_match(kind);
        info!(
            kind = %kind,
            mask = %xline.mask(),
            user = %user.mask(),
            "User matched X-line"
        );
        let applied = self.apply(manager.on_match(ctx, user, &xline));
        Some(XLineMatch {
            kind,
            xline,
            applied,
        })
    }

    /// Only nickname bans care about a new nick, and opers are let through.
    pub fn on_user_nick_change(&self, user: &User, old_nick: &str) -> Option<XLineMatch> {
        if user.is_oper {
            return None;
        }
        let manager = self.registry.get(XLineKind::Qline)?;
        debug!(uid = %user.uid, old = %old_nick, new = %user.nick, "Re-checking nick bans");
        self.enforce(manager, &self.context(), user, Self::now())
    }

    /// Check a channel join against `#channel` Q-lines.
    pub fn on_check_kick(&self, user: &User, channel: &str) -> KickCheck {
        let Some(manager) = self.registry.get(XLineKind::Qline) else {
            return KickCheck::Continue;
        };
        let Some(xline) = manager.check_channel(channel, Self::now()) else {
            return KickCheck::Continue;
        };

        metrics::record_match(XLineKind::Qline);
        info!(channel = %channel, mask = %xline.mask(), user = %user.mask(), "Channel is Q-lined");
        self.apply(manager.on_match(&self.context(), user, &xline));

        KickCheck::Deny {
            mask: xline.mask().to_string(),
            reason: xline.reason().to_string(),
        }
    }

    /// Enforce opers-only access on messages to the service.
    pub fn on_bot_privmsg(&self, user: &User, target: &str, message: &str) -> EventReturn {
        if !self.opers_only || user.is_oper || !irc_eq(target, &self.client) {
            return EventReturn::Continue;
        }

        debug!(uid = %user.uid, len = message.len(), "Dropping message from non-oper");
        self.collab.users.notice(&user.uid, &self.client, ACCESS_DENIED);
        self.log(
            "bados",
            &format!(
                "Denied access to {} from {} (non-oper)",
                self.client,
                user.mask()
            ),
        );
        EventReturn::Stop
    }

    pub fn on_user_mode_set(&self, user: &User, mode: &str) {
        if is_oper_mode(mode) {
            self.log("oper", &format!("{} is now an IRC operator.", user.mask()));
        }
    }

    pub fn on_user_mode_unset(&self, user: &User, mode: &str) {
        if is_oper_mode(mode) {
            self.log("oper", &format!("{} is no longer an IRC operator", user.mask()));
        }
    }

    pub fn on_server_quit(&self, server: &str, juped: bool) {
        if juped {
            self.log("squit", &format!("Received SQUIT for juped server {server}"));
        }
    }

    // ========================================================================
    // Rule management
    // ========================================================================

    /// Add a rule and announce it.
    ///
    /// Rules the new one replaces or supersedes are removed (and their
    /// removal announced) first.
    pub fn add_xline(&mut self, kind: XLineKind, xline: XLine) -> XLineResult<Arc<XLine>> {
        let ctx = self.context();
        let manager = self
            .registry
            .get_mut(kind)
            .ok_or(XLineError::NoManager(kind))?;

        let stale = match manager.xlines().can_add(&xline) {
            AddCheck::Exists(existing) => {
                return Err(XLineError::AlreadyExists {
                    mask: existing.mask().to_string(),
                });
            }
            AddCheck::Covered(by) => {
                return Err(XLineError::AlreadyCovered {
                    mask: xline.mask().to_string(),
                    by: by.mask().to_string(),
                });
            }
            AddCheck::Replace(old) => vec![old],
            AddCheck::Allowed { superseded } => superseded,
        };

        let mut effects = Vec::new();
        for old in stale {
            manager.xlines_mut().remove(&old);
            debug!(kind = %kind, mask = %old.mask(), "Removing superseded X-line");
            effects.extend(manager.send_del(&ctx, &old));
        }

        let added = manager.xlines_mut().add(xline);
        effects.extend(manager.send(&ctx, None, &added));

        info!(
            kind = %kind,
            mask = %added.mask(),
            by = %added.by(),
            expires = ?added.expires(),
            reason = %added.reason(),
            "X-line added"
        );
        apply_effects(&self.collab, &self.client, effects);
        Ok(added)
    }

    /// Remove a rule by mask and announce the removal.
    pub fn del_xline(&mut self, kind: XLineKind, mask: &str) -> XLineResult<Arc<XLine>> {
        let ctx = self.context();
        let manager = self
            .registry
            .get_mut(kind)
            .ok_or(XLineError::NoManager(kind))?;

        let removed = manager
            .xlines_mut()
            .remove_mask(mask)
            .ok_or_else(|| XLineError::NotFound {
                kind,
                mask: mask.to_string(),
            })?;

        let effects = manager.send_del(&ctx, &removed);
        info!(kind = %kind, mask = %removed.mask(), "X-line removed");
        apply_effects(&self.collab, &self.client, effects);
        Ok(removed)
    }

    /// Remove every rule of one category. Returns how many were removed.
    pub fn clear_xlines(&mut self, kind: XLineKind) -> XLineResult<usize> {
        let ctx = self.context();
        let manager = self
            .registry
            .get_mut(kind)
            .ok_or(XLineError::NoManager(kind))?;

        let removed = manager.xlines_mut().clear();
        let effects: Vec<_> = removed
            .iter()
            .flat_map(|x| manager.send_del(&ctx, x))
            .collect();

        info!(kind = %kind, count = removed.len(), "X-lines cleared");
        apply_effects(&self.collab, &self.client, effects);
        Ok(removed.len())
    }

    pub fn expire_xlines(&mut self) -> usize {
        self.expire_xlines_at(Self::now())
    }

    /// Drop every rule whose lifetime ended by `now`. Each one is logged
    /// and its removal announced exactly once.
    pub fn expire_xlines_at(&mut self, now: i64) -> usize {
        let _span = spans::expire(now).entered();
        let ctx = self.context();
        let mut effects = Vec::new();
        let mut count = 0;

        for manager in self.registry.iter_mut() {
            let kind = manager.kind();
            for x in manager.xlines_mut().take_expired(now) {
                metrics::record_expired(kind);
                effects.push(manager.on_expire(&x));
                effects.extend(manager.send_del(&ctx, &x));
                count += 1;
            }
        }

        if count > 0 {
            info!(count, "Expired X-lines");
        }
        apply_effects(&self.collab, &self.client, effects);
        count
    }

    /// Drop every rule locally and unregister each manager. Nothing is
    /// announced, so the rules stay in force on the rest of the network.
    pub fn shutdown(&mut self) {
        for kind in self.registry.kinds() {
            if let Some(mut manager) = self.registry.unregister(kind) {
                let dropped = manager.xlines_mut().clear().len();
                debug!(kind = %kind, count = dropped, "Dropped X-lines on shutdown");
            }
        }
        info!("OperServ shut down");
    }

    /// Apply a new configuration. Existing rules keep the regex options they
    /// were compiled with.
    pub fn reload(&mut self, config: &Config) -> Result<(), ConfigError> {
        crate::config::validate(config).map_err(ConfigError::Invalid)?;

        self.client = config.operserv.client.clone();
        self.opers_only = config.operserv.opers_only;
        self.caps = config.protocol;
        self.regex_case_insensitive = config.xlines.regex_case_insensitive;

        info!(
            client = %self.client,
            opers_only = self.opers_only,
            caps = ?self.caps,
            "OperServ configuration reloaded"
        );
        Ok(())
    }
}

fn is_oper_mode(mode: &str) -> bool {
    mode.eq_ignore_ascii_case("OPER")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{LogSink, Uplink, UserDirectory};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Sink {
        lines: Mutex<Vec<String>>,
    }

    impl Sink {
        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.lines.lock())
        }
    }

    impl Uplink for Sink {
        fn send_xline(&self, kind: XLineKind, xline: &XLine, _target: Option<&str>) {
            self.lines.lock().push(format!("add {kind} {}", xline.mask()));
        }
        fn send_xline_del(&self, kind: XLineKind, xline: &XLine) {
            self.lines.lock().push(format!("del {kind} {}", xline.mask()));
        }
    }

    impl UserDirectory for Sink {
        fn kill(&self, uid: &str, source: &str, reason: &str) {
            self.lines.lock().push(format!("kill {uid} {source} {reason}"));
        }
        fn notice(&self, uid: &str, source: &str, text: &str) {
            self.lines.lock().push(format!("notice {uid} {source} {text}"));
        }
    }

    impl LogSink for Sink {
        fn log(&self, category: &str, message: &str) {
            self.lines.lock().push(format!("log {category} {message}"));
        }
    }

    fn service(config: &Config) -> (OperServ, Arc<Sink>) {
        let sink = Arc::new(Sink::default());
        let collab = Collaborators::new(sink.clone(), sink.clone()).with_log_sink(sink.clone());
        (OperServ::new(config, XLineRegistry::standard(), collab), sink)
    }

    fn user() -> User {
        User::new("001AAAAAA", "alice", "al", "host.example", "192.0.2.1".parse().unwrap())
    }

    #[test]
    fn test_opers_only_gate() {
        let (os, sink) = service(&Config::default());

        assert_eq!(os.on_bot_privmsg(&user(), "operserv", "help"), EventReturn::Stop);
        assert_eq!(
            sink.take(),
            [
                "notice 001AAAAAA OperServ Access denied.",
                "log bados Denied access to OperServ from alice!al@host.example (non-oper)",
            ]
        );

        let oper = user().with_oper(true);
        assert_eq!(os.on_bot_privmsg(&oper, "OperServ", "help"), EventReturn::Continue);
        assert_eq!(os.on_bot_privmsg(&user(), "NickServ", "help"), EventReturn::Continue);
        assert!(sink.take().is_empty());
    }

    #[test]
    fn test_opers_only_disabled() {
        let mut config = Config::default();
        config.operserv.opers_only = false;
        let (os, sink) = service(&config);
        assert_eq!(os.on_bot_privmsg(&user(), "OperServ", "help"), EventReturn::Continue);
        assert!(sink.take().is_empty());
    }

    #[test]
    fn test_aux_logs() {
        let (os, sink) = service(&Config::default());
        os.on_user_mode_set(&user(), "OPER");
        os.on_user_mode_unset(&user(), "OPER");
        os.on_user_mode_set(&user(), "INVIS");
        os.on_server_quit("jupe.example", true);
        os.on_server_quit("leaf.example", false);
        assert_eq!(
            sink.take(),
            [
                "log oper alice!al@host.example is now an IRC operator.",
                "log oper alice!al@host.example is no longer an IRC operator",
                "log squit Received SQUIT for juped server jupe.example",
            ]
        );
    }

    #[test]
    fn test_reload() {
        let (mut os, _sink) = service(&Config::default());

        let mut config = Config::default();
        config.operserv.client = "OS".to_string();
        config.protocol.can_sqline = true;
        os.reload(&config).unwrap();
        assert_eq!(os.client(), "OS");
        assert!(os.capabilities().can_sqline);

        config.operserv.client = String::new();
        let err = os.reload(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert_eq!(os.client(), "OS");
    }

    #[test]
    fn test_builder_uses_service_defaults() {
        let mut config = Config::default();
        config.xlines.regex_case_insensitive = false;
        let (os, _sink) = service(&config);

        let x = os.xline_builder("/^Bot$/").build().unwrap();
        assert_eq!(x.by(), "OperServ");
        assert!(x.regex().unwrap().is_match("Bot"));
        assert!(!x.regex().unwrap().is_match("bot"));
    }

    #[test]
    fn test_shutdown_clears_and_unregisters() {
        let (mut os, sink) = service(&Config::default());
        os.add_xline(XLineKind::Gline, XLine::new("*@*.evil.example", "spam").unwrap())
            .unwrap();
        sink.take();

        os.shutdown();
        // Rules stay in force on the network.
        assert!(sink.take().is_empty());
        assert!(os.registry().is_empty());
        assert!(matches!(
            os.del_xline(XLineKind::Gline, "*"),
            Err(XLineError::NoManager(XLineKind::Gline))
        ));
    }
}
