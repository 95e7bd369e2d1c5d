//! Integration test common infrastructure.
//!
//! A [`Recorder`] stands in for every collaborator and keeps what OperServ
//! asked it to do, in order.

#![allow(dead_code)]

use parking_lot::Mutex;
use slircd_operserv::{
    Collaborators, Config, LogSink, NickCollider, OperServ, Uplink, User, UserDirectory, XLine,
    XLineKind, XLineRegistry,
};
use std::sync::Arc;

/// One collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Propagate {
        kind: XLineKind,
        mask: String,
        target: Option<String>,
    },
    PropagateDel {
        kind: XLineKind,
        mask: String,
    },
    Kill {
        uid: String,
        source: String,
        reason: String,
    },
    Notice {
        uid: String,
        text: String,
    },
    Collide {
        uid: String,
    },
    Log {
        category: String,
        message: String,
    },
}

#[derive(Debug, Default)]
pub struct Recorder {
    calls: Mutex<Vec<Call>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Everything recorded since the last call.
    pub fn take(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock())
    }

    pub fn kills(&self) -> Vec<Call> {
        self.filtered(|c| matches!(c, Call::Kill { .. }))
    }

    pub fn propagations(&self) -> Vec<Call> {
        self.filtered(|c| matches!(c, Call::Propagate { .. }))
    }

    pub fn removals(&self) -> Vec<Call> {
        self.filtered(|c| matches!(c, Call::PropagateDel { .. }))
    }

    pub fn logs(&self) -> Vec<Call> {
        self.filtered(|c| matches!(c, Call::Log { .. }))
    }

    fn filtered(&self, pred: impl Fn(&Call) -> bool) -> Vec<Call> {
        self.calls.lock().iter().filter(|c| pred(c)).cloned().collect()
    }

    fn push(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

impl Uplink for Recorder {
    fn send_xline(&self, kind: XLineKind, xline: &XLine, target_uid: Option<&str>) {
        self.push(Call::Propagate {
            kind,
            mask: xline.mask().to_string(),
            target: target_uid.map(str::to_string),
        });
    }

    fn send_xline_del(&self, kind: XLineKind, xline: &XLine) {
        self.push(Call::PropagateDel {
            kind,
            mask: xline.mask().to_string(),
        });
    }
}

impl UserDirectory for Recorder {
    fn kill(&self, target_uid: &str, source: &str, reason: &str) {
        self.push(Call::Kill {
            uid: target_uid.to_string(),
            source: source.to_string(),
            reason: reason.to_string(),
        });
    }

    fn notice(&self, target_uid: &str, _source: &str, text: &str) {
        self.push(Call::Notice {
            uid: target_uid.to_string(),
            text: text.to_string(),
        });
    }
}

impl NickCollider for Recorder {
    fn collide(&self, target_uid: &str) {
        self.push(Call::Collide {
            uid: target_uid.to_string(),
        });
    }
}

impl LogSink for Recorder {
    fn log(&self, category: &str, message: &str) {
        self.push(Call::Log {
            category: category.to_string(),
            message: message.to_string(),
        });
    }
}

/// Config with the given native capabilities.
pub fn config(can_sqline: bool, can_sqline_channel: bool, can_snline: bool) -> Config {
    let mut config = Config::default();
    config.protocol.can_sqline = can_sqline;
    config.protocol.can_sqline_channel = can_sqline_channel;
    config.protocol.can_snline = can_snline;
    config
}

/// OperServ with the standard registry, recording into one [`Recorder`].
pub fn operserv(config: &Config) -> (OperServ, Arc<Recorder>) {
    let rec = Recorder::new();
    let collab = Collaborators::new(rec.clone(), rec.clone()).with_log_sink(rec.clone());
    (OperServ::new(config, XLineRegistry::standard(), collab), rec)
}

pub fn user(uid: &str, nick: &str) -> User {
    User::new(uid, nick, "ident", "client.example", "192.0.2.50".parse().unwrap())
        .with_realname("Just A User")
}

pub fn kill(uid: &str, reason: &str) -> Call {
    Call::Kill {
        uid: uid.to_string(),
        source: "OperServ".to_string(),
        reason: reason.to_string(),
    }
}

pub fn xline(mask: &str, reason: &str) -> XLine {
    XLine::new(mask, reason).unwrap()
}
