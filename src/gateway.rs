//! JSON-lines gateway between an IRCd link and OperServ.
//!
//! Each input line is one [`GatewayEvent`]; everything OperServ asks the
//! network to do is written back as one [`GatewayAction`] per line.
//!
//! ```text
//! {"event":"connect","user":{"uid":"001AAAAAB","nick":"bob","ident":"b","host":"h.example","ip":"192.0.2.1"}}
//! {"event":"add_xline","kind":"Q","mask":"bad*","reason":"reserved","duration":"1d"}
//! ```

use crate::effect::{NickCollider, Uplink, UserDirectory};
use crate::error::XLineError;
use crate::operserv::{EventReturn, KickCheck, OperServ};
use crate::telemetry::spans;
use crate::user::User;
use crate::xline::{XLine, XLineKind};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// An inbound event from the IRCd link.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GatewayEvent {
    Connect {
        user: User,
        #[serde(default)]
        exempt: bool,
    },
    NickChange {
        user: User,
        old_nick: String,
    },
    Join {
        user: User,
        channel: String,
    },
    Privmsg {
        user: User,
        target: String,
        #[serde(default)]
        text: String,
    },
    ModeSet {
        user: User,
        mode: String,
    },
    ModeUnset {
        user: User,
        mode: String,
    },
    Squit {
        server: String,
        #[serde(default)]
        juped: bool,
    },
    AddXline {
        kind: XLineKind,
        mask: String,
        #[serde(default)]
        reason: Option<String>,
        #[serde(default)]
        by: Option<String>,
        /// `30m`, `12h`, `7d`... `0` or absent is permanent.
        #[serde(default)]
        duration: Option<String>,
    },
    DelXline {
        kind: XLineKind,
        mask: String,
    },
    ClearXlines {
        kind: XLineKind,
    },
    /// Run an expiry sweep, optionally at a fixed time.
    Expire {
        #[serde(default)]
        now: Option<i64>,
    },
    /// The nick collision service came up or went away.
    Collider {
        available: bool,
    },
}

impl GatewayEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::NickChange { .. } => "nick_change",
            Self::Join { .. } => "join",
            Self::Privmsg { .. } => "privmsg",
            Self::ModeSet { .. } => "mode_set",
            Self::ModeUnset { .. } => "mode_unset",
            Self::Squit { .. } => "squit",
            Self::AddXline { .. } => "add_xline",
            Self::DelXline { .. } => "del_xline",
            Self::ClearXlines { .. } => "clear_xlines",
            Self::Expire { .. } => "expire",
            Self::Collider { .. } => "collider",
        }
    }
}

/// An outbound request to the IRCd link.
#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GatewayAction<'a> {
    Xline {
        kind: XLineKind,
        mask: &'a str,
        by: &'a str,
        reason: &'a str,
        created: i64,
        expires: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<&'a str>,
    },
    Unxline {
        kind: XLineKind,
        mask: &'a str,
    },
    Kill {
        uid: &'a str,
        source: &'a str,
        reason: &'a str,
    },
    Notice {
        uid: &'a str,
        source: &'a str,
        text: &'a str,
    },
    Collide {
        uid: &'a str,
    },
    JoinDenied {
        uid: &'a str,
        channel: &'a str,
        mask: &'a str,
        reason: &'a str,
    },
    Error {
        code: &'static str,
        message: String,
    },
}

/// Gateway errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("malformed event: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error(transparent)]
    XLine(#[from] XLineError),
}

impl GatewayError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::InvalidDuration(_) => "invalid_duration",
            Self::XLine(e) => e.error_code(),
        }
    }
}

/// Parse an X-line duration: a number with an optional `s`, `m`, `h`, `d`
/// or `w` suffix. A bare number means days. `"0"` is a zero duration.
/// Values too large to represent are rejected.
pub fn parse_duration(s: &str) -> Option<chrono::Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (num_str, unit) = match s.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&s[..i], c.to_ascii_lowercase()),
        _ => (s, 'd'),
    };

    let num: i64 = num_str.parse().ok()?;
    if num < 0 {
        return None;
    }
    match unit {
        's' => chrono::Duration::try_seconds(num),
        'm' => chrono::Duration::try_minutes(num),
        'h' => chrono::Duration::try_hours(num),
        'd' => chrono::Duration::try_days(num),
        'w' => chrono::Duration::try_weeks(num),
        _ => None,
    }
}

/// Writes [`GatewayAction`]s as JSON lines. Serves as the uplink, the user
/// directory and the nick collision service.
pub struct JsonLinesOutput<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesOutput<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn emit(&self, action: &GatewayAction<'_>) {
        let mut writer = self.writer.lock();
        if let Err(e) = write_line(&mut *writer, action) {
            warn!(error = %e, "Failed to write gateway action");
        }
    }

    /// Run `f` against the underlying writer.
    pub fn with_writer<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        f(&mut *self.writer.lock())
    }
}

fn write_line<W: Write>(writer: &mut W, action: &GatewayAction<'_>) -> std::io::Result<()> {
    serde_json::to_writer(&mut *writer, action)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

impl<W: Write + Send> Uplink for JsonLinesOutput<W> {
    fn send_xline(&self, kind: XLineKind, xline: &XLine, target_uid: Option<&str>) {
        self.emit(&GatewayAction::Xline {
            kind,
            mask: xline.mask(),
            by: xline.by(),
            reason: xline.reason(),
            created: xline.created(),
            expires: xline.expires(),
            target: target_uid,
        });
    }

    fn send_xline_del(&self, kind: XLineKind, xline: &XLine) {
        self.emit(&GatewayAction::Unxline {
            kind,
            mask: xline.mask(),
        });
    }
}

impl<W: Write + Send> UserDirectory for JsonLinesOutput<W> {
    fn kill(&self, target_uid: &str, source: &str, reason: &str) {
        self.emit(&GatewayAction::Kill {
            uid: target_uid,
            source,
            reason,
        });
    }

    fn notice(&self, target_uid: &str, source: &str, text: &str) {
        self.emit(&GatewayAction::Notice {
            uid: target_uid,
            source,
            text,
        });
    }
}

impl<W: Write + Send> NickCollider for JsonLinesOutput<W> {
    fn collide(&self, target_uid: &str) {
        self.emit(&GatewayAction::Collide { uid: target_uid });
    }
}

/// Decodes events and drives an [`OperServ`] with them.
pub struct Gateway<W: Write + Send + 'static> {
    output: Arc<JsonLinesOutput<W>>,
}

impl<W: Write + Send + 'static> Gateway<W> {
    pub fn new(output: Arc<JsonLinesOutput<W>>) -> Self {
        Self { output }
    }

    pub fn output(&self) -> &Arc<JsonLinesOutput<W>> {
        &self.output
    }

    /// Handle one input line. Failures are logged and reported back as an
    /// `error` action; they never stop the gateway.
    pub fn handle_line(&self, os: &mut OperServ, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let result = serde_json::from_str::<GatewayEvent>(line)
            .map_err(GatewayError::from)
            .and_then(|event| self.dispatch(os, event));

        if let Err(e) = result {
            warn!(error = %e, code = e.error_code(), "Gateway event failed");
            self.output.emit(&GatewayAction::Error {
                code: e.error_code(),
                message: e.to_string(),
            });
        }
    }

    /// Handle one raw input line. Lines that are not UTF-8 are reported as
    /// `decode` errors and skipped.
    pub fn handle_bytes(&self, os: &mut OperServ, line: &[u8]) {
        match std::str::from_utf8(line) {
            Ok(line) => self.handle_line(os, line),
            Err(e) => {
                warn!(error = %e, len = line.len(), "Skipping non-UTF-8 input line");
                self.output.emit(&GatewayAction::Error {
                    code: "decode",
                    message: format!("input line is not valid UTF-8: {e}"),
                });
            }
        }
    }

    pub fn dispatch(&self, os: &mut OperServ, event: GatewayEvent) -> Result<(), GatewayError> {
        let _span = spans::event(event.name()).entered();

        match event {
            GatewayEvent::Connect { user, exempt } => {
                os.on_user_connect(&user, exempt);
            }
            GatewayEvent::NickChange { user, old_nick } => {
                os.on_user_nick_change(&user, &old_nick);
            }
            GatewayEvent::Join { user, channel } => {
                if let KickCheck::Deny { mask, reason } = os.on_check_kick(&user, &channel) {
                    self.output.emit(&GatewayAction::JoinDenied {
                        uid: &user.uid,
                        channel: &channel,
                        mask: &mask,
                        reason: &reason,
                    });
                }
            }
            GatewayEvent::Privmsg { user, target, text } => {
                if os.on_bot_privmsg(&user, &target, &text) == EventReturn::Continue {
                    debug!(target = %target, "Message passed through");
                }
            }
            GatewayEvent::ModeSet { user, mode } => os.on_user_mode_set(&user, &mode),
            GatewayEvent::ModeUnset { user, mode } => os.on_user_mode_unset(&user, &mode),
            GatewayEvent::Squit { server, juped } => os.on_server_quit(&server, juped),
            GatewayEvent::AddXline {
                kind,
                mask,
                reason,
                by,
                duration,
            } => {
                let mut builder = os.xline_builder(mask);
                if let Some(reason) = reason {
                    builder = builder.reason(reason);
                }
                if let Some(by) = by {
                    builder = builder.by(by);
                }
                if let Some(duration) = duration {
                    let d = parse_duration(&duration)
                        .ok_or(GatewayError::InvalidDuration(duration))?;
                    if d > chrono::Duration::zero() {
                        builder = builder.expires_in(d);
                    }
                }
                os.add_xline(kind, builder.build()?)?;
            }
            GatewayEvent::DelXline { kind, mask } => {
                os.del_xline(kind, &mask)?;
            }
            GatewayEvent::ClearXlines { kind } => {
                os.clear_xlines(kind)?;
            }
            GatewayEvent::Expire { now } => {
                match now {
                    Some(now) => os.expire_xlines_at(now),
                    None => os.expire_xlines(),
                };
            }
            GatewayEvent::Collider { available } => {
                let collider = available.then(|| Arc::clone(&self.output) as Arc<dyn NickCollider>);
                os.set_collider(collider);
            }
        }

        Ok(())
    }
}
