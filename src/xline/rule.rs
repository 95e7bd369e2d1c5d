//! The X-line record.

use crate::error::{XLineError, XLineResult};
use crate::matcher::compile_anchored;
use ipnet::IpNet;
use regex::Regex;

/// Reason used when the setter did not give one.
pub const DEFAULT_REASON: &str = "No reason given";

/// Setter recorded when none is supplied.
pub const DEFAULT_SETTER: &str = "OperServ";

/// A single ban rule.
///
/// Immutable once built. A mask wrapped in slashes (`/.../`) is a regex
/// rule; the pattern between the slashes is compiled exactly once, here.
/// Any other mask is split into `nick!user@host#real` scope fields, which
/// G-lines match field by field. Q-lines and N-lines use the whole mask.
#[derive(Debug, Clone)]
pub struct XLine {
    mask: String,
    nick: String,
    user: String,
    host: String,
    real: String,
    cidr: Option<IpNet>,
    regex: Option<Regex>,
    by: String,
    reason: String,
    created: i64,
    expires: Option<i64>,
}

impl XLine {
    /// Start building an X-line for `mask`.
    pub fn builder(mask: impl Into<String>) -> XLineBuilder {
        XLineBuilder {
            mask: mask.into(),
            by: None,
            reason: None,
            created: None,
            expires: None,
            duration: None,
            regex_case_insensitive: true,
        }
    }

    /// Build a permanent X-line with default setter.
    pub fn new(mask: impl Into<String>, reason: impl Into<String>) -> XLineResult<Self> {
        Self::builder(mask).reason(reason).build()
    }

    /// The mask as it was given, slashes included for regex rules.
    pub fn mask(&self) -> &str {
        &self.mask
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn real(&self) -> &str {
        &self.real
    }

    /// Network parsed from a host part such as `10.0.0.0/8`.
    pub fn cidr(&self) -> Option<&IpNet> {
        self.cidr.as_ref()
    }

    /// Anchored regex, present only for regex rules.
    pub fn regex(&self) -> Option<&Regex> {
        self.regex.as_ref()
    }

    pub fn is_regex(&self) -> bool {
        is_regex_mask(&self.mask)
    }

    /// Whether the mask carries a nick or realname part.
    pub fn has_nick_or_real(&self) -> bool {
        !self.nick.is_empty() || !self.real.is_empty()
    }

    pub fn by(&self) -> &str {
        &self.by
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Creation time (unix seconds).
    pub fn created(&self) -> i64 {
        self.created
    }

    /// Expiry time (unix seconds), `None` for permanent rules.
    pub fn expires(&self) -> Option<i64> {
        self.expires
    }

    pub fn is_permanent(&self) -> bool {
        self.expires.is_none()
    }

    /// A rule is active while `now < expires`, or forever when permanent.
    pub fn is_active_at(&self, now: i64) -> bool {
        self.expires.is_none_or(|expires| now < expires)
    }

    /// Whether this rule's lifetime extends at least as far as `expires`.
    pub(crate) fn outlives(&self, expires: Option<i64>) -> bool {
        match (self.expires, expires) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(mine), Some(theirs)) => mine >= theirs,
        }
    }
}

/// Builder for [`XLine`].
#[derive(Debug, Clone)]
pub struct XLineBuilder {
    mask: String,
    by: Option<String>,
    reason: Option<String>,
    created: Option<i64>,
    expires: Option<i64>,
    duration: Option<chrono::Duration>,
    regex_case_insensitive: bool,
}

impl XLineBuilder {
    pub fn by(mut self, by: impl Into<String>) -> Self {
        self.by = Some(by.into());
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Override the creation timestamp (defaults to now).
    pub fn created_at(mut self, created: i64) -> Self {
        self.created = Some(created);
        self
    }

    /// Absolute expiry in unix seconds. `None` makes the rule permanent.
    pub fn expires_at(mut self, expires: Option<i64>) -> Self {
        self.expires = expires;
        self.duration = None;
        self
    }

    /// Expire `duration` after the creation time.
    pub fn expires_in(mut self, duration: chrono::Duration) -> Self {
        self.duration = Some(duration);
        self.expires = None;
        self
    }

    /// Compile regex rules case-insensitively (default: true).
    pub fn regex_case_insensitive(mut self, yes: bool) -> Self {
        self.regex_case_insensitive = yes;
        self
    }

    pub fn build(self) -> XLineResult<XLine> {
        if self.mask.is_empty() {
            return Err(XLineError::EmptyMask);
        }

        let created = self
            .created
            .unwrap_or_else(|| chrono::Utc::now().timestamp());
        let expires = self
            .expires
            .or_else(|| self.duration.map(|d| created + d.num_seconds()));

        let mut line = XLine {
            mask: self.mask,
            nick: String::new(),
            user: String::new(),
            host: String::new(),
            real: String::new(),
            cidr: None,
            regex: None,
            by: self.by.unwrap_or_else(|| DEFAULT_SETTER.to_string()),
            reason: self
                .reason
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| DEFAULT_REASON.to_string()),
            created,
            expires,
        };

        if is_regex_mask(&line.mask) {
            let source = &line.mask[1..line.mask.len() - 1];
            let regex = compile_anchored(source, self.regex_case_insensitive).map_err(|source| {
                XLineError::InvalidRegex {
                    mask: line.mask.clone(),
                    source,
                }
            })?;
            line.regex = Some(regex);
        } else {
            let scope = MaskScope::parse(&line.mask);
            line.cidr = scope.host.contains('/').then(|| scope.host.parse().ok()).flatten();
            line.nick = scope.nick.to_string();
            line.user = scope.user.to_string();
            line.host = scope.host.to_string();
            line.real = scope.real.to_string();
        }

        Ok(line)
    }
}

fn is_regex_mask(mask: &str) -> bool {
    mask.len() >= 2 && mask.starts_with('/') && mask.ends_with('/')
}

/// The `nick!user@host#real` fields of a wildcard mask.
#[derive(Debug, PartialEq, Eq)]
struct MaskScope<'a> {
    nick: &'a str,
    user: &'a str,
    host: &'a str,
    real: &'a str,
}

impl<'a> MaskScope<'a> {
    fn parse(mask: &'a str) -> Self {
        let bang = mask.find('!');
        let at = mask.find('@');
        let hash = mask.find('#');

        let nick = bang.map_or("", |b| &mask[..b]);

        let user = match (at, bang) {
            (Some(a), Some(b)) if a > b => &mask[b + 1..a],
            (Some(a), _) => &mask[..a],
            (None, _) => "",
        };

        let host = match (at, hash) {
            (Some(a), Some(h)) if h > a => &mask[a + 1..h],
            (Some(a), _) => &mask[a + 1..],
            // `nick!user` without a host part.
            (None, _) if bang.is_some() => "",
            (None, Some(h)) => &mask[..h],
            (None, None) => mask,
        };

        let real = hash.map_or("", |h| &mask[h + 1..]);

        Self {
            nick,
            user,
            host,
            real,
        }
    }
}
