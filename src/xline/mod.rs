//! X-lines: network-wide bans enforced by OperServ.
//!
//! # X-Line Types
//!
//! | Kind | Char | Scope | Match Target |
//! |--------|------|-------|--------------|
//! | G-Line | `G` | Host/identity | `nick!user@host#real`, CIDR |
//! | Q-Line | `Q` | Nickname | nickname, `#channel` masks |
//! | N-Line | `N` | Realname | realname (GECOS) |
//!
//! Each kind has an [`XLineManager`] that owns an [`XLineSet`] and decides
//! how a match is enforced and how the rule is propagated. Managers are
//! registered in an [`XLineRegistry`] whose order is the enforcement
//! priority: most violent first.

mod gline;
mod manager;
mod nline;
mod qline;
mod registry;
mod rule;
mod set;

pub use gline::GlineManager;
pub use manager::{Capabilities, MatchContext, XLineManager};
pub use nline::NlineManager;
pub use qline::QlineManager;
pub use registry::XLineRegistry;
pub use rule::{XLine, XLineBuilder};
pub use set::{AddCheck, XLineSet};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category an X-line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum XLineKind {
    /// G-line (AKILL): ban by host/identity.
    #[serde(rename = "G")]
    Gline,
    /// Q-line (SQLINE): ban by nickname or channel name.
    #[serde(rename = "Q")]
    Qline,
    /// N-line (SNLINE): ban by realname.
    #[serde(rename = "N")]
    Nline,
}

impl XLineKind {
    /// One-character discriminator.
    pub const fn as_char(self) -> char {
        match self {
            XLineKind::Gline => 'G',
            XLineKind::Qline => 'Q',
            XLineKind::Nline => 'N',
        }
    }

    /// Parse the one-character discriminator (case-insensitive).
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'G' => Some(XLineKind::Gline),
            'Q' => Some(XLineKind::Qline),
            'N' => Some(XLineKind::Nline),
            _ => None,
        }
    }

    /// Service name the manager registers under.
    pub const fn manager_name(self) -> &'static str {
        match self {
            XLineKind::Gline => "xlinemanager/sgline",
            XLineKind::Qline => "xlinemanager/sqline",
            XLineKind::Nline => "xlinemanager/snline",
        }
    }

    /// Command-style name used in logs and notices.
    pub const fn name(self) -> &'static str {
        match self {
            XLineKind::Gline => "AKILL",
            XLineKind::Qline => "SQLINE",
            XLineKind::Nline => "SNLINE",
        }
    }

    /// Metrics label.
    pub const fn label(self) -> &'static str {
        match self {
            XLineKind::Gline => "gline",
            XLineKind::Qline => "qline",
            XLineKind::Nline => "nline",
        }
    }
}

impl fmt::Display for XLineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_chars() {
        for kind in [XLineKind::Gline, XLineKind::Qline, XLineKind::Nline] {
            assert_eq!(XLineKind::from_char(kind.as_char()), Some(kind));
        }
        assert_eq!(XLineKind::from_char('q'), Some(XLineKind::Qline));
        assert_eq!(XLineKind::from_char('K'), None);
    }

    #[test]
    fn test_kind_serde() {
        let kind: XLineKind = serde_json::from_str("\"N\"").unwrap();
        assert_eq!(kind, XLineKind::Nline);
        assert_eq!(serde_json::to_string(&XLineKind::Gline).unwrap(), "\"G\"");
    }
}
