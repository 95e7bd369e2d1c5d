//! The view of a network user that X-lines are matched against.

use serde::Deserialize;
use std::net::IpAddr;

/// A user as seen by OperServ.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    /// Network-unique user ID.
    pub uid: String,
    /// Current nickname.
    pub nick: String,
    /// Username (ident).
    #[serde(alias = "user")]
    pub ident: String,
    /// Hostname (may be cloaked).
    pub host: String,
    /// Real IP address.
    pub ip: IpAddr,
    /// Realname (GECOS).
    #[serde(default)]
    pub realname: String,
    /// Whether the user is an IRC operator (+o).
    #[serde(default)]
    pub is_oper: bool,
    /// The user is already on the way out.
    #[serde(default)]
    pub quitting: bool,
}

impl User {
    pub fn new(
        uid: impl Into<String>,
        nick: impl Into<String>,
        ident: impl Into<String>,
        host: impl Into<String>,
        ip: IpAddr,
    ) -> Self {
        Self {
            uid: uid.into(),
            nick: nick.into(),
            ident: ident.into(),
            host: host.into(),
            ip,
            realname: String::new(),
            is_oper: false,
            quitting: false,
        }
    }

    pub fn with_realname(mut self, realname: impl Into<String>) -> Self {
        self.realname = realname.into();
        self
    }

    pub fn with_oper(mut self, is_oper: bool) -> Self {
        self.is_oper = is_oper;
        self
    }

    /// `nick!ident@host`
    pub fn mask(&self) -> String {
        format!("{}!{}@{}", self.nick, self.ident, self.host)
    }

    /// `ident@host`, the G-line regex subject.
    pub fn user_host(&self) -> String {
        format!("{}@{}", self.ident, self.host)
    }

    /// `nick!ident@host#realname`, the extended G-line regex subject.
    pub fn full_mask(&self) -> String {
        format!("{}#{}", self.mask(), self.realname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks() {
        let user = User::new("001AAAAAA", "nick", "ident", "host.example", "10.1.2.3".parse().unwrap())
            .with_realname("Real Name");
        assert_eq!(user.mask(), "nick!ident@host.example");
        assert_eq!(user.user_host(), "ident@host.example");
        assert_eq!(user.full_mask(), "nick!ident@host.example#Real Name");
    }

    #[test]
    fn test_deserialize_defaults() {
        let user: User = serde_json::from_str(
            r#"{"uid":"1","nick":"n","user":"u","host":"h","ip":"::1"}"#,
        )
        .unwrap();
        assert_eq!(user.ident, "u");
        assert!(!user.is_oper);
        assert!(user.realname.is_empty());
    }
}
