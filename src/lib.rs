//! slircd-operserv - OperServ X-line enforcement for Straylight IRC services.
//!
//! Three categories of network ban are enforced against users as they
//! connect, change nick and join channels:
//!
//! - G-lines (AKILL): `nick!user@host#real` masks, CIDR hosts, regexes
//! - Q-lines (SQLINE): nicknames, and channel names for `#` masks
//! - N-lines (SNLINE): realnames
//!
//! [`OperServ`] drives the managers in an [`XLineRegistry`] and applies
//! their decisions through the [`Collaborators`] it is given.

pub mod config;
pub mod effect;
pub mod error;
pub mod gateway;
pub mod matcher;
pub mod metrics;
pub mod operserv;
pub mod telemetry;
pub mod user;
pub mod xline;

pub use config::{Config, ConfigError};
pub use effect::{
    Applied, Collaborators, LogSink, NickCollider, TracingLogSink, Uplink, UserDirectory,
    XLineEffect, apply_effects,
};
pub use error::{XLineError, XLineResult};
pub use operserv::{EventReturn, KickCheck, OperServ, XLineMatch};
pub use user::User;
pub use xline::{
    AddCheck, Capabilities, GlineManager, MatchContext, NlineManager, QlineManager, XLine,
    XLineKind, XLineManager, XLineRegistry, XLineSet,
};
