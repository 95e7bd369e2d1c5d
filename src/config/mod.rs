//! Configuration loading and management.
//!
//! - [`types`]: the config structs and `Config::load`
//! - [`validation`]: startup checks that report every problem at once

mod defaults;
mod types;
mod validation;

pub use types::{Config, ConfigError, LogConfig, LogFormat, OperServConfig, XLineConfig};
pub use validation::{ValidationError, validate};
