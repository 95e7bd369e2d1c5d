//! Default value functions for configuration.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

pub fn default_client() -> String {
    "OperServ".to_string()
}

pub fn default_expire_interval() -> u64 {
    30
}

pub fn default_log_filter() -> String {
    "info".to_string()
}
