//! Provider endpoint and placement defaults shared by the provider crate
//! and configuration

pub const HETZNER_API_BASE: &str = "https://api.hetzner.cloud/v1";

pub const DEFAULT_LOCATION: &str = "fsn1";

/// Location codes accepted as the configured default
pub const LOCATION_CODES: &[&str] = &["fsn1", "nbg1", "hel1", "ash", "hil"];
