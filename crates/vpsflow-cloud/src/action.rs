//! Instance actions
//!
//! The host surface (buttons, cron, CLI) refers to actions by loose string
//! identifiers. They are parsed once into [`ServerAction`] and dispatched
//! through a single entry point.

use crate::error::CloudError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Action performed on an existing server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerAction {
    /// Power off (suspend)
    PowerOff,
    /// Power on (resume)
    PowerOn,
    Reboot,
    /// Reset the root password and store the new one
    ResetPassword,
}

impl ServerAction {
    pub const ALL: [ServerAction; 4] = [
        ServerAction::PowerOff,
        ServerAction::PowerOn,
        ServerAction::Reboot,
        ServerAction::ResetPassword,
    ];

    /// Path segment under `/servers/{id}/actions/`
    pub fn endpoint_name(&self) -> &'static str {
        match self {
            ServerAction::PowerOff => "poweroff",
            ServerAction::PowerOn => "poweron",
            ServerAction::Reboot => "reboot",
            ServerAction::ResetPassword => "reset_password",
        }
    }
}

impl std::fmt::Display for ServerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.endpoint_name())
    }
}

impl FromStr for ServerAction {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "poweroff" | "power_off" | "suspend" => Ok(ServerAction::PowerOff),
            "poweron" | "power_on" | "resume" | "unsuspend" => Ok(ServerAction::PowerOn),
            "reboot" => Ok(ServerAction::Reboot),
            "resetpassword" | "reset_password" | "reset-password" => {
                Ok(ServerAction::ResetPassword)
            }
            other => Err(CloudError::InvalidInput(format!(
                "unknown server action: {}",
                other
            ))),
        }
    }
}

/// Result of a successful action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Done,
    /// New root password, already persisted to the record
    PasswordReset { root_password: String },
}
