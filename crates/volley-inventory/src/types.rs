//! Inventory data model

use serde::{Deserialize, Serialize};
use volley_exec::HostKeyPolicy;

/// Fallback options for hosts that do not set their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryDefaults {
    /// SSH user for hosts without their own
    pub username: Option<String>,
    /// SSH port (default 22)
    pub port: u16,
    /// Connect deadline in seconds
    pub connect_timeout: f64,
    /// Host key verification policy; accepts booleans and string spellings
    #[serde(deserialize_with = "crate::loader::de_known_hosts")]
    pub known_hosts: HostKeyPolicy,
    /// Request a pseudo-terminal
    pub pty: bool,
    /// Private key path, or an `env:VAR` reference
    pub identity: Option<String>,
    /// Password, or an `env:VAR` reference
    pub password: Option<String>,
}

impl Default for InventoryDefaults {
    fn default() -> Self {
        Self {
            username: None,
            port: 22,
            connect_timeout: 10.0,
            known_hosts: HostKeyPolicy::Strict,
            pty: false,
            identity: None,
            password: None,
        }
    }
}

/// One host entry from the inventory file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostEntry {
    /// Hostname or IP address
    pub host: String,
    /// Overrides the default user
    #[serde(default)]
    pub username: Option<String>,
    /// Overrides the default port
    #[serde(default)]
    pub port: Option<u16>,
    /// Tags for grouping
    #[serde(default)]
    pub tags: Vec<String>,
    /// Overrides the default key, or an `env:VAR` reference
    #[serde(default)]
    pub identity: Option<String>,
    /// Overrides the default password, or an `env:VAR` reference
    #[serde(default)]
    pub password: Option<String>,
    /// Per-host command, taking precedence over the CLI command
    #[serde(default)]
    pub command: Option<String>,
}

/// A fully loaded inventory, ready for target planning.
#[derive(Debug, Clone)]
pub struct Inventory {
    /// Global defaults
    pub defaults: InventoryDefaults,
    /// Hosts, in file order
    pub hosts: Vec<HostEntry>,
}
