//! volley-inventory: YAML host inventory
//!
//! Global defaults plus per-host overrides, with `env:VAR` resolution for
//! secret-bearing fields and normalization of the known-hosts policy.

pub mod error;
pub mod loader;
pub mod types;

pub use error::InventoryError;
pub use loader::{load_inventory, parse_inventory};
pub use types::{HostEntry, Inventory, InventoryDefaults};
