//! Inventory error types

use thiserror::Error;

/// Errors that can occur while loading an inventory
#[derive(Error, Debug)]
pub enum InventoryError {
    /// Inventory file does not exist
    #[error("inventory file not found: {0}")]
    NotFound(String),

    /// Inventory file could not be read
    #[error("failed to read inventory: {0}")]
    Io(#[from] std::io::Error),

    /// Inventory file is not valid YAML
    #[error("failed to parse inventory: {0}")]
    Parse(#[from] serde_yml::Error),

    /// Inventory parsed but lists no hosts
    #[error("inventory contains no hosts")]
    NoHosts,
}
