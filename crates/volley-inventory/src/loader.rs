//! Inventory loading and normalization

use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use volley_exec::HostKeyPolicy;

use crate::error::InventoryError;
use crate::types::{HostEntry, Inventory, InventoryDefaults};

// Option-wrapped so a bare `defaults:` or `hosts:` key (YAML null) reads
// the same as an absent one.
#[derive(Debug, Default, Deserialize)]
struct RawInventory {
    #[serde(default)]
    defaults: Option<InventoryDefaults>,
    #[serde(default)]
    hosts: Option<Vec<HostEntry>>,
}

/// Read an inventory file from disk and parse it.
pub fn load_inventory(path: impl AsRef<Path>) -> Result<Inventory, InventoryError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(InventoryError::NotFound(path.display().to_string()));
    }
    parse_inventory(&fs::read_to_string(path)?)
}

/// Parse inventory YAML text, resolving `env:VAR` references in the
/// secret-bearing fields. An empty document counts as "no hosts".
pub fn parse_inventory(text: &str) -> Result<Inventory, InventoryError> {
    if text.trim().is_empty() {
        return Err(InventoryError::NoHosts);
    }

    let raw: RawInventory = serde_yml::from_str(text)?;

    let mut defaults = raw.defaults.unwrap_or_default();
    defaults.identity = resolve_env(defaults.identity);
    defaults.password = resolve_env(defaults.password);

    let hosts: Vec<HostEntry> = raw
        .hosts
        .unwrap_or_default()
        .into_iter()
        .map(|mut host| {
            host.identity = resolve_env(host.identity);
            host.password = resolve_env(host.password);
            host
        })
        .collect();

    if hosts.is_empty() {
        return Err(InventoryError::NoHosts);
    }

    Ok(Inventory { defaults, hosts })
}

/// Resolve an `env:VAR` reference; a missing variable clears the value.
fn resolve_env(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    match trimmed.strip_prefix("env:") {
        Some(var) => std::env::var(var.trim()).ok(),
        None => Some(trimmed.to_string()),
    }
}

/// Deserialize the known-hosts policy from booleans, numbers, or the string
/// spellings the inventory format accepts.
pub(crate) fn de_known_hosts<'de, D>(deserializer: D) -> Result<HostKeyPolicy, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
        Str(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Bool(false) | Raw::Int(0) => HostKeyPolicy::Off,
        Raw::Bool(true) | Raw::Int(_) => HostKeyPolicy::Strict,
        Raw::Str(s) => normalize_known_hosts(&s),
    })
}

/// `off`/`no`/`false`/`0` disable checking; everything else, including
/// unknown spellings, stays strict.
fn normalize_known_hosts(value: &str) -> HostKeyPolicy {
    match value.trim().to_ascii_lowercase().as_str() {
        "off" | "no" | "false" | "0" => HostKeyPolicy::Off,
        _ => HostKeyPolicy::Strict,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parses_defaults_and_hosts() {
        let inv = parse_inventory(
            r#"
defaults:
  username: ubuntu
  port: 2222
  connect_timeout: 5.0
  known_hosts: "off"
  pty: true
hosts:
  - host: web-1
    tags: [web, prod]
    command: systemctl restart nginx
  - host: db-1
    username: postgres
    port: 22
"#,
        )
        .unwrap();

        assert_eq!(inv.defaults.username.as_deref(), Some("ubuntu"));
        assert_eq!(inv.defaults.port, 2222);
        assert_eq!(inv.defaults.known_hosts, HostKeyPolicy::Off);
        assert!(inv.defaults.pty);

        assert_eq!(inv.hosts.len(), 2);
        assert_eq!(inv.hosts[0].host, "web-1");
        assert_eq!(inv.hosts[0].tags, vec!["web", "prod"]);
        assert_eq!(
            inv.hosts[0].command.as_deref(),
            Some("systemctl restart nginx")
        );
        assert_eq!(inv.hosts[1].username.as_deref(), Some("postgres"));
        assert_eq!(inv.hosts[1].port, Some(22));
    }

    #[test]
    fn missing_defaults_fall_back() {
        let inv = parse_inventory("hosts:\n  - host: a\n").unwrap();
        assert_eq!(inv.defaults.port, 22);
        assert_eq!(inv.defaults.connect_timeout, 10.0);
        assert_eq!(inv.defaults.known_hosts, HostKeyPolicy::Strict);
        assert!(!inv.defaults.pty);
    }

    #[test]
    fn known_hosts_spellings_normalize() {
        for (value, expected) in [
            ("\"off\"", HostKeyPolicy::Off),
            ("\"no\"", HostKeyPolicy::Off),
            ("\"0\"", HostKeyPolicy::Off),
            ("false", HostKeyPolicy::Off),
            ("\"strict\"", HostKeyPolicy::Strict),
            ("\"on\"", HostKeyPolicy::Strict),
            ("true", HostKeyPolicy::Strict),
            ("\"anything-else\"", HostKeyPolicy::Strict),
        ] {
            let text = format!("defaults:\n  known_hosts: {value}\nhosts:\n  - host: a\n");
            let inv = parse_inventory(&text).unwrap();
            assert_eq!(inv.defaults.known_hosts, expected, "value {value}");
        }
    }

    #[test]
    fn env_references_resolve() {
        unsafe {
            std::env::set_var("VOLLEY_TEST_PASSWORD", "hunter2");
        }
        let inv = parse_inventory(
            r#"
defaults:
  password: env:VOLLEY_TEST_PASSWORD
hosts:
  - host: a
    identity: env:VOLLEY_TEST_MISSING_KEY
"#,
        )
        .unwrap();

        assert_eq!(inv.defaults.password.as_deref(), Some("hunter2"));
        // Unset variable clears the field rather than passing "env:..." on.
        assert_eq!(inv.hosts[0].identity, None);
    }

    #[test]
    fn empty_or_hostless_documents_are_rejected() {
        assert!(matches!(parse_inventory(""), Err(InventoryError::NoHosts)));
        assert!(matches!(
            parse_inventory("defaults:\n  port: 22\n"),
            Err(InventoryError::NoHosts)
        ));
        assert!(matches!(
            parse_inventory("hosts: []\n"),
            Err(InventoryError::NoHosts)
        ));
        // A bare key with no value reads the same as an absent one.
        assert!(matches!(
            parse_inventory("defaults:\nhosts:\n"),
            Err(InventoryError::NoHosts)
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_inventory("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, InventoryError::NotFound(_)));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "hosts:\n  - host: disk-1\n").unwrap();

        let inv = load_inventory(file.path()).unwrap();
        assert_eq!(inv.hosts[0].host, "disk-1");
    }
}
