//! Per-host execution planning: option precedence and command resolution

use std::borrow::Cow;
use std::path::PathBuf;
use std::time::Duration;

use color_eyre::eyre::{Result, bail};
use volley_exec::{HostKeyPolicy, Target};
use volley_inventory::Inventory;

/// CLI flags merged with inventory defaults; the base every host starts
/// from before its own overrides apply.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub username: Option<String>,
    pub port: Option<u16>,
    pub identity: Option<PathBuf>,
    pub password: Option<String>,
    pub known_hosts: HostKeyPolicy,
    pub connect_timeout: Duration,
    pub command_timeout: Option<Duration>,
    pub pty: bool,
    pub retry_attempts: u32,
}

/// Expand `~` and environment variables in a user-supplied path. Unknown
/// variables leave the text as typed.
pub fn expand_path(raw: &str) -> PathBuf {
    let expanded = shellexpand::full(raw)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| shellexpand::tilde(raw).into_owned());
    PathBuf::from(expanded)
}

/// Build one target per inventory host.
///
/// Command precedence: per-host `command` > `--command-file` content >
/// positional CLI command. Auth precedence: per-host values > the merged
/// CLI/inventory base.
pub fn build_targets(
    inventory: &Inventory,
    settings: &RunSettings,
    cli_command: Option<&str>,
    file_command: Option<&str>,
) -> Result<Vec<Target>> {
    let mut targets = Vec::with_capacity(inventory.hosts.len());

    for entry in &inventory.hosts {
        let Some(command) = entry.command.as_deref().or(file_command).or(cli_command) else {
            bail!(
                "no command provided for host {}; pass one on the command line or set `command` in the inventory",
                entry.host
            );
        };

        let identity = entry
            .identity
            .as_deref()
            .map(expand_path)
            .or_else(|| settings.identity.clone());
        let password = entry.password.clone().or_else(|| settings.password.clone());

        let mut target = Target::new(&entry.host, command)
            .with_port(entry.port.or(settings.port).unwrap_or(22))
            .with_connect_timeout(settings.connect_timeout)
            .with_pty(settings.pty)
            .with_retry_attempts(settings.retry_attempts)
            .with_host_key_policy(settings.known_hosts);

        if let Some(username) = entry.username.as_deref().or(settings.username.as_deref()) {
            target = target.with_username(username);
        }
        if let Some(identity) = identity {
            target = target.with_identity(identity);
        }
        if let Some(password) = password {
            target = target.with_password(password);
        }
        if let Some(timeout) = settings.command_timeout {
            target = target.with_command_timeout(timeout);
        }

        targets.push(target);
    }

    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use volley_inventory::{HostEntry, Inventory, InventoryDefaults};

    fn entry(host: &str) -> HostEntry {
        HostEntry {
            host: host.to_string(),
            username: None,
            port: None,
            tags: Vec::new(),
            identity: None,
            password: None,
            command: None,
        }
    }

    fn inventory(hosts: Vec<HostEntry>) -> Inventory {
        Inventory {
            defaults: InventoryDefaults::default(),
            hosts,
        }
    }

    fn settings() -> RunSettings {
        RunSettings {
            username: Some("ubuntu".to_string()),
            port: Some(22),
            identity: None,
            password: None,
            known_hosts: HostKeyPolicy::Off,
            connect_timeout: Duration::from_secs(10),
            command_timeout: None,
            pty: false,
            retry_attempts: 1,
        }
    }

    #[test]
    fn host_command_beats_file_and_cli() {
        let mut host = entry("a");
        host.command = Some("host-cmd".to_string());
        let targets =
            build_targets(&inventory(vec![host]), &settings(), Some("cli-cmd"), Some("file-cmd"))
                .unwrap();
        assert_eq!(targets[0].command, "host-cmd");
    }

    #[test]
    fn file_command_beats_cli() {
        let targets = build_targets(
            &inventory(vec![entry("a")]),
            &settings(),
            Some("cli-cmd"),
            Some("file-cmd"),
        )
        .unwrap();
        assert_eq!(targets[0].command, "file-cmd");
    }

    #[test]
    fn cli_command_is_the_fallback() {
        let targets =
            build_targets(&inventory(vec![entry("a")]), &settings(), Some("cli-cmd"), None)
                .unwrap();
        assert_eq!(targets[0].command, "cli-cmd");
    }

    #[test]
    fn missing_command_is_an_error() {
        let err = build_targets(&inventory(vec![entry("a")]), &settings(), None, None);
        assert!(err.is_err());
    }

    #[test]
    fn per_host_values_override_the_base() {
        let mut host = entry("a");
        host.username = Some("admin".to_string());
        host.port = Some(2222);
        host.password = Some("secret".to_string());

        let targets =
            build_targets(&inventory(vec![host]), &settings(), Some("uptime"), None).unwrap();

        let target = &targets[0];
        assert_eq!(target.username.as_deref(), Some("admin"));
        assert_eq!(target.port, 2222);
        assert_eq!(target.password.as_deref(), Some("secret"));
    }

    #[test]
    fn base_values_apply_when_host_is_silent() {
        let targets =
            build_targets(&inventory(vec![entry("a")]), &settings(), Some("uptime"), None)
                .unwrap();

        let target = &targets[0];
        assert_eq!(target.username.as_deref(), Some("ubuntu"));
        assert_eq!(target.port, 22);
        assert_eq!(target.retry_attempts, 1);
    }

    #[test]
    fn tilde_paths_expand() {
        let expanded = expand_path("~/keys/id_ed25519");
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }
}
