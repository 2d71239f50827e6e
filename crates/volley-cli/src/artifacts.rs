//! Post-run artifacts: per-host output files and the JSONL log

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use color_eyre::eyre::Result;
use serde::Serialize;
use volley_exec::HostResult;

/// Replace filename-hostile characters so a host can name its output files.
pub fn sanitize_host(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Write `<host>.stdout.txt` and `<host>.stderr.txt` for every result.
pub fn save_outputs(dir: &Path, results: &[HostResult]) -> Result<()> {
    fs::create_dir_all(dir)?;
    for result in results {
        let base = sanitize_host(&result.host);
        fs::write(dir.join(format!("{base}.stdout.txt")), &result.stdout)?;
        fs::write(dir.join(format!("{base}.stderr.txt")), &result.stderr)?;
    }
    Ok(())
}

/// One JSON Lines record per host.
#[derive(Debug, Serialize)]
pub struct LogRecord<'a> {
    pub timestamp: DateTime<Utc>,
    pub host: &'a str,
    pub ok: bool,
    pub exit_status: Option<i32>,
    pub duration_sec: f64,
    pub error: Option<&'a str>,
    pub stdout: &'a str,
    pub stderr: &'a str,
    pub command: Option<&'a str>,
}

/// Write the JSONL log, one record per result, carrying the effective
/// command each host ran.
pub fn write_log(
    path: &Path,
    results: &[HostResult],
    commands: &HashMap<String, String>,
) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    for result in results {
        let record = LogRecord {
            timestamp: Utc::now(),
            host: &result.host,
            ok: result.ok(),
            exit_status: result.exit_status,
            duration_sec: result.duration().as_secs_f64(),
            error: result.error.as_deref(),
            stdout: &result.stdout,
            stderr: &result.stderr,
            command: commands.get(&result.host).map(String::as_str),
        };
        serde_json::to_writer(&mut writer, &record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use volley_exec::CommandOutput;

    use super::*;

    fn result(host: &str, exit: i32, stdout: &str, stderr: &str) -> HostResult {
        HostResult::completed(
            host.to_string(),
            Instant::now(),
            CommandOutput {
                exit_status: Some(exit),
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        )
    }

    #[test]
    fn sanitize_keeps_safe_chars_only() {
        assert_eq!(sanitize_host("web-1.example.com"), "web-1.example.com");
        assert_eq!(sanitize_host("user@host:22"), "user_host_22");
        assert_eq!(sanitize_host("a/b\\c"), "a_b_c");
    }

    #[test]
    fn save_outputs_writes_both_streams() {
        let dir = tempfile::tempdir().unwrap();
        let results = vec![result("web/1", 0, "out\n", "err\n")];

        save_outputs(dir.path(), &results).unwrap();

        let stdout = fs::read_to_string(dir.path().join("web_1.stdout.txt")).unwrap();
        let stderr = fs::read_to_string(dir.path().join("web_1.stderr.txt")).unwrap();
        assert_eq!(stdout, "out\n");
        assert_eq!(stderr, "err\n");
    }

    #[test]
    fn log_records_round_trip_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/run.jsonl");

        let mut failed = HostResult::failed(
            "db-1".to_string(),
            Instant::now(),
            "ConnectError: connection refused".to_string(),
        );
        failed.stderr = String::new();
        let results = vec![result("web-1", 0, "ok\n", ""), failed];
        let commands =
            HashMap::from([("web-1".to_string(), "uptime".to_string())]);

        write_log(&path, &results, &commands).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["host"], "web-1");
        assert_eq!(first["ok"], true);
        assert_eq!(first["exit_status"], 0);
        assert_eq!(first["command"], "uptime");

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["host"], "db-1");
        assert_eq!(second["ok"], false);
        assert!(second["exit_status"].is_null());
        assert_eq!(second["error"], "ConnectError: connection refused");
        assert!(second["command"].is_null());
    }
}
