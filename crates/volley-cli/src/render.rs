//! Console rendering: plan and results tables, summary, progress lines

use colored::Colorize;
use volley_exec::{HostResult, Target};

pub const PLAN_HEADERS: [&str; 6] = ["Host", "User", "Port", "Auth", "PTY", "Command (preview)"];
pub const RESULT_HEADERS: [&str; 6] = [
    "Host",
    "Status",
    "Exit",
    "Duration (s)",
    "Stdout (first line)",
    "Error",
];

/// First line of a block of text, trimmed.
pub fn first_line(text: &str) -> &str {
    text.trim().lines().next().unwrap_or("")
}

/// Truncate to at most `max` characters.
pub fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}

/// Render an aligned plain-text table with a header rule.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let render_row = |cells: Vec<String>, widths: &[usize]| -> String {
        let line = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<w$}", w = width))
            .collect::<Vec<_>>()
            .join("  ");
        line.trim_end().to_string()
    };

    let mut out = String::new();
    out.push_str(&render_row(
        headers.iter().map(ToString::to_string).collect(),
        &widths,
    ));
    out.push('\n');
    out.push_str(&"-".repeat(
        widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1),
    ));
    out.push('\n');
    for row in rows {
        out.push_str(&render_row(row.clone(), &widths));
        out.push('\n');
    }
    out
}

/// Dry-run plan rows, passwords masked.
pub fn plan_rows(targets: &[Target]) -> Vec<Vec<String>> {
    targets
        .iter()
        .map(|target| {
            let mut auth = Vec::new();
            if let Some(identity) = &target.identity {
                auth.push(format!("key:{}", identity.display()));
            }
            if target.password.is_some() {
                auth.push("password:***".to_string());
            }
            let auth = if auth.is_empty() {
                "agent/none".to_string()
            } else {
                auth.join(", ")
            };

            vec![
                target.host.clone(),
                target.username.clone().unwrap_or_default(),
                target.port.to_string(),
                auth,
                if target.pty { "yes" } else { "no" }.to_string(),
                clip(first_line(&target.command), 120),
            ]
        })
        .collect()
}

/// Result table rows.
pub fn result_rows(results: &[HostResult]) -> Vec<Vec<String>> {
    results
        .iter()
        .map(|result| {
            vec![
                result.host.clone(),
                if result.ok() { "OK" } else { "FAIL" }.to_string(),
                result
                    .exit_status
                    .map(|code| code.to_string())
                    .unwrap_or_default(),
                format!("{:.2}", result.duration().as_secs_f64()),
                clip(first_line(&result.stdout), 200),
                if result.ok() {
                    String::new()
                } else {
                    clip(&failure_reason(result), 200)
                },
            ]
        })
        .collect()
}

/// Structured error when present, else the first stderr line.
pub fn failure_reason(result: &HostResult) -> String {
    result
        .error
        .clone()
        .unwrap_or_else(|| first_line(&result.stderr).to_string())
}

/// One streamed line per finished host.
pub fn progress_line(result: &HostResult) -> String {
    if result.ok() {
        let exit = result
            .exit_status
            .map(|code| code.to_string())
            .unwrap_or_default();
        format!(
            "{}: {} exit={} dur={:.2}s - {}",
            result.host,
            "OK".green(),
            exit,
            result.duration().as_secs_f64(),
            clip(first_line(&result.stdout), 120),
        )
    } else {
        format!(
            "{}: {} {}",
            result.host,
            "FAIL".red(),
            failure_reason(result)
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use volley_exec::CommandOutput;

    use super::*;

    fn ok_result(host: &str, stdout: &str) -> HostResult {
        HostResult::completed(
            host.to_string(),
            Instant::now(),
            CommandOutput {
                exit_status: Some(0),
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        )
    }

    #[test]
    fn first_line_trims_and_takes_one() {
        assert_eq!(first_line("  hello\nworld\n"), "hello");
        assert_eq!(first_line(""), "");
    }

    #[test]
    fn clip_is_char_safe() {
        assert_eq!(clip("abcdef", 3), "abc");
        assert_eq!(clip("ab", 3), "ab");
        assert_eq!(clip("ééééé", 2), "éé");
    }

    #[test]
    fn failure_reason_prefers_structured_error() {
        let mut result = ok_result("h", "");
        result.exit_status = Some(1);
        result.stderr = "stderr line\nmore".to_string();
        assert_eq!(failure_reason(&result), "stderr line");

        result.error = Some("ConnectError: refused".to_string());
        assert_eq!(failure_reason(&result), "ConnectError: refused");
    }

    #[test]
    fn progress_line_shows_exit_and_duration() {
        let line = progress_line(&ok_result("web-1", "up 3 days\n"));
        assert!(line.starts_with("web-1: "));
        assert!(line.contains("exit=0"));
        assert!(line.contains("dur="));
        assert!(line.contains("up 3 days"));
    }

    #[test]
    fn table_aligns_columns() {
        let table = render_table(
            &["A", "Bee"],
            &[
                vec!["x".to_string(), "y".to_string()],
                vec!["longer".to_string(), "z".to_string()],
            ],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "A       Bee");
        assert_eq!(lines[2], "x       y");
        assert_eq!(lines[3], "longer  z");
    }
}
