//! volley CLI
//!
//! Runs a command across every host in a YAML inventory with bounded
//! concurrency, then reports per-host results.

mod artifacts;
mod plan;
mod render;

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use volley_exec::ssh::SshTransport;
use volley_exec::{Dispatcher, HostKeyPolicy, HostResult};
use volley_inventory::load_inventory;

use crate::plan::{RunSettings, build_targets, expand_path};

#[derive(Parser)]
#[command(name = "volley", about = "Concurrent SSH executor for 100+ hosts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command across all hosts in the inventory
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Shell command to run on all hosts (a per-host `command` in the inventory wins)
    command: Option<String>,

    /// Path to inventory YAML
    #[arg(long, default_value = "inventory.yaml")]
    inventory: PathBuf,

    /// Max concurrent SSH sessions
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..))]
    limit: u32,

    /// Path to private key file to use
    #[arg(long)]
    identity: Option<String>,

    /// Override SSH username for all hosts
    #[arg(long)]
    username: Option<String>,

    /// Override SSH port for all hosts
    #[arg(long)]
    port: Option<u16>,

    /// Host key verification policy (off disables StrictHostKeyChecking)
    #[arg(long, value_enum, default_value_t = KnownHostsArg::Off)]
    known_hosts: KnownHostsArg,

    /// SSH connect timeout (seconds)
    #[arg(long, default_value_t = 10.0, value_parser = parse_seconds)]
    connect_timeout: f64,

    /// Request a PTY (xterm) for the command
    #[arg(long)]
    pty: bool,

    /// Command timeout (seconds)
    #[arg(long, value_parser = parse_seconds)]
    command_timeout: Option<f64>,

    /// Connection retry attempts per host
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=5))]
    retry_attempts: u32,

    /// Print full stdout per host after the summary table
    #[arg(long)]
    show_output: bool,

    /// Also print stderr blocks for failed hosts
    #[arg(long)]
    show_stderr: bool,

    /// Directory to save per-host stdout/stderr files
    #[arg(long)]
    save_dir: Option<String>,

    /// Stream per-host results with a progress bar (default)
    #[arg(long, overrides_with = "no_progress")]
    progress: bool,

    /// Disable the progress bar and streamed results
    #[arg(long)]
    no_progress: bool,

    /// Preview target hosts, auth, and commands without executing
    #[arg(long)]
    dry_run: bool,

    /// Read command text from a file (used when a host has no `command`)
    #[arg(long)]
    command_file: Option<String>,

    /// Increase verbosity (repeat for more detail)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Minimal output: only summary and exit code
    #[arg(long)]
    quiet: bool,

    /// Write a JSON lines log with per-host results
    #[arg(long)]
    log_file: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum KnownHostsArg {
    Strict,
    Off,
}

impl From<KnownHostsArg> for HostKeyPolicy {
    fn from(value: KnownHostsArg) -> Self {
        match value {
            KnownHostsArg::Strict => HostKeyPolicy::Strict,
            KnownHostsArg::Off => HostKeyPolicy::Off,
        }
    }
}

fn parse_seconds(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|e| format!("not a number: {e}"))?;
    if value <= 0.0 {
        return Err("must be positive".to_string());
    }
    Ok(value)
}

fn init_tracing(verbose: u8) {
    let directive = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(args).await,
    }
}

async fn run(mut args: RunArgs) -> Result<ExitCode> {
    init_tracing(args.verbose);

    let inventory = load_inventory(&args.inventory)
        .wrap_err_with(|| format!("loading inventory {}", args.inventory.display()))?;
    tracing::debug!(hosts = inventory.hosts.len(), "inventory loaded");

    // -vv implies the full output blocks.
    if args.verbose >= 2 {
        args.show_output = true;
        args.show_stderr = true;
    }

    let settings = RunSettings {
        username: args
            .username
            .clone()
            .or_else(|| inventory.defaults.username.clone()),
        port: args.port.or(Some(inventory.defaults.port)),
        identity: args
            .identity
            .as_deref()
            .map(expand_path)
            .or_else(|| inventory.defaults.identity.as_deref().map(expand_path)),
        password: inventory.defaults.password.clone(),
        known_hosts: args.known_hosts.into(),
        connect_timeout: Duration::from_secs_f64(args.connect_timeout),
        command_timeout: args.command_timeout.map(Duration::from_secs_f64),
        pty: args.pty || inventory.defaults.pty,
        retry_attempts: args.retry_attempts,
    };

    let file_command = match args.command_file.as_deref() {
        Some(raw) => Some(
            std::fs::read_to_string(expand_path(raw))
                .wrap_err_with(|| format!("reading command file {raw}"))?,
        ),
        None => None,
    };

    let targets = build_targets(
        &inventory,
        &settings,
        args.command.as_deref(),
        file_command.as_deref(),
    )?;
    let total = targets.len();
    let limit = args.limit as usize;

    if args.dry_run {
        if !args.quiet {
            println!("Planned SSH Execution");
            print!(
                "{}",
                render::render_table(&render::PLAN_HEADERS, &render::plan_rows(&targets))
            );
        }
        println!("Will run on {total} hosts with concurrency={limit}");
        return Ok(ExitCode::SUCCESS);
    }

    let progress = args.progress || !args.no_progress;
    if !args.quiet && !progress {
        println!("Running on {total} hosts with concurrency={limit}...");
    }

    // Effective command per host, for the JSONL log.
    let commands: HashMap<String, String> = targets
        .iter()
        .map(|t| (t.host.clone(), t.command.clone()))
        .collect();

    let dispatcher = Dispatcher::new(Arc::new(SshTransport::new()));

    let results = if progress && !args.quiet {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template("{spinner} {bar:30} {pos}/{len} {elapsed_precise}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);

        let (tx, mut rx) = mpsc::unbounded_channel::<HostResult>();
        let printer = tokio::spawn({
            let bar = bar.clone();
            async move {
                while let Some(result) = rx.recv().await {
                    bar.inc(1);
                    bar.println(render::progress_line(&result));
                }
                bar.finish_and_clear();
            }
        });

        let results = dispatcher.run_with_events(targets, limit, Some(tx)).await;
        let _ = printer.await;
        results
    } else {
        dispatcher.run(targets, limit).await
    };

    let ok_count = results.iter().filter(|r| r.ok()).count();
    let failed_count = results.len() - ok_count;

    if !args.quiet {
        println!("SSH Results");
        print!(
            "{}",
            render::render_table(&render::RESULT_HEADERS, &render::result_rows(&results))
        );

        if failed_count > 0 {
            println!(
                "{}, Succeeded: {ok_count}",
                format!("Failed: {failed_count}").red()
            );
            for result in results.iter().filter(|r| !r.ok()) {
                println!(
                    "{}: {}",
                    format!("- {}", result.host).red(),
                    render::failure_reason(result)
                );
            }
        } else {
            println!("{}", format!("Succeeded: {ok_count}").green());
        }
    } else if failed_count > 0 {
        println!("Failed: {failed_count}, Succeeded: {ok_count}");
    } else {
        println!("Succeeded: {ok_count}");
    }

    if (args.show_output || args.show_stderr) && !args.quiet {
        for result in &results {
            if args.show_output && !result.stdout.is_empty() {
                println!("--- STDOUT - {} ---", result.host);
                println!("{}", result.stdout);
            }
            if args.show_stderr && !result.ok() && !result.stderr.is_empty() {
                println!("--- STDERR - {} ---", result.host);
                println!("{}", result.stderr);
            }
        }
    }

    if let Some(dir) = args.save_dir.as_deref() {
        artifacts::save_outputs(&expand_path(dir), &results)?;
    }
    if let Some(path) = args.log_file.as_deref() {
        artifacts::write_log(&expand_path(path), &results, &commands)?;
    }

    Ok(if failed_count > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
