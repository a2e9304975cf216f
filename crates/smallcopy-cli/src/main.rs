//! smallcopy - privacy-reduced copies of the Weasyl database
//!
//! Copies allow-listed accounts and their rating-bounded content into the
//! `smallcopy` schema of the same database, in a single transaction.
//!
//! ## Commands
//!
//! - `run`: perform a copy
//! - `plan`: print the unit plan without touching a database

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use smallcopy_core::{
    Engine, ImportError, Include, Rating, RunConfig, RunObserver, RunReport,
};
use smallcopy_pg::{weasyl_registry, PgTarget};
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "smallcopy")]
#[command(author = "Weasyl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Copy a privacy-reduced subset of the Weasyl database", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines (and JSON output from `plan`)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy the subset into the `smallcopy` schema
    Run(RunArgs),

    /// Print the validated unit plan
    Plan,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// PostgreSQL connection URL (default: from the config file, then DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Accounts to copy: `all` or a comma-separated list of user ids
    #[arg(long)]
    include: Option<Include>,

    /// Most mature rating to copy: general, moderate, mature or explicit
    #[arg(long)]
    maximum_rating: Option<Rating>,

    /// SQL script creating the `smallcopy` schema
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Schema holding the source tables
    #[arg(long)]
    source_schema: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Console lines carry unit progress; logs stay quiet unless asked.
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    smallcopy_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run(args) => cmd_run(&args, std::env::var("DATABASE_URL").ok()).await,
        Commands::Plan => cmd_plan(cli.json),
    }
}

/// Merge the config file, command-line flags and the environment.
///
/// Flags win over the file; `env_url` is used only when neither names a
/// database.
fn resolve_config(args: &RunArgs, env_url: Option<String>) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            let include = args
                .include
                .clone()
                .context("--include is required when no --config is given")?;
            let maximum_rating = args
                .maximum_rating
                .context("--maximum-rating is required when no --config is given")?;
            RunConfig::new(include, maximum_rating)
        }
    };

    if let Some(include) = &args.include {
        config.include = include.clone();
    }
    if let Some(rating) = args.maximum_rating {
        config.maximum_rating = rating;
    }
    if let Some(url) = &args.database_url {
        config.database.url = Some(url.clone());
    }
    if let Some(schema) = &args.schema {
        config.database.schema_script = schema.clone();
    }
    if let Some(source) = &args.source_schema {
        config.database.source_schema = source.clone();
    }
    if config.database.url.is_none() {
        config.database.url = env_url;
    }

    Ok(config)
}

fn read_schema_script(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema script {}", path.display()))
}

/// Perform a copy, committing only if every unit succeeds
async fn cmd_run(args: &RunArgs, env_url: Option<String>) -> Result<()> {
    let config = resolve_config(args, env_url)?;
    let script = read_schema_script(&config.database.schema_script)?;
    let registry = weasyl_registry(script).context("Invalid unit catalog")?;
    let url = config
        .database_url()
        .context("No database: pass --database-url, set [database] url, or set DATABASE_URL")?;

    info!(
        include = %config.include,
        maximum_rating = %config.maximum_rating,
        units = registry.len(),
        "Starting copy"
    );

    let mut target = PgTarget::connect(url)
        .await
        .context("Failed to connect to database")?;

    let engine = Engine::new().with_observer(Arc::new(ConsoleReporter::default()));
    match engine.run(&registry, &mut target, &config).await {
        Ok(report) => {
            target
                .commit()
                .await
                .context("Failed to commit the copy")?;
            info!(
                run_id = %report.run_id,
                duration_ms = report.duration_ms(),
                "Copy committed"
            );
            Ok(())
        }
        Err(err) => {
            if let Err(rollback_err) = target.rollback().await {
                warn!(error = %rollback_err, "Rollback failed; the connection was dropped");
            }
            Err(err).context("Copy aborted; nothing was committed")
        }
    }
}

/// Print the unit plan
fn cmd_plan(json: bool) -> Result<()> {
    let registry = weasyl_registry(String::new()).context("Invalid unit catalog")?;
    registry
        .verify_order()
        .context("Unit order does not satisfy declared dependencies")?;
    let plan = registry.plan();

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    for step in &plan {
        println!("{:>2}. {}", step.position + 1, step.name);
        if !step.after.is_empty() {
            println!("      after:     {}", step.after.join(", "));
        }
        if !step.populates.is_empty() {
            println!("      populates: {}", step.populates.join(", "));
        }
        if !step.reads.is_empty() {
            println!("      reads:     {}", step.reads.join(", "));
        }
    }
    Ok(())
}

/// Prints one line per unit and a total, on stderr.
///
/// On a terminal the running unit's `…` line is overwritten when it finishes.
struct ConsoleReporter {
    width: AtomicUsize,
    in_place: bool,
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self {
            width: AtomicUsize::new(0),
            in_place: std::io::stderr().is_terminal(),
        }
    }
}

impl ConsoleReporter {
    fn width(&self) -> usize {
        self.width.load(Ordering::Relaxed)
    }
}

fn started_line(unit: &str, width: usize) -> String {
    format!("… {unit:<width$}")
}

fn unit_line(mark: char, unit: &str, width: usize, elapsed: Duration) -> String {
    format!("{mark} {unit:<width$} {:6.2}s", elapsed.as_secs_f64())
}

fn total_lines(width: usize, elapsed: Duration) -> [String; 2] {
    let pad = " ".repeat(width + 3);
    [
        format!("{pad}───────"),
        format!("{pad}{:6.2}s", elapsed.as_secs_f64()),
    ]
}

impl RunObserver for ConsoleReporter {
    fn run_started(&self, _run_id: &str, unit_names: &[&str]) {
        let width = unit_names.iter().map(|name| name.len()).max().unwrap_or(0);
        self.width.store(width, Ordering::Relaxed);
    }

    fn unit_started(&self, unit: &str) {
        let line = started_line(unit, self.width());
        if self.in_place {
            eprint!("{line}\r");
        } else {
            eprintln!("{line}");
        }
    }

    fn unit_finished(&self, unit: &str, elapsed: Duration) {
        eprintln!("{}", unit_line('✓', unit, self.width(), elapsed));
    }

    fn unit_failed(&self, unit: &str, elapsed: Duration, _error: &ImportError) {
        eprintln!("{}", unit_line('✗', unit, self.width(), elapsed));
    }

    fn run_finished(&self, report: &RunReport) {
        for line in total_lines(self.width(), report.elapsed) {
            eprintln!("{line}");
        }
    }
}
