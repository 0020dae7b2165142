//! CLI for the VFS benchmark harness.
//!
//! This crate provides the `vfs-bench` command: building the workload,
//! preparing scratch space, running one backend and charting the results.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use vfs_bench_benchmarks::graph::{self, GraphSeries};
use vfs_bench_benchmarks::scratch::MountTable;
use vfs_bench_benchmarks::{artifact, io, markdown, ScratchStatus};
use vfs_bench_core::{BackendId, HarnessConfig};

/// VFS benchmark harness CLI.
#[derive(Parser, Debug)]
#[command(name = "vfs-bench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./vfs-bench.toml when present).
    #[arg(long, global = true, env = "VFS_BENCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Log output format.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the workload and install it into the programs directory.
    Build,

    /// Create the harness directories and mount the scratch filesystem.
    Prepare,

    /// Run the workload repeatedly on one backend and record the timings.
    Bench {
        /// Backend to run on: vc-fee or wasmtime.
        backend: String,

        /// Result file to write.
        results: PathBuf,

        /// Number of timed repetitions (overrides run.jobs).
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Repetitions in flight at once (overrides run.workers).
        #[arg(short, long)]
        workers: Option<usize>,

        /// Per-repetition deadline in seconds (overrides run.timeout_secs).
        #[arg(long)]
        timeout: Option<u64>,

        /// Keep each repetition's scratch root after it succeeds.
        #[arg(long)]
        keep_scratch: bool,
    },

    /// Render result files into one comparison chart.
    Graph {
        /// Chart to write (SVG).
        output: PathBuf,

        /// Series as LABEL=PATH, drawn in the given order.
        #[arg(required = true)]
        series: Vec<String>,

        /// Also write a markdown summary table.
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Series label the summary is made relative to.
        #[arg(long, requires = "summary")]
        baseline: Option<String>,

        /// Chart title (default: the workload name).
        #[arg(long)]
        title: Option<String>,
    },

    /// Show harness configuration and scratch state.
    Status {
        /// Show detailed status information.
        #[arg(short, long)]
        detailed: bool,
    },
}

/// Parse the command line and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_tracing(cli.verbose, cli.log_format);

    let config = HarnessConfig::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("loading configuration from {}", path.display()),
        None => "loading configuration".to_string(),
    })?;
    debug!(?config, "loaded configuration");

    match cli.command {
        Commands::Build => {
            config.validate()?;
            let installed = artifact::build(&config.build, &config.workload).await?;
            println!("{} {}", "Built".green().bold(), installed.display());
            Ok(())
        }
        Commands::Prepare => {
            config.validate()?;
            let status = vfs_bench_benchmarks::prepare(&config).await?;
            println!(
                "{} {} ({})",
                "Prepared".green().bold(),
                config.paths.scratch_dir.display(),
                describe(status, &config)
            );
            Ok(())
        }
        Commands::Bench {
            backend,
            results,
            jobs,
            workers,
            timeout,
            keep_scratch,
        } => {
            let backend: BackendId = backend.parse()?;
            let mut config = config;
            if let Some(jobs) = jobs {
                config.run.jobs = jobs;
            }
            if let Some(workers) = workers {
                config.run.workers = workers;
            }
            if let Some(timeout) = timeout {
                config.run.timeout_secs = timeout;
            }
            config.run.keep_scratch |= keep_scratch;
            config.validate()?;
            debug!(%backend, run = ?config.run, "effective run settings");

            let set =
                vfs_bench_benchmarks::bench(&config, backend, config.run.jobs, &results).await?;
            println!(
                "{} {} runs on {} -> {}",
                "Recorded".green().bold(),
                set.len(),
                backend,
                results.display()
            );
            Ok(())
        }
        Commands::Graph {
            output,
            series,
            summary,
            baseline,
            title,
        } => {
            let series = series
                .iter()
                .map(|s| s.parse::<GraphSeries>())
                .collect::<Result<Vec<_>, _>>()?;
            let title = title.unwrap_or_else(|| config.workload.name.clone());
            write_graph(&series, &output, &title, summary.as_deref(), baseline.as_deref())
        }
        Commands::Status { detailed } => {
            print_status(&config, detailed).await;
            Ok(())
        }
    }
}

/// Load every series, then write the chart and optional summary.
///
/// Nothing is written until all inputs and the baseline are known good.
fn write_graph(
    series: &[GraphSeries],
    output: &Path,
    title: &str,
    summary: Option<&Path>,
    baseline: Option<&str>,
) -> anyhow::Result<()> {
    let summaries = graph::load_series(series)?;
    let table = summary
        .map(|_| markdown::generate_summary(&summaries, baseline))
        .transpose()?;
    let svg = graph::render_svg(&summaries, title)?;

    io::write_atomic(output, svg.as_bytes())?;
    println!("{} {}", "Wrote".green().bold(), output.display());
    if let (Some(path), Some(table)) = (summary, table) {
        io::write_atomic(path, table.as_bytes())?;
        println!("{} {}", "Wrote".green().bold(), path.display());
    }
    Ok(())
}

async fn print_status(config: &HarnessConfig, detailed: bool) {
    println!("{}", "VFS Bench Harness".bold());
    println!("Version: {}", env!("CARGO_PKG_VERSION"));

    let workload = if config.workload.wasm.is_file() {
        "built".green()
    } else {
        "not built".yellow()
    };
    println!("Workload: {} ({})", config.workload.wasm.display(), workload);

    let table = MountTable::read(&config.scratch.mount_table).await;
    let mounted = std::fs::canonicalize(&config.paths.scratch_dir)
        .ok()
        .and_then(|scratch| table.fs_type_at(&scratch).map(str::to_string));
    let scratch = match mounted {
        Some(fs) if fs == config.scratch.filesystem.as_str() => format!("{} mounted", fs).green(),
        Some(fs) => format!("{} mounted, expected {}", fs, config.scratch.filesystem).yellow(),
        None => "not mounted".yellow(),
    };
    println!("Scratch: {} ({})", config.paths.scratch_dir.display(), scratch);

    if detailed {
        println!("\nDirectories:");
        println!("  - target:   {}", config.paths.target_dir.display());
        println!("  - programs: {}", config.paths.programs_dir.display());
        println!("  - results:  {}", config.paths.results_dir.display());
        println!("\nRun:");
        println!("  - jobs:         {}", config.run.jobs);
        println!("  - workers:      {}", config.run.workers);
        println!("  - timeout:      {}s", config.run.timeout_secs);
        println!("  - keep scratch: {}", config.run.keep_scratch);
        println!("  - mount policy: {}", config.scratch.mount_policy);
        println!("\nBackends:");
        for (id, command) in [
            (BackendId::VcFee, &config.backends.vc_fee),
            (BackendId::Wasmtime, &config.backends.wasmtime),
        ] {
            println!(
                "  - {}: {} {}",
                id,
                command.program.display(),
                command.args.join(" ")
            );
        }
    }
}

fn describe(status: ScratchStatus, config: &HarnessConfig) -> String {
    match status {
        ScratchStatus::AlreadyMounted => format!("{} already mounted", config.scratch.filesystem),
        ScratchStatus::Mounted => format!("mounted {}", config.scratch.filesystem),
        ScratchStatus::Unmounted => "plain directory".to_string(),
    }
}

/// Install the stderr subscriber. `RUST_LOG` takes precedence over `-v`.
fn init_tracing(verbose: u8, format: LogFormat) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
