//! Benchmark pipeline for the VFS benchmark harness.
//!
//! This crate drives the `veracruz-vfs-bench` workload on the supported
//! runtimes and turns the timings into comparable artifacts.
//!
//! # Quick Start
//!
//! ```no_run
//! use vfs_bench_benchmarks::{bench, graph::GraphSeries};
//! use vfs_bench_core::{BackendId, HarnessConfig};
//! use std::path::Path;
//!
//! # async fn example() -> vfs_bench_core::Result<()> {
//! let config = HarnessConfig::load(None)?;
//! bench(&config, BackendId::Wasmtime, 5, Path::new("target/wasmtime.json")).await?;
//! bench(&config, BackendId::VcFee, 5, Path::new("target/vc-fee.json")).await?;
//!
//! vfs_bench_benchmarks::graph::render(
//!     &[
//!         GraphSeries::new("vc-fee", "target/vc-fee.json"),
//!         GraphSeries::new("wasmtime+tmpfs", "target/wasmtime.json"),
//!     ],
//!     Path::new("target/out.svg"),
//!     "veracruz-vfs-bench",
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`artifact`] - building and installing the workload
//! - [`scratch`] - memory-backed scratch preparation
//! - [`backend`] - the runtime backends
//! - [`driver`] - repeated timed execution
//! - [`result`] - `ResultSet` and its file format
//! - [`io`] - atomic reading and writing of result files
//! - [`stats`] - summary statistics
//! - [`graph`] - comparison charts
//! - [`markdown`] - markdown summaries

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod artifact;
pub mod backend;
pub mod driver;
pub mod graph;
pub mod io;
pub mod markdown;
pub mod result;
pub mod scratch;
pub mod stats;

pub use backend::Backend;
pub use driver::{DriverSettings, RunDriver};
pub use result::{BenchmarkRun, ResultSet};
pub use scratch::{ScratchPreparer, ScratchStatus};

use std::path::Path;
use tracing::info;
use vfs_bench_core::{BackendId, Error, HarnessConfig, Result, Workload};

/// Prepare the harness directories and the scratch filesystem.
pub async fn prepare(config: &HarnessConfig) -> Result<ScratchStatus> {
    ScratchPreparer::from_config(&config.scratch)
        .prepare(&config.paths)
        .await
}

/// Run the full pipeline for one backend: prepare scratch space, execute
/// `job_count` timed repetitions and record them at `output`.
///
/// Nothing is written unless every repetition succeeds.
pub async fn bench(
    config: &HarnessConfig,
    backend_id: BackendId,
    job_count: usize,
    output: &Path,
) -> Result<ResultSet> {
    config.validate()?;
    if job_count == 0 {
        return Err(Error::invalid_input("job count must be a positive integer"));
    }

    let status = prepare(config).await?;
    info!(?status, scratch = %config.paths.scratch_dir.display(), "scratch ready");

    let workload = Workload::from_config(&config.workload).resolve()?;
    let driver = RunDriver::new(
        backend::from_config(backend_id, &config.backends),
        workload,
        &config.paths.scratch_dir,
        DriverSettings::from_config(&config.run),
    )?;
    run_and_record(&driver, job_count, output).await
}

/// Execute `job_count` repetitions and write the result file.
pub async fn run_and_record(
    driver: &RunDriver,
    job_count: usize,
    output: &Path,
) -> Result<ResultSet> {
    let set = driver.run(job_count).await?;
    io::write_result_set(&set, output)?;
    info!(
        backend = %set.backend_id(),
        runs = set.len(),
        output = %output.display(),
        "recorded results"
    );
    Ok(set)
}
