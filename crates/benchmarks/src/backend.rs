//! Runtime backends.
//!
//! Every backend answers one question: how long did it take to execute
//! the workload against a given filesystem root? [`from_config`] is the only
//! place that maps a [`BackendId`] to an implementation.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{trace, Level};
use vfs_bench_core::config::{BackendCommand, BackendsConfig};
use vfs_bench_core::workload::{RESULTS_SUBDIR, SCRATCH_SUBDIR};
use vfs_bench_core::{BackendId, InvokeFailure, Workload};

/// Bytes of stderr kept when a runtime fails.
const STDERR_TAIL: usize = 2048;

/// A runtime able to execute the workload.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    /// Identifier recorded with every run.
    fn id(&self) -> BackendId;

    /// Execute repetition `run_index` of `workload` with `fs_root` as its
    /// filesystem root and return the elapsed time of the invocation.
    ///
    /// `fs_root` contains `scratch/` and `results/` directories. Dropping
    /// the returned future must stop the invocation.
    async fn invoke(
        &self,
        workload: &Workload,
        fs_root: &Path,
        run_index: usize,
    ) -> Result<Duration, InvokeFailure>;
}

/// Build the backend for `id` from configuration.
pub fn from_config(id: BackendId, config: &BackendsConfig) -> Arc<dyn Backend> {
    match id {
        BackendId::VcFee => Arc::new(VcFee::new(&config.vc_fee)),
        BackendId::Wasmtime => Arc::new(Wasmtime::new(&config.wasmtime)),
    }
}

/// The Veracruz freestanding execution environment, run as `vc-fee`.
///
/// vc-fee maps host directories named by `-o` into the guest under the same
/// name, so it runs with the filesystem root as working directory.
#[derive(Debug, Clone)]
pub struct VcFee {
    command: BackendCommand,
}

impl VcFee {
    /// Create from configuration.
    pub fn new(command: &BackendCommand) -> Self {
        Self {
            command: command.clone(),
        }
    }

    /// The command that runs one repetition.
    pub fn command(&self, workload: &Workload, fs_root: &Path, run_index: usize) -> Command {
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args);
        cmd.arg("--arg").arg(&workload.name);
        for arg in workload.args_for_run(run_index) {
            cmd.arg("--arg").arg(arg);
        }
        cmd.arg("-p")
            .arg(&workload.wasm)
            .arg("-i")
            .arg(workload.program_dir())
            .arg("-o")
            .arg(SCRATCH_SUBDIR)
            .arg("-o")
            .arg(RESULTS_SUBDIR)
            .current_dir(fs_root);
        cmd
    }
}

#[async_trait]
impl Backend for VcFee {
    fn id(&self) -> BackendId {
        BackendId::VcFee
    }

    async fn invoke(
        &self,
        workload: &Workload,
        fs_root: &Path,
        run_index: usize,
    ) -> Result<Duration, InvokeFailure> {
        execute(self.command(workload, fs_root, run_index)).await
    }
}

/// The wasmtime runtime, with the scratch and results directories mapped
/// into the guest as `/scratch` and `/results`.
#[derive(Debug, Clone)]
pub struct Wasmtime {
    command: BackendCommand,
}

impl Wasmtime {
    /// Create from configuration.
    pub fn new(command: &BackendCommand) -> Self {
        Self {
            command: command.clone(),
        }
    }

    /// The command that runs one repetition.
    pub fn command(&self, workload: &Workload, fs_root: &Path, run_index: usize) -> Command {
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args);
        for dir in [SCRATCH_SUBDIR, RESULTS_SUBDIR] {
            cmd.arg("--mapdir")
                .arg(format!("/{}::{}", dir, fs_root.join(dir).display()));
        }
        cmd.arg(&workload.wasm)
            .args(workload.args_for_run(run_index))
            .current_dir(fs_root);
        cmd
    }
}

#[async_trait]
impl Backend for Wasmtime {
    fn id(&self) -> BackendId {
        BackendId::Wasmtime
    }

    async fn invoke(
        &self,
        workload: &Workload,
        fs_root: &Path,
        run_index: usize,
    ) -> Result<Duration, InvokeFailure> {
        execute(self.command(workload, fs_root, run_index)).await
    }
}

/// Spawn `command`, wait for it and return the wall-clock time from spawn
/// to exit. The child is killed if the returned future is dropped.
pub(crate) async fn execute(mut command: Command) -> Result<Duration, InvokeFailure> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();
    // stdout is only kept when someone will read it
    let capture_stdout = tracing::enabled!(Level::TRACE);
    command
        .stdin(Stdio::null())
        .stdout(if capture_stdout {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let output = command
        .output()
        .await
        .map_err(|source| InvokeFailure::Spawn {
            program: program.clone(),
            source,
        })?;
    let elapsed = start.elapsed();

    if capture_stdout {
        trace!(
            program = %program,
            stdout = %String::from_utf8_lossy(&output.stdout),
            "workload output"
        );
    }

    if !output.status.success() {
        return Err(InvokeFailure::Exit {
            program,
            status: output.status.to_string(),
            stderr: stderr_tail(&output.stderr),
        });
    }
    Ok(elapsed)
}

fn stderr_tail(stderr: &[u8]) -> String {
    let start = stderr.len().saturating_sub(STDERR_TAIL);
    String::from_utf8_lossy(&stderr[start..]).trim().to_string()
}
