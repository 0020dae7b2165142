//! Building the workload artifact.
//!
//! The toolchain is opaque: the configured command is run as-is and the
//! artifact it leaves behind is copied to where the backends expect it.

use std::path::PathBuf;
use tokio::process::Command;
use tracing::info;
use vfs_bench_core::config::{BuildConfig, WorkloadConfig};
use vfs_bench_core::{Error, Result};

/// Run the build command and install the artifact at `workload.wasm`.
///
/// Returns the installed path.
pub async fn build(build: &BuildConfig, workload: &WorkloadConfig) -> Result<PathBuf> {
    let (program, args) = build
        .command
        .split_first()
        .ok_or_else(|| Error::invalid_input("build.command must not be empty"))?;

    info!(command = ?build.command, workdir = %build.workdir.display(), "building workload");
    let status = Command::new(program)
        .args(args)
        .current_dir(&build.workdir)
        .status()
        .await
        .map_err(|e| Error::Build(format!("failed to run `{}`: {}", program, e)))?;
    if !status.success() {
        return Err(Error::Build(format!("`{}` exited with {}", program, status)));
    }

    let artifact = build.workdir.join(&build.artifact);
    if !artifact.is_file() {
        return Err(Error::Build(format!(
            "build succeeded but {} was not produced",
            artifact.display()
        )));
    }

    if let Some(parent) = workload.wasm.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io("create directory", parent, e))?;
    }
    tokio::fs::copy(&artifact, &workload.wasm)
        .await
        .map_err(|e| Error::io("copy artifact to", &workload.wasm, e))?;

    info!(artifact = %workload.wasm.display(), "installed workload");
    Ok(workload.wasm.clone())
}
