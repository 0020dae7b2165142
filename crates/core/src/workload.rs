// Copyright 2025 VFS Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! The benchmarked WASM program and its argument contract.
//!
//! The workload is opaque to the harness: it is handed a filesystem root
//! containing `scratch/` and `results/` directories, its configured
//! arguments and, by default, the run index as the last argument.

use crate::config::WorkloadConfig;
use std::path::{Path, PathBuf};

/// Name of the directory the workload uses as its scratch filesystem.
pub const SCRATCH_SUBDIR: &str = "scratch";

/// Name of the directory the workload may write its own reports into.
pub const RESULTS_SUBDIR: &str = "results";

/// A workload binary plus the arguments it is run with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    /// Program name.
    pub name: String,
    /// Path of the `.wasm` binary.
    pub wasm: PathBuf,
    /// Arguments common to every run.
    pub args: Vec<String>,
    /// Append the run index as the final argument.
    pub append_run_index: bool,
}

impl Workload {
    /// Build a workload description from configuration.
    pub fn from_config(config: &WorkloadConfig) -> Self {
        Self {
            name: config.name.clone(),
            wasm: config.wasm.clone(),
            args: config.args.clone(),
            append_run_index: config.append_run_index,
        }
    }

    /// Make the binary path absolute, failing if the artifact is missing.
    ///
    /// Backends run with their working directory inside the scratch root,
    /// so relative paths would no longer resolve.
    pub fn resolve(mut self) -> crate::Result<Self> {
        self.wasm = self
            .wasm
            .canonicalize()
            .map_err(|_| crate::Error::MissingArtifact(self.wasm.clone()))?;
        Ok(self)
    }

    /// Directory containing the binary.
    pub fn program_dir(&self) -> &Path {
        self.wasm
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    /// Arguments for the given run.
    pub fn args_for_run(&self, run_index: usize) -> Vec<String> {
        let mut args = self.args.clone();
        if self.append_run_index {
            args.push(run_index.to_string());
        }
        args
    }
}
