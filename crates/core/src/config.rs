// Copyright 2025 VFS Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Harness configuration.
//!
//! Values are layered, lowest precedence first:
//!
//! 1. built-in defaults,
//! 2. `vfs-bench.toml` in the working directory (or an explicit file, which
//!    must then exist),
//! 3. `VFS_BENCH_*` environment variables, with `__` separating nested keys
//!    (`VFS_BENCH_RUN__JOBS=10`, `VFS_BENCH_SCRATCH__MOUNT_POLICY=lenient`).
//!
//! Command-line flags are applied on top by the CLI.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name, looked up without extension.
pub const DEFAULT_CONFIG_NAME: &str = "vfs-bench";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "VFS_BENCH";

/// Complete harness configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Directory layout.
    pub paths: PathsConfig,
    /// Scratch filesystem preparation.
    pub scratch: ScratchConfig,
    /// The benchmarked workload.
    pub workload: WorkloadConfig,
    /// How to build the workload.
    pub build: BuildConfig,
    /// Run driver settings.
    pub run: RunConfig,
    /// Backend executables.
    pub backends: BackendsConfig,
}

impl HarnessConfig {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// When `path` is `None`, `vfs-bench.{toml,json,yaml}` is used if present.
    /// The result is not validated: callers apply their own overrides first
    /// and then call [`HarnessConfig::validate`].
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let config: HarnessConfig = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Reject values the harness cannot run with.
    pub fn validate(&self) -> crate::Result<()> {
        if self.run.jobs == 0 {
            return Err(crate::Error::invalid_input(
                "run.jobs must be a positive integer",
            ));
        }
        if self.run.workers == 0 {
            return Err(crate::Error::invalid_input(
                "run.workers must be a positive integer",
            ));
        }
        if self.run.timeout_secs == 0 {
            return Err(crate::Error::invalid_input(
                "run.timeout_secs must be a positive integer",
            ));
        }
        if self.scratch.mount_command.is_empty() {
            return Err(crate::Error::invalid_input(
                "scratch.mount_command must not be empty",
            ));
        }
        if self.build.command.is_empty() {
            return Err(crate::Error::invalid_input(
                "build.command must not be empty",
            ));
        }
        Ok(())
    }
}

/// Directory layout. Every directory is created on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root for everything the harness produces.
    pub target_dir: PathBuf,
    /// Where built workload binaries live.
    pub programs_dir: PathBuf,
    /// Where result files are written by default.
    pub results_dir: PathBuf,
    /// Mount point of the memory-backed scratch filesystem.
    pub scratch_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            target_dir: PathBuf::from("target"),
            programs_dir: PathBuf::from("target/programs"),
            results_dir: PathBuf::from("target/results"),
            scratch_dir: PathBuf::from("target/scratch"),
        }
    }
}

/// Memory-resident filesystem required under the scratch directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScratchFs {
    /// Size-limited, swappable memory filesystem.
    #[default]
    Tmpfs,
    /// Unbounded memory filesystem.
    Ramfs,
}

impl ScratchFs {
    /// Filesystem type as it appears in the mount table.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScratchFs::Tmpfs => "tmpfs",
            ScratchFs::Ramfs => "ramfs",
        }
    }
}

impl fmt::Display for ScratchFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do when the scratch filesystem cannot be mounted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountPolicy {
    /// Mount failure aborts before any run.
    #[default]
    Strict,
    /// Mount failure is logged and the plain directory is used.
    Lenient,
}

impl fmt::Display for MountPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountPolicy::Strict => f.write_str("strict"),
            MountPolicy::Lenient => f.write_str("lenient"),
        }
    }
}

/// Scratch filesystem preparation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScratchConfig {
    /// Filesystem type the scratch directory must be backed by.
    pub filesystem: ScratchFs,
    /// Mount failure policy.
    pub mount_policy: MountPolicy,
    /// Size limit passed to tmpfs (`size=` option), e.g. `"4G"`.
    pub size: Option<String>,
    /// Command used to mount, e.g. `["sudo", "mount"]`.
    pub mount_command: Vec<String>,
    /// Mount table consulted to detect an existing mount.
    pub mount_table: PathBuf,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            filesystem: ScratchFs::default(),
            mount_policy: MountPolicy::default(),
            size: None,
            mount_command: vec!["mount".to_string()],
            mount_table: PathBuf::from("/proc/self/mounts"),
        }
    }
}

/// The benchmarked program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Program name, passed as argv[0] where the backend needs one.
    pub name: String,
    /// Path of the compiled `.wasm` binary.
    pub wasm: PathBuf,
    /// Arguments handed to the workload.
    pub args: Vec<String>,
    /// Append the run index as the final argument.
    pub append_run_index: bool,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            name: "veracruz-vfs-bench".to_string(),
            wasm: PathBuf::from("target/programs/veracruz-vfs-bench.wasm"),
            args: vec![
                "write_inorder".to_string(),
                (1u64 << 20).to_string(),
                "512".to_string(),
            ],
            append_run_index: true,
        }
    }
}

/// How the workload is compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Build command and its arguments.
    pub command: Vec<String>,
    /// Working directory of the build command.
    pub workdir: PathBuf,
    /// Artifact produced by the build, relative to `workdir`.
    pub artifact: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: ["cargo", "build", "--release", "--target", "wasm32-wasi"]
                .into_iter()
                .map(String::from)
                .collect(),
            workdir: PathBuf::from("."),
            artifact: PathBuf::from("target/wasm32-wasi/release/veracruz-vfs-bench.wasm"),
        }
    }
}

/// Run driver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Number of timed repetitions per result set.
    pub jobs: usize,
    /// Repetitions allowed in flight at once; 1 runs strictly serially.
    pub workers: usize,
    /// Per-invocation deadline in seconds.
    pub timeout_secs: u64,
    /// Keep each run's scratch directory instead of removing it.
    pub keep_scratch: bool,
}

impl RunConfig {
    /// Per-invocation deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            jobs: 5,
            workers: 1,
            timeout_secs: 600,
            keep_scratch: false,
        }
    }
}

/// Executables for each backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendsConfig {
    /// vc-fee invocation.
    pub vc_fee: BackendCommand,
    /// wasmtime invocation.
    pub wasmtime: BackendCommand,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            vc_fee: BackendCommand {
                program: PathBuf::from("vc-fee"),
                args: ["-de", "-x", "jit"].into_iter().map(String::from).collect(),
            },
            wasmtime: BackendCommand {
                program: PathBuf::from("wasmtime"),
                args: Vec::new(),
            },
        }
    }
}

/// Executable plus leading arguments for one backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendCommand {
    /// Runtime executable.
    pub program: PathBuf,
    /// Arguments placed before the workload-specific ones.
    pub args: Vec<String>,
}
