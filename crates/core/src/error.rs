// Copyright 2025 VFS Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types shared by every crate in the harness.
//!
//! Every fatal condition carries enough context (backend, run index, path)
//! to reproduce the failure. Nothing in the harness retries.

use crate::backend::BackendId;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Schema a result file is expected to follow, quoted in parse errors.
pub const RESULT_FILE_SCHEMA: &str =
    r#"{"backend_id": "vc-fee" | "wasmtime", "durations": [<seconds>, ...]}"#;

/// Errors produced by the harness.
#[derive(Debug, Error)]
pub enum Error {
    /// A backend identifier outside the supported set.
    #[error("unknown backend `{0}` (expected one of: vc-fee, wasmtime)")]
    UnknownBackend(String),

    /// Invalid argument or configuration value.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The scratch environment does not satisfy its preconditions.
    #[error("scratch environment {path} is not usable: {reason}")]
    Environment {
        /// Offending directory.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The workload artifact does not exist.
    #[error("workload artifact {0} not found (run `vfs-bench build` first)")]
    MissingArtifact(PathBuf),

    /// One workload invocation failed.
    #[error("{backend} run {run_index} failed: {source}")]
    Invocation {
        /// Backend that executed the run.
        backend: BackendId,
        /// Ordinal of the failed run.
        run_index: usize,
        /// Underlying failure.
        #[source]
        source: InvokeFailure,
    },

    /// One workload invocation exceeded its deadline.
    #[error("{backend} run {run_index} exceeded the deadline of {deadline:?}")]
    Timeout {
        /// Backend that executed the run.
        backend: BackendId,
        /// Ordinal of the hung run.
        run_index: usize,
        /// Configured per-invocation deadline.
        deadline: Duration,
    },

    /// Filesystem I/O failure.
    #[error("failed to {action} {path}: {source}")]
    Io {
        /// What was being attempted, e.g. "read".
        action: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A result file that does not follow the expected schema.
    #[error("malformed result file {path}: {reason} (expected {})", RESULT_FILE_SCHEMA)]
    MalformedResult {
        /// Offending file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// The artifact build step failed.
    #[error("build failed: {0}")]
    Build(String),

    /// Chart rendering failed.
    #[error("failed to render chart: {0}")]
    Render(String),
}

impl Error {
    /// Shorthand for [`Error::InvalidInput`].
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Shorthand for [`Error::Io`].
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Shorthand for [`Error::Environment`].
    pub fn environment(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Environment {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Why a single backend invocation did not succeed.
#[derive(Debug, Error)]
pub enum InvokeFailure {
    /// The runtime executable could not be started.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        /// Program that was spawned.
        program: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The runtime exited unsuccessfully.
    #[error("`{program}` exited with {status}: {stderr}")]
    Exit {
        /// Program that ran.
        program: String,
        /// Exit status as reported by the OS.
        status: String,
        /// Tail of the captured stderr.
        stderr: String,
    },

    /// Failure reported by an embedded backend.
    #[error("{0}")]
    Backend(String),
}

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, Error>;
