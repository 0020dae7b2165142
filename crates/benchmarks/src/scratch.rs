//! Scratch environment preparation.
//!
//! Before any run, the scratch directory must exist, be backed by the
//! configured memory filesystem and be writable. Preparation is idempotent:
//! an existing mount of the right type is left untouched.

use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};
use vfs_bench_core::config::{MountPolicy, PathsConfig, ScratchConfig, ScratchFs};
use vfs_bench_core::{Error, Result};

const PROBE_FILE: &str = ".vfs-bench-probe";

/// Outcome of a successful preparation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScratchStatus {
    /// The required filesystem was already mounted; nothing was done.
    AlreadyMounted,
    /// The filesystem was mounted by this call.
    Mounted,
    /// Mounting failed under the lenient policy; the plain directory is used.
    Unmounted,
}

/// Parsed `/proc/mounts`-style table.
#[derive(Debug, Default)]
pub struct MountTable {
    entries: Vec<(PathBuf, String)>,
}

impl MountTable {
    /// Parse a mount table. Malformed lines are skipped.
    pub fn parse(table: &str) -> Self {
        let entries = table
            .lines()
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let _device = fields.next()?;
                let mount_point = fields.next()?;
                let fs_type = fields.next()?;
                Some((PathBuf::from(unescape(mount_point)), fs_type.to_string()))
            })
            .collect();
        Self { entries }
    }

    /// Read a mount table, treating an unreadable one as empty.
    pub async fn read(path: &Path) -> Self {
        match tokio::fs::read_to_string(path).await {
            Ok(table) => Self::parse(&table),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "mount table unavailable");
                Self::default()
            }
        }
    }

    /// Filesystem type mounted exactly at `mount_point`. Later entries
    /// shadow earlier ones, as with stacked mounts.
    pub fn fs_type_at(&self, mount_point: &Path) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(point, _)| point == mount_point)
            .map(|(_, fs_type)| fs_type.as_str())
    }
}

/// Decode the octal escapes (`\040` for space, ...) the kernel uses.
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let value = bytes[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            if let Ok(byte) = u8::try_from(value) {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Prepares the memory-backed scratch directory.
#[derive(Debug, Clone)]
pub struct ScratchPreparer {
    filesystem: ScratchFs,
    policy: MountPolicy,
    size: Option<String>,
    mount_command: Vec<String>,
    mount_table: PathBuf,
}

impl ScratchPreparer {
    /// Create a preparer from configuration.
    pub fn from_config(config: &ScratchConfig) -> Self {
        Self {
            filesystem: config.filesystem,
            policy: config.mount_policy,
            size: config.size.clone(),
            mount_command: config.mount_command.clone(),
            mount_table: config.mount_table.clone(),
        }
    }

    /// Create the harness directories and make sure the scratch directory
    /// is a writable mount of the configured filesystem.
    pub async fn prepare(&self, paths: &PathsConfig) -> Result<ScratchStatus> {
        for dir in [&paths.programs_dir, &paths.results_dir, &paths.scratch_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| Error::environment(dir, format!("cannot create directory: {}", e)))?;
        }

        let scratch = tokio::fs::canonicalize(&paths.scratch_dir)
            .await
            .map_err(|e| Error::environment(&paths.scratch_dir, e.to_string()))?;

        let status = self.ensure_mounted(&scratch).await?;
        probe_writable(&scratch).await?;
        Ok(status)
    }

    async fn ensure_mounted(&self, scratch: &Path) -> Result<ScratchStatus> {
        let table = MountTable::read(&self.mount_table).await;
        if let Some(fs_type) = table.fs_type_at(scratch) {
            if fs_type == self.filesystem.as_str() {
                debug!(path = %scratch.display(), fs = fs_type, "scratch already mounted");
                return Ok(ScratchStatus::AlreadyMounted);
            }
            debug!(path = %scratch.display(), found = fs_type, "scratch mounted with another filesystem");
        }

        match self.mount(scratch).await {
            Ok(()) => {
                info!(path = %scratch.display(), fs = %self.filesystem, "mounted scratch filesystem");
                Ok(ScratchStatus::Mounted)
            }
            Err(reason) => match self.policy {
                MountPolicy::Strict => Err(Error::environment(scratch, reason)),
                MountPolicy::Lenient => {
                    warn!(
                        path = %scratch.display(),
                        fs = %self.filesystem,
                        %reason,
                        "could not mount scratch filesystem, using plain directory"
                    );
                    Ok(ScratchStatus::Unmounted)
                }
            },
        }
    }

    /// The mount invocation, without running it.
    pub fn mount_args(&self, scratch: &Path) -> Vec<String> {
        let mut args: Vec<String> = self.mount_command.iter().skip(1).cloned().collect();
        args.push("-t".to_string());
        args.push(self.filesystem.to_string());
        if let (ScratchFs::Tmpfs, Some(size)) = (self.filesystem, &self.size) {
            args.push("-o".to_string());
            args.push(format!("size={}", size));
        }
        args.push(self.filesystem.to_string());
        args.push(scratch.display().to_string());
        args
    }

    async fn mount(&self, scratch: &Path) -> std::result::Result<(), String> {
        let program = self
            .mount_command
            .first()
            .ok_or_else(|| "mount command is empty".to_string())?;
        let output = Command::new(program)
            .args(self.mount_args(scratch))
            .output()
            .await
            .map_err(|e| format!("failed to run `{}`: {}", program, e))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(format!(
                "`{}` exited with {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        }
    }
}

async fn probe_writable(scratch: &Path) -> Result<()> {
    let probe = scratch.join(PROBE_FILE);
    tokio::fs::write(&probe, b"probe")
        .await
        .map_err(|e| Error::environment(scratch, format!("not writable: {}", e)))?;
    tokio::fs::remove_file(&probe)
        .await
        .map_err(|e| Error::environment(scratch, format!("cannot remove probe file: {}", e)))
}
