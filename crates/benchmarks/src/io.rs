//! I/O operations for benchmark results.
//!
//! Writes are atomic: content goes to a temporary file next to the
//! destination and is renamed over it, so a reader sees either the old
//! file or the complete new one.

use crate::result::{ResultFile, ResultSet};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;
use vfs_bench_core::{Error, Result};

/// Ensure every given directory exists.
pub fn ensure_dirs<'a>(dirs: impl IntoIterator<Item = &'a Path>) -> Result<()> {
    for dir in dirs {
        fs::create_dir_all(dir).map_err(|e| Error::io("create directory", dir, e))?;
    }
    Ok(())
}

/// Atomically replace `path` with `contents`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    ensure_dirs([parent])?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| Error::io("create temporary file in", parent, e))?;
    tmp.write_all(contents)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| Error::io("write", tmp.path().to_path_buf(), e))?;
    tmp.persist(path)
        .map_err(|e| Error::io("replace", path, e.error))?;

    debug!(path = %path.display(), bytes = contents.len(), "wrote file");
    Ok(())
}

/// Write a result set to a JSON result file, replacing any existing file.
pub fn write_result_set(set: &ResultSet, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_vec_pretty(&ResultFile::from(set))
        .map_err(|e| Error::io("serialize", path, e.into()))?;
    write_atomic(path, &json)
}

/// Read a result set from a JSON result file.
pub fn read_result_set(path: impl AsRef<Path>) -> Result<ResultSet> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| Error::io("read", path, e))?;
    let file: ResultFile =
        serde_json::from_str(&content).map_err(|e| Error::MalformedResult {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    file.into_result_set()
        .map_err(|reason| Error::MalformedResult {
            path: path.to_path_buf(),
            reason,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::BenchmarkRun;
    use std::time::Duration;
    use vfs_bench_core::BackendId;

    fn sample_set() -> ResultSet {
        let runs = [1.25, 0.3, 2.0e-6, 17.000001]
            .iter()
            .enumerate()
            .map(|(i, s)| BenchmarkRun::new(BackendId::VcFee, i, Duration::from_secs_f64(*s)))
            .collect();
        ResultSet::new(BackendId::VcFee, "/tmp/veracruz-vfs-bench.wasm", runs).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/results.json");
        let set = sample_set();

        write_result_set(&set, &path).unwrap();
        let loaded = read_result_set(&path).unwrap();

        assert_eq!(loaded, set);
    }

    #[test]
    fn test_write_overwrites_in_full() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        fs::write(&path, "x".repeat(10_000)).unwrap();

        write_result_set(&sample_set(), &path).unwrap();

        let loaded = read_result_set(&path).unwrap();
        assert_eq!(loaded.len(), 4);
        // no temporary files left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_read_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = read_result_set(&path).unwrap_err();
        assert!(matches!(err, Error::Io { action: "read", .. }));
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn test_read_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"backend": "wasmtime", "times": [1]}"#).unwrap();
        let err = read_result_set(&path).unwrap_err();
        assert!(matches!(err, Error::MalformedResult { .. }));
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn test_read_unknown_backend_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wasmer.json");
        fs::write(&path, r#"{"backend_id": "wasmer", "durations": [1]}"#).unwrap();
        assert!(matches!(
            read_result_set(&path),
            Err(Error::MalformedResult { .. })
        ));
    }
}
