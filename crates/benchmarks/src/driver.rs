//! The run driver.
//!
//! Executes the workload `job_count` times on one backend. `job_count` is
//! the number of timed repetitions; how many run at once is a separate
//! setting (`workers`, 1 by default, meaning strictly serial). Each
//! repetition gets its own root `<scratch>/run-<index>/` so concurrent runs
//! never touch the same files.
//!
//! A failing or hung repetition aborts the whole set: the remaining
//! invocations are dropped (killing their processes) and no partial result
//! is returned.

use crate::backend::Backend;
use crate::result::{BenchmarkRun, ResultSet};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use vfs_bench_core::config::RunConfig;
use vfs_bench_core::workload::{RESULTS_SUBDIR, SCRATCH_SUBDIR};
use vfs_bench_core::{BackendId, Error, Result, Workload};

/// Driver settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSettings {
    /// Repetitions in flight at once.
    pub workers: usize,
    /// Deadline for a single invocation.
    pub deadline: Duration,
    /// Keep each run's root after it succeeds.
    pub keep_scratch: bool,
}

impl DriverSettings {
    /// Settings from the `[run]` configuration section.
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            workers: config.workers,
            deadline: config.timeout(),
            keep_scratch: config.keep_scratch,
        }
    }
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self::from_config(&RunConfig::default())
    }
}

/// Drives repeated timed executions of one workload on one backend.
pub struct RunDriver {
    backend: Arc<dyn Backend>,
    workload: Workload,
    scratch_root: PathBuf,
    settings: DriverSettings,
}

impl RunDriver {
    /// Create a driver. `scratch_root` must already be prepared.
    pub fn new(
        backend: Arc<dyn Backend>,
        workload: Workload,
        scratch_root: impl Into<PathBuf>,
        settings: DriverSettings,
    ) -> Result<Self> {
        if settings.workers == 0 {
            return Err(Error::invalid_input("workers must be a positive integer"));
        }
        Ok(Self {
            backend,
            workload,
            scratch_root: scratch_root.into(),
            settings,
        })
    }

    /// Backend this driver runs on.
    pub fn backend_id(&self) -> BackendId {
        self.backend.id()
    }

    /// Root directory used by repetition `run_index`.
    pub fn run_root(&self, run_index: usize) -> PathBuf {
        self.scratch_root.join(format!("run-{}", run_index))
    }

    /// Execute `job_count` timed repetitions.
    pub async fn run(&self, job_count: usize) -> Result<ResultSet> {
        if job_count == 0 {
            return Err(Error::invalid_input("job count must be a positive integer"));
        }

        let backend = self.backend.id();
        info!(
            %backend,
            job_count,
            workers = self.settings.workers,
            workload = %self.workload.wasm.display(),
            "starting benchmark runs"
        );

        let outcome: Result<Vec<BenchmarkRun>> = stream::iter(0..job_count)
            .map(|run_index| self.run_one(backend, run_index))
            .buffer_unordered(self.settings.workers)
            .try_collect()
            .await;
        let mut runs = match outcome {
            Ok(runs) => runs,
            Err(err) => {
                self.discard_abandoned(job_count, failed_run(&err)).await;
                return Err(err);
            }
        };
        runs.sort_by_key(BenchmarkRun::run_index);

        ResultSet::new(backend, self.workload.wasm.display().to_string(), runs)
    }

    async fn run_one(&self, backend: BackendId, run_index: usize) -> Result<BenchmarkRun> {
        let root = self.run_root(run_index);
        create_run_root(&root).await?;
        debug!(%backend, run_index, root = %root.display(), "invoking workload");

        let invocation = self.backend.invoke(&self.workload, &root, run_index);
        let elapsed = match tokio::time::timeout(self.settings.deadline, invocation).await {
            Ok(Ok(elapsed)) => elapsed,
            Ok(Err(source)) => {
                error!(%backend, run_index, root = %root.display(), error = %source, "run failed");
                return Err(Error::Invocation {
                    backend,
                    run_index,
                    source,
                });
            }
            Err(_) => {
                error!(%backend, run_index, root = %root.display(), "run exceeded deadline");
                return Err(Error::Timeout {
                    backend,
                    run_index,
                    deadline: self.settings.deadline,
                });
            }
        };

        info!(%backend, run_index, elapsed_secs = elapsed.as_secs_f64(), "run complete");

        if !self.settings.keep_scratch {
            tokio::fs::remove_dir_all(&root)
                .await
                .map_err(|e| Error::io("remove", &root, e))?;
        }
        Ok(BenchmarkRun::new(backend, run_index, elapsed))
    }

    /// Clean up roots of repetitions cancelled by another run's failure.
    /// The failed run's own root is left alone.
    async fn discard_abandoned(&self, job_count: usize, failed: Option<usize>) {
        for run_index in (0..job_count).filter(|i| Some(*i) != failed) {
            let root = self.run_root(run_index);
            if self.settings.keep_scratch {
                if tokio::fs::metadata(&root).await.is_ok() {
                    warn!(run_index, root = %root.display(), "keeping root of cancelled run");
                }
                continue;
            }
            match tokio::fs::remove_dir_all(&root).await {
                Ok(()) => debug!(run_index, root = %root.display(), "removed root of cancelled run"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(run_index, root = %root.display(), error = %e, "could not remove root of cancelled run")
                }
            }
        }
    }
}

fn failed_run(err: &Error) -> Option<usize> {
    match err {
        Error::Invocation { run_index, .. } | Error::Timeout { run_index, .. } => Some(*run_index),
        _ => None,
    }
}

/// Create a fresh run root with its `scratch/` and `results/` directories.
async fn create_run_root(root: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(root).await {
        Ok(()) => debug!(root = %root.display(), "removed stale run root"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::io("remove", root, e)),
    }
    for dir in [SCRATCH_SUBDIR, RESULTS_SUBDIR] {
        let path = root.join(dir);
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| Error::io("create directory", &path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use vfs_bench_core::InvokeFailure;

    fn workload() -> Workload {
        Workload {
            name: "veracruz-vfs-bench".to_string(),
            wasm: PathBuf::from("/programs/veracruz-vfs-bench.wasm"),
            args: Vec::new(),
            append_run_index: true,
        }
    }

    fn settings(workers: usize) -> DriverSettings {
        DriverSettings {
            workers,
            deadline: Duration::from_secs(5),
            keep_scratch: false,
        }
    }

    fn mock(id: BackendId) -> MockBackend {
        let mut backend = MockBackend::new();
        backend.expect_id().return_const(id);
        backend
    }

    #[tokio::test]
    async fn test_run_indices_are_contiguous() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = mock(BackendId::Wasmtime);
        backend
            .expect_invoke()
            .times(5)
            .returning(|_, _, i| Ok(Duration::from_millis(10 + i as u64)));

        let driver =
            RunDriver::new(Arc::new(backend), workload(), dir.path(), settings(1)).unwrap();
        let set = driver.run(5).await.unwrap();

        assert_eq!(set.backend_id(), BackendId::Wasmtime);
        let indices: Vec<usize> = set.runs().iter().map(|r| r.run_index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(set.durations()[4], 0.014);
    }

    #[tokio::test]
    async fn test_parallel_runs_keep_submission_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = mock(BackendId::VcFee);
        backend
            .expect_invoke()
            .times(6)
            .returning(|_, _, i| Ok(Duration::from_millis(100 * i as u64)));

        let driver =
            RunDriver::new(Arc::new(backend), workload(), dir.path(), settings(3)).unwrap();
        let set = driver.run(6).await.unwrap();

        for (position, run) in set.runs().iter().enumerate() {
            assert_eq!(run.run_index(), position);
            assert_eq!(run.duration_secs(), Duration::from_millis(100 * position as u64).as_secs_f64());
        }
    }

    #[tokio::test]
    async fn test_each_run_gets_its_own_root() {
        let dir = tempfile::tempdir().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let mut backend = mock(BackendId::Wasmtime);
        backend.expect_invoke().returning(move |_, root, _| {
            assert!(root.join("scratch").is_dir());
            assert!(root.join("results").is_dir());
            recorder.lock().unwrap().push(root.to_path_buf());
            Ok(Duration::from_millis(1))
        });

        let driver =
            RunDriver::new(Arc::new(backend), workload(), dir.path(), settings(4)).unwrap();
        driver.run(8).await.unwrap();

        let roots = seen.lock().unwrap();
        let unique: HashSet<_> = roots.iter().collect();
        assert_eq!(unique.len(), 8);
        // successful runs are cleaned up
        assert!(roots.iter().all(|r| !r.exists()));
    }

    #[tokio::test]
    async fn test_failure_aborts_the_set() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = mock(BackendId::VcFee);
        backend.expect_invoke().returning(|_, _, i| {
            if i == 2 {
                Err(InvokeFailure::Backend("trap: unreachable".to_string()))
            } else {
                Ok(Duration::from_millis(1))
            }
        });

        let driver =
            RunDriver::new(Arc::new(backend), workload(), dir.path(), settings(1)).unwrap();
        let err = driver.run(5).await.unwrap_err();

        match err {
            Error::Invocation {
                backend,
                run_index,
                ..
            } => {
                assert_eq!(backend, BackendId::VcFee);
                assert_eq!(run_index, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        // the failed run's root is kept for diagnosis
        assert!(driver.run_root(2).exists());
        // later runs never started
        assert!(!driver.run_root(3).exists());
    }

    #[tokio::test]
    async fn test_keep_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = mock(BackendId::Wasmtime);
        backend
            .expect_invoke()
            .returning(|_, _, _| Ok(Duration::from_millis(1)));
        let mut keep = settings(1);
        keep.keep_scratch = true;

        let driver = RunDriver::new(Arc::new(backend), workload(), dir.path(), keep).unwrap();
        driver.run(2).await.unwrap();

        assert!(driver.run_root(0).join("scratch").is_dir());
        assert!(driver.run_root(1).join("scratch").is_dir());
    }

    #[tokio::test]
    async fn test_zero_jobs_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let backend = mock(BackendId::Wasmtime);
        let driver =
            RunDriver::new(Arc::new(backend), workload(), dir.path(), settings(1)).unwrap();
        assert!(matches!(driver.run(0).await, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let backend = mock(BackendId::Wasmtime);
        assert!(RunDriver::new(Arc::new(backend), workload(), "/tmp", settings(0)).is_err());
    }

    /// Run 0 fails quickly while every other run is still in flight.
    struct FailFirst;

    #[async_trait::async_trait]
    impl Backend for FailFirst {
        fn id(&self) -> BackendId {
            BackendId::Wasmtime
        }

        async fn invoke(
            &self,
            _workload: &Workload,
            _fs_root: &Path,
            run_index: usize,
        ) -> std::result::Result<Duration, InvokeFailure> {
            if run_index == 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
                return Err(InvokeFailure::Backend("trap".to_string()));
            }
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Duration::from_secs(30))
        }
    }

    #[tokio::test]
    async fn test_cancelled_runs_are_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let driver = RunDriver::new(Arc::new(FailFirst), workload(), dir.path(), settings(3)).unwrap();

        let err = driver.run(3).await.unwrap_err();

        assert!(matches!(err, Error::Invocation { run_index: 0, .. }));
        assert!(driver.run_root(0).exists());
        assert!(!driver.run_root(1).exists());
        assert!(!driver.run_root(2).exists());
    }

    #[tokio::test]
    async fn test_cancelled_runs_are_kept_with_keep_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let mut keep = settings(3);
        keep.keep_scratch = true;
        let driver = RunDriver::new(Arc::new(FailFirst), workload(), dir.path(), keep).unwrap();

        driver.run(3).await.unwrap_err();

        for run_index in 0..3 {
            assert!(driver.run_root(run_index).join("scratch").is_dir());
        }
    }

    #[cfg(unix)]
    struct Sleeper;

    #[cfg(unix)]
    #[async_trait::async_trait]
    impl Backend for Sleeper {
        fn id(&self) -> BackendId {
            BackendId::Wasmtime
        }

        async fn invoke(
            &self,
            _workload: &Workload,
            fs_root: &Path,
            _run_index: usize,
        ) -> std::result::Result<Duration, InvokeFailure> {
            let mut cmd = tokio::process::Command::new("sleep");
            cmd.arg("30").current_dir(fs_root);
            crate::backend::execute(cmd).await
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_run_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let mut short = settings(1);
        short.deadline = Duration::from_millis(200);
        let driver = RunDriver::new(Arc::new(Sleeper), workload(), dir.path(), short).unwrap();

        let started = std::time::Instant::now();
        let err = driver.run(3).await.unwrap_err();

        assert!(matches!(err, Error::Timeout { run_index: 0, .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
