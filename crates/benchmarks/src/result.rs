//! Benchmark result types.
//!
//! A [`ResultSet`] is the in-memory form of one backend's timing samples;
//! a [`ResultFile`] is its persisted JSON form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vfs_bench_core::{BackendId, Error, Result};

/// Unit of every duration stored in a result file.
pub const DURATION_UNIT: &str = "s";

/// One timed execution of the workload.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkRun {
    backend_id: BackendId,
    run_index: usize,
    duration_secs: f64,
}

impl BenchmarkRun {
    /// Create a new run from a measured duration.
    pub fn new(backend_id: BackendId, run_index: usize, duration: Duration) -> Self {
        Self::from_secs(backend_id, run_index, duration.as_secs_f64())
    }

    fn from_secs(backend_id: BackendId, run_index: usize, duration_secs: f64) -> Self {
        Self {
            backend_id,
            run_index,
            duration_secs,
        }
    }

    /// Backend the run executed on.
    pub fn backend_id(&self) -> BackendId {
        self.backend_id
    }

    /// Ordinal within its batch, in submission order.
    pub fn run_index(&self) -> usize {
        self.run_index
    }

    /// Elapsed time in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }
}

/// Ordered runs of one workload on one backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    backend_id: BackendId,
    workload: String,
    runs: Vec<BenchmarkRun>,
}

impl ResultSet {
    /// Create a result set, checking that it is non-empty, that every run
    /// belongs to `backend_id` and that runs are ordered `0..n`.
    pub fn new(
        backend_id: BackendId,
        workload: impl Into<String>,
        runs: Vec<BenchmarkRun>,
    ) -> Result<Self> {
        if runs.is_empty() {
            return Err(Error::invalid_input("a result set needs at least one run"));
        }
        for (position, run) in runs.iter().enumerate() {
            if run.backend_id != backend_id {
                return Err(Error::invalid_input(format!(
                    "run {} was executed on {} but the result set is for {}",
                    run.run_index, run.backend_id, backend_id
                )));
            }
            if run.run_index != position {
                return Err(Error::invalid_input(format!(
                    "run at position {} has index {}",
                    position, run.run_index
                )));
            }
        }
        Ok(Self {
            backend_id,
            workload: workload.into(),
            runs,
        })
    }

    /// Backend shared by every run.
    pub fn backend_id(&self) -> BackendId {
        self.backend_id
    }

    /// Workload the runs executed.
    pub fn workload(&self) -> &str {
        &self.workload
    }

    /// Runs in execution order.
    pub fn runs(&self) -> &[BenchmarkRun] {
        &self.runs
    }

    /// Number of runs.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Always false for a constructed set.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Durations in seconds, in execution order.
    pub fn durations(&self) -> Vec<f64> {
        self.runs.iter().map(|r| r.duration_secs).collect()
    }
}

/// Persisted form of a [`ResultSet`].
///
/// Unknown fields are ignored when reading so newer writers stay readable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultFile {
    /// Backend that produced the samples.
    pub backend_id: BackendId,
    /// Unit of `durations`; only seconds are supported.
    #[serde(default = "default_unit")]
    pub unit: String,
    /// Workload binary the samples came from.
    #[serde(default)]
    pub workload: String,
    /// When the file was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
    /// Samples in execution order.
    pub durations: Vec<f64>,
}

fn default_unit() -> String {
    DURATION_UNIT.to_string()
}

impl From<&ResultSet> for ResultFile {
    fn from(set: &ResultSet) -> Self {
        Self {
            backend_id: set.backend_id,
            unit: default_unit(),
            workload: set.workload.clone(),
            recorded_at: Some(Utc::now()),
            durations: set.durations(),
        }
    }
}

impl ResultFile {
    /// Rebuild the result set, describing the first schema violation found.
    pub fn into_result_set(self) -> std::result::Result<ResultSet, String> {
        if self.unit != DURATION_UNIT {
            return Err(format!(
                "unsupported duration unit `{}` (expected `{}`)",
                self.unit, DURATION_UNIT
            ));
        }
        if self.durations.is_empty() {
            return Err("`durations` must not be empty".to_string());
        }
        if let Some(bad) = self
            .durations
            .iter()
            .position(|d| !d.is_finite() || *d < 0.0)
        {
            return Err(format!(
                "duration {} is not a non-negative number of seconds",
                bad
            ));
        }

        let backend_id = self.backend_id;
        let runs = self
            .durations
            .into_iter()
            .enumerate()
            .map(|(index, secs)| BenchmarkRun::from_secs(backend_id, index, secs))
            .collect();
        ResultSet::new(backend_id, self.workload, runs).map_err(|e| e.to_string())
    }
}
