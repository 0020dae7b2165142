//! Summary statistics over timing samples.
//!
//! Samples are treated as an unordered multiset: the summary of any
//! permutation of the same durations is identical.

/// Distribution of one series' durations, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Number of samples
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Median (mean of the two middle samples for even counts)
    pub median: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Minimum
    pub min: f64,
    /// Maximum
    pub max: f64,
}

impl Summary {
    /// Summarize a slice of samples. Returns `None` when it is empty.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let variance = sorted
            .iter()
            .map(|s| {
                let diff = s - mean;
                diff * diff
            })
            .sum::<f64>()
            / n as f64;
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };

        Some(Self {
            count: n,
            mean,
            median,
            std_dev: variance.sqrt(),
            min: sorted[0],
            max: sorted[n - 1],
        })
    }

    /// Relative change of this mean against a baseline mean, e.g. `0.25`
    /// for 25% slower. `None` when the baseline mean is zero.
    pub fn relative_to(&self, baseline: &Summary) -> Option<f64> {
        if baseline.mean == 0.0 {
            None
        } else {
            Some((self.mean - baseline.mean) / baseline.mean)
        }
    }
}
