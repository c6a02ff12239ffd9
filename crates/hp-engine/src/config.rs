//! Run configuration.

use std::path::PathBuf;

use hp_types::{config_error, DatasetRef, HpResult};
use serde::{Deserialize, Serialize};

/// Settings shared by every trial evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Seed of the stratified train/test split.
    pub split_seed: u64,
    /// Share of rows held out for scoring.
    pub test_fraction: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            split_seed: 42,
            test_fraction: 0.2,
        }
    }
}

/// How often a trial slot may be re-drawn after retryable failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts allowed per trial slot; `None` retries forever.
    pub max_attempts: Option<usize>,
}

impl RetryPolicy {
    pub fn unbounded() -> Self {
        Self { max_attempts: None }
    }

    pub fn with_max_attempts(max_attempts: usize) -> Self {
        Self {
            max_attempts: Some(max_attempts),
        }
    }

    /// Whether `attempts` failed attempts use up the budget.
    pub fn exhausted(&self, attempts: usize) -> bool {
        self.max_attempts.map_or(false, |max| attempts >= max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_max_attempts(100)
    }
}

/// Search run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub trials_per_family: usize,
    pub datasets: Vec<DatasetRef>,
    /// Directory receiving the best configurations and the run report.
    pub output_dir: PathBuf,
    pub evaluation: EvaluationConfig,
    /// Seed for candidate pools and sampling; entropy when unset.
    pub sampling_seed: Option<u64>,
    pub retry: RetryPolicy,
    /// Log progress every this many trials.
    pub progress_interval: usize,
}

impl SearchConfig {
    /// The four OpenML benchmark datasets and the name of their label column.
    pub fn default_datasets() -> Vec<DatasetRef> {
        vec![
            DatasetRef::new(44, "class"),
            DatasetRef::new(1504, "Class"),
            DatasetRef::new(37, "class"),
            DatasetRef::new(1494, "Class"),
        ]
    }

    pub fn with_trials_per_family(mut self, trials: usize) -> Self {
        self.trials_per_family = trials;
        self
    }

    pub fn with_datasets(mut self, datasets: Vec<DatasetRef>) -> Self {
        self.datasets = datasets;
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_evaluation(mut self, evaluation: EvaluationConfig) -> Self {
        self.evaluation = evaluation;
        self
    }

    pub fn with_sampling_seed(mut self, seed: u64) -> Self {
        self.sampling_seed = Some(seed);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn validate(&self) -> HpResult<()> {
        if self.trials_per_family == 0 {
            return Err(config_error!("trials_per_family must be positive"));
        }
        if self.datasets.is_empty() {
            return Err(config_error!("at least one dataset is required"));
        }
        let fraction = self.evaluation.test_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(config_error!(
                "test_fraction must be in (0, 1), got {}",
                fraction
            ));
        }
        if self.retry.max_attempts == Some(0) {
            return Err(config_error!("retry.max_attempts must be positive"));
        }
        if self.progress_interval == 0 {
            return Err(config_error!("progress_interval must be positive"));
        }
        Ok(())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            trials_per_family: 500,
            datasets: Self::default_datasets(),
            output_dir: PathBuf::from("best_default_models"),
            evaluation: EvaluationConfig::default(),
            sampling_seed: None,
            retry: RetryPolicy::default(),
            progress_interval: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_benchmark_setup() {
        let config = SearchConfig::default();
        assert_eq!(config.trials_per_family, 500);
        assert_eq!(config.output_dir, PathBuf::from("best_default_models"));
        assert_eq!(config.evaluation.split_seed, 42);
        assert_eq!(config.evaluation.test_fraction, 0.2);
        assert_eq!(config.retry.max_attempts, Some(100));

        let ids: Vec<u32> = config.datasets.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![44, 1504, 37, 1494]);
        assert_eq!(config.datasets[1].label, "Class");
        config.validate().unwrap();
    }

    #[test]
    fn validation_rejects_bad_values() {
        assert!(SearchConfig::default()
            .with_trials_per_family(0)
            .validate()
            .is_err());
        assert!(SearchConfig::default()
            .with_datasets(Vec::new())
            .validate()
            .is_err());
        assert!(SearchConfig::default()
            .with_evaluation(EvaluationConfig {
                split_seed: 42,
                test_fraction: 1.0,
            })
            .validate()
            .is_err());
        assert!(SearchConfig::default()
            .with_retry(RetryPolicy::with_max_attempts(0))
            .validate()
            .is_err());
    }

    #[test]
    fn retry_budget() {
        let policy = RetryPolicy::with_max_attempts(3);
        assert!(!policy.exhausted(2));
        assert!(policy.exhausted(3));
        assert!(!RetryPolicy::unbounded().exhausted(usize::MAX));
    }
}
