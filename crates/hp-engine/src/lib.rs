//! # hp-engine
//!
//! Runs the hyperparameter search: samples each family's configurations,
//! scores them on the benchmark datasets, keeps the best per family and
//! writes it to disk.

pub mod config;
pub mod evaluation;
pub mod orchestrator;
pub mod persist;

pub use config::{EvaluationConfig, RetryPolicy, SearchConfig};
pub use evaluation::{DatasetEvaluator, Evaluation, TrialEvaluator};
pub use orchestrator::{FamilyOutcome, SearchOrchestrator};
pub use persist::{best_file_name, load_best, save_best, write_report, REPORT_FILE};
