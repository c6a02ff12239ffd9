//! # hp-model
//!
//! The classifier and metric that every trial runs: a deterministic binary
//! logistic regression supporting `l1`, `l2`, `elasticnet` and unpenalized
//! fits, and ROC AUC scoring.

mod logistic;
mod metrics;
mod params;

pub use logistic::{FitSummary, LogisticRegression};
pub use metrics::{accuracy_score, roc_auc_score};
pub use params::{LogisticParams, Penalty, Solver};
