//! # hp-optimizer
//!
//! Search space definitions, the logistic-regression hyperparameter
//! families, random sampling, trial tracking and the per-family result
//! registry.

mod families;
mod registry;
mod search;
mod trial;

pub use families::{
    find_family, logistic_regression_families, Family, C_POOL_SIZE, L1_RATIO_POOL_SIZE,
};
pub use registry::ResultRegistry;
pub use search::{ParameterDef, ParameterKind, RandomSearch, SearchSpace, SearchStrategy};
pub use trial::{DatasetScore, FamilyState, FamilyStatus, Trial, TrialResult, TrialStatus};
