//! Hyperparameter families: named search spaces sharing one regularization
//! type.

use hp_types::{Configuration, HpResult, SearchError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::search::SearchSpace;

/// Size of the pre-generated pool for `C`.
pub const C_POOL_SIZE: usize = 500;
/// Size of the pre-generated pool for `l1_ratio`.
pub const L1_RATIO_POOL_SIZE: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Family {
    pub name: String,
    pub space: SearchSpace,
}

impl Family {
    pub fn new(name: impl Into<String>, space: SearchSpace) -> Self {
        Self {
            name: name.into(),
            space,
        }
    }

    /// Whether `config` carries every fixed value of this family.
    pub fn satisfies(&self, config: &Configuration) -> bool {
        self.space
            .constraints()
            .all(|(name, value)| config.get(name) == Some(value))
    }

    /// A family must have at least one candidate for every parameter.
    pub fn validate(&self) -> HpResult<()> {
        if let Some(parameter) = self.space.first_empty() {
            return Err(SearchError::EmptyCandidates {
                family: self.name.clone(),
                parameter: parameter.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// The four logistic-regression families, in search order: `l1`, `l2`,
/// `elasticnet`, `none`. Candidate pools are drawn from `rng` once, here.
pub fn logistic_regression_families<R: Rng + ?Sized>(rng: &mut R) -> Vec<Family> {
    let families = vec![
        Family::new(
            "l1",
            SearchSpace::new()
                .add_fixed("penalty", "l1")
                .add_fixed("solver", "liblinear")
                .add_uniform_pool("C", 0.0, 500.0, C_POOL_SIZE, rng),
        ),
        Family::new(
            "l2",
            SearchSpace::new()
                .add_fixed("penalty", "l2")
                .add_uniform_pool("C", 0.0, 500.0, C_POOL_SIZE, rng),
        ),
        Family::new(
            "elasticnet",
            SearchSpace::new()
                .add_fixed("penalty", "elasticnet")
                .add_fixed("solver", "saga")
                .add_uniform_pool("C", 0.0, 500.0, C_POOL_SIZE, rng)
                .add_uniform_pool("l1_ratio", 0.0, 1.0, L1_RATIO_POOL_SIZE, rng),
        ),
        Family::new(
            "none",
            SearchSpace::new()
                .add_fixed("penalty", "none")
                .add_uniform_pool("C", 0.0, 250.0, C_POOL_SIZE, rng),
        ),
    ];
    for family in &families {
        debug!(
            "Family {}: {} parameters, {} fixed",
            family.name,
            family.space.parameters.len(),
            family.space.constraints().count()
        );
    }
    families
}

/// Look a family up by name.
pub fn find_family<'a>(families: &'a [Family], name: &str) -> HpResult<&'a Family> {
    families
        .iter()
        .find(|f| f.name == name)
        .ok_or_else(|| {
            SearchError::UnknownFamily {
                name: name.to_string(),
            }
            .into()
        })
}
