//! Search space definitions and the random sampling strategy.

use hp_types::{Configuration, ParamValue};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// A single parameter dimension in the search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    /// Parameter name as the model expects it (e.g. "C").
    pub name: String,
    /// The kind of candidate set.
    pub kind: ParameterKind,
}

/// Describes how a parameter is sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Exactly one allowed value.
    Fixed(ParamValue),
    /// Uniform choice over a candidate pool.
    Choice(Vec<ParamValue>),
}

impl ParameterKind {
    pub fn candidates(&self) -> &[ParamValue] {
        match self {
            Self::Fixed(value) => std::slice::from_ref(value),
            Self::Choice(values) => values,
        }
    }
}

/// The full search space: an ordered list of parameter definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub parameters: Vec<ParameterDef>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_fixed(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::Fixed(value.into()),
        });
        self
    }

    pub fn add_choice(mut self, name: impl Into<String>, values: Vec<ParamValue>) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::Choice(values),
        });
        self
    }

    /// Pre-generate `size` draws from U(low, high) and use them as the
    /// candidate pool.
    pub fn add_uniform_pool<R: Rng + ?Sized>(
        self,
        name: impl Into<String>,
        low: f64,
        high: f64,
        size: usize,
        rng: &mut R,
    ) -> Self {
        let values = (0..size)
            .map(|_| ParamValue::Float(rng.gen_range(low..high)))
            .collect();
        self.add_choice(name, values)
    }

    pub fn get(&self, name: &str) -> Option<&ParameterDef> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Parameters with a single allowed value, which every sample must carry.
    pub fn constraints(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.parameters.iter().filter_map(|p| match &p.kind {
            ParameterKind::Fixed(value) => Some((p.name.as_str(), value)),
            ParameterKind::Choice(values) if values.len() == 1 => {
                Some((p.name.as_str(), &values[0]))
            }
            ParameterKind::Choice(_) => None,
        })
    }

    /// Name of the first parameter without any candidate value.
    pub fn first_empty(&self) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.kind.candidates().is_empty())
            .map(|p| p.name.as_str())
    }

    /// Whether `config` assigns an allowed value to every parameter and
    /// nothing else.
    pub fn contains(&self, config: &Configuration) -> bool {
        config.len() == self.parameters.len()
            && self.parameters.iter().all(|p| {
                config
                    .get(&p.name)
                    .map(|v| p.kind.candidates().contains(v))
                    .unwrap_or(false)
            })
    }
}

// ---------------------------------------------------------------------------
// Search strategies
// ---------------------------------------------------------------------------

/// Common trait for search strategies.
pub trait SearchStrategy: Send + Sync {
    /// Generate the next batch of configurations to evaluate.
    fn suggest(&mut self, count: usize) -> Vec<Configuration>;

    /// Report completed trial results so adaptive strategies can learn.
    fn report(&mut self, _config: &Configuration, _objective: f64) {}

    /// Human-readable strategy name.
    fn name(&self) -> &str;
}

/// Independent random sampling across the search space.
#[derive(Debug, Clone)]
pub struct RandomSearch {
    space: SearchSpace,
    rng: StdRng,
}

impl RandomSearch {
    pub fn new(space: SearchSpace) -> Self {
        Self {
            space,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(space: SearchSpace, seed: u64) -> Self {
        Self {
            space,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    /// Draw one value per parameter. Parameters with an empty candidate set
    /// are skipped.
    pub fn sample_one(&mut self) -> Configuration {
        let mut config = Configuration::new();
        for param in &self.space.parameters {
            if let Some(value) = param.kind.candidates().choose(&mut self.rng) {
                config.insert(param.name.clone(), value.clone());
            }
        }
        config
    }
}

impl SearchStrategy for RandomSearch {
    fn suggest(&mut self, count: usize) -> Vec<Configuration> {
        (0..count).map(|_| self.sample_one()).collect()
    }

    fn name(&self) -> &str {
        "random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_space(rng: &mut StdRng) -> SearchSpace {
        SearchSpace::new()
            .add_fixed("penalty", "elasticnet")
            .add_fixed("solver", "saga")
            .add_uniform_pool("C", 0.0, 500.0, 500, rng)
            .add_uniform_pool("l1_ratio", 0.0, 1.0, 200, rng)
    }

    #[test]
    fn uniform_pool_respects_bounds_and_size() {
        let mut rng = StdRng::seed_from_u64(1);
        let space = sample_space(&mut rng);
        let c = space.get("C").unwrap();
        assert_eq!(c.kind.candidates().len(), 500);
        for value in c.kind.candidates() {
            let v = value.as_f64().unwrap();
            assert!((0.0..500.0).contains(&v), "C out of bounds: {v}");
        }
        assert_eq!(space.get("l1_ratio").unwrap().kind.candidates().len(), 200);
    }

    #[test]
    fn random_search_draws_from_pools() {
        let mut rng = StdRng::seed_from_u64(2);
        let space = sample_space(&mut rng);
        let mut rs = RandomSearch::with_seed(space.clone(), 3);
        let suggestions = rs.suggest(50);
        assert_eq!(suggestions.len(), 50);

        for config in &suggestions {
            assert!(space.contains(config));
            assert_eq!(config.get_str("penalty"), Some("elasticnet"));
            assert_eq!(config.get_str("solver"), Some("saga"));
        }
    }

    #[test]
    fn single_candidate_always_sampled() {
        let space = SearchSpace::new().add_choice("C", vec![ParamValue::Float(7.5)]);
        let mut rs = RandomSearch::new(space);
        for config in rs.suggest(20) {
            assert_eq!(config.get_f64("C"), Some(7.5));
        }
    }

    #[test]
    fn seeded_search_is_reproducible() {
        let mut rng = StdRng::seed_from_u64(4);
        let space = sample_space(&mut rng);
        let a = RandomSearch::with_seed(space.clone(), 9).suggest(10);
        let b = RandomSearch::with_seed(space, 9).suggest(10);
        assert_eq!(a, b);
    }

    #[test]
    fn constraints_list_fixed_parameters() {
        let mut rng = StdRng::seed_from_u64(5);
        let space = sample_space(&mut rng);
        let fixed: Vec<&str> = space.constraints().map(|(name, _)| name).collect();
        assert_eq!(fixed, vec!["penalty", "solver"]);
    }

    #[test]
    fn contains_rejects_foreign_values() {
        let space = SearchSpace::new()
            .add_fixed("penalty", "l2")
            .add_choice("C", vec![ParamValue::Float(1.0), ParamValue::Float(2.0)]);

        let good = Configuration::new().with("penalty", "l2").with("C", 2.0);
        let bad_value = Configuration::new().with("penalty", "l2").with("C", 3.0);
        let extra = good.clone().with("solver", "saga");
        assert!(space.contains(&good));
        assert!(!space.contains(&bad_value));
        assert!(!space.contains(&extra));
    }

    #[test]
    fn empty_pool_is_reported() {
        let space = SearchSpace::new()
            .add_fixed("penalty", "l1")
            .add_choice("C", Vec::new());
        assert_eq!(space.first_empty(), Some("C"));
    }
}
