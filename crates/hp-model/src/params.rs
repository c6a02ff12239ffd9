//! Logistic-regression hyperparameters and their validation.

use hp_types::{Configuration, HpResult, ModelError, ParamValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Regularization applied to the coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Penalty {
    L1,
    L2,
    ElasticNet,
    None,
}

impl Penalty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L1 => "l1",
            Self::L2 => "l2",
            Self::ElasticNet => "elasticnet",
            Self::None => "none",
        }
    }
}

impl fmt::Display for Penalty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Penalty {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "l1" => Ok(Self::L1),
            "l2" => Ok(Self::L2),
            "elasticnet" => Ok(Self::ElasticNet),
            "none" => Ok(Self::None),
            other => Err(ModelError::InvalidHyperparameter {
                name: "penalty".to_string(),
                message: format!("unknown penalty {other:?}"),
            }),
        }
    }
}

/// Solver name. All solvers share the same deterministic proximal-gradient
/// core; the name controls which penalties are accepted and whether the
/// intercept is regularized (`liblinear` regularizes it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Solver {
    Lbfgs,
    Liblinear,
    Saga,
}

impl Solver {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lbfgs => "lbfgs",
            Self::Liblinear => "liblinear",
            Self::Saga => "saga",
        }
    }

    pub fn supports(&self, penalty: Penalty) -> bool {
        match self {
            Self::Lbfgs => matches!(penalty, Penalty::L2 | Penalty::None),
            Self::Liblinear => matches!(penalty, Penalty::L1 | Penalty::L2),
            Self::Saga => true,
        }
    }

    pub fn penalizes_intercept(&self) -> bool {
        matches!(self, Self::Liblinear)
    }
}

impl fmt::Display for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Solver {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lbfgs" => Ok(Self::Lbfgs),
            "liblinear" => Ok(Self::Liblinear),
            "saga" => Ok(Self::Saga),
            other => Err(ModelError::InvalidHyperparameter {
                name: "solver".to_string(),
                message: format!("unknown solver {other:?}"),
            }),
        }
    }
}

/// Hyperparameters of [`LogisticRegression`](crate::LogisticRegression).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    pub penalty: Penalty,
    pub solver: Solver,
    /// Inverse regularization strength; must be positive.
    pub c: f64,
    /// Elastic-net mixing: 0 is pure L2, 1 is pure L1.
    pub l1_ratio: Option<f64>,
    pub max_iter: usize,
    pub tol: f64,
    pub fit_intercept: bool,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            penalty: Penalty::L2,
            solver: Solver::Lbfgs,
            c: 1.0,
            l1_ratio: None,
            max_iter: 100,
            tol: 1e-4,
            fit_intercept: true,
        }
    }
}

impl LogisticParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_penalty(mut self, penalty: Penalty) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_l1_ratio(mut self, l1_ratio: f64) -> Self {
        self.l1_ratio = Some(l1_ratio);
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    /// Build parameters from a sampled configuration. Parameters missing from
    /// the configuration keep their defaults; unknown names are rejected.
    pub fn from_configuration(config: &Configuration) -> HpResult<Self> {
        let mut params = Self::default();

        for (name, value) in config.iter() {
            match name {
                "penalty" => params.penalty = text(name, value)?.parse()?,
                "solver" => params.solver = text(name, value)?.parse()?,
                "C" => params.c = number(name, value)?,
                "l1_ratio" => params.l1_ratio = Some(number(name, value)?),
                "tol" => params.tol = number(name, value)?,
                "max_iter" => {
                    let n = number(name, value)?;
                    if n < 1.0 || n.fract() != 0.0 {
                        return Err(invalid(name, format!("expected a positive integer, got {n}")));
                    }
                    params.max_iter = n as usize;
                }
                other => {
                    return Err(invalid(other, "unknown hyperparameter".to_string()));
                }
            }
        }

        params.validate()?;
        Ok(params)
    }

    /// Reject parameter combinations the solver cannot fit.
    pub fn validate(&self) -> HpResult<()> {
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(invalid("C", format!("must be a positive finite number, got {}", self.c)));
        }
        if !self.solver.supports(self.penalty) {
            return Err(ModelError::IncompatibleSolver {
                solver: self.solver.to_string(),
                penalty: self.penalty.to_string(),
            }
            .into());
        }
        if self.penalty == Penalty::ElasticNet {
            match self.l1_ratio {
                Some(r) if (0.0..=1.0).contains(&r) => {}
                Some(r) => return Err(invalid("l1_ratio", format!("must lie in [0, 1], got {r}"))),
                None => {
                    return Err(invalid(
                        "l1_ratio",
                        "required for the elasticnet penalty".to_string(),
                    ))
                }
            }
        }
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(invalid("tol", format!("must be positive, got {}", self.tol)));
        }
        if self.max_iter == 0 {
            return Err(invalid("max_iter", "must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Share of the penalty applied as L1; the rest is L2.
    pub fn l1_share(&self) -> f64 {
        match self.penalty {
            Penalty::L1 => 1.0,
            Penalty::L2 | Penalty::None => 0.0,
            Penalty::ElasticNet => self.l1_ratio.unwrap_or(0.0),
        }
    }
}

fn invalid(name: &str, message: String) -> hp_types::HpError {
    ModelError::InvalidHyperparameter {
        name: name.to_string(),
        message,
    }
    .into()
}

fn text<'a>(name: &str, value: &'a ParamValue) -> HpResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| invalid(name, format!("expected a string, got {value}")))
}

fn number(name: &str, value: &ParamValue) -> HpResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| invalid(name, format!("expected a number, got {value}")))
}
