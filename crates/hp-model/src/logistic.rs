//! Binary logistic regression.
//!
//! The model minimizes
//!
//! ```text
//! mean log-loss + 1/(C n) * (rho * |w|_1 + (1 - rho) / 2 * |w|_2^2)
//! ```
//!
//! with accelerated proximal gradient descent (FISTA) and a backtracking line
//! search. Features are standardized internally before fitting and the
//! coefficients are mapped back to the original feature scale afterwards, so
//! penalties act on standardized coefficients. Fitting is fully
//! deterministic.

use hp_types::{FeatureMatrix, HpResult, ModelError};
use serde::{Deserialize, Serialize};

use crate::params::{LogisticParams, Penalty};

const MAX_LIPSCHITZ: f64 = 1e12;

/// Outcome of a call to [`LogisticRegression::fit`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub n_iter: usize,
    pub converged: bool,
    pub objective: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    params: LogisticParams,
    coefficients: Option<Vec<f64>>,
    intercept: f64,
}

impl LogisticRegression {
    pub fn new(params: LogisticParams) -> Self {
        Self {
            params,
            coefficients: None,
            intercept: 0.0,
        }
    }

    pub fn params(&self) -> &LogisticParams {
        &self.params
    }

    /// Coefficients on the original feature scale.
    pub fn coefficients(&self) -> Option<&[f64]> {
        self.coefficients.as_deref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn fit(&mut self, x: &FeatureMatrix, y: &[u8]) -> HpResult<FitSummary> {
        self.params.validate()?;
        let (n_samples, n_features) = x.shape();

        if n_samples != y.len() {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{n_samples} labels"),
                actual: format!("{} labels", y.len()),
            }
            .into());
        }
        if n_samples == 0 || n_features == 0 {
            return Err(ModelError::InvalidInput {
                message: format!("cannot fit on a {n_samples}x{n_features} matrix"),
            }
            .into());
        }
        if y.iter().any(|&label| label > 1) {
            return Err(ModelError::InvalidInput {
                message: "labels must be 0 or 1".to_string(),
            }
            .into());
        }
        let positives = y.iter().filter(|&&label| label == 1).count();
        if positives == 0 || positives == n_samples {
            return Err(ModelError::InvalidInput {
                message: "training labels contain a single class".to_string(),
            }
            .into());
        }

        let scaler = Standardizer::fit(x)?;
        let z = scaler.transform(x);
        let problem = Problem::new(&z, y, &self.params);

        let summary = problem.solve(&self.params)?;
        let (weights, bias) = problem.unpack(&summary.theta);
        let (coefficients, intercept) = scaler.unscale(weights, bias);

        if !summary.converged {
            tracing::debug!(
                "Logistic regression ({}, {}, C={}) did not converge in {} iterations",
                self.params.penalty,
                self.params.solver,
                self.params.c,
                self.params.max_iter
            );
        }

        self.coefficients = Some(coefficients);
        self.intercept = intercept;

        Ok(FitSummary {
            n_iter: summary.n_iter,
            converged: summary.converged,
            objective: summary.objective,
        })
    }

    pub fn decision_function(&self, x: &FeatureMatrix) -> HpResult<Vec<f64>> {
        let coef = self.coefficients.as_ref().ok_or(ModelError::NotFitted)?;
        if x.n_cols() != coef.len() {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} features", coef.len()),
                actual: format!("{} features", x.n_cols()),
            }
            .into());
        }

        Ok((0..x.n_rows())
            .map(|i| self.intercept + dot(coef, x.row(i)))
            .collect())
    }

    /// Probability of class 1 for each row.
    pub fn predict_proba(&self, x: &FeatureMatrix) -> HpResult<Vec<f64>> {
        Ok(self
            .decision_function(x)?
            .into_iter()
            .map(sigmoid)
            .collect())
    }

    pub fn predict(&self, x: &FeatureMatrix) -> HpResult<Vec<u8>> {
        Ok(self
            .decision_function(x)?
            .into_iter()
            .map(|d| u8::from(d > 0.0))
            .collect())
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// log(1 + exp(x)) without overflow.
fn softplus(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

fn soft_threshold(v: f64, threshold: f64) -> f64 {
    if v > threshold {
        v - threshold
    } else if v < -threshold {
        v + threshold
    } else {
        0.0
    }
}

/// Per-column centering and scaling.
#[derive(Debug, Clone)]
struct Standardizer {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl Standardizer {
    fn fit(x: &FeatureMatrix) -> HpResult<Self> {
        let (n, p) = x.shape();
        let mut mean = vec![0.0; p];
        let mut sq = vec![0.0; p];

        for i in 0..n {
            for (j, &v) in x.row(i).iter().enumerate() {
                if !v.is_finite() {
                    return Err(ModelError::InvalidInput {
                        message: format!("non-finite feature value at row {i}, column {j}"),
                    }
                    .into());
                }
                mean[j] += v;
            }
        }
        for m in &mut mean {
            *m /= n as f64;
        }
        for i in 0..n {
            for (j, &v) in x.row(i).iter().enumerate() {
                let d = v - mean[j];
                sq[j] += d * d;
            }
        }
        let scale = sq
            .into_iter()
            .map(|s| {
                let std = (s / n as f64).sqrt();
                if std > 1e-12 {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    fn transform(&self, x: &FeatureMatrix) -> FeatureMatrix {
        let (n, p) = x.shape();
        let mut data = Vec::with_capacity(n * p);
        for i in 0..n {
            data.extend(
                x.row(i)
                    .iter()
                    .zip(self.mean.iter().zip(&self.scale))
                    .map(|(v, (m, s))| (v - m) / s),
            );
        }
        // Same shape as the input, so construction cannot fail.
        FeatureMatrix::from_vec(n, p, data).unwrap_or_else(|| x.clone())
    }

    /// Map coefficients fitted on standardized features back to raw ones.
    fn unscale(&self, weights: &[f64], bias: f64) -> (Vec<f64>, f64) {
        let coefficients: Vec<f64> = weights
            .iter()
            .zip(&self.scale)
            .map(|(w, s)| w / s)
            .collect();
        let intercept = bias - dot(&coefficients, &self.mean);
        (coefficients, intercept)
    }
}

struct SolveResult {
    theta: Vec<f64>,
    n_iter: usize,
    converged: bool,
    objective: f64,
}

/// Penalized log-loss over standardized features. `theta` holds the
/// coefficients followed by the intercept.
struct Problem<'a> {
    x: &'a FeatureMatrix,
    y: &'a [u8],
    n_features: usize,
    fit_intercept: bool,
    penalize_intercept: bool,
    l1: f64,
    l2: f64,
}

impl<'a> Problem<'a> {
    fn new(x: &'a FeatureMatrix, y: &'a [u8], params: &LogisticParams) -> Self {
        let n = x.n_rows() as f64;
        let alpha = match params.penalty {
            Penalty::None => 0.0,
            _ => 1.0 / (params.c * n),
        };
        let rho = params.l1_share();
        Self {
            x,
            y,
            n_features: x.n_cols(),
            fit_intercept: params.fit_intercept,
            penalize_intercept: params.fit_intercept && params.solver.penalizes_intercept(),
            l1: alpha * rho,
            l2: alpha * (1.0 - rho),
        }
    }

    fn unpack<'t>(&self, theta: &'t [f64]) -> (&'t [f64], f64) {
        (&theta[..self.n_features], theta[self.n_features])
    }

    fn is_penalized(&self, k: usize) -> bool {
        k < self.n_features || self.penalize_intercept
    }

    /// Smooth part of the objective and its gradient.
    fn smooth(&self, theta: &[f64]) -> (f64, Vec<f64>) {
        let (w, b) = self.unpack(theta);
        let n = self.x.n_rows() as f64;
        let mut loss = 0.0;
        let mut grad = vec![0.0; theta.len()];

        for (i, &label) in self.y.iter().enumerate() {
            let row = self.x.row(i);
            let margin = dot(w, row) + b;
            loss += if label == 1 {
                softplus(-margin)
            } else {
                softplus(margin)
            };
            let residual = sigmoid(margin) - f64::from(label);
            for (g, v) in grad.iter_mut().zip(row) {
                *g += residual * v;
            }
            if self.fit_intercept {
                grad[self.n_features] += residual;
            }
        }

        loss /= n;
        for g in &mut grad {
            *g /= n;
        }

        for (k, t) in theta.iter().enumerate() {
            if self.is_penalized(k) {
                loss += 0.5 * self.l2 * t * t;
                grad[k] += self.l2 * t;
            }
        }

        (loss, grad)
    }

    fn smooth_value(&self, theta: &[f64]) -> f64 {
        self.smooth(theta).0
    }

    fn nonsmooth(&self, theta: &[f64]) -> f64 {
        theta
            .iter()
            .enumerate()
            .filter(|(k, _)| self.is_penalized(*k))
            .map(|(_, t)| self.l1 * t.abs())
            .sum()
    }

    fn prox(&self, v: &[f64], step: f64) -> Vec<f64> {
        v.iter()
            .enumerate()
            .map(|(k, &vk)| {
                if !self.fit_intercept && k == self.n_features {
                    0.0
                } else if self.is_penalized(k) {
                    soft_threshold(vk, self.l1 * step)
                } else {
                    vk
                }
            })
            .collect()
    }

    fn solve(&self, params: &LogisticParams) -> HpResult<SolveResult> {
        let dim = self.n_features + 1;
        let mut theta = vec![0.0; dim];
        let mut momentum = theta.clone();
        let mut t = 1.0_f64;
        let mut lipschitz = 1.0_f64;
        let mut converged = false;
        let mut n_iter = 0;

        for iter in 1..=params.max_iter {
            n_iter = iter;
            let (f_y, grad) = self.smooth(&momentum);
            if !f_y.is_finite() {
                return Err(numerical_failure(iter, "loss is not finite"));
            }

            let candidate = loop {
                let step = 1.0 / lipschitz;
                let shifted: Vec<f64> = momentum
                    .iter()
                    .zip(&grad)
                    .map(|(m, g)| m - step * g)
                    .collect();
                let candidate = self.prox(&shifted, step);

                let diff: Vec<f64> = candidate
                    .iter()
                    .zip(&momentum)
                    .map(|(c, m)| c - m)
                    .collect();
                let bound = f_y + dot(&grad, &diff) + 0.5 * lipschitz * dot(&diff, &diff);
                let f_c = self.smooth_value(&candidate);
                if !f_c.is_finite() {
                    return Err(numerical_failure(iter, "candidate loss is not finite"));
                }
                if f_c <= bound + 1e-12 {
                    break candidate;
                }

                lipschitz *= 2.0;
                if lipschitz > MAX_LIPSCHITZ {
                    return Err(numerical_failure(iter, "line search failed to find a descent step"));
                }
            };

            let t_next = (1.0 + (1.0 + 4.0 * t * t).sqrt()) / 2.0;
            let beta = (t - 1.0) / t_next;
            momentum = candidate
                .iter()
                .zip(&theta)
                .map(|(c, prev)| c + beta * (c - prev))
                .collect();

            let delta = candidate
                .iter()
                .zip(&theta)
                .map(|(c, prev)| (c - prev).abs())
                .fold(0.0, f64::max);
            let magnitude = candidate.iter().map(|c| c.abs()).fold(1.0, f64::max);

            theta = candidate;
            t = t_next;

            if theta.iter().any(|v| !v.is_finite()) {
                return Err(numerical_failure(iter, "coefficients are not finite"));
            }
            if delta <= params.tol * magnitude {
                converged = true;
                break;
            }
        }

        let objective = self.smooth_value(&theta) + self.nonsmooth(&theta);
        Ok(SolveResult {
            theta,
            n_iter,
            converged,
            objective,
        })
    }
}

fn numerical_failure(iter: usize, what: &str) -> hp_types::HpError {
    ModelError::NumericalFailure {
        message: format!("{what} at iteration {iter}"),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Solver;

    /// Two well separated clusters along the first feature; the second
    /// feature is noise.
    fn separable() -> (FeatureMatrix, Vec<u8>) {
        let mut rows = Vec::new();
        let mut y = Vec::new();
        for i in 0..40 {
            let noise = ((i * 7) % 11) as f64 / 11.0;
            if i % 2 == 0 {
                rows.push(vec![-2.0 - (i as f64) * 0.05, noise]);
                y.push(0);
            } else {
                rows.push(vec![2.0 + (i as f64) * 0.05, noise]);
                y.push(1);
            }
        }
        (FeatureMatrix::from_rows(&rows).unwrap(), y)
    }

    #[test]
    fn separates_separable_data() {
        let (x, y) = separable();
        let mut model = LogisticRegression::new(LogisticParams::default().with_max_iter(300));
        let summary = model.fit(&x, &y).unwrap();
        assert!(summary.n_iter >= 1);
        assert_eq!(model.predict(&x).unwrap(), y);

        let proba = model.predict_proba(&x).unwrap();
        for (p, &label) in proba.iter().zip(&y) {
            assert!((0.0..=1.0).contains(p));
            assert_eq!(u8::from(*p > 0.5), label);
        }
    }

    #[test]
    fn fitting_is_deterministic() {
        let (x, y) = separable();
        let params = LogisticParams::default().with_c(3.0);
        let mut a = LogisticRegression::new(params.clone());
        let mut b = LogisticRegression::new(params);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.coefficients(), b.coefficients());
        assert_eq!(a.intercept(), b.intercept());
    }

    #[test]
    fn strong_l1_zeroes_coefficients() {
        let (x, y) = separable();
        let params = LogisticParams::default()
            .with_penalty(Penalty::L1)
            .with_solver(Solver::Liblinear)
            .with_c(1e-4);
        let mut model = LogisticRegression::new(params);
        model.fit(&x, &y).unwrap();
        assert!(model.coefficients().unwrap().iter().all(|&w| w == 0.0));
    }

    #[test]
    fn weak_l1_keeps_signal_feature() {
        let (x, y) = separable();
        let params = LogisticParams::default()
            .with_penalty(Penalty::L1)
            .with_solver(Solver::Saga)
            .with_c(100.0)
            .with_max_iter(300);
        let mut model = LogisticRegression::new(params);
        model.fit(&x, &y).unwrap();
        assert!(model.coefficients().unwrap()[0] > 0.0);
    }

    #[test]
    fn elasticnet_and_unpenalized_fit() {
        let (x, y) = separable();
        let enet = LogisticParams::default()
            .with_penalty(Penalty::ElasticNet)
            .with_solver(Solver::Saga)
            .with_l1_ratio(0.5)
            .with_c(10.0);
        let mut model = LogisticRegression::new(enet);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);

        let none = LogisticParams::default().with_penalty(Penalty::None);
        let mut model = LogisticRegression::new(none);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn stronger_l2_shrinks_coefficients() {
        let (x, y) = separable();
        let mut weak = LogisticRegression::new(LogisticParams::default().with_c(100.0));
        let mut strong = LogisticRegression::new(LogisticParams::default().with_c(0.01));
        weak.fit(&x, &y).unwrap();
        strong.fit(&x, &y).unwrap();
        assert!(strong.coefficients().unwrap()[0].abs() < weak.coefficients().unwrap()[0].abs());
    }

    #[test]
    fn incompatible_solver_rejected_before_fitting() {
        let (x, y) = separable();
        let params = LogisticParams::default().with_penalty(Penalty::L1);
        let err = LogisticRegression::new(params).fit(&x, &y).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn single_class_training_rejected() {
        let x = FeatureMatrix::from_rows(&[vec![1.0], vec![2.0]]).unwrap();
        let err = LogisticRegression::new(LogisticParams::default())
            .fit(&x, &[1, 1])
            .unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn predict_before_fit_fails() {
        let x = FeatureMatrix::from_rows(&[vec![1.0]]).unwrap();
        let model = LogisticRegression::new(LogisticParams::default());
        assert!(model.predict(&x).is_err());
    }

    #[test]
    fn constant_feature_is_harmless() {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, 5.0]).collect();
        let y: Vec<u8> = (0..20).map(|i| u8::from(i >= 10)).collect();
        let x = FeatureMatrix::from_rows(&rows).unwrap();
        let mut model = LogisticRegression::new(LogisticParams::default().with_c(10.0));
        model.fit(&x, &y).unwrap();
        assert_eq!(model.coefficients().unwrap()[1], 0.0);
    }
}
