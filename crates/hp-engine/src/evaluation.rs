//! Trial evaluation: fit a logistic regression per benchmark dataset and
//! average the test-set ROC AUC.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use hp_data::{train_test_split, DatasetStore, TrainTestSplit};
use hp_model::{roc_auc_score, LogisticParams, LogisticRegression};
use hp_optimizer::DatasetScore;
use hp_types::{config_error, Configuration, DatasetRef, HpResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EvaluationConfig;

/// Score of one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Mean AUC over all datasets.
    pub score: f64,
    pub dataset_scores: Vec<DatasetScore>,
}

impl Evaluation {
    pub fn from_scores(dataset_scores: Vec<DatasetScore>) -> HpResult<Self> {
        if dataset_scores.is_empty() {
            return Err(config_error!("cannot average an empty set of dataset scores"));
        }
        let score =
            dataset_scores.iter().map(|s| s.auc).sum::<f64>() / dataset_scores.len() as f64;
        Ok(Self {
            score,
            dataset_scores,
        })
    }
}

/// Turns a hyperparameter configuration into a score.
#[async_trait]
pub trait TrialEvaluator: Send + Sync {
    async fn evaluate(&self, config: &Configuration) -> HpResult<Evaluation>;

    fn name(&self) -> &str;
}

/// Evaluates configurations against a fixed list of datasets.
///
/// Splits are deterministic for a given seed, so each dataset is loaded and
/// split once and the partitions are reused by every later trial.
#[derive(Debug)]
pub struct DatasetEvaluator {
    store: DatasetStore,
    datasets: Vec<DatasetRef>,
    config: EvaluationConfig,
    splits: DashMap<DatasetRef, Arc<TrainTestSplit>>,
}

impl DatasetEvaluator {
    pub fn new(store: DatasetStore, datasets: Vec<DatasetRef>, config: EvaluationConfig) -> Self {
        Self {
            store,
            datasets,
            config,
            splits: DashMap::new(),
        }
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    pub fn datasets(&self) -> &[DatasetRef] {
        &self.datasets
    }

    /// Number of datasets whose split is already prepared.
    pub fn prepared_count(&self) -> usize {
        self.splits.len()
    }

    async fn split_for(&self, reference: &DatasetRef) -> HpResult<Arc<TrainTestSplit>> {
        let cached = self.splits.get(reference).map(|s| Arc::clone(s.value()));
        if let Some(split) = cached {
            return Ok(split);
        }

        let data = self.store.load_prepared(reference).await?;
        let split = Arc::new(train_test_split(
            &data,
            self.config.test_fraction,
            self.config.split_seed,
        )?);
        debug!(
            "Prepared {}: {} train rows, {} test rows, {} features",
            reference,
            split.y_train.len(),
            split.y_test.len(),
            split.x_train.n_cols()
        );
        self.splits.insert(reference.clone(), Arc::clone(&split));
        Ok(split)
    }

    async fn score_dataset(
        &self,
        reference: &DatasetRef,
        params: &LogisticParams,
    ) -> HpResult<f64> {
        let split = self.split_for(reference).await?;

        let mut model = LogisticRegression::new(params.clone());
        let summary = model.fit(&split.x_train, &split.y_train)?;
        if !summary.converged {
            debug!(
                "Fit on {} stopped after {} iterations without converging",
                reference, summary.n_iter
            );
        }

        let predicted: Vec<f64> = model
            .predict(&split.x_test)?
            .into_iter()
            .map(f64::from)
            .collect();
        roc_auc_score(&split.y_test, &predicted)
    }
}

#[async_trait]
impl TrialEvaluator for DatasetEvaluator {
    async fn evaluate(&self, config: &Configuration) -> HpResult<Evaluation> {
        // Reject bad draws before touching any dataset.
        let params = LogisticParams::from_configuration(config)?;

        let mut scores = Vec::with_capacity(self.datasets.len());
        for reference in &self.datasets {
            let auc = self.score_dataset(reference, &params).await?;
            scores.push(DatasetScore {
                dataset_id: reference.id,
                auc,
            });
        }
        Evaluation::from_scores(scores)
    }

    fn name(&self) -> &str {
        "logistic_regression_auc"
    }
}
