//! The search loop: families in order, a fixed number of trials each, best
//! configuration persisted per family.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use hp_optimizer::{Family, FamilyStatus, RandomSearch, ResultRegistry, Trial, TrialResult};
use hp_types::{Configuration, HpResult, SearchError};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::SearchConfig;
use crate::evaluation::TrialEvaluator;
use crate::persist;

/// Summary of one finished family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyOutcome {
    pub family: String,
    pub best_score: f64,
    pub best_parameters: Configuration,
    pub best_trial: usize,
    pub trials: usize,
    pub failed_attempts: usize,
    pub output_path: PathBuf,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

pub struct SearchOrchestrator {
    config: SearchConfig,
    families: Vec<Family>,
    evaluator: Box<dyn TrialEvaluator>,
    statuses: Vec<FamilyStatus>,
}

impl SearchOrchestrator {
    pub fn new(
        config: SearchConfig,
        families: Vec<Family>,
        evaluator: Box<dyn TrialEvaluator>,
    ) -> Self {
        Self {
            config,
            families,
            evaluator,
            statuses: Vec::new(),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn families(&self) -> &[Family] {
        &self.families
    }

    /// Status of every family started so far, in run order.
    pub fn statuses(&self) -> &[FamilyStatus] {
        &self.statuses
    }

    /// Search every family in declared order, then write the run report.
    pub async fn run(&mut self) -> HpResult<Vec<FamilyOutcome>> {
        self.config.validate()?;
        info!(
            "Starting search: {} families x {} trials, evaluator {}",
            self.families.len(),
            self.config.trials_per_family,
            self.evaluator.name()
        );

        let families = self.families.clone();
        let mut outcomes = Vec::with_capacity(families.len());
        for family in &families {
            outcomes.push(self.run_family(family).await?);
        }

        let report = persist::write_report(&self.config.output_dir, &outcomes).await?;
        info!("Search completed, report written to {}", report.display());
        Ok(outcomes)
    }

    /// Run all trials of one family and persist its best configuration.
    pub async fn run_family(&mut self, family: &Family) -> HpResult<FamilyOutcome> {
        self.config.validate()?;
        family.validate()?;

        let mut status = FamilyStatus::new(&family.name, self.config.trials_per_family);
        status.mark_running();
        info!("Searching family {}", family.name);

        match self.search_family(family, &mut status).await {
            Ok(outcome) => {
                self.statuses.push(status);
                Ok(outcome)
            }
            Err(e) => {
                error!("Family {} aborted: {}", family.name, e);
                status.mark_failed(e.to_string());
                self.statuses.push(status);
                Err(e)
            }
        }
    }

    async fn search_family(
        &self,
        family: &Family,
        status: &mut FamilyStatus,
    ) -> HpResult<FamilyOutcome> {
        let mut sampler = match self.config.sampling_seed {
            Some(seed) => RandomSearch::with_seed(family.space.clone(), seed),
            None => RandomSearch::new(family.space.clone()),
        };
        let mut registry = ResultRegistry::new(&family.name);

        for trial_number in 0..self.config.trials_per_family {
            let result = self
                .fill_slot(family, trial_number, &mut sampler, status)
                .await?;
            registry.record(result);

            let done = trial_number + 1;
            if done % self.config.progress_interval == 0 {
                info!(
                    "{}: {}/{} trials, best so far {:.6}",
                    family.name,
                    done,
                    self.config.trials_per_family,
                    registry.max_score().unwrap_or(f64::NAN)
                );
            }
        }

        let best = registry.require_best()?.clone();
        let output_path =
            persist::save_best(&self.config.output_dir, &family.name, &best.parameters).await?;
        status.mark_completed();
        print_summary(&family.name, &best);

        Ok(FamilyOutcome {
            family: family.name.clone(),
            best_score: best.score,
            best_parameters: best.parameters,
            best_trial: best.trial_number,
            trials: registry.len(),
            failed_attempts: status.attempts_failed,
            output_path,
            started_at: status.started_at,
            finished_at: status.finished_at,
        })
    }

    /// Draw and evaluate until one configuration succeeds. Retryable failures
    /// discard the draw; anything else ends the run.
    async fn fill_slot(
        &self,
        family: &Family,
        trial_number: usize,
        sampler: &mut RandomSearch,
        status: &mut FamilyStatus,
    ) -> HpResult<TrialResult> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut trial = Trial::new(&family.name, trial_number, attempt, sampler.sample_one());
            trial.mark_running();

            match self.evaluator.evaluate(&trial.parameters).await {
                Ok(evaluation) => {
                    let result = trial
                        .complete(evaluation.dataset_scores, evaluation.score)
                        .clone();
                    status.record_trial(&trial);
                    debug!(
                        "{} trial {}: {:.6} with {}",
                        family.name, trial_number, result.score, result.parameters
                    );
                    return Ok(result);
                }
                Err(e) if e.is_retryable() => {
                    warn!(
                        "{} trial {} attempt {} discarded ({}): {}",
                        family.name, trial_number, attempt, trial.parameters, e
                    );
                    trial.discard(e.to_string());
                    status.record_trial(&trial);

                    if self.config.retry.exhausted(attempt) {
                        return Err(SearchError::RetriesExhausted {
                            family: family.name.clone(),
                            trial: trial_number,
                            attempts: attempt,
                            last_error: e.to_string(),
                        }
                        .into());
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn print_summary(family: &str, best: &TrialResult) {
    info!(
        "{}: best mean AUC {:.6} from trial {}",
        family, best.score, best.trial_number
    );
    println!("{family}");
    println!("{}", best.score);
    println!("{}", best.parameters);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::Evaluation;
    use crate::persist::{best_file_name, load_best};
    use async_trait::async_trait;
    use hp_optimizer::{logistic_regression_families, DatasetScore, FamilyState, SearchSpace};
    use hp_types::{DataError, ParamValue};
    use parking_lot::Mutex;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Arc;

    enum Step {
        Score(f64),
        Retryable,
        Fatal,
    }

    /// Plays back scripted outcomes; once the script is empty every call
    /// scores 0.5.
    #[derive(Clone, Default)]
    struct ScriptedEvaluator {
        script: Arc<Mutex<VecDeque<Step>>>,
        seen: Arc<Mutex<Vec<Configuration>>>,
    }

    impl ScriptedEvaluator {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                script: Arc::new(Mutex::new(steps.into())),
                seen: Arc::default(),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().len()
        }
    }

    #[async_trait]
    impl TrialEvaluator for ScriptedEvaluator {
        async fn evaluate(&self, config: &Configuration) -> HpResult<Evaluation> {
            self.seen.lock().push(config.clone());
            match self.script.lock().pop_front() {
                Some(Step::Retryable) => Err(DataError::Download {
                    id: 44,
                    message: "connection reset".into(),
                }
                .into()),
                Some(Step::Fatal) => Err(DataError::LabelNotNominal {
                    dataset: "toy".into(),
                    label: "class".into(),
                }
                .into()),
                Some(Step::Score(score)) => Evaluation::from_scores(vec![DatasetScore {
                    dataset_id: 44,
                    auc: score,
                }]),
                None => Evaluation::from_scores(vec![DatasetScore {
                    dataset_id: 44,
                    auc: 0.5,
                }]),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    /// `l2` family whose C pool is 1.0, 2.0, ... so trials can be told apart.
    fn l2_family(pool: usize) -> Family {
        let values = (1..=pool).map(|c| ParamValue::Float(c as f64)).collect();
        Family::new(
            "l2",
            SearchSpace::new()
                .add_fixed("penalty", "l2")
                .add_choice("C", values),
        )
    }

    fn config(dir: &Path, trials: usize) -> SearchConfig {
        SearchConfig::default()
            .with_trials_per_family(trials)
            .with_output_dir(dir)
            .with_sampling_seed(11)
    }

    #[tokio::test]
    async fn first_of_tied_best_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let evaluator = ScriptedEvaluator::new(vec![
            Step::Score(0.81),
            Step::Score(0.77),
            Step::Score(0.81),
        ]);
        let mut orchestrator = SearchOrchestrator::new(
            config(dir.path(), 3),
            vec![l2_family(500)],
            Box::new(evaluator.clone()),
        );

        let outcome = orchestrator.run_family(&l2_family(500)).await.unwrap();
        assert_eq!(outcome.trials, 3);
        assert_eq!(outcome.best_score, 0.81);
        assert_eq!(outcome.best_trial, 0);

        let first_config = evaluator.seen.lock()[0].clone();
        let saved = load_best(&dir.path().join(best_file_name("l2"))).await.unwrap();
        assert_eq!(saved, first_config);
        assert_eq!(outcome.best_parameters, first_config);
    }

    #[tokio::test]
    async fn retried_draws_do_not_count_as_trials() {
        let dir = tempfile::tempdir().unwrap();
        let evaluator = ScriptedEvaluator::new(vec![
            Step::Score(0.6),
            Step::Retryable,
            Step::Score(0.7),
            Step::Score(0.65),
        ]);
        let mut orchestrator = SearchOrchestrator::new(
            config(dir.path(), 3),
            vec![l2_family(500)],
            Box::new(evaluator.clone()),
        );

        let outcome = orchestrator.run_family(&l2_family(500)).await.unwrap();
        assert_eq!(evaluator.calls(), 4);
        assert_eq!(outcome.trials, 3);
        assert_eq!(outcome.failed_attempts, 1);
        assert_eq!(outcome.best_score, 0.7);
        assert_eq!(outcome.best_trial, 1);

        let status = &orchestrator.statuses()[0];
        assert_eq!(status.state, FamilyState::Completed);
        assert_eq!(status.trials_completed, 3);
    }

    #[tokio::test]
    async fn fatal_error_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let evaluator =
            ScriptedEvaluator::new(vec![Step::Score(0.6), Step::Fatal, Step::Score(0.9)]);
        let mut orchestrator = SearchOrchestrator::new(
            config(dir.path(), 5),
            vec![l2_family(500)],
            Box::new(evaluator.clone()),
        );

        let err = orchestrator.run().await.unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(evaluator.calls(), 2);
        assert_eq!(orchestrator.statuses()[0].state, FamilyState::Failed);
        assert!(!dir.path().join(best_file_name("l2")).exists());
    }

    #[tokio::test]
    async fn retry_cap_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let evaluator = ScriptedEvaluator::new(vec![
            Step::Retryable,
            Step::Retryable,
            Step::Retryable,
        ]);
        let mut orchestrator = SearchOrchestrator::new(
            config(dir.path(), 2).with_retry(crate::config::RetryPolicy::with_max_attempts(3)),
            vec![l2_family(500)],
            Box::new(evaluator.clone()),
        );

        let err = orchestrator.run_family(&l2_family(500)).await.unwrap_err();
        assert!(matches!(
            err,
            hp_types::HpError::Search(SearchError::RetriesExhausted { attempts: 3, .. })
        ));
        assert_eq!(evaluator.calls(), 3);
    }

    #[tokio::test]
    async fn all_families_run_in_order_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        let families = logistic_regression_families(&mut StdRng::seed_from_u64(42));
        let evaluator = ScriptedEvaluator::default();
        let mut orchestrator = SearchOrchestrator::new(
            config(dir.path(), 4),
            families.clone(),
            Box::new(evaluator.clone()),
        );

        let outcomes = orchestrator.run().await.unwrap();
        let names: Vec<&str> = outcomes.iter().map(|o| o.family.as_str()).collect();
        assert_eq!(names, vec!["l1", "l2", "elasticnet", "none"]);
        assert_eq!(evaluator.calls(), 16);

        for (family, outcome) in families.iter().zip(&outcomes) {
            assert_eq!(outcome.trials, 4);
            let saved = load_best(&outcome.output_path).await.unwrap();
            assert!(family.satisfies(&saved));
            assert!(family.space.contains(&saved));
        }
        assert!(dir.path().join(persist::REPORT_FILE).exists());
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut orchestrator = SearchOrchestrator::new(
            config(dir.path(), 0),
            vec![l2_family(5)],
            Box::new(ScriptedEvaluator::default()),
        );
        assert!(orchestrator.run().await.is_err());
    }
}
