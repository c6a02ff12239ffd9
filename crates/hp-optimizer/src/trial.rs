//! Trial tracking and per-family run status.

use chrono::{DateTime, Utc};
use hp_types::Configuration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of one family's search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FamilyState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Aggregate status of one family's search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyStatus {
    pub family: String,
    pub state: FamilyState,
    pub trials_planned: usize,
    pub trials_completed: usize,
    /// Draws discarded because evaluation failed and was retried.
    pub attempts_failed: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl FamilyStatus {
    pub fn new(family: impl Into<String>, trials_planned: usize) -> Self {
        Self {
            family: family.into(),
            state: FamilyState::Pending,
            trials_planned,
            trials_completed: 0,
            attempts_failed: 0,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.state = FamilyState::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self) {
        self.state = FamilyState::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.state = FamilyState::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }

    pub fn record_trial(&mut self, trial: &Trial) {
        match trial.status {
            TrialStatus::Completed => self.trials_completed += 1,
            TrialStatus::Discarded => self.attempts_failed += 1,
            TrialStatus::Pending | TrialStatus::Running => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Individual trial
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialStatus {
    Pending,
    Running,
    Completed,
    /// Evaluation failed; the draw is thrown away and the slot retried.
    Discarded,
}

/// One attempt at filling a trial slot with an evaluated configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub id: Uuid,
    pub family: String,
    /// Zero-based slot within the family.
    pub trial_number: usize,
    /// One-based attempt count for this slot.
    pub attempt: usize,
    pub parameters: Configuration,
    pub status: TrialStatus,
    pub result: Option<TrialResult>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Trial {
    pub fn new(
        family: impl Into<String>,
        trial_number: usize,
        attempt: usize,
        parameters: Configuration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            family: family.into(),
            trial_number,
            attempt,
            parameters,
            status: TrialStatus::Pending,
            result: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = TrialStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Build the result from the per-dataset scores and store it.
    pub fn complete(&mut self, dataset_scores: Vec<DatasetScore>, score: f64) -> &TrialResult {
        let finished_at = Utc::now();
        let duration_ms = self
            .started_at
            .map(|s| (finished_at - s).num_milliseconds().max(0) as u64);

        self.status = TrialStatus::Completed;
        self.finished_at = Some(finished_at);
        self.result.insert(TrialResult {
            trial_id: self.id,
            family: self.family.clone(),
            trial_number: self.trial_number,
            attempts: self.attempt,
            score,
            dataset_scores,
            parameters: self.parameters.clone(),
            duration_ms,
        })
    }

    pub fn discard(&mut self, error: String) {
        self.status = TrialStatus::Discarded;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }
}

/// AUC obtained on one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetScore {
    pub dataset_id: u32,
    pub auc: f64,
}

/// Result of a completed trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub trial_id: Uuid,
    pub family: String,
    pub trial_number: usize,
    /// Attempts needed to fill the slot, including the successful one.
    pub attempts: usize,
    /// Mean AUC across datasets.
    pub score: f64,
    pub dataset_scores: Vec<DatasetScore>,
    pub parameters: Configuration,
    pub duration_ms: Option<u64>,
}
