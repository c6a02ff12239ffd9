//! Per-family collection of trial results.

use hp_types::{HpResult, SearchError};

use crate::trial::TrialResult;

/// Every completed trial of one family in insertion order, plus the index of
/// the best one.
///
/// The best entry only changes on a strictly greater score, so among equal
/// scores the first recorded trial wins. NaN scores never become best.
#[derive(Debug, Clone, Default)]
pub struct ResultRegistry {
    family: String,
    entries: Vec<TrialResult>,
    best: Option<usize>,
}

impl ResultRegistry {
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            entries: Vec::new(),
            best: None,
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    /// Record a result; returns `true` if it became the new best.
    pub fn record(&mut self, result: TrialResult) -> bool {
        let score = result.score;
        self.entries.push(result);

        let improved = !score.is_nan()
            && match self.best {
                None => true,
                Some(i) => score > self.entries[i].score,
            };
        if improved {
            self.best = Some(self.entries.len() - 1);
        }
        improved
    }

    pub fn best(&self) -> Option<&TrialResult> {
        self.best.map(|i| &self.entries[i])
    }

    /// Best result, or an error if nothing usable was recorded.
    pub fn require_best(&self) -> HpResult<&TrialResult> {
        self.best().ok_or_else(|| {
            SearchError::NoTrials {
                family: self.family.clone(),
            }
            .into()
        })
    }

    pub fn max_score(&self) -> Option<f64> {
        self.best().map(|r| r.score)
    }

    pub fn entries(&self) -> &[TrialResult] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct scores recorded.
    pub fn distinct_scores(&self) -> usize {
        let mut scores: Vec<f64> = self.entries.iter().map(|r| r.score).collect();
        scores.sort_by(f64::total_cmp);
        scores.dedup_by(|a, b| a.total_cmp(b).is_eq());
        scores.len()
    }

    /// Results sorted best first; ties keep insertion order.
    pub fn ranked(&self) -> Vec<&TrialResult> {
        let mut ranked: Vec<&TrialResult> = self.entries.iter().collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }
}
