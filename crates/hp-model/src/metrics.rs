//! Classification metrics.

use hp_types::{HpResult, ModelError};

/// Area under the ROC curve for binary labels.
///
/// Computed as the Mann-Whitney statistic with average ranks for tied
/// scores, so hard 0/1 predictions are handled the same way as
/// probabilities.
pub fn roc_auc_score(y_true: &[u8], y_score: &[f64]) -> HpResult<f64> {
    if y_true.len() != y_score.len() {
        return Err(ModelError::ShapeMismatch {
            expected: format!("{} scores", y_true.len()),
            actual: format!("{} scores", y_score.len()),
        }
        .into());
    }
    if y_score.iter().any(|s| s.is_nan()) {
        return Err(ModelError::InvalidInput {
            message: "scores contain NaN".to_string(),
        }
        .into());
    }

    let positives = y_true.iter().filter(|&&y| y != 0).count();
    let negatives = y_true.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(ModelError::SingleClass.into());
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[a].total_cmp(&y_score[b]));

    // Sum of 1-based ranks of the positive samples, ties sharing their mean rank.
    let mut rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && y_score[order[end]] == y_score[order[start]] {
            end += 1;
        }
        let mean_rank = (start + 1 + end) as f64 / 2.0;
        let tied_positives = order[start..end]
            .iter()
            .filter(|&&i| y_true[i] != 0)
            .count();
        rank_sum += mean_rank * tied_positives as f64;
        start = end;
    }

    let p = positives as f64;
    let n = negatives as f64;
    Ok((rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

/// Fraction of predictions equal to the true label.
pub fn accuracy_score(y_true: &[u8], y_pred: &[u8]) -> HpResult<f64> {
    if y_true.len() != y_pred.len() {
        return Err(ModelError::ShapeMismatch {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        }
        .into());
    }
    if y_true.is_empty() {
        return Err(ModelError::InvalidInput {
            message: "cannot score an empty prediction set".to_string(),
        }
        .into());
    }
    let correct = y_true.iter().zip(y_pred).filter(|(a, b)| a == b).count();
    Ok(correct as f64 / y_true.len() as f64)
}
