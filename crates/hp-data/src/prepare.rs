//! Turning a parsed dataset into model-ready features and binary labels.

use hp_types::{ColumnData, DataError, Dataset, FeatureMatrix, HpResult};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Features and binarized labels of one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedData {
    pub features: FeatureMatrix,
    pub labels: Vec<u8>,
    pub feature_names: Vec<String>,
}

/// Train/test partitions produced by [`train_test_split`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    pub x_train: FeatureMatrix,
    pub x_test: FeatureMatrix,
    pub y_train: Vec<u8>,
    pub y_test: Vec<u8>,
}

/// Map the first declared category of the label column to 0 and every other
/// category to 1.
pub fn binarize_labels(dataset: &Dataset, label: &str) -> HpResult<Vec<u8>> {
    let column = dataset
        .column(label)
        .ok_or_else(|| DataError::LabelNotFound {
            dataset: dataset.name.clone(),
            label: label.to_string(),
        })?;

    let codes = match &column.data {
        ColumnData::Nominal { codes, .. } => codes,
        ColumnData::Numeric(_) => {
            return Err(DataError::LabelNotNominal {
                dataset: dataset.name.clone(),
                label: label.to_string(),
            }
            .into())
        }
    };

    let missing = column.data.missing_count();
    if missing > 0 {
        return Err(DataError::MissingValues {
            dataset: dataset.name.clone(),
            column: label.to_string(),
            count: missing,
        }
        .into());
    }

    Ok(codes
        .iter()
        .map(|code| u8::from(*code != Some(0)))
        .collect())
}

/// Collect every non-label column into a dense matrix. All feature columns
/// must be numeric and complete.
pub fn feature_matrix(dataset: &Dataset, label: &str) -> HpResult<(FeatureMatrix, Vec<String>)> {
    let n_rows = dataset.n_rows();
    let mut names = Vec::new();
    let mut columns: Vec<&[Option<f64>]> = Vec::new();

    for column in dataset.columns.iter().filter(|c| c.name != label) {
        match &column.data {
            ColumnData::Numeric(values) => {
                if values.len() != n_rows {
                    return Err(DataError::InvalidFormat {
                        message: format!(
                            "column {} of dataset {} has {} rows, expected {}",
                            column.name,
                            dataset.name,
                            values.len(),
                            n_rows
                        ),
                    }
                    .into());
                }
                let missing = column.data.missing_count();
                if missing > 0 {
                    return Err(DataError::MissingValues {
                        dataset: dataset.name.clone(),
                        column: column.name.clone(),
                        count: missing,
                    }
                    .into());
                }
                names.push(column.name.clone());
                columns.push(values);
            }
            ColumnData::Nominal { .. } => {
                return Err(DataError::UnsupportedFeature {
                    dataset: dataset.name.clone(),
                    column: column.name.clone(),
                }
                .into())
            }
        }
    }

    if columns.is_empty() {
        return Err(DataError::InsufficientData {
            message: format!("dataset {} has no feature columns", dataset.name),
        }
        .into());
    }

    let mut data = Vec::with_capacity(n_rows * columns.len());
    for row in 0..n_rows {
        data.extend(columns.iter().map(|col| col[row].unwrap_or_default()));
    }

    let matrix = FeatureMatrix::from_vec(n_rows, columns.len(), data).ok_or_else(|| {
        DataError::InvalidFormat {
            message: format!("dataset {} produced a ragged feature matrix", dataset.name),
        }
    })?;
    Ok((matrix, names))
}

pub fn prepare(dataset: &Dataset, label: &str) -> HpResult<PreparedData> {
    let labels = binarize_labels(dataset, label)?;
    let (features, feature_names) = feature_matrix(dataset, label)?;
    Ok(PreparedData {
        features,
        labels,
        feature_names,
    })
}

/// Stratified shuffle split of row indices.
///
/// The test partition holds `ceil(test_fraction * n)` rows; each class
/// contributes in proportion to its size, with leftover rows going to the
/// classes with the largest fractional share. Both index lists are sorted.
pub fn stratified_split_indices(
    labels: &[u8],
    test_fraction: f64,
    seed: u64,
) -> HpResult<(Vec<usize>, Vec<usize>)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(DataError::InsufficientData {
            message: format!("test fraction must be in (0, 1), got {test_fraction}"),
        }
        .into());
    }

    let n = labels.len();
    if n == 0 {
        return Err(DataError::InsufficientData {
            message: "cannot split an empty dataset".to_string(),
        }
        .into());
    }
    let n_test = (test_fraction * n as f64).ceil() as usize;
    let n_train = n.saturating_sub(n_test);

    let mut by_class: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
    for (i, &y) in labels.iter().enumerate() {
        by_class[usize::from(y != 0)].push(i);
    }
    let present = by_class.iter().filter(|c| !c.is_empty()).count();

    if let Some(small) = by_class.iter().find(|c| c.len() == 1) {
        return Err(DataError::InsufficientData {
            message: format!(
                "class of row {} has a single member; stratification needs at least 2",
                small[0]
            ),
        }
        .into());
    }
    if n_test < present || n_train < present {
        return Err(DataError::InsufficientData {
            message: format!(
                "{n} rows cannot be split into {n_train} train / {n_test} test rows over {present} classes"
            ),
        }
        .into());
    }

    // Per-class test counts by largest remainder.
    let shares: Vec<f64> = by_class
        .iter()
        .map(|c| n_test as f64 * c.len() as f64 / n as f64)
        .collect();
    let mut counts: Vec<usize> = shares.iter().map(|s| s.floor() as usize).collect();
    let mut leftover = n_test - counts.iter().sum::<usize>();
    let mut order: Vec<usize> = (0..by_class.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = shares[a] - shares[a].floor();
        let fb = shares[b] - shares[b].floor();
        fb.total_cmp(&fa).then(a.cmp(&b))
    });
    for &class in order.iter().cycle() {
        if leftover == 0 {
            break;
        }
        if counts[class] < by_class[class].len() {
            counts[class] += 1;
            leftover -= 1;
        }
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);
    for (members, &k) in by_class.iter_mut().zip(&counts) {
        members.shuffle(&mut rng);
        test.extend_from_slice(&members[..k]);
        train.extend_from_slice(&members[k..]);
    }
    train.sort_unstable();
    test.sort_unstable();

    Ok((train, test))
}

pub fn train_test_split(
    data: &PreparedData,
    test_fraction: f64,
    seed: u64,
) -> HpResult<TrainTestSplit> {
    let (train, test) = stratified_split_indices(&data.labels, test_fraction, seed)?;
    Ok(TrainTestSplit {
        x_train: data.features.select_rows(&train),
        x_test: data.features.select_rows(&test),
        y_train: train.iter().map(|&i| data.labels[i]).collect(),
        y_test: test.iter().map(|&i| data.labels[i]).collect(),
    })
}
