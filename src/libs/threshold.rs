use crate::libs::base::TrainingSet;
use crate::libs::error::{CalibrationError, Result};
use itertools::Itertools;

/// Calibration state for one trace parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Sorted distinct observed values
    pub uniques: Vec<f64>,
    /// Number of bases carrying each distinct value
    pub weights: Vec<u64>,
    /// Number of thresholds asked for
    pub requested: usize,
    /// Bin upper bounds, non-decreasing; the last one is the maximum observed value
    pub thresholds: Vec<f64>,
    /// Stride of this dimension in the flattened bin grid
    pub dimension: usize,
}

impl Parameter {
    /// Derive the thresholds of one parameter from all its observed values.
    pub fn from_values(values: &mut [f64], requested: usize, compress: bool) -> Self {
        let (uniques, weights) = collapse(values);
        let mut thresholds = quantile_thresholds(&uniques, &weights, requested);
        if compress {
            compress_thresholds(&mut thresholds);
        }

        Parameter {
            uniques,
            weights,
            requested,
            thresholds,
            dimension: 1,
        }
    }

    pub fn threshold_count(&self) -> usize {
        self.thresholds.len()
    }

    pub fn max_threshold(&self) -> Option<f64> {
        self.thresholds.last().copied()
    }

    /// Index of the first threshold `>= value`, or `None` above the last threshold.
    ///
    /// ```
    /// use qvcal::libs::threshold::Parameter;
    /// let param = Parameter::from_values(&mut [1.0, 2.0, 3.0, 4.0], 2, true);
    /// assert_eq!(param.thresholds, vec![2.5, 4.0]);
    /// assert_eq!(param.index_of(2.5), Some(0));
    /// assert_eq!(param.index_of(2.6), Some(1));
    /// assert_eq!(param.index_of(4.1), None);
    /// ```
    pub fn index_of(&self, value: f64) -> Option<usize> {
        let i = self.thresholds.partition_point(|&t| t < value);
        if i < self.thresholds.len() {
            Some(i)
        } else {
            None
        }
    }
}

/// Sort values and collapse duplicates into `(unique value, weight)` pairs.
pub fn collapse(values: &mut [f64]) -> (Vec<f64>, Vec<u64>) {
    values.sort_by(|a, b| a.total_cmp(b));

    values
        .iter()
        .dedup_with_count()
        .map(|(count, &value)| (value, count as u64))
        .unzip()
}

/// Place up to `requested` thresholds so each bin holds about the same number of bases.
///
/// Thresholds sit halfway between the last value of a bin and the first value of
/// the next one. Identical values are never split, so a heavy value takes one
/// threshold only, and fewer thresholds come back when the data runs out of
/// distinct values. The last threshold is pinned to the maximum value.
pub fn quantile_thresholds(uniques: &[f64], weights: &[u64], requested: usize) -> Vec<f64> {
    let n = uniques.len();
    if n == 0 || requested == 0 {
        return vec![];
    }

    let mut thresholds = Vec::with_capacity(requested);
    let mut remaining_bases: u64 = weights.iter().sum();
    let mut remaining_thresholds = requested;
    let mut i = 0;

    while remaining_thresholds > 1 && i < n {
        let params_per_threshold =
            ((remaining_bases as f64 / remaining_thresholds as f64).round() as u64).max(1);

        let mut sum = 0;
        while i < n && sum < params_per_threshold {
            sum += weights[i];
            i += 1;
        }
        if i >= n {
            break;
        }

        thresholds.push((uniques[i - 1] + uniques[i]) / 2.0);
        remaining_bases -= sum;
        remaining_thresholds -= 1;
    }

    thresholds.push(uniques[n - 1]);
    thresholds
}

/// Merge runs of adjacent equal thresholds.
pub fn compress_thresholds(thresholds: &mut Vec<f64>) {
    thresholds.dedup();
}

/// Threshold every parameter of the training set and compute grid strides.
pub fn build_parameters(
    set: &TrainingSet,
    requested: &[usize],
    compress: bool,
) -> Result<Vec<Parameter>> {
    if set.is_empty() {
        return Err(CalibrationError::EmptyTrainingSet);
    }

    let mut parameters = Vec::with_capacity(requested.len());
    let mut stride: usize = 1;
    for (d, &count) in requested.iter().enumerate() {
        if count == 0 {
            return Err(CalibrationError::ZeroThresholds { dimension: d });
        }
        let mut values = set.column(d);
        let mut param = Parameter::from_values(&mut values, count, compress);
        param.dimension = stride;
        stride = stride
            .checked_mul(param.threshold_count())
            .ok_or(CalibrationError::GridOverflow)?;
        parameters.push(param);
    }

    Ok(parameters)
}
