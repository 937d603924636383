//! Robust and comparison statistics
use num_traits::Float;
use std::cmp::Ordering;

use crate::{averager::Averager, constants::MAD_TO_SIGMA};

fn sorted<T: Float>(values: &[T]) -> Vec<T> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

/// Median of a slice, None when empty.
/// Even populations average the two central values.
pub fn median<T: Float>(values: &[T]) -> Option<T> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    let sorted = sorted(values);
    if n % 2 == 0 {
        let two = T::one() + T::one();
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / two)
    } else {
        Some(sorted[n / 2])
    }
}

/// Median Absolute Deviation: median(|x_i - median(x)|)
pub fn mad<T: Float>(values: &[T]) -> Option<T> {
    let m = median(values)?;
    let deviations = values.iter().map(|x| (*x - m).abs()).collect::<Vec<_>>();
    median(&deviations)
}

/// [mad] scaled to a gaussian standard deviation
pub fn robust_sigma(values: &[f64]) -> Option<f64> {
    mad(values).map(|mad| mad * MAD_TO_SIGMA)
}

/// Pearson correlation coefficient. None with less than 2 pairs,
/// or when either side has no variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }

    let mean_x = x.iter().copied().collect::<Averager>().mean;
    let mean_y = y.iter().copied().collect::<Averager>().mean;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(y.iter()) {
        let (dx, dy) = (xi - mean_x, yi - mean_y);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        None
    } else {
        Some(sxy / (sxx * syy).sqrt())
    }
}

/// Root mean square of residuals
pub fn rms(residuals: &[f64]) -> Option<f64> {
    if residuals.is_empty() {
        None
    } else {
        let sum = residuals.iter().map(|r| r * r).sum::<f64>();
        Some((sum / residuals.len() as f64).sqrt())
    }
}
