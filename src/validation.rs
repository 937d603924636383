//! Comparison of derived series against ground truth sensors
use log::{debug, info, warn};
use polyfit_rs::polyfit_rs::polyfit;
use serde::Serialize;

use crate::{
    aligner::Aligner,
    averager::Averager,
    prelude::{Quantity, TimeSeries},
    stats::{pearson, rms},
};

/// Statistics of one (derived, reference) pair.
/// Statistics are absent when fewer than 2 points could be compared.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonStats {
    pub derived_id: String,
    pub reference_id: String,
    pub quantity: Quantity,
    /// Number of co-located points, valid on both sides
    pub samples: usize,
    /// Mean of derived - reference
    pub bias: Option<f64>,
    pub rmse: Option<f64>,
    /// Pearson correlation coefficient
    pub correlation: Option<f64>,
    /// Mean relative bias [%], over non-zero reference values
    pub mean_relative_bias_pct: Option<f64>,
    /// derived = slope * reference + intercept
    pub slope: Option<f64>,
    pub intercept: Option<f64>,
}

impl ComparisonStats {
    fn empty(derived: &TimeSeries, reference: &TimeSeries, samples: usize) -> Self {
        Self {
            derived_id: derived.id.clone(),
            reference_id: reference.id.clone(),
            quantity: derived.quantity,
            samples,
            bias: None,
            rmse: None,
            correlation: None,
            mean_relative_bias_pct: None,
            slope: None,
            intercept: None,
        }
    }
}

/// All comparisons of a station
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub entries: Vec<ComparisonStats>,
}

impl ComparisonReport {
    /// Statistics for this (derived, reference) pair
    pub fn get(&self, derived_id: &str, reference_id: &str) -> Option<&ComparisonStats> {
        self.entries
            .iter()
            .find(|e| e.derived_id == derived_id && e.reference_id == reference_id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compares derived series to references of the same [Quantity],
/// once both are aligned. Only points observed on both sides are compared:
/// interpolated values never contribute. Derived series are never modified.
pub struct Comparator<'a> {
    aligner: &'a Aligner,
}

impl<'a> Comparator<'a> {
    pub fn new(aligner: &'a Aligner) -> Self {
        Self { aligner }
    }

    /// Compares one pair
    pub fn compare(&self, derived: &TimeSeries, reference: &TimeSeries) -> ComparisonStats {
        let derived_aligned = self.aligner.align(derived);
        let reference_aligned = self.aligner.align(reference);

        let (x, y): (Vec<f64>, Vec<f64>) = reference_aligned
            .iter()
            .zip(derived_aligned.iter())
            .filter_map(|(r, d)| Some((r.valid_value()?, d.valid_value()?)))
            .unzip();

        let n = x.len();
        if n < 2 {
            warn!(
                "{} vs {}: only {} co-located points",
                derived.id, reference.id, n
            );
            return ComparisonStats::empty(derived, reference, n);
        }

        let residuals = y.iter().zip(x.iter()).map(|(d, r)| d - r).collect::<Vec<_>>();

        let bias = residuals.iter().copied().collect::<Averager>().mean;

        let relative = residuals
            .iter()
            .zip(x.iter())
            .filter_map(|(res, r)| if *r != 0.0 { Some(res / r) } else { None })
            .collect::<Averager>();

        let mean_relative_bias_pct = if relative.count > 0 {
            Some(relative.mean * 100.0)
        } else {
            None
        };

        let (slope, intercept) = match polyfit(&x, &y, 1) {
            Ok(coefs) if coefs.len() == 2 && coefs.iter().all(|c| c.is_finite()) => {
                (Some(coefs[1]), Some(coefs[0]))
            },
            Ok(_) => (None, None),
            Err(e) => {
                debug!("{} vs {}: linear fit - {:?}", derived.id, reference.id, e);
                (None, None)
            },
        };

        let stats = ComparisonStats {
            derived_id: derived.id.clone(),
            reference_id: reference.id.clone(),
            quantity: derived.quantity,
            samples: n,
            bias: Some(bias),
            rmse: rms(&residuals),
            correlation: pearson(&x, &y),
            mean_relative_bias_pct,
            slope,
            intercept,
        };

        info!(
            "{} vs {}: n={} bias={:.4} rmse={:.4} r={:?}",
            derived.id,
            reference.id,
            n,
            bias,
            stats.rmse.unwrap_or_default(),
            stats.correlation
        );

        stats
    }

    /// Compares every derived series to every reference of the same [Quantity]
    pub fn compare_all(
        &self,
        derived: &[&TimeSeries],
        references: &[TimeSeries],
    ) -> ComparisonReport {
        let mut report = ComparisonReport::default();
        for series in derived.iter() {
            for reference in references.iter().filter(|r| r.quantity == series.quantity) {
                report.entries.push(self.compare(series, reference));
            }
        }
        report
    }
}
