//! Series conditioning shared by both estimators
use crate::{
    averager::Averager,
    prelude::{Epoch, QualityFlag, Sample, TimeSeries},
    stats::median,
    time::day_start,
};

use itertools::Itertools;
use log::{debug, info};

/// Instrument step, typically an antenna mast heightening
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Jump {
    /// First sample affected
    pub epoch: Epoch,
    /// Step that was removed [m]
    pub offset: f64,
}

/// Rejects accepted samples outside median ± k.σ.
/// Rejected samples retain their value for diagnostics.
pub fn sigma_clip(series: &TimeSeries, k: f64) -> TimeSeries {
    let values = series.accepted().map(|(_, v)| v).collect::<Vec<_>>();

    let sigma = match values.iter().copied().collect::<Averager>().std_dev() {
        Some(sigma) if sigma > 0.0 => sigma,
        _ => return series.clone(),
    };

    let Some(center) = median(&values) else {
        return series.clone();
    };

    let (lower, upper) = (center - k * sigma, center + k * sigma);
    let mut nb_clipped = 0;

    let clipped = series
        .iter()
        .map(|s| match s.accepted_value() {
            Some(v) if v <= lower || v >= upper => {
                nb_clipped += 1;
                s.with_flag(QualityFlag::Rejected)
            },
            _ => *s,
        })
        .collect::<Vec<_>>();

    if nb_clipped > 0 {
        info!(
            "{}: {} samples outside {}±{}σ (σ={:.4})",
            series.id, nb_clipped, center, k, sigma
        );
    }

    series.rebuild(&series.id, series.quantity, clipped)
}

/// Removes downward steps larger than `threshold` between consecutive accepted
/// samples: the step is added back to every later sample.
pub fn correct_jumps(series: &TimeSeries, threshold: f64) -> (TimeSeries, Vec<Jump>) {
    let mut jumps = Vec::new();
    let mut correction = 0.0;
    let mut samples = series.samples().to_vec();

    let accepted = samples
        .iter()
        .enumerate()
        .filter_map(|(idx, s)| s.accepted_value().map(|v| (idx, v)))
        .collect::<Vec<_>>();

    let mut corrections = vec![0.0; samples.len()];

    for ((_, prev), (idx, next)) in accepted.iter().tuple_windows() {
        let diff = next - prev;
        if diff < -threshold {
            info!(
                "{}: jump of {:.3} detected at {}",
                series.id, diff, samples[*idx].epoch
            );
            correction -= diff;
            jumps.push(Jump {
                epoch: samples[*idx].epoch,
                offset: -diff,
            });
        }
        corrections[*idx] = correction;
    }

    if jumps.is_empty() {
        return (series.clone(), jumps);
    }

    // rejected samples are corrected too, so diagnostics remain comparable
    let mut current = 0.0;
    for (sample, corr) in samples.iter_mut().zip(corrections.iter()) {
        if sample.flag.is_accepted() {
            current = *corr;
        }
        if let Some(v) = sample.value {
            sample.value = Some(v + current);
        }
    }

    (series.rebuild(&series.id, series.quantity, samples), jumps)
}

/// Aggregates accepted samples per UTC day, using their median.
/// Output epochs are midnight; days without accepted samples are omitted.
/// A day is [QualityFlag::Valid] only if all its samples were.
pub fn daily_median(series: &TimeSeries) -> TimeSeries {
    let mut daily = TimeSeries::new(&series.id, series.quantity);

    let accepted = series.iter().filter(|s| s.accepted_value().is_some());

    for (day, group) in &accepted.chunk_by(|s| day_start(s.epoch)) {
        let group = group.collect::<Vec<_>>();
        let values = group.iter().filter_map(|s| s.value).collect::<Vec<_>>();
        let flag = group
            .iter()
            .fold(QualityFlag::Valid, |flag, s| flag.combine(s.flag));

        if let Some(value) = median(&values) {
            // days are strictly increasing
            let _ = daily.push(Sample {
                epoch: day,
                value: Some(value),
                flag,
            });
        }
    }

    debug!(
        "{}: {} samples aggregated into {} days",
        series.id,
        series.len(),
        daily.len()
    );

    daily
}
