use crate::{
    averager::Averager,
    prelude::{Duration, TimeSeries},
    stats::median,
};

use log::debug;

/// Window reduction
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Kernel {
    /// Robust to single outliers
    Median,
    Mean,
}

/// Centered rolling window, expressed in time (not in samples)
/// so irregular sampling and gaps do not distort it.
#[derive(Debug, Clone)]
pub struct Smoother {
    half_width_s: f64,
    kernel: Kernel,
}

/// For each position, the [lo, hi[ range of neighbours whose epoch
/// is within ±half_width_s. `epochs_s` must be sorted.
pub(crate) fn centered_windows(epochs_s: &[f64], half_width_s: f64) -> Vec<(usize, usize)> {
    // tolerate representation noise on window edges
    let half = half_width_s + 1.0E-6;
    let mut windows = Vec::with_capacity(epochs_s.len());
    let (mut lo, mut hi) = (0, 0);
    for t in epochs_s.iter() {
        while epochs_s[lo] < t - half {
            lo += 1;
        }
        while hi < epochs_s.len() && epochs_s[hi] <= t + half {
            hi += 1;
        }
        windows.push((lo, hi));
    }
    windows
}

impl Smoother {
    /// Builds a new [Smoother] spanning `width` in total
    pub fn new(width: Duration, kernel: Kernel) -> Self {
        Self {
            half_width_s: width.to_seconds().max(0.0) / 2.0,
            kernel,
        }
    }

    pub fn centered_median(width: Duration) -> Self {
        Self::new(width, Kernel::Median)
    }

    pub fn centered_mean(width: Duration) -> Self {
        Self::new(width, Kernel::Mean)
    }

    /// Smooths accepted samples only: neither rejected samples nor gaps
    /// contribute to, or receive, a smoothed value. Flags are preserved.
    pub fn smooth(&self, series: &TimeSeries) -> TimeSeries {
        let accepted = series
            .iter()
            .enumerate()
            .filter_map(|(idx, s)| s.accepted_value().map(|v| (idx, v)))
            .collect::<Vec<_>>();

        if accepted.is_empty() {
            return series.clone();
        }

        let t0 = series.samples()[accepted[0].0].epoch;
        let epochs_s = accepted
            .iter()
            .map(|(idx, _)| (series.samples()[*idx].epoch - t0).to_seconds())
            .collect::<Vec<_>>();

        let windows = centered_windows(&epochs_s, self.half_width_s);

        let mut smoothed = series.samples().to_vec();

        for ((idx, _), (lo, hi)) in accepted.iter().zip(windows.iter()) {
            let window = accepted[*lo..*hi].iter().map(|(_, v)| *v);
            let value = match self.kernel {
                Kernel::Mean => window.collect::<Averager>().mean,
                Kernel::Median => {
                    let values = window.collect::<Vec<_>>();
                    // window always contains the point itself
                    median(&values).unwrap_or_default()
                },
            };
            smoothed[*idx] = smoothed[*idx].with_value(value);
        }

        debug!(
            "{}: smoothed {} samples ({:?}, ±{}s)",
            series.id,
            accepted.len(),
            self.kernel,
            self.half_width_s
        );

        series.rebuild(&series.id, series.quantity, smoothed)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prelude::{Epoch, Quantity, QualityFlag, Sample};

    fn day(n: u8) -> Epoch {
        Epoch::from_gregorian_utc_at_midnight(2022, 1, n)
    }

    #[test]
    fn windows() {
        let epochs = [0.0, 1.0, 2.0, 5.0, 6.0];
        let w = centered_windows(&epochs, 1.0);
        assert_eq!(w, vec![(0, 2), (0, 3), (1, 3), (3, 5), (3, 5)]);
    }

    #[test]
    fn median_removes_spike() {
        let epochs = (1..=5).map(day).collect::<Vec<_>>();
        let series = TimeSeries::from_values(
            "h",
            Quantity::HeightAnomaly,
            &epochs,
            &[1.0, 1.0, 10.0, 1.0, 1.0],
        )
        .unwrap();
        let smoother = Smoother::centered_median(Duration::from_seconds(3.0 * 86_400.0));
        let smoothed = smoother.smooth(&series);
        for s in smoothed.iter() {
            assert_eq!(s.value, Some(1.0));
        }
    }

    #[test]
    fn rejected_samples_are_untouched() {
        let samples = vec![
            Sample::valid(day(1), 1.0),
            Sample::rejected(day(2), Some(100.0)),
            Sample::gap(day(3)),
            Sample::valid(day(4), 3.0),
        ];
        let series = TimeSeries::from_samples("rho", Quantity::Density, samples).unwrap();
        let smoother = Smoother::centered_mean(Duration::from_seconds(10.0 * 86_400.0));
        let smoothed = smoother.smooth(&series);
        let s = smoothed.samples();
        assert_eq!(s[0].value, Some(2.0));
        assert_eq!(s[1].value, Some(100.0));
        assert_eq!(s[1].flag, QualityFlag::Rejected);
        assert_eq!(s[2].value, None);
        assert_eq!(s[3].value, Some(2.0));
    }
}
