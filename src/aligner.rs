use log::debug;

use crate::prelude::{Duration, Epoch, Sample, TimeGrid, TimeSeries};

/// Resamples independently sampled series onto one regular [TimeGrid].
#[derive(Debug, Clone)]
pub struct Aligner {
    grid: TimeGrid,
    max_gap: Duration,
}

impl Aligner {
    /// Builds a new [Aligner]. Gaps (between two usable samples)
    /// longer than `max_gap` are never interpolated.
    pub fn new(grid: TimeGrid, max_gap: Duration) -> Self {
        Self { grid, max_gap }
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    /// Aligns one [TimeSeries] to the grid.
    /// - a grid node matching an input sample copies it unchanged
    /// - nodes outside the usable input range are gaps (no extrapolation)
    /// - nodes within a gap larger than the tolerance are gaps
    /// - other nodes are linearly interpolated between their two
    ///   usable neighbours, and flagged as such.
    pub fn align(&self, series: &TimeSeries) -> TimeSeries {
        let usable = series
            .iter()
            .filter_map(|s| s.accepted_value().map(|v| (s.epoch, v)))
            .collect::<Vec<_>>();

        let mut aligned = TimeSeries::new(&series.id, series.quantity);
        let (mut nb_interpolated, mut nb_gaps) = (0, 0);

        for t in self.grid.epochs().iter().copied() {
            let sample = match series.sample_at(t) {
                Some(sample) => *sample,
                None => match self.interpolate(&usable, t) {
                    Some(sample) => {
                        nb_interpolated += 1;
                        sample
                    },
                    None => {
                        nb_gaps += 1;
                        Sample::gap(t)
                    },
                },
            };
            // grid is strictly increasing
            let _ = aligned.push(sample);
        }

        debug!(
            "{}: aligned {} samples ({} interpolated, {} gaps)",
            series.id,
            aligned.len(),
            nb_interpolated,
            nb_gaps
        );

        aligned
    }

    /// Aligns several [TimeSeries] to the same grid
    pub fn align_all(&self, series: &[TimeSeries]) -> Vec<TimeSeries> {
        series.iter().map(|s| self.align(s)).collect()
    }

    fn interpolate(&self, usable: &[(Epoch, f64)], t: Epoch) -> Option<Sample> {
        let idx = usable.partition_point(|(epoch, _)| *epoch < t);
        if idx == 0 || idx == usable.len() {
            return None;
        }

        let (t0, y0) = usable[idx - 1];
        let (t1, y1) = usable[idx];

        let span = t1 - t0;
        if span > self.max_gap {
            return None;
        }

        let alpha = (t - t0).to_seconds() / span.to_seconds();
        let (lo, hi) = if y0 < y1 { (y0, y1) } else { (y1, y0) };
        let value = (y0 + alpha * (y1 - y0)).clamp(lo, hi);

        Some(Sample::interpolated(t, value))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prelude::{QualityFlag, Quantity};

    fn day(n: u8) -> Epoch {
        Epoch::from_gregorian_utc_at_midnight(2022, 1, n)
    }

    #[test]
    fn linear_interpolation() {
        let series = TimeSeries::from_values(
            "swe",
            Quantity::SWE,
            &[day(2), day(4), day(8)],
            &[10.0, 20.0, 0.0],
        )
        .unwrap();

        let grid = TimeGrid::daily(day(1), day(9)).unwrap();
        let aligner = Aligner::new(grid, Duration::from_seconds(3.0 * 86_400.0));
        let aligned = aligner.align(&series);

        assert_eq!(aligned.len(), 9);
        let s = aligned.samples();
        assert_eq!(s[0], Sample::gap(day(1)));
        assert_eq!(s[1], Sample::valid(day(2), 10.0));
        assert_eq!(s[2], Sample::interpolated(day(3), 15.0));
        assert_eq!(s[3], Sample::valid(day(4), 20.0));
        // 4 days gap
        for sample in &s[4..7] {
            assert_eq!(sample.value, None);
            assert_eq!(sample.flag, QualityFlag::Rejected);
        }
        assert_eq!(s[7], Sample::valid(day(8), 0.0));
        assert_eq!(s[8], Sample::gap(day(9)));
    }

    #[test]
    fn rejected_samples_are_not_interpolated() {
        let samples = vec![
            Sample::valid(day(1), 1.0),
            Sample::rejected(day(2), Some(100.0)),
            Sample::valid(day(3), 3.0),
        ];
        let series = TimeSeries::from_samples("acc", Quantity::Accumulation, samples).unwrap();

        let grid = TimeGrid::new(day(1), day(3), Duration::from_seconds(43_200.0)).unwrap();
        let aligned = Aligner::new(grid, Duration::from_seconds(2.0 * 86_400.0)).align(&series);

        let s = aligned.samples();
        assert_eq!(s.len(), 5);
        assert_eq!(s[1].value, Some(1.5));
        // exact match is copied, even when rejected
        assert_eq!(s[2], Sample::rejected(day(2), Some(100.0)));
        assert_eq!(s[3].value, Some(2.5));
        assert_eq!(s[3].flag, QualityFlag::Interpolated);
    }
}
