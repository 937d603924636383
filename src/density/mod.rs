//! Snow/firn density from co-located SWE and accumulation
use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    cfg::DensityOpts,
    prelude::{Duration, Epoch, Error, QualityFlag, Quantity, Sample, TimeSeries},
    smoothing::{centered_windows, Smoother},
    stats::{median, robust_sigma},
};

mod validator;

pub use validator::{PointInvalidation, RejectionSummary};

use validator::PointValidator;

/// Reporting window diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReportingWindow {
    /// First epoch (included)
    pub start: Epoch,
    /// Last epoch (excluded)
    pub end: Epoch,
    /// Number of [QualityFlag::Valid] raw points
    pub valid: usize,
    /// Number of grid points
    pub total: usize,
    /// False when the whole window was rejected
    pub sufficient: bool,
}

impl ReportingWindow {
    /// Fraction of valid raw points
    pub fn valid_fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.valid as f64 / self.total as f64
        }
    }

    /// [Error::InsufficientData] when this window was rejected
    pub fn status(&self) -> Result<(), Error> {
        if self.sufficient {
            Ok(())
        } else {
            Err(Error::InsufficientData(self.valid, self.total))
        }
    }
}

/// Density products
#[derive(Debug, Clone)]
pub struct DensityProducts {
    /// Point-wise density, rejected points retain their value when it exists
    pub raw: TimeSeries,
    /// Smoothed density, rejected points are gaps
    pub smoothed: TimeSeries,
    /// Reporting window diagnostics
    pub windows: Vec<ReportingWindow>,
    /// Per-point rejection reasons
    pub rejections: RejectionSummary,
}

impl DensityProducts {
    /// Windows that did not gather enough valid points
    pub fn insufficient_windows(&self) -> impl Iterator<Item = &ReportingWindow> + '_ {
        self.windows.iter().filter(|w| !w.sufficient)
    }
}

/// Derives bounded and smoothed density from aligned
/// accumulation and SWE series.
pub struct DensityCombiner<'a> {
    station: &'a str,
    opts: &'a DensityOpts,
}

impl<'a> DensityCombiner<'a> {
    pub fn new(station: &'a str, opts: &'a DensityOpts) -> Self {
        Self { station, opts }
    }

    /// Both series must share the same grid
    fn check_grids(acc: &TimeSeries, swe: &TimeSeries) -> Result<(), Error> {
        if acc.quantity != Quantity::Accumulation {
            return Err(Error::UnexpectedQuantity(acc.quantity));
        }
        if swe.quantity != Quantity::SWE {
            return Err(Error::UnexpectedQuantity(swe.quantity));
        }
        if acc.len() != swe.len() {
            return Err(Error::InvalidGrid(format!(
                "{} accumulation but {} swe samples",
                acc.len(),
                swe.len()
            )));
        }
        if let Some((a, _)) = acc
            .iter()
            .zip(swe.iter())
            .find(|(a, s)| a.epoch != s.epoch)
        {
            return Err(Error::InvalidGrid(format!(
                "series are not aligned at {}",
                a.epoch
            )));
        }
        Ok(())
    }

    /// Point-wise density
    fn raw_density(
        &self,
        acc: &TimeSeries,
        swe: &TimeSeries,
        rejections: &mut RejectionSummary,
    ) -> TimeSeries {
        let validator = PointValidator::new(self.opts);

        let samples = acc
            .iter()
            .zip(swe.iter())
            .map(|(a, s)| match validator.validate(a, s) {
                Ok((density, flag)) => Sample {
                    epoch: a.epoch,
                    value: Some(density),
                    flag,
                },
                Err(reason) => {
                    rejections.count(&reason);
                    match reason {
                        PointInvalidation::OutOfBounds(density) => {
                            debug!(
                                "{}: {} - {}",
                                self.station,
                                Error::NumericInstability(a.epoch),
                                reason
                            );
                            Sample::rejected(a.epoch, Some(density))
                        },
                        PointInvalidation::NearZeroDenominator(_) => {
                            debug!(
                                "{}: {} - {}",
                                self.station,
                                Error::NumericInstability(a.epoch),
                                reason
                            );
                            Sample::gap(a.epoch)
                        },
                        _ => Sample::gap(a.epoch),
                    }
                },
            })
            .collect::<Vec<_>>();

        acc.rebuild(&format!("{}_density_raw", self.station), Quantity::Density, samples)
    }

    /// Rejects accepted points that deviate from their local median
    /// by more than k scaled MADs. Windows with null MAD never reject.
    fn reject_outliers(
        &self,
        raw: &TimeSeries,
        k: f64,
        rejections: &mut RejectionSummary,
    ) -> TimeSeries {
        let accepted = raw
            .iter()
            .enumerate()
            .filter_map(|(idx, s)| s.accepted_value().map(|v| (idx, v)))
            .collect::<Vec<_>>();

        let Some((first, _)) = accepted.first() else {
            return raw.clone();
        };

        let t0 = raw.samples()[*first].epoch;
        let epochs_s = accepted
            .iter()
            .map(|(idx, _)| (raw.samples()[*idx].epoch - t0).to_seconds())
            .collect::<Vec<_>>();

        let half_width_s = self.opts.outlier_window().to_seconds() / 2.0;
        let windows = centered_windows(&epochs_s, half_width_s);

        let mut samples = raw.samples().to_vec();

        for ((idx, value), (lo, hi)) in accepted.iter().zip(windows.iter()) {
            let neighbours = accepted[*lo..*hi].iter().map(|(_, v)| *v).collect::<Vec<_>>();
            let (Some(center), Some(sigma)) = (median(&neighbours), robust_sigma(&neighbours))
            else {
                continue;
            };
            if sigma == 0.0 {
                continue;
            }
            if (value - center).abs() > k * sigma {
                let reason = PointInvalidation::Outlier(*value);
                debug!("{}: {} {}", self.station, samples[*idx].epoch, reason);
                rejections.count(&reason);
                samples[*idx] = samples[*idx].with_flag(QualityFlag::Rejected);
            }
        }

        raw.rebuild(&raw.id, raw.quantity, samples)
    }

    /// Splits the grid into consecutive reporting windows
    fn reporting_windows(&self, raw: &TimeSeries) -> Vec<ReportingWindow> {
        let mut windows = Vec::new();
        let (Some(first), Some(last)) = (raw.first_epoch(), raw.last_epoch()) else {
            return windows;
        };

        let length = self.opts.reporting_window();
        if length <= Duration::ZERO {
            return windows;
        }

        let mut start = first;
        while start <= last {
            let end = start + length;
            let (mut valid, mut total) = (0, 0);
            for s in raw.iter().filter(|s| s.epoch >= start && s.epoch < end) {
                total += 1;
                if s.flag == QualityFlag::Valid && s.value.is_some() {
                    valid += 1;
                }
            }
            let mut window = ReportingWindow {
                start,
                end,
                valid,
                total,
                sufficient: true,
            };
            window.sufficient =
                total > 0 && window.valid_fraction() >= self.opts.min_valid_fraction;
            windows.push(window);
            start = end;
        }

        windows
    }

    /// Combines aligned accumulation and SWE into [DensityProducts]
    pub fn combine(&self, acc: &TimeSeries, swe: &TimeSeries) -> Result<DensityProducts, Error> {
        Self::check_grids(acc, swe)?;

        let mut rejections = RejectionSummary::default();

        let mut raw = self.raw_density(acc, swe, &mut rejections);

        if let Some(k) = self.opts.outlier_mad_factor {
            raw = self.reject_outliers(&raw, k, &mut rejections);
        }

        let smoothed = Smoother::centered_mean(self.opts.smoothing_window()).smooth(&raw);

        let windows = self.reporting_windows(&raw);

        let samples = smoothed
            .iter()
            .map(|s| {
                let sufficient = windows
                    .iter()
                    .find(|w| s.epoch >= w.start && s.epoch < w.end)
                    .map(|w| w.sufficient)
                    .unwrap_or(false);
                if sufficient && s.flag.is_accepted() {
                    *s
                } else {
                    Sample::gap(s.epoch)
                }
            })
            .collect::<Vec<_>>();

        let smoothed = raw.rebuild(
            &format!("{}_density", self.station),
            Quantity::Density,
            samples,
        );

        for window in windows.iter() {
            if let Err(e) = window.status() {
                warn!(
                    "{}: [{} - {}[ rejected, {}",
                    self.station, window.start, window.end, e
                );
            }
        }

        info!(
            "{}: {} density points, {} valid, {} rejected ({} out of bounds, {} near zero, {} outliers)",
            self.station,
            raw.len(),
            raw.count(QualityFlag::Valid),
            rejections.total(),
            rejections.out_of_bounds,
            rejections.near_zero_denominator,
            rejections.outlier,
        );

        Ok(DensityProducts {
            raw,
            smoothed,
            windows,
            rejections,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn day(n: u8) -> Epoch {
        Epoch::from_gregorian_utc_at_midnight(2022, 1, n)
    }

    fn series(quantity: Quantity, values: &[f64]) -> TimeSeries {
        let epochs = (1..=values.len() as u8).map(day).collect::<Vec<_>>();
        TimeSeries::from_values("test", quantity, &epochs, values).unwrap()
    }

    fn opts() -> DensityOpts {
        DensityOpts::default()
            .with_smoothing_window(1.0)
            .without_outlier_rejection()
            .with_reporting(30.0, 0.0)
    }

    #[test]
    fn misaligned_series() {
        let opts = opts();
        let combiner = DensityCombiner::new("nmlb", &opts);
        let acc = series(Quantity::Accumulation, &[0.1, 0.2]);
        let swe = series(Quantity::SWE, &[20.0]);
        assert!(matches!(combiner.combine(&acc, &swe), Err(Error::InvalidGrid(_))));
        assert!(matches!(
            combiner.combine(&swe, &acc),
            Err(Error::UnexpectedQuantity(Quantity::SWE))
        ));
    }

    #[test]
    fn bounds_are_never_clamped() {
        let opts = opts();
        let combiner = DensityCombiner::new("nmlb", &opts);
        let acc = series(Quantity::Accumulation, &[0.1, 0.1, 0.1]);
        let swe = series(Quantity::SWE, &[20.0, 2.0, 95.0]);
        let products = combiner.combine(&acc, &swe).unwrap();

        let raw = products.raw.samples();
        assert_eq!(raw[0].flag, QualityFlag::Valid);
        assert_eq!(raw[1].flag, QualityFlag::Rejected);
        assert!((raw[1].value.unwrap() - 20.0).abs() < 1.0E-9);
        assert_eq!(raw[2].flag, QualityFlag::Rejected);
        assert!((raw[2].value.unwrap() - 950.0).abs() < 1.0E-9);
        assert_eq!(products.rejections.out_of_bounds, 2);

        let smoothed = products.smoothed.samples();
        assert_eq!(smoothed[1].value, None);
        assert_eq!(smoothed[2].value, None);
    }

    #[test]
    fn outliers() {
        let opts = opts().with_smoothing_window(1.0);
        let opts = DensityOpts {
            outlier_mad_factor: Some(3.0),
            ..opts
        };
        let combiner = DensityCombiner::new("nmlb", &opts);
        let acc = series(Quantity::Accumulation, &[1.0; 7]);
        let swe = series(
            Quantity::SWE,
            &[300.0, 310.0, 305.0, 800.0, 300.0, 295.0, 310.0],
        );
        let products = combiner.combine(&acc, &swe).unwrap();
        assert_eq!(products.rejections.outlier, 1);
        assert_eq!(products.raw.samples()[3].flag, QualityFlag::Rejected);
        assert_eq!(products.raw.samples()[3].value.map(|v| v.round()), Some(800.0));
        assert_eq!(products.raw.count(QualityFlag::Valid), 6);
    }

    #[test]
    fn insufficient_windows() {
        let opts = opts().with_reporting(3.0, 0.5);
        let combiner = DensityCombiner::new("nmlb", &opts);
        // first window: 1/3 valid, second window: 3/3 valid
        let acc = series(Quantity::Accumulation, &[0.0, 0.1, 0.001, 0.1, 0.2, 0.3]);
        let swe = series(Quantity::SWE, &[0.0, 30.0, 5.0, 30.0, 60.0, 90.0]);
        let products = combiner.combine(&acc, &swe).unwrap();

        assert_eq!(products.windows.len(), 2);
        assert_eq!(products.windows[0].valid, 1);
        assert_eq!(products.windows[0].total, 3);
        assert!(!products.windows[0].sufficient);
        assert_eq!(
            products.windows[0].status(),
            Err(Error::InsufficientData(1, 3))
        );
        assert!(products.windows[1].sufficient);
        assert_eq!(products.insufficient_windows().count(), 1);

        let smoothed = products.smoothed.samples();
        // the window is rejected as a whole, including its valid point
        assert_eq!(products.raw.samples()[1].flag, QualityFlag::Valid);
        assert_eq!(smoothed[1], Sample::gap(day(2)));
        for s in &smoothed[3..] {
            assert_eq!(s.flag, QualityFlag::Valid);
            assert!((s.value.unwrap() - 300.0).abs() < 1.0E-9);
        }
        assert_eq!(products.rejections.near_zero_denominator, 2);
    }
}
