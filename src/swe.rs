//! Snow water equivalent from the refractometry baseline bias
use log::{debug, info, warn};

use crate::{
    cfg::StationConfig,
    filters::{correct_jumps, daily_median, sigma_clip, Jump},
    prelude::{Duration, Error, QualityFlag, Quantity, TimeSeries},
    smoothing::Smoother,
    stats::median,
};

/// SWE estimate, with the zero point in use
#[derive(Debug, Clone)]
pub struct SweEstimate {
    pub series: TimeSeries,
    /// Snow free baseline bias [m]
    pub zero_point_m: f64,
    pub jumps: Vec<Jump>,
}

/// Converts the apparent vertical baseline bias into SWE.
pub struct SweEstimator<'a> {
    cfg: &'a StationConfig,
}

impl<'a> SweEstimator<'a> {
    pub fn new(cfg: &'a StationConfig) -> Self {
        Self { cfg }
    }

    /// Identifier of the produced series
    pub fn series_id(&self) -> String {
        format!("{}_swe", self.cfg.id)
    }

    /// Zero point: either calibrated, or the median bias
    /// over the first hours of usable data.
    pub fn zero_point(&self, bias: &TimeSeries) -> Result<f64, Error> {
        let opts = &self.cfg.refractometry;

        if let Some(zero_point) = opts.zero_point_m {
            return Ok(zero_point);
        }

        let calibration_missing = || Error::CalibrationMissing(self.cfg.id.clone());

        let hours = opts.zero_point_window_hours.ok_or_else(calibration_missing)?;
        let (t0, _) = bias.accepted().next().ok_or_else(calibration_missing)?;
        let t1 = t0 + Duration::from_seconds(hours * 3600.0);

        let values = bias
            .accepted()
            .filter_map(|(t, v)| if t < t1 { Some(v) } else { None })
            .collect::<Vec<_>>();

        let zero_point = median(&values).ok_or_else(calibration_missing)?;

        info!(
            "{}: zero point {:.4}m derived from {} samples (first {}h)",
            self.cfg.id,
            zero_point,
            values.len(),
            hours
        );

        Ok(zero_point)
    }

    /// Estimates the daily SWE from per-epoch baseline bias.
    /// SWE is never negative: negative values are clipped to zero
    /// and flagged as such.
    pub fn estimate(&self, bias: &TimeSeries) -> Result<SweEstimate, Error> {
        if bias.quantity != Quantity::BaselineBias {
            return Err(Error::UnexpectedQuantity(bias.quantity));
        }

        let (opts, geometry) = (&self.cfg.swe, &self.cfg.refractometry);

        let clipped = match opts.sigma_threshold {
            Some(k) => sigma_clip(bias, k),
            None => bias.clone(),
        };

        let zero_point_m = self.zero_point(&clipped)?;

        let mut daily = daily_median(&clipped);

        let jumps = match opts.jump_threshold_m {
            Some(threshold) => {
                let (corrected, jumps) = correct_jumps(&daily, threshold);
                daily = corrected;
                jumps
            },
            None => Vec::new(),
        };

        let smoothed = Smoother::centered_median(opts.smoothing_window()).smooth(&daily);

        let scale = geometry.propagation_scale;

        let nb_negative = smoothed
            .accepted()
            .filter(|(_, bias)| (bias - zero_point_m) * scale < 0.0)
            .count();

        let series = smoothed.map_samples(&self.series_id(), Quantity::SWE, |s| match s.value {
            Some(bias) => {
                let swe = (bias - zero_point_m) * scale;
                if swe < 0.0 && s.flag.is_accepted() {
                    s.with_value(0.0)
                        .with_flag(s.flag.combine(QualityFlag::Interpolated))
                } else {
                    s.with_value(swe)
                }
            },
            None => *s,
        });

        if nb_negative > 0 {
            warn!("{}: {} negative SWE values clipped", self.cfg.id, nb_negative);
        }

        debug!(
            "{}: {} days of SWE ({} valid)",
            self.cfg.id,
            series.len(),
            series.count(QualityFlag::Valid)
        );

        Ok(SweEstimate {
            series,
            zero_point_m,
            jumps,
        })
    }
}
