//! Snow/firn accumulation from reflectometry heights
use log::{debug, info};

use crate::{
    cfg::{HeightConvention, StationConfig},
    filters::{correct_jumps, daily_median, sigma_clip, Jump},
    prelude::{Error, QualityFlag, Quantity, TimeSeries},
    smoothing::Smoother,
};

/// Accumulation estimate, with the instrument steps that were removed
#[derive(Debug, Clone)]
pub struct AccumulationEstimate {
    pub series: TimeSeries,
    pub jumps: Vec<Jump>,
}

/// Converts reflectometry height anomalies into a cumulative accumulation series.
pub struct AccumulationEstimator<'a> {
    cfg: &'a StationConfig,
}

impl<'a> AccumulationEstimator<'a> {
    pub fn new(cfg: &'a StationConfig) -> Self {
        Self { cfg }
    }

    /// Identifier of the produced series
    pub fn series_id(&self) -> String {
        format!("{}_accumulation", self.cfg.id)
    }

    /// Surface height (positive upwards) from the raw product
    fn surface_height(&self, heights: &TimeSeries) -> TimeSeries {
        let antenna = self.cfg.antenna_height_m;
        let convention = self.cfg.reflectometry.convention;
        heights.map_samples(&heights.id, Quantity::HeightAnomaly, |s| match s.value {
            Some(h) => match convention {
                HeightConvention::ReflectorHeight => s.with_value(antenna - h),
                HeightConvention::SurfaceHeight => s.with_value(h - antenna),
            },
            None => *s,
        })
    }

    /// Estimates the daily accumulation from per-epoch height anomalies.
    /// Accumulation is null on the first valid day.
    pub fn estimate(&self, heights: &TimeSeries) -> Result<AccumulationEstimate, Error> {
        if heights.quantity != Quantity::HeightAnomaly {
            return Err(Error::UnexpectedQuantity(heights.quantity));
        }

        let opts = &self.cfg.accumulation;

        let surface = self.surface_height(heights);
        let mut daily = daily_median(&surface);

        if let Some(k) = opts.sigma_threshold {
            daily = sigma_clip(&daily, k);
        }

        let jumps = match opts.jump_threshold_m {
            Some(threshold) => {
                let (corrected, jumps) = correct_jumps(&daily, threshold);
                daily = corrected;
                jumps
            },
            None => Vec::new(),
        };

        let smoothed = Smoother::centered_median(opts.smoothing_window()).smooth(&daily);

        let origin = smoothed
            .iter()
            .find(|s| s.flag == QualityFlag::Valid && s.value.is_some())
            .or_else(|| smoothed.iter().find(|s| s.accepted_value().is_some()))
            .and_then(|s| s.value)
            .ok_or_else(|| {
                Error::MissingInput(format!("{}: no valid reflectometry day", self.cfg.id))
            })?;

        debug!("{}: surface height origin {:.3}m", self.cfg.id, origin);

        let series = smoothed.map_samples(&self.series_id(), Quantity::Accumulation, |s| {
            match s.value {
                Some(v) => s.with_value(v - origin),
                None => *s,
            }
        });

        info!(
            "{}: {} days of accumulation ({} valid, {} jumps)",
            self.cfg.id,
            series.len(),
            series.count(QualityFlag::Valid),
            jumps.len()
        );

        Ok(AccumulationEstimate { series, jumps })
    }
}
