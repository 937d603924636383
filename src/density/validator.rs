use serde::Serialize;
use thiserror::Error;

use crate::{
    cfg::DensityOpts,
    prelude::{QualityFlag, Sample},
};

/// Reason why a density point was rejected
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PointInvalidation {
    #[error("missing or rejected input")]
    MissingInput,
    #[error("near zero accumulation {0}")]
    NearZeroDenominator(f64),
    #[error("density out of bounds {0}")]
    OutOfBounds(f64),
    #[error("outlier {0}")]
    Outlier(f64),
}

/// Number of rejected points, per [PointInvalidation]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RejectionSummary {
    pub missing_input: usize,
    pub near_zero_denominator: usize,
    pub out_of_bounds: usize,
    pub outlier: usize,
}

impl RejectionSummary {
    pub(crate) fn count(&mut self, reason: &PointInvalidation) {
        match reason {
            PointInvalidation::MissingInput => self.missing_input += 1,
            PointInvalidation::NearZeroDenominator(_) => self.near_zero_denominator += 1,
            PointInvalidation::OutOfBounds(_) => self.out_of_bounds += 1,
            PointInvalidation::Outlier(_) => self.outlier += 1,
        }
    }

    /// Total number of rejections
    pub fn total(&self) -> usize {
        self.missing_input + self.near_zero_denominator + self.out_of_bounds + self.outlier
    }
}

/// Point-wise density derivation and validation
pub(crate) struct PointValidator<'a> {
    opts: &'a DensityOpts,
}

impl<'a> PointValidator<'a> {
    pub fn new(opts: &'a DensityOpts) -> Self {
        Self { opts }
    }

    fn usable(&self, flag: QualityFlag) -> bool {
        match flag {
            QualityFlag::Valid => true,
            QualityFlag::Interpolated => self.opts.accept_interpolated,
            QualityFlag::Rejected => false,
        }
    }

    /// Derives one density point from co-located accumulation and SWE.
    /// Returns the density [kg.m⁻³] and its derived flag.
    pub fn validate(
        &self,
        acc: &Sample,
        swe: &Sample,
    ) -> Result<(f64, QualityFlag), PointInvalidation> {
        if !self.usable(acc.flag) || !self.usable(swe.flag) {
            return Err(PointInvalidation::MissingInput);
        }

        let (Some(acc_m), Some(swe_kg_m2)) = (acc.value, swe.value) else {
            return Err(PointInvalidation::MissingInput);
        };

        if !acc_m.is_finite() || acc_m < self.opts.min_accumulation_m {
            return Err(PointInvalidation::NearZeroDenominator(acc_m));
        }

        // SWE [kg.m⁻²] is the water equivalent height scaled by ρ water
        let density = swe_kg_m2 / acc_m;

        if !density.is_finite()
            || density < self.opts.min_density
            || density > self.opts.max_density
        {
            return Err(PointInvalidation::OutOfBounds(density));
        }

        Ok((density, acc.flag.combine(swe.flag)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prelude::Epoch;

    #[test]
    fn point_validation() {
        let t = Epoch::from_gregorian_utc_at_midnight(2022, 1, 1);
        let opts = DensityOpts::default();
        let validator = PointValidator::new(&opts);

        let (rho, flag) = validator
            .validate(&Sample::valid(t, 0.1), &Sample::valid(t, 20.0))
            .unwrap();
        assert_eq!(rho, 200.0);
        assert_eq!(flag, QualityFlag::Valid);

        let (_, flag) = validator
            .validate(&Sample::interpolated(t, 0.1), &Sample::valid(t, 20.0))
            .unwrap();
        assert_eq!(flag, QualityFlag::Interpolated);

        assert_eq!(
            validator.validate(&Sample::valid(t, 0.0), &Sample::valid(t, 5.0)),
            Err(PointInvalidation::NearZeroDenominator(0.0))
        );
        assert_eq!(
            validator.validate(&Sample::valid(t, -0.2), &Sample::valid(t, 5.0)),
            Err(PointInvalidation::NearZeroDenominator(-0.2))
        );
        assert_eq!(
            validator.validate(&Sample::gap(t), &Sample::valid(t, 5.0)),
            Err(PointInvalidation::MissingInput)
        );
        assert!(matches!(
            validator.validate(&Sample::valid(t, 0.1), &Sample::valid(t, 200.0)),
            Err(PointInvalidation::OutOfBounds(_))
        ));

        let strict = DensityOpts {
            accept_interpolated: false,
            ..Default::default()
        };
        let validator = PointValidator::new(&strict);
        assert_eq!(
            validator.validate(&Sample::interpolated(t, 0.1), &Sample::valid(t, 20.0)),
            Err(PointInvalidation::MissingInput)
        );
    }
}
