//! Flagged time series
use crate::{
    prelude::{Epoch, Error},
    time::epoch_cmp,
};

use serde::{Deserialize, Serialize};

mod grid;
pub use grid::TimeGrid;

/// Per-sample classification, attached to every value we produce.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityFlag {
    /// Observed (or computed from observed inputs only)
    #[default]
    Valid,
    /// Interpolated, clipped or derived from at least one interpolated input
    Interpolated,
    /// Not usable. May still carry the offending value for diagnostics.
    Rejected,
}

impl QualityFlag {
    /// True unless [QualityFlag::Rejected]
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Rejected)
    }

    /// Worst of both flags
    pub fn combine(&self, rhs: Self) -> Self {
        match (self, rhs) {
            (Self::Rejected, _) | (_, Self::Rejected) => Self::Rejected,
            (Self::Interpolated, _) | (_, Self::Interpolated) => Self::Interpolated,
            _ => Self::Valid,
        }
    }
}

impl std::fmt::Display for QualityFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::Interpolated => write!(f, "interpolated"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for QualityFlag {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "valid" => Ok(Self::Valid),
            "interpolated" => Ok(Self::Interpolated),
            "rejected" => Ok(Self::Rejected),
            other => Err(Error::Parse(format!("unknown quality flag \"{}\"", other))),
        }
    }
}

/// Physical quantity carried by a [TimeSeries]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    /// Reflector or surface height, from reflectometry [m]
    HeightAnomaly,
    /// Vertical baseline component, from refractometry [m]
    BaselineBias,
    /// Cumulative snow/firn accumulation [m]
    Accumulation,
    /// Snow water equivalent [kg.m⁻²], equivalently [mm w.e.]
    SWE,
    /// Snow/firn density [kg.m⁻³]
    Density,
}

impl Quantity {
    /// SI unit of this [Quantity]
    pub fn unit(&self) -> &'static str {
        match self {
            Self::HeightAnomaly | Self::BaselineBias | Self::Accumulation => "m",
            Self::SWE => "kg/m2",
            Self::Density => "kg/m3",
        }
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::HeightAnomaly => write!(f, "height anomaly"),
            Self::BaselineBias => write!(f, "baseline bias"),
            Self::Accumulation => write!(f, "accumulation"),
            Self::SWE => write!(f, "SWE"),
            Self::Density => write!(f, "density"),
        }
    }
}

/// One (epoch, value, flag) triplet. A gap has no value.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Sample {
    pub epoch: Epoch,
    pub value: Option<f64>,
    pub flag: QualityFlag,
}

impl Sample {
    /// Builds a [QualityFlag::Valid] [Sample]
    pub fn valid(epoch: Epoch, value: f64) -> Self {
        Self {
            epoch,
            value: Some(value),
            flag: QualityFlag::Valid,
        }
    }

    /// Builds a [QualityFlag::Interpolated] [Sample]
    pub fn interpolated(epoch: Epoch, value: f64) -> Self {
        Self {
            epoch,
            value: Some(value),
            flag: QualityFlag::Interpolated,
        }
    }

    /// Builds a [QualityFlag::Rejected] [Sample], that may retain
    /// the offending value.
    pub fn rejected(epoch: Epoch, value: Option<f64>) -> Self {
        Self {
            epoch,
            value,
            flag: QualityFlag::Rejected,
        }
    }

    /// Builds an explicit gap
    pub fn gap(epoch: Epoch) -> Self {
        Self::rejected(epoch, None)
    }

    /// Value, if this [Sample] may be used downstream
    pub fn accepted_value(&self) -> Option<f64> {
        if self.flag.is_accepted() {
            self.value
        } else {
            None
        }
    }

    /// Value of an observed sample: neither interpolated nor rejected
    pub fn valid_value(&self) -> Option<f64> {
        if self.flag == QualityFlag::Valid {
            self.value
        } else {
            None
        }
    }

    /// Copies self with updated value, preserving the flag
    pub fn with_value(&self, value: f64) -> Self {
        let mut s = *self;
        s.value = Some(value);
        s
    }

    /// Copies self with updated flag
    pub fn with_flag(&self, flag: QualityFlag) -> Self {
        let mut s = *self;
        s.flag = flag;
        s
    }

    /// Non finite values never make it into a series:
    /// they're converted to gaps.
    fn sanitized(self) -> Self {
        match self.value {
            Some(v) if !v.is_finite() => Self::gap(self.epoch),
            _ => self,
        }
    }
}

/// Ordered (strictly increasing epochs) and flagged series of a single [Quantity].
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    /// Identifier, used in reports
    pub id: String,
    /// Physical [Quantity]
    pub quantity: Quantity,
    samples: Vec<Sample>,
}

impl TimeSeries {
    /// Builds an empty [TimeSeries]
    pub fn new(id: &str, quantity: Quantity) -> Self {
        Self {
            id: id.to_string(),
            quantity,
            samples: Vec::new(),
        }
    }

    /// Builds a [TimeSeries] from samples that must already be
    /// sorted by strictly increasing epochs.
    pub fn from_samples(id: &str, quantity: Quantity, samples: Vec<Sample>) -> Result<Self, Error> {
        let mut s = Self::new(id, quantity);
        s.samples.reserve(samples.len());
        for sample in samples {
            s.push(sample)?;
        }
        Ok(s)
    }

    /// Builds a [TimeSeries] of [QualityFlag::Valid] samples
    pub fn from_values(
        id: &str,
        quantity: Quantity,
        epochs: &[Epoch],
        values: &[f64],
    ) -> Result<Self, Error> {
        if epochs.len() != values.len() {
            return Err(Error::Parse(format!(
                "{} epochs but {} values",
                epochs.len(),
                values.len()
            )));
        }
        let samples = epochs
            .iter()
            .zip(values.iter())
            .map(|(t, v)| Sample::valid(*t, *v))
            .collect();
        Self::from_samples(id, quantity, samples)
    }

    /// Builds a [TimeSeries] from unordered records, typically freshly
    /// parsed. Records are sorted, and on duplicated epochs the last one wins.
    pub fn from_records(id: &str, quantity: Quantity, mut records: Vec<Sample>) -> Self {
        records.sort_by(|a, b| epoch_cmp(&a.epoch, &b.epoch));
        let mut samples: Vec<Sample> = Vec::with_capacity(records.len());
        for record in records {
            let record = record.sanitized();
            match samples.last_mut() {
                Some(last) if last.epoch == record.epoch => *last = record,
                _ => samples.push(record),
            }
        }
        Self {
            id: id.to_string(),
            quantity,
            samples,
        }
    }

    /// Appends a new [Sample], which must be strictly posterior
    /// to the latest one. Non finite values are stored as gaps.
    pub fn push(&mut self, sample: Sample) -> Result<(), Error> {
        if let Some(last) = self.samples.last() {
            if sample.epoch <= last.epoch {
                return Err(Error::Parse(format!(
                    "{}: {} is not posterior to {}",
                    self.id, sample.epoch, last.epoch
                )));
            }
        }
        self.samples.push(sample.sanitized());
        Ok(())
    }

    /// Copies self with a new identifier
    pub fn with_id(&self, id: &str) -> Self {
        let mut s = self.clone();
        s.id = id.to_string();
        s
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first_epoch(&self) -> Option<Epoch> {
        self.samples.first().map(|s| s.epoch)
    }

    pub fn last_epoch(&self) -> Option<Epoch> {
        self.samples.last().map(|s| s.epoch)
    }

    /// Iterates over (epoch, value) of usable samples only
    pub fn accepted(&self) -> impl Iterator<Item = (Epoch, f64)> + '_ {
        self.samples
            .iter()
            .filter_map(|s| s.accepted_value().map(|v| (s.epoch, v)))
    }

    /// Number of samples carrying this [QualityFlag]
    pub fn count(&self, flag: QualityFlag) -> usize {
        self.samples.iter().filter(|s| s.flag == flag).count()
    }

    /// [Sample] at this exact [Epoch]
    pub fn sample_at(&self, t: Epoch) -> Option<&Sample> {
        let idx = self.samples.partition_point(|s| s.epoch < t);
        self.samples.get(idx).filter(|s| s.epoch == t)
    }

    /// Rebuilds a series of possibly different [Quantity] by
    /// mapping every sample. Epochs must not be modified.
    pub(crate) fn map_samples<F: Fn(&Sample) -> Sample>(
        &self,
        id: &str,
        quantity: Quantity,
        f: F,
    ) -> Self {
        Self {
            id: id.to_string(),
            quantity,
            samples: self.samples.iter().map(|s| f(s).sanitized()).collect(),
        }
    }

    /// Replaces all samples, keeping the epochs of self
    pub(crate) fn rebuild(&self, id: &str, quantity: Quantity, samples: Vec<Sample>) -> Self {
        debug_assert_eq!(samples.len(), self.samples.len());
        Self {
            id: id.to_string(),
            quantity,
            samples: samples.into_iter().map(|s| s.sanitized()).collect(),
        }
    }

}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prelude::Duration;
    use std::str::FromStr;

    fn t(day: u8) -> Epoch {
        Epoch::from_gregorian_utc_at_midnight(2022, 1, day)
    }

    #[test]
    fn flag_combination() {
        assert_eq!(
            QualityFlag::Valid.combine(QualityFlag::Valid),
            QualityFlag::Valid
        );
        assert_eq!(
            QualityFlag::Valid.combine(QualityFlag::Interpolated),
            QualityFlag::Interpolated
        );
        assert_eq!(
            QualityFlag::Interpolated.combine(QualityFlag::Rejected),
            QualityFlag::Rejected
        );
        assert_eq!(
            QualityFlag::from_str("Interpolated").unwrap(),
            QualityFlag::Interpolated
        );
    }

    #[test]
    fn push_requires_increasing_epochs() {
        let mut s = TimeSeries::new("acc", Quantity::Accumulation);
        s.push(Sample::valid(t(2), 0.1)).unwrap();
        assert!(s.push(Sample::valid(t(2), 0.2)).is_err());
        assert!(s.push(Sample::valid(t(1), 0.2)).is_err());
        s.push(Sample::valid(t(3), 0.2)).unwrap();
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn non_finite_values_become_gaps() {
        let mut s = TimeSeries::new("density", Quantity::Density);
        s.push(Sample::valid(t(1), f64::NAN)).unwrap();
        s.push(Sample::valid(t(2), f64::INFINITY)).unwrap();
        for sample in s.iter() {
            assert_eq!(sample.value, None);
            assert_eq!(sample.flag, QualityFlag::Rejected);
        }
    }

    #[test]
    fn records_are_sorted_and_last_duplicate_wins() {
        let records = vec![
            Sample::valid(t(3), 3.0),
            Sample::valid(t(1), 1.0),
            Sample::valid(t(3), 4.0),
            Sample::valid(t(2), 2.0),
        ];
        let s = TimeSeries::from_records("bias", Quantity::BaselineBias, records);
        let values = s.iter().map(|s| s.value.unwrap()).collect::<Vec<_>>();
        assert_eq!(values, vec![1.0, 2.0, 4.0]);
    }

    #[test]
    fn sample_lookup() {
        let s = TimeSeries::from_values(
            "swe",
            Quantity::SWE,
            &[t(1), t(2), t(4)],
            &[0.0, 1.0, 2.0],
        )
        .unwrap();
        assert_eq!(s.sample_at(t(2)).unwrap().value, Some(1.0));
        assert!(s.sample_at(t(3)).is_none());
        assert!(s.sample_at(t(1) + Duration::from_seconds(1.0)).is_none());
    }
}
