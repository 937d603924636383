use log::debug;

use crate::{
    cfg::ReferenceSource,
    loader::{fields, leading_epoch, parse_f64, RecordParser},
    prelude::{Error, Quantity, Sample, TimeSeries},
};

/// `date, value[, value..]` ground truth records, converted to SI
#[derive(Debug, Clone)]
pub struct ReferenceParser {
    /// Value column, 1 being the first column after the date
    pub column: usize,
    /// Scaling to SI
    pub scale: f64,
}

impl ReferenceParser {
    pub fn new(reference: &ReferenceSource) -> Self {
        Self {
            column: reference.column.max(1),
            scale: reference.unit.to_si(),
        }
    }

    /// Applies the series-wide conversions: heights made relative
    /// to the first accepted value, and optional conversion to SWE.
    pub fn finalize(reference: &ReferenceSource, series: &TimeSeries) -> TimeSeries {
        if series.quantity != Quantity::Accumulation {
            return series.clone();
        }

        let origin = if reference.relative_to_first {
            series.accepted().next().map(|(_, v)| v).unwrap_or_default()
        } else {
            0.0
        };

        let (quantity, scale) = match reference.swe_density_kg_m3 {
            Some(density) => {
                debug!("{}: converted to SWE at {} kg/m3", reference.id, density);
                (Quantity::SWE, density)
            },
            None => (Quantity::Accumulation, 1.0),
        };

        series.map_samples(&reference.id, quantity, |s| match s.value {
            Some(v) => s.with_value((v - origin) * scale),
            None => *s,
        })
    }
}

impl RecordParser for ReferenceParser {
    fn parse_line(&self, line: &str) -> Result<Option<Sample>, Error> {
        let items = fields(line);
        let (epoch, offset) = leading_epoch(&items)?;

        let item = items
            .get(offset + self.column - 1)
            .ok_or_else(|| Error::Parse(format!("missing column #{}", self.column)))?;

        if item.eq_ignore_ascii_case("nan") {
            return Ok(Some(Sample::gap(epoch)));
        }

        let value = parse_f64(item)?;
        Ok(Some(Sample::valid(epoch, value * self.scale)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        cfg::{ProductSource, SensorUnit},
        prelude::Epoch,
    };

    #[test]
    fn unit_conversion() {
        let mut reference = ReferenceSource::new(
            "stakes",
            ProductSource::new("stakes.csv"),
            SensorUnit::Centimeter,
        );
        reference.column = 2;
        let parser = ReferenceParser::new(&reference);
        let s = parser.parse_line("2022-01-05;12.0;25.0").unwrap().unwrap();
        assert_eq!(s.epoch, Epoch::from_gregorian_utc_at_midnight(2022, 1, 5));
        assert!((s.value.unwrap() - 0.25).abs() < 1.0E-12);
        let s = parser.parse_line("2022-01-05;12.0;NaN").unwrap().unwrap();
        assert_eq!(s.value, None);
    }

    #[test]
    fn height_to_swe() {
        let reference = ReferenceSource::new(
            "laser",
            ProductSource::new("laser.csv"),
            SensorUnit::Meter,
        )
        .with_swe_conversion(None);

        let epochs = (1..=3)
            .map(|d| Epoch::from_gregorian_utc_at_midnight(2022, 1, d))
            .collect::<Vec<_>>();
        let heights =
            TimeSeries::from_values("laser", Quantity::Accumulation, &epochs, &[1.5, 1.6, 1.75])
                .unwrap();

        let swe = ReferenceParser::finalize(&reference, &heights);
        assert_eq!(swe.quantity, Quantity::SWE);
        let values = swe.accepted().map(|(_, v)| v).collect::<Vec<_>>();
        assert!((values[0] - 0.0).abs() < 1.0E-9);
        assert!((values[1] - 40.8).abs() < 1.0E-9);
        assert!((values[2] - 102.0).abs() < 1.0E-9);
    }
}
