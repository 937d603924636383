use crate::{
    loader::{fields, leading_epoch, parse_f64, RecordParser},
    prelude::{Error, Sample},
    time::from_year_doy,
};

/// `date, height_anomaly_m[, fit_quality]` records
#[derive(Debug, Clone, Default)]
pub struct CsvHeightParser {
    /// Records whose fit quality is below this floor are dropped.
    /// Records without fit quality are always kept.
    pub min_fit_quality: Option<f64>,
}

impl RecordParser for CsvHeightParser {
    fn parse_line(&self, line: &str) -> Result<Option<Sample>, Error> {
        let items = fields(line);
        let (epoch, offset) = leading_epoch(&items)?;

        let height = items
            .get(offset)
            .ok_or_else(|| Error::Parse("missing height".to_string()))
            .and_then(|item| parse_f64(item))?;

        if let (Some(floor), Some(quality)) = (self.min_fit_quality, items.get(offset + 1)) {
            if parse_f64(quality)? < floor {
                return Ok(None);
            }
        }

        Ok(Some(Sample::valid(epoch, height)))
    }
}

/// gnssrefl daily results:
/// `year doy RH sat UTCtime Azim Amp eminO emaxO NumbOf freq rise EdotF PkNoise DelT MJD refr-appl`.
/// Each record is one satellite arc, RH is the reflector height [m].
#[derive(Debug, Clone, Default)]
pub struct GnssreflParser {
    /// Arcs whose peak to noise ratio is below this floor are dropped.
    /// The amplitude is used when the peak to noise ratio is not reported.
    pub min_fit_quality: Option<f64>,
}

impl GnssreflParser {
    const RH: usize = 2;
    const UTC_HOURS: usize = 4;
    const AMPLITUDE: usize = 6;
    const PEAK_NOISE: usize = 13;
}

impl RecordParser for GnssreflParser {
    fn parse_line(&self, line: &str) -> Result<Option<Sample>, Error> {
        let items = fields(line);
        if items.len() <= Self::AMPLITUDE {
            return Err(Error::Parse(format!(
                "gnssrefl record: expecting at least {} fields",
                Self::AMPLITUDE + 1
            )));
        }

        let year = items[0]
            .parse::<i32>()
            .map_err(|_| Error::Parse(format!("invalid year \"{}\"", items[0])))?;
        let doy = items[1]
            .parse::<u16>()
            .map_err(|_| Error::Parse(format!("invalid day of year \"{}\"", items[1])))?;

        let utc_hours = parse_f64(items[Self::UTC_HOURS])?;
        let epoch = from_year_doy(year, doy, utc_hours)?;

        let rh = parse_f64(items[Self::RH])?;

        if let Some(floor) = self.min_fit_quality {
            let quality = match items.get(Self::PEAK_NOISE) {
                Some(pk_noise) => parse_f64(pk_noise)?,
                None => parse_f64(items[Self::AMPLITUDE])?,
            };
            if quality < floor {
                return Ok(None);
            }
        }

        Ok(Some(Sample::valid(epoch, rh)))
    }
}
