//! Readers of the external processing chain products
use std::{fs::File, io::BufRead, io::BufReader, path::Path};

use log::{debug, error, warn};

use crate::{
    cfg::ProductSource,
    prelude::{Epoch, Error, Quantity, Sample, TimeSeries},
    time::{parse_epoch, DateRange},
};

mod reference;
mod reflectometry;
mod refractometry;

pub use reference::ReferenceParser;
pub use reflectometry::{CsvHeightParser, GnssreflParser};
pub use refractometry::{CsvBiasParser, RtkPosParser};

/// Product record parser. One implementation per product format.
pub trait RecordParser {
    /// Parses one line. Ok(None) means the line carries no record
    /// (header, filtered out..), Err means it is malformed.
    fn parse_line(&self, line: &str) -> Result<Option<Sample>, Error>;
}

/// What was found while loading one product
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadSummary {
    /// Number of files we expected
    pub expected: usize,
    /// Days (or single file) that were missing or empty
    pub missing: Vec<String>,
    /// Records loaded
    pub records: usize,
    /// Malformed lines
    pub skipped: usize,
}

impl LoadSummary {
    /// Fraction of expected files that were missing
    pub fn missing_fraction(&self) -> f64 {
        if self.expected == 0 {
            0.0
        } else {
            self.missing.len() as f64 / self.expected as f64
        }
    }
}

/// Splits a product line into fields. Commas, semicolons and white spaces
/// are all accepted as separators.
pub(crate) fn fields(line: &str) -> Vec<&str> {
    line.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|item| !item.is_empty())
        .collect()
}

/// True for empty, header and comment lines
pub(crate) fn is_comment(line: &str) -> bool {
    let line = line.trim_start();
    line.is_empty() || line.starts_with('#') || line.starts_with('%')
}

/// Parses the leading date of a record, that may spread over two fields
/// ("2022/01/01 00:00:30.000" or "2022-01-01T00:00:30").
/// Returns the epoch and the number of fields it consumed.
pub(crate) fn leading_epoch(items: &[&str]) -> Result<(Epoch, usize), Error> {
    let date = items
        .first()
        .ok_or_else(|| Error::Parse("empty record".to_string()))?;
    if let Some(time) = items.get(1).filter(|t| t.contains(':')) {
        let t = parse_epoch(&format!("{} {}", date, time))?;
        Ok((t, 2))
    } else {
        Ok((parse_epoch(date)?, 1))
    }
}

pub(crate) fn parse_f64(item: &str) -> Result<f64, Error> {
    item.trim()
        .parse::<f64>()
        .map_err(|_| Error::Parse(format!("invalid number \"{}\"", item)))
}

/// Parses one file. Returns the records and the number of malformed lines.
/// A file that exists but has no record is reported as Ok(empty).
fn parse_file<P: RecordParser>(path: &Path, parser: &P) -> Result<(Vec<Sample>, usize), Error> {
    let fd = File::open(path)?;
    let reader = BufReader::new(fd);

    let mut records = Vec::new();
    let mut skipped = 0;

    for (nth, line) in reader.lines().enumerate() {
        let line = line?;
        if is_comment(&line) {
            continue;
        }
        match parser.parse_line(&line) {
            Ok(Some(sample)) => records.push(sample),
            Ok(None) => {},
            Err(e) => {
                warn!("{}:{} - {}", path.display(), nth + 1, e);
                skipped += 1;
            },
        }
    }

    Ok((records, skipped))
}

/// Generic product [Loader]
pub struct Loader<'a> {
    station: &'a str,
    range: DateRange,
    max_missing_fraction: f64,
}

impl<'a> Loader<'a> {
    pub fn new(station: &'a str, range: DateRange, max_missing_fraction: f64) -> Self {
        Self {
            station,
            range,
            max_missing_fraction,
        }
    }

    /// Loads one product into a [TimeSeries] of this [Quantity],
    /// restricted to the date range. Daily products tolerate missing days,
    /// up to the configured fraction.
    pub fn load<P: RecordParser>(
        &self,
        id: &str,
        quantity: Quantity,
        source: &ProductSource,
        parser: &P,
    ) -> Result<(TimeSeries, LoadSummary), Error> {
        let mut summary = LoadSummary::default();
        let mut records = Vec::new();

        let paths = if source.is_daily() {
            self.range
                .days()
                .map(|day| source.path_for(self.station, day))
                .collect::<Vec<_>>()
        } else {
            vec![source.path_for(self.station, self.range.start)]
        };

        summary.expected = paths.len();

        for path in paths.iter() {
            match parse_file(Path::new(path), parser) {
                Ok((parsed, skipped)) => {
                    summary.skipped += skipped;
                    if parsed.is_empty() {
                        warn!("{}({}): no valid record in {}", self.station, id, path);
                        summary.missing.push(path.clone());
                    } else {
                        debug!("{}({}): {} records in {}", self.station, id, parsed.len(), path);
                        records.extend(parsed);
                    }
                },
                Err(e) => {
                    warn!("{}({}): {} - {}", self.station, id, path, e);
                    summary.missing.push(path.clone());
                },
            }
        }

        let fraction = summary.missing_fraction();

        if summary.missing.len() == summary.expected || fraction > self.max_missing_fraction {
            error!(
                "{}({}): {}/{} products missing",
                self.station,
                id,
                summary.missing.len(),
                summary.expected
            );
            return Err(Error::MissingInput(format!(
                "{}: {}/{} {} products missing",
                self.station,
                summary.missing.len(),
                summary.expected,
                id,
            )));
        }

        let records = records
            .into_iter()
            .filter(|s| self.range.contains(s.epoch))
            .collect::<Vec<_>>();

        summary.records = records.len();

        let series = TimeSeries::from_records(id, quantity, records);

        if series.accepted().next().is_none() {
            return Err(Error::MissingInput(format!(
                "{}: no {} record within {} - {}",
                self.station, id, self.range.start, self.range.end
            )));
        }

        Ok((series, summary))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn field_splitting() {
        assert_eq!(fields("2022-01-01, 1.5 ,0.2"), vec!["2022-01-01", "1.5", "0.2"]);
        assert_eq!(
            fields("2022/01/01 00:00:30.000   -0.12  0.33"),
            vec!["2022/01/01", "00:00:30.000", "-0.12", "0.33"]
        );
        assert!(is_comment("% GPST  e-baseline(m)"));
        assert!(is_comment("   "));
        assert!(!is_comment("2022 1 1.5"));
    }

    #[test]
    fn record_dates() {
        let (t, n) = leading_epoch(&["2022/01/01", "00:00:30.000", "1.0"]).unwrap();
        assert_eq!(n, 2);
        assert_eq!(t, Epoch::from_gregorian_utc(2022, 1, 1, 0, 0, 30, 0));
        let (t, n) = leading_epoch(&["2022-01-02", "1.0"]).unwrap();
        assert_eq!(n, 1);
        assert_eq!(t, Epoch::from_gregorian_utc_at_midnight(2022, 1, 2));
    }
}
