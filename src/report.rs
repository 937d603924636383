use std::{
    fs::{create_dir_all, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use log::info;
use serde::Serialize;

use crate::{
    density::{DensityProducts, RejectionSummary, ReportingWindow},
    filters::Jump,
    prelude::{Epoch, Error, QualityFlag, TimeSeries},
    validation::ComparisonReport,
};

/// Everything a station run produced
#[derive(Debug, Clone)]
pub struct StationProducts {
    pub station: String,
    pub accumulation: TimeSeries,
    pub swe: TimeSeries,
    pub density: DensityProducts,
    pub comparison: ComparisonReport,
    pub summary: RunSummary,
}

/// Series statistics, as reported
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub samples: usize,
    pub valid: usize,
    pub interpolated: usize,
    pub rejected: usize,
}

impl From<&TimeSeries> for SeriesSummary {
    fn from(series: &TimeSeries) -> Self {
        Self {
            samples: series.len(),
            valid: series.count(QualityFlag::Valid),
            interpolated: series.count(QualityFlag::Interpolated),
            rejected: series.count(QualityFlag::Rejected),
        }
    }
}

/// Instrument step, as reported
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JumpSummary {
    pub epoch: Epoch,
    pub offset_m: f64,
}

impl From<&Jump> for JumpSummary {
    fn from(jump: &Jump) -> Self {
        Self {
            epoch: jump.epoch,
            offset_m: jump.offset,
        }
    }
}

/// Run summary of one station
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub start: Option<Epoch>,
    pub end: Option<Epoch>,
    /// Missing daily products
    pub missing_products: Vec<String>,
    /// Malformed product lines
    pub skipped_lines: usize,
    pub zero_point_m: Option<f64>,
    pub accumulation_jumps: Vec<JumpSummary>,
    pub swe_jumps: Vec<JumpSummary>,
    pub accumulation: SeriesSummary,
    pub swe: SeriesSummary,
    pub density_raw: SeriesSummary,
    pub density: SeriesSummary,
}

#[derive(Serialize)]
struct DensityDiagnostics<'a> {
    rejections: &'a RejectionSummary,
    windows: &'a [ReportingWindow],
}

#[derive(Serialize)]
struct StationReport<'a> {
    station: &'a str,
    summary: &'a RunSummary,
    comparison: &'a ComparisonReport,
    density: DensityDiagnostics<'a>,
}

/// Writes a [TimeSeries] as `epoch,value,flag` records.
/// Gaps have an empty value.
pub fn write_series<W: Write>(writer: &mut W, series: &TimeSeries) -> Result<(), Error> {
    writeln!(writer, "epoch,value,flag")?;
    for s in series.iter() {
        match s.value {
            Some(value) => writeln!(writer, "{},{},{}", s.epoch, value, s.flag)?,
            None => writeln!(writer, "{},,{}", s.epoch, s.flag)?,
        }
    }
    Ok(())
}

/// Persists [StationProducts] into an output directory
#[derive(Debug, Clone)]
pub struct Reporter {
    directory: PathBuf,
}

impl Reporter {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn write_csv(&self, name: &str, series: &TimeSeries) -> Result<PathBuf, Error> {
        let path = self.directory.join(name);
        let mut writer = BufWriter::new(File::create(&path)?);
        write_series(&mut writer, series)?;
        writer.flush()?;
        Ok(path)
    }

    /// Writes all station files, returns their paths
    pub fn persist(&self, products: &StationProducts) -> Result<Vec<PathBuf>, Error> {
        create_dir_all(&self.directory)?;

        let station = &products.station;

        let mut paths = vec![
            self.write_csv(&format!("{}_accumulation.csv", station), &products.accumulation)?,
            self.write_csv(&format!("{}_swe.csv", station), &products.swe)?,
            self.write_csv(&format!("{}_density_raw.csv", station), &products.density.raw)?,
            self.write_csv(&format!("{}_density.csv", station), &products.density.smoothed)?,
        ];

        let report = StationReport {
            station,
            summary: &products.summary,
            comparison: &products.comparison,
            density: DensityDiagnostics {
                rejections: &products.density.rejections,
                windows: &products.density.windows,
            },
        };

        let path = self.directory.join(format!("{}_report.json", station));
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, &report).map_err(|e| Error::Io(e.to_string()))?;
        writer.flush()?;
        paths.push(path);

        let summary = &products.summary;
        info!(
            "{}: accumulation {}/{} valid, swe {}/{} valid, density {}/{} valid - {} comparisons",
            station,
            summary.accumulation.valid,
            summary.accumulation.samples,
            summary.swe.valid,
            summary.swe.samples,
            summary.density.valid,
            summary.density.samples,
            products.comparison.entries.len(),
        );

        Ok(paths)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prelude::{Quantity, Sample};

    #[test]
    fn series_records() {
        let t0 = Epoch::from_gregorian_utc_at_midnight(2022, 1, 1);
        let t1 = Epoch::from_gregorian_utc_at_midnight(2022, 1, 2);
        let series = TimeSeries::from_samples(
            "rho",
            Quantity::Density,
            vec![Sample::valid(t0, 250.5), Sample::gap(t1)],
        )
        .unwrap();

        let mut buf = Vec::new();
        write_series(&mut buf, &series).unwrap();
        let content = String::from_utf8(buf).unwrap();
        let lines = content.lines().collect::<Vec<_>>();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "epoch,value,flag");
        assert!(lines[1].ends_with(",250.5,valid"));
        assert!(lines[2].ends_with(",,rejected"));
    }

    #[test]
    fn series_summary() {
        let t0 = Epoch::from_gregorian_utc_at_midnight(2022, 1, 1);
        let t1 = Epoch::from_gregorian_utc_at_midnight(2022, 1, 2);
        let series = TimeSeries::from_samples(
            "swe",
            Quantity::SWE,
            vec![Sample::valid(t0, 1.0), Sample::interpolated(t1, 0.0)],
        )
        .unwrap();
        let summary = SeriesSummary::from(&series);
        assert_eq!(summary.samples, 2);
        assert_eq!(summary.valid, 1);
        assert_eq!(summary.interpolated, 1);
        assert_eq!(summary.rejected, 0);
    }
}
