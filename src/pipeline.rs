//! Per station orchestration
use std::path::PathBuf;

use log::{error, info, warn};
use rayon::prelude::*;

use crate::{
    accumulation::{AccumulationEstimate, AccumulationEstimator},
    aligner::Aligner,
    cfg::{ReflectometryFormat, RefractometryFormat, RunConfig, StationConfig},
    density::DensityCombiner,
    filters::daily_median,
    loader::{
        CsvBiasParser, CsvHeightParser, GnssreflParser, LoadSummary, Loader, ReferenceParser,
        RtkPosParser,
    },
    prelude::{Error, Quantity, TimeGrid, TimeSeries},
    report::{Reporter, RunSummary, SeriesSummary, StationProducts},
    swe::{SweEstimate, SweEstimator},
    time::DateRange,
    validation::Comparator,
};

/// In-memory station inputs
#[derive(Debug, Clone)]
pub struct StationInputs {
    /// Reflectometry height anomalies
    pub heights: TimeSeries,
    /// Refractometry baseline bias
    pub bias: TimeSeries,
    /// Ground truth series, in SI units
    pub references: Vec<TimeSeries>,
}

/// Processes one station over a [DateRange]
pub struct Pipeline<'a> {
    cfg: &'a StationConfig,
    range: DateRange,
}

impl<'a> Pipeline<'a> {
    pub fn new(cfg: &'a StationConfig, range: DateRange) -> Self {
        Self { cfg, range }
    }

    fn loader(&self) -> Loader<'_> {
        Loader::new(&self.cfg.id, self.range, self.cfg.max_missing_fraction)
    }

    /// Loads reflectometry height anomalies
    pub fn load_reflectometry(&self) -> Result<(TimeSeries, LoadSummary), Error> {
        let opts = &self.cfg.reflectometry;
        let id = format!("{}_heights", self.cfg.id);
        match opts.format {
            ReflectometryFormat::Csv => self.loader().load(
                &id,
                Quantity::HeightAnomaly,
                &opts.source,
                &CsvHeightParser {
                    min_fit_quality: opts.min_fit_quality,
                },
            ),
            ReflectometryFormat::Gnssrefl => self.loader().load(
                &id,
                Quantity::HeightAnomaly,
                &opts.source,
                &GnssreflParser {
                    min_fit_quality: opts.min_fit_quality,
                },
            ),
        }
    }

    /// Loads refractometry baseline bias
    pub fn load_refractometry(&self) -> Result<(TimeSeries, LoadSummary), Error> {
        let opts = &self.cfg.refractometry;
        let id = format!("{}_bias", self.cfg.id);
        match opts.format {
            RefractometryFormat::Csv => self.loader().load(
                &id,
                Quantity::BaselineBias,
                &opts.source,
                &CsvBiasParser {
                    max_uncertainty_m: opts.max_uncertainty_m,
                },
            ),
            RefractometryFormat::RtkPos => self.loader().load(
                &id,
                Quantity::BaselineBias,
                &opts.source,
                &RtkPosParser {
                    ambiguity_state: opts.ambiguity_state,
                    max_uncertainty_m: opts.max_uncertainty_m,
                },
            ),
        }
    }

    /// Loads ground truth series. References are only used for comparison:
    /// an unavailable reference is reported and skipped.
    pub fn load_references(&self) -> Vec<TimeSeries> {
        let mut references = Vec::new();
        for reference in self.cfg.references.iter() {
            let parser = ReferenceParser::new(reference);
            let quantity = reference.unit.quantity();
            match self
                .loader()
                .load(&reference.id, quantity, &reference.source, &parser)
            {
                Ok((series, _)) => {
                    let series = ReferenceParser::finalize(reference, &series);
                    info!(
                        "{}: reference \"{}\" ({}) - {} records",
                        self.cfg.id,
                        reference.id,
                        series.quantity,
                        series.len()
                    );
                    references.push(series);
                },
                Err(e) => {
                    warn!("{}: reference \"{}\" - {}", self.cfg.id, reference.id, e);
                },
            }
        }
        references
    }

    /// Station grid, covering every day of the range
    fn grid(&self) -> Result<TimeGrid, Error> {
        TimeGrid::half_open(
            self.range.start,
            self.range.end_exclusive(),
            self.cfg.aligner.step(),
        )
    }

    /// Runs the complete chain from input products.
    /// Both branches are loaded and estimated in parallel.
    pub fn run(&self) -> Result<StationProducts, Error> {
        info!(
            "{}: processing {} - {}",
            self.cfg.id, self.range.start, self.range.end
        );

        let (accumulation, swe) = rayon::join(
            || {
                let (heights, summary) = self.load_reflectometry()?;
                let estimate = AccumulationEstimator::new(self.cfg).estimate(&heights)?;
                Ok::<_, Error>((estimate, summary))
            },
            || {
                let (bias, summary) = self.load_refractometry()?;
                let estimate = SweEstimator::new(self.cfg).estimate(&bias)?;
                Ok::<_, Error>((estimate, summary))
            },
        );

        let (accumulation, acc_summary) = accumulation?;
        let (swe, swe_summary) = swe?;

        let references = self.load_references();

        let mut summary = RunSummary::default();
        for load in [acc_summary, swe_summary] {
            summary.missing_products.extend(load.missing);
            summary.skipped_lines += load.skipped;
        }

        self.combine(accumulation, swe, &references, summary)
    }

    /// Runs the chain from in-memory series
    pub fn process(&self, inputs: &StationInputs) -> Result<StationProducts, Error> {
        let (accumulation, swe) = rayon::join(
            || AccumulationEstimator::new(self.cfg).estimate(&inputs.heights),
            || SweEstimator::new(self.cfg).estimate(&inputs.bias),
        );

        self.combine(accumulation?, swe?, &inputs.references, RunSummary::default())
    }

    fn combine(
        &self,
        accumulation: AccumulationEstimate,
        swe: SweEstimate,
        references: &[TimeSeries],
        mut summary: RunSummary,
    ) -> Result<StationProducts, Error> {
        let aligner = Aligner::new(self.grid()?, self.cfg.aligner.max_gap());

        let acc = aligner.align(&accumulation.series);
        let swe_aligned = aligner.align(&swe.series);

        let density =
            DensityCombiner::new(&self.cfg.id, &self.cfg.density).combine(&acc, &swe_aligned)?;

        let references = references.iter().map(daily_median).collect::<Vec<_>>();

        let comparison = Comparator::new(&aligner)
            .compare_all(&[&acc, &swe_aligned, &density.smoothed], &references);

        summary.start = Some(aligner.grid().start());
        summary.end = Some(aligner.grid().end());
        summary.zero_point_m = Some(swe.zero_point_m);
        summary.accumulation_jumps = accumulation.jumps.iter().map(Into::into).collect();
        summary.swe_jumps = swe.jumps.iter().map(Into::into).collect();
        summary.accumulation = SeriesSummary::from(&acc);
        summary.swe = SeriesSummary::from(&swe_aligned);
        summary.density_raw = SeriesSummary::from(&density.raw);
        summary.density = SeriesSummary::from(&density.smoothed);

        Ok(StationProducts {
            station: self.cfg.id.clone(),
            accumulation: acc,
            swe: swe_aligned,
            density,
            comparison,
            summary,
        })
    }
}

/// Outcome of one station
#[derive(Debug)]
pub struct StationOutcome {
    pub station: String,
    /// Persisted files, or why this station failed
    pub result: Result<Vec<PathBuf>, Error>,
}

/// Processes and persists several stations in parallel.
/// A failing station never interrupts the others.
/// All stations are processed when `stations` is empty.
pub fn run_stations(
    cfg: &RunConfig,
    stations: &[String],
    range: DateRange,
    reporter: &Reporter,
) -> Vec<StationOutcome> {
    let ids = if stations.is_empty() {
        cfg.stations.iter().map(|s| s.id.clone()).collect::<Vec<_>>()
    } else {
        stations.to_vec()
    };

    ids.par_iter()
        .map(|id| {
            let result = cfg.station(id).and_then(|station| {
                let products = Pipeline::new(station, range).run()?;
                reporter.persist(&products)
            });
            if let Err(e) = &result {
                error!("{}: {}", id, e);
            }
            StationOutcome {
                station: id.clone(),
                result,
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        prelude::Duration,
        tests::{day, test_station},
    };

    #[test]
    fn grid_covers_last_day() {
        let mut cfg = test_station("rh.csv", "bias.csv");
        let range = DateRange::new(day(1), day(2)).unwrap();

        let grid = Pipeline::new(&cfg, range).grid().unwrap();
        assert_eq!(grid.epochs(), &[day(1), day(2)]);

        cfg.aligner.step_hours = 6.0;
        let grid = Pipeline::new(&cfg, range).grid().unwrap();
        assert_eq!(grid.len(), 8);
        assert_eq!(grid.start(), day(1));
        assert_eq!(grid.end(), day(2) + Duration::from_seconds(18.0 * 3_600.0));
    }
}
