#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

// private modules
mod accumulation;
mod aligner;
mod averager;
mod cfg;
mod constants;
mod density;
mod error;
mod filters;
mod loader;
mod pipeline;
mod report;
mod series;
mod smoothing;
mod stats;
mod swe;
mod time;
mod validation;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::accumulation::{AccumulationEstimate, AccumulationEstimator};
    pub use crate::aligner::Aligner;
    pub use crate::averager::Averager;
    pub use crate::cfg::{
        AccumulationOpts, AlignerOpts, DensityOpts, Error as ConfigError, HeightConvention,
        ProductSource, ReferenceSource, ReflectometryFormat, ReflectometryOpts,
        RefractometryFormat, RefractometryOpts, RunConfig, SensorUnit, StationConfig, SweOpts,
    };
    pub use crate::constants::*;
    pub use crate::density::{
        DensityCombiner, DensityProducts, PointInvalidation, RejectionSummary, ReportingWindow,
    };
    pub use crate::error::Error;
    pub use crate::filters::{correct_jumps, daily_median, sigma_clip, Jump};
    pub use crate::loader::{
        CsvBiasParser, CsvHeightParser, GnssreflParser, LoadSummary, Loader, RecordParser,
        ReferenceParser, RtkPosParser,
    };
    pub use crate::pipeline::{run_stations, Pipeline, StationInputs, StationOutcome};
    pub use crate::report::{
        write_series, JumpSummary, Reporter, RunSummary, SeriesSummary, StationProducts,
    };
    pub use crate::series::{QualityFlag, Quantity, Sample, TimeGrid, TimeSeries};
    pub use crate::smoothing::{Kernel, Smoother};
    pub use crate::stats::{mad, median, pearson, rms, robust_sigma};
    pub use crate::swe::{SweEstimate, SweEstimator};
    pub use crate::time::{day_of_year, day_start, from_year_doy, parse_epoch, DateRange};
    pub use crate::validation::{Comparator, ComparisonReport, ComparisonStats};
    // re-export
    pub use hifitime::{Duration, Epoch, TimeScale};
}

// pub export
pub use error::Error;
