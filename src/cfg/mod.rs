use thiserror::Error;

use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        DEFAULT_PROPAGATION_SCALE, FRESH_SNOW_DENSITY_KG_M3, ICE_DENSITY_KG_M3,
        MEAN_SNOW_DENSITY_KG_M3, SECONDS_PER_DAY,
    },
    prelude::Duration,
};

mod product;

pub use product::{
    HeightConvention, ProductSource, ReflectometryFormat, RefractometryFormat, SensorUnit,
};

/// Configuration Error
#[derive(Debug, PartialEq, Error)]
pub enum Error {
    #[error("station identifier is empty")]
    EmptyStationId,
    #[error("duplicated station \"{0}\"")]
    DuplicatedStation(String),
    #[error("density bounds [{0}, {1}] are not consistent")]
    InvalidDensityBounds(f64, f64),
    #[error("{0} must be strictly positive")]
    InvalidWindow(&'static str),
    #[error("{0} must lie within [0, 1]")]
    InvalidFraction(&'static str),
    #[error("{0} must be strictly positive")]
    InvalidThreshold(&'static str),
}

fn default_antenna_height() -> f64 {
    0.0
}

fn default_ambiguity_state() -> u8 {
    1
}

fn default_propagation_scale() -> f64 {
    DEFAULT_PROPAGATION_SCALE
}

fn default_zero_point_window() -> Option<f64> {
    Some(12.0)
}

fn default_step_hours() -> f64 {
    24.0
}

fn default_max_gap_hours() -> f64 {
    72.0
}

fn default_accumulation_smoothing() -> f64 {
    5.0
}

fn default_swe_smoothing() -> f64 {
    3.0
}

fn default_jump_threshold() -> Option<f64> {
    Some(1.0)
}

fn default_swe_sigma_threshold() -> Option<f64> {
    Some(3.0)
}

fn default_min_density() -> f64 {
    FRESH_SNOW_DENSITY_KG_M3
}

fn default_max_density() -> f64 {
    ICE_DENSITY_KG_M3
}

fn default_min_accumulation() -> f64 {
    0.01
}

fn default_accept_interpolated() -> bool {
    true
}

fn default_density_smoothing() -> f64 {
    7.0
}

fn default_outlier_mad_factor() -> Option<f64> {
    Some(5.0)
}

fn default_outlier_window() -> f64 {
    15.0
}

fn default_reporting_window() -> f64 {
    30.0
}

fn default_min_valid_fraction() -> f64 {
    0.5
}

fn default_max_missing_fraction() -> f64 {
    0.5
}

fn default_reference_column() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn days(n: f64) -> Duration {
    Duration::from_seconds(n * SECONDS_PER_DAY)
}

fn hours(n: f64) -> Duration {
    Duration::from_seconds(n * 3600.0)
}

/// Reflectometry (GNSS-IR) product and interpretation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectometryOpts {
    /// Where to find the products
    pub source: ProductSource,
    #[serde(default)]
    pub format: ReflectometryFormat,
    /// What the height anomaly refers to
    #[serde(default)]
    pub convention: HeightConvention,
    /// Records whose fit quality (amplitude, peak to noise..) is below this
    /// floor are dropped on load
    #[serde(default)]
    pub min_fit_quality: Option<f64>,
}

impl ReflectometryOpts {
    pub fn new(source: ProductSource) -> Self {
        Self {
            source,
            format: Default::default(),
            convention: Default::default(),
            min_fit_quality: None,
        }
    }
}

/// Refractometry product and baseline geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefractometryOpts {
    /// Where to find the products
    pub source: ProductSource,
    #[serde(default)]
    pub format: RefractometryFormat,
    /// RTKLib solution state (Q) we retain. 1 means fixed ambiguities.
    #[serde(default = "default_ambiguity_state")]
    pub ambiguity_state: u8,
    /// Solutions with larger uncertainty are dropped on load [m]
    #[serde(default)]
    pub max_uncertainty_m: Option<f64>,
    /// Calibrated baseline bias for a snow free antenna [m].
    /// When undefined, it is derived from the first hours of data.
    #[serde(default)]
    pub zero_point_m: Option<f64>,
    /// Number of hours of data used to derive the zero point,
    /// when not explicitly calibrated. None disables the derivation.
    #[serde(default = "default_zero_point_window")]
    pub zero_point_window_hours: Option<f64>,
    /// kg.m⁻² of SWE per m of apparent baseline shift
    #[serde(default = "default_propagation_scale")]
    pub propagation_scale: f64,
}

impl RefractometryOpts {
    pub fn new(source: ProductSource) -> Self {
        Self {
            source,
            format: Default::default(),
            ambiguity_state: default_ambiguity_state(),
            max_uncertainty_m: None,
            zero_point_m: None,
            zero_point_window_hours: default_zero_point_window(),
            propagation_scale: default_propagation_scale(),
        }
    }

    /// Copies and returns with a calibrated zero point
    pub fn with_zero_point(&self, zero_point_m: f64) -> Self {
        let mut s = self.clone();
        s.zero_point_m = Some(zero_point_m);
        s
    }
}

/// Ground truth sensor (snow stake, sonic ranger, snow pillow, pits..)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSource {
    /// Identifier, used in comparison reports
    pub id: String,
    /// Single file (or daily template) of `date, value` records
    pub source: ProductSource,
    /// Unit of the records, defines the compared quantity
    pub unit: SensorUnit,
    /// Value column (0 being the date)
    #[serde(default = "default_reference_column")]
    pub column: usize,
    /// Heights are expressed relative to the first record
    #[serde(default = "default_true")]
    pub relative_to_first: bool,
    /// Converts a height reference to SWE, using this constant density [kg.m⁻³]
    #[serde(default)]
    pub swe_density_kg_m3: Option<f64>,
}

impl ReferenceSource {
    pub fn new(id: &str, source: ProductSource, unit: SensorUnit) -> Self {
        Self {
            id: id.to_string(),
            source,
            unit,
            column: default_reference_column(),
            relative_to_first: true,
            swe_density_kg_m3: None,
        }
    }

    /// Copies and returns with a SWE conversion, at mean snow density
    /// when `density` is not specified
    pub fn with_swe_conversion(&self, density: Option<f64>) -> Self {
        let mut s = self.clone();
        s.swe_density_kg_m3 = Some(density.unwrap_or(MEAN_SNOW_DENSITY_KG_M3));
        s
    }
}

/// Common grid definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignerOpts {
    /// Grid step [h]
    #[serde(default = "default_step_hours")]
    pub step_hours: f64,
    /// Gaps longer than this are never interpolated [h]
    #[serde(default = "default_max_gap_hours")]
    pub max_gap_hours: f64,
}

impl Default for AlignerOpts {
    fn default() -> Self {
        Self {
            step_hours: default_step_hours(),
            max_gap_hours: default_max_gap_hours(),
        }
    }
}

impl AlignerOpts {
    pub fn step(&self) -> Duration {
        hours(self.step_hours)
    }

    pub fn max_gap(&self) -> Duration {
        hours(self.max_gap_hours)
    }
}

/// Accumulation estimate conditioning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccumulationOpts {
    /// Centered rolling median width [days]
    #[serde(default = "default_accumulation_smoothing")]
    pub smoothing_window_days: f64,
    /// Day to day drops larger than this are mast heightenings [m]
    #[serde(default = "default_jump_threshold")]
    pub jump_threshold_m: Option<f64>,
    /// Daily values outside median ± k.σ are rejected
    #[serde(default)]
    pub sigma_threshold: Option<f64>,
}

impl Default for AccumulationOpts {
    fn default() -> Self {
        Self {
            smoothing_window_days: default_accumulation_smoothing(),
            jump_threshold_m: default_jump_threshold(),
            sigma_threshold: None,
        }
    }
}

impl AccumulationOpts {
    pub fn smoothing_window(&self) -> Duration {
        days(self.smoothing_window_days)
    }
}

/// SWE estimate conditioning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweOpts {
    /// Centered rolling median width [days]
    #[serde(default = "default_swe_smoothing")]
    pub smoothing_window_days: f64,
    /// Bias samples outside median ± k.σ are rejected
    #[serde(default = "default_swe_sigma_threshold")]
    pub sigma_threshold: Option<f64>,
    /// Day to day bias drops larger than this are instrument steps [m]
    #[serde(default = "default_jump_threshold")]
    pub jump_threshold_m: Option<f64>,
}

impl Default for SweOpts {
    fn default() -> Self {
        Self {
            smoothing_window_days: default_swe_smoothing(),
            sigma_threshold: default_swe_sigma_threshold(),
            jump_threshold_m: default_jump_threshold(),
        }
    }
}

impl SweOpts {
    pub fn smoothing_window(&self) -> Duration {
        days(self.smoothing_window_days)
    }
}

/// Density combination and quality control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityOpts {
    /// Lowest physical density [kg.m⁻³]
    #[serde(default = "default_min_density")]
    pub min_density: f64,
    /// Highest physical density [kg.m⁻³]
    #[serde(default = "default_max_density")]
    pub max_density: f64,
    /// Accumulation below this is a near-zero denominator [m]
    #[serde(default = "default_min_accumulation")]
    pub min_accumulation_m: f64,
    /// Interpolated inputs may contribute
    #[serde(default = "default_accept_interpolated")]
    pub accept_interpolated: bool,
    /// Centered rolling mean width of the final series [days]
    #[serde(default = "default_density_smoothing")]
    pub smoothing_window_days: f64,
    /// Points deviating from their local median by more than
    /// this many scaled MADs are outliers. None disables it.
    #[serde(default = "default_outlier_mad_factor")]
    pub outlier_mad_factor: Option<f64>,
    /// Width of the outlier detection window [days]
    #[serde(default = "default_outlier_window")]
    pub outlier_window_days: f64,
    /// Reporting window length [days]
    #[serde(default = "default_reporting_window")]
    pub reporting_window_days: f64,
    /// Minimal fraction of valid raw points per reporting window
    #[serde(default = "default_min_valid_fraction")]
    pub min_valid_fraction: f64,
}

impl Default for DensityOpts {
    fn default() -> Self {
        Self {
            min_density: default_min_density(),
            max_density: default_max_density(),
            min_accumulation_m: default_min_accumulation(),
            accept_interpolated: default_accept_interpolated(),
            smoothing_window_days: default_density_smoothing(),
            outlier_mad_factor: default_outlier_mad_factor(),
            outlier_window_days: default_outlier_window(),
            reporting_window_days: default_reporting_window(),
            min_valid_fraction: default_min_valid_fraction(),
        }
    }
}

impl DensityOpts {
    pub fn smoothing_window(&self) -> Duration {
        days(self.smoothing_window_days)
    }

    pub fn outlier_window(&self) -> Duration {
        days(self.outlier_window_days)
    }

    pub fn reporting_window(&self) -> Duration {
        days(self.reporting_window_days)
    }

    /// Copies and returns with updated density bounds
    pub fn with_bounds(&self, min: f64, max: f64) -> Self {
        let mut s = self.clone();
        s.min_density = min;
        s.max_density = max;
        s
    }

    /// Copies and returns with updated smoothing window
    pub fn with_smoothing_window(&self, days: f64) -> Self {
        let mut s = self.clone();
        s.smoothing_window_days = days;
        s
    }

    /// Copies and returns with updated reporting policy
    pub fn with_reporting(&self, window_days: f64, min_valid_fraction: f64) -> Self {
        let mut s = self.clone();
        s.reporting_window_days = window_days;
        s.min_valid_fraction = min_valid_fraction;
        s
    }

    /// Copies and returns with outlier rejection disabled
    pub fn without_outlier_rejection(&self) -> Self {
        let mut s = self.clone();
        s.outlier_mad_factor = None;
        s
    }
}

/// Static description of a site, immutable for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    /// Station identifier
    pub id: String,
    /// Antenna phase center height above the initial surface [m]
    #[serde(default = "default_antenna_height")]
    pub antenna_height_m: f64,
    pub reflectometry: ReflectometryOpts,
    pub refractometry: RefractometryOpts,
    /// Ground truth sensors
    #[serde(default)]
    pub references: Vec<ReferenceSource>,
    #[serde(default)]
    pub aligner: AlignerOpts,
    #[serde(default)]
    pub accumulation: AccumulationOpts,
    #[serde(default)]
    pub swe: SweOpts,
    #[serde(default)]
    pub density: DensityOpts,
    /// Tolerated fraction of missing daily products
    #[serde(default = "default_max_missing_fraction")]
    pub max_missing_fraction: f64,
}

impl StationConfig {
    /// Builds a [StationConfig] with default processing options
    pub fn new(
        id: &str,
        reflectometry: ReflectometryOpts,
        refractometry: RefractometryOpts,
    ) -> Self {
        Self {
            id: id.to_string(),
            antenna_height_m: default_antenna_height(),
            reflectometry,
            refractometry,
            references: Vec::new(),
            aligner: Default::default(),
            accumulation: Default::default(),
            swe: Default::default(),
            density: Default::default(),
            max_missing_fraction: default_max_missing_fraction(),
        }
    }

    /// Copies and returns with updated antenna height
    pub fn with_antenna_height(&self, height_m: f64) -> Self {
        let mut s = self.clone();
        s.antenna_height_m = height_m;
        s
    }

    /// Copies and returns with one more reference sensor
    pub fn with_reference(&self, reference: ReferenceSource) -> Self {
        let mut s = self.clone();
        s.references.push(reference);
        s
    }

    /// Copies and returns with updated [DensityOpts]
    pub fn with_density_opts(&self, opts: DensityOpts) -> Self {
        let mut s = self.clone();
        s.density = opts;
        s
    }

    /// Copies and returns with updated [AlignerOpts]
    pub fn with_aligner_opts(&self, opts: AlignerOpts) -> Self {
        let mut s = self.clone();
        s.aligner = opts;
        s
    }

    /// Verifies this setup is physically and numerically consistent
    pub fn validate(&self) -> Result<(), Error> {
        if self.id.trim().is_empty() {
            return Err(Error::EmptyStationId);
        }

        let density = &self.density;
        if !(density.min_density >= 0.0 && density.min_density < density.max_density) {
            return Err(Error::InvalidDensityBounds(
                density.min_density,
                density.max_density,
            ));
        }
        if !(density.min_accumulation_m > 0.0) {
            return Err(Error::InvalidThreshold("minimal accumulation"));
        }

        for (name, value) in [
            ("grid step", self.aligner.step_hours),
            ("maximal gap", self.aligner.max_gap_hours),
            ("accumulation smoothing window", self.accumulation.smoothing_window_days),
            ("swe smoothing window", self.swe.smoothing_window_days),
            ("density smoothing window", density.smoothing_window_days),
            ("outlier window", density.outlier_window_days),
            ("reporting window", density.reporting_window_days),
        ] {
            if !(value > 0.0) {
                return Err(Error::InvalidWindow(name));
            }
        }

        for (name, value) in [
            ("minimal valid fraction", density.min_valid_fraction),
            ("maximal missing fraction", self.max_missing_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidFraction(name));
            }
        }

        for (name, value) in [
            ("accumulation jump threshold", self.accumulation.jump_threshold_m),
            ("accumulation sigma threshold", self.accumulation.sigma_threshold),
            ("swe jump threshold", self.swe.jump_threshold_m),
            ("swe sigma threshold", self.swe.sigma_threshold),
            ("outlier factor", density.outlier_mad_factor),
            ("zero point window", self.refractometry.zero_point_window_hours),
        ] {
            if let Some(value) = value {
                if !(value > 0.0) {
                    return Err(Error::InvalidThreshold(name));
                }
            }
        }

        if !(self.refractometry.propagation_scale > 0.0) {
            return Err(Error::InvalidThreshold("propagation scale"));
        }

        Ok(())
    }
}

/// Complete run setup: one or several stations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub stations: Vec<StationConfig>,
}

impl RunConfig {
    /// Loads and validates a JSON [RunConfig]
    pub fn from_file(path: &str) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("{}: {}", path, e)))?;
        let cfg: Self = serde_json::from_str(&content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Verifies all stations
    pub fn validate(&self) -> Result<(), Error> {
        for (i, station) in self.stations.iter().enumerate() {
            station.validate()?;
            if self.stations[..i].iter().any(|s| s.id == station.id) {
                return Err(Error::DuplicatedStation(station.id.clone()));
            }
        }
        Ok(())
    }

    /// Returns [StationConfig] for this identifier
    pub fn station(&self, id: &str) -> Result<&StationConfig, crate::Error> {
        self.stations
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| crate::Error::UnknownStation(id.to_string()))
    }
}
