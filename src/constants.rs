/// Density of liquid water, in kg.m⁻³
pub const WATER_DENSITY_KG_M3: f64 = 1000.0;

/// Density of pure glacier ice, in kg.m⁻³.
/// Physical upper bound of any firn density.
pub const ICE_DENSITY_KG_M3: f64 = 917.0;

/// Lowest density of freshly fallen snow we consider physical, in kg.m⁻³
pub const FRESH_SNOW_DENSITY_KG_M3: f64 = 50.0;

/// Mean density of the upper 0.5 m snow pack on the Ekström ice shelf
/// (Hecht, 2022), in kg.m⁻³. Used to convert height-only reference
/// sensors to SWE when no better density is known.
pub const MEAN_SNOW_DENSITY_KG_M3: f64 = 408.0;

/// Apparent vertical baseline change to SWE scaling, in kg.m⁻².m⁻¹.
/// 1 mm of apparent antenna uplift maps onto 1 mm w.e.
pub const DEFAULT_PROPAGATION_SCALE: f64 = WATER_DENSITY_KG_M3;

/// Scaling of the median absolute deviation to a gaussian standard deviation
pub const MAD_TO_SIGMA: f64 = 1.4826;

/// Seconds per day
pub const SECONDS_PER_DAY: f64 = 86_400.0;
