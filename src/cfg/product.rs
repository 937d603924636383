use serde::{Deserialize, Serialize};

use crate::{
    prelude::{Epoch, Quantity},
    time::day_of_year,
};

/// Reflectometry product format
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectometryFormat {
    /// `date, height_anomaly_m, fit_quality`
    #[default]
    Csv,
    /// gnssrefl daily results, one reflector height per satellite arc
    Gnssrefl,
}

/// Refractometry product format
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefractometryFormat {
    /// `date, bias_m, uncertainty_m`
    #[default]
    Csv,
    /// RTKLib ENU position solutions (.pos)
    RtkPos,
}

/// How the reflectometry height is referenced
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeightConvention {
    /// Distance from antenna phase center down to the reflecting surface:
    /// decreases as snow accumulates.
    #[default]
    ReflectorHeight,
    /// Height of the surface, positive upwards
    SurfaceHeight,
}

/// Unit of a reference sensor record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SensorUnit {
    #[serde(rename = "m")]
    Meter,
    #[serde(rename = "cm")]
    Centimeter,
    #[serde(rename = "mm")]
    Millimeter,
    /// Mass per area, same as mm w.e.
    #[serde(rename = "kg/m2", alias = "mm_we")]
    KilogramPerSquareMeter,
    #[serde(rename = "kg/m3")]
    KilogramPerCubicMeter,
    #[serde(rename = "g/cm3")]
    GramPerCubicCentimeter,
}

impl SensorUnit {
    /// Scaling to SI (m, kg.m⁻², kg.m⁻³)
    pub fn to_si(&self) -> f64 {
        match self {
            Self::Meter => 1.0,
            Self::Centimeter => 1.0E-2,
            Self::Millimeter => 1.0E-3,
            Self::KilogramPerSquareMeter => 1.0,
            Self::KilogramPerCubicMeter => 1.0,
            Self::GramPerCubicCentimeter => 1.0E3,
        }
    }

    /// [Quantity] a sensor expressed in this unit measures
    pub fn quantity(&self) -> Quantity {
        match self {
            Self::Meter | Self::Centimeter | Self::Millimeter => Quantity::Accumulation,
            Self::KilogramPerSquareMeter => Quantity::SWE,
            Self::KilogramPerCubicMeter | Self::GramPerCubicCentimeter => Quantity::Density,
        }
    }
}

/// Location of a product. `path` is a template where
/// `{station}`, `{year}`, `{yy}`, `{doy}`, `{month}` and `{day}` are
/// replaced. A template that depends on the date describes one file per day,
/// otherwise a single file covering the whole period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSource {
    pub path: String,
}

impl ProductSource {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
        }
    }

    /// True when there is one file per day
    pub fn is_daily(&self) -> bool {
        ["{year}", "{yy}", "{doy}", "{month}", "{day}"]
            .iter()
            .any(|key| self.path.contains(key))
    }

    /// File path for this station and day
    pub fn path_for(&self, station: &str, day: Epoch) -> String {
        let (y, m, d, _, _, _, _) = day.to_gregorian_utc();
        let doy = day_of_year(day);
        self.path
            .replace("{station}", station)
            .replace("{year}", &format!("{:04}", y))
            .replace("{yy}", &format!("{:02}", y.rem_euclid(100)))
            .replace("{doy}", &format!("{:03}", doy))
            .replace("{month}", &format!("{:02}", m))
            .replace("{day}", &format!("{:02}", d))
    }
}
