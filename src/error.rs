use thiserror::Error;

use crate::prelude::{Epoch, Quantity};

#[derive(Debug, PartialEq, Error)]
pub enum Error {
    /// A required input product is absent for the requested range,
    /// beyond the configured tolerance. Isolated missing days are
    /// degraded locally and never end up here.
    #[error("missing input: {0}")]
    MissingInput(String),

    /// No zero point was defined for the refractometry baseline and none
    /// could be derived from the data: SWE cannot be resolved.
    #[error("calibration missing: no zero point for station \"{0}\"")]
    CalibrationMissing(String),

    /// Near-zero denominator or out of bounds density. Per-point instability
    /// is always resolved by flag rejection, this variant only exists
    /// so the taxonomy can be reported and matched on.
    #[error("numerical instability at {0}")]
    NumericInstability(Epoch),

    /// Not enough valid points within a reporting window.
    /// Surfaced as flagged windows, not as a run failure.
    #[error("insufficient data: {0}/{1} valid points")]
    InsufficientData(usize, usize),

    /// Invalid or unreadable configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// The requested station is not described by the configuration
    #[error("unknown station \"{0}\"")]
    UnknownStation(String),

    /// Time grid definition is not consistent (end prior start, null step..)
    #[error("invalid time grid: {0}")]
    InvalidGrid(String),

    /// Series quantity does not match the operation
    #[error("unexpected {0} series")]
    UnexpectedQuantity(Quantity),

    #[error("i/o error: {0}")]
    Io(String),

    /// Malformed record or file
    #[error("parsing error: {0}")]
    Parse(String),
}

impl Error {
    /// Process exit code, per error class:
    /// 1 configuration, 2 missing input, 3 calibration, 4 other.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::UnknownStation(_) | Self::InvalidGrid(_) => 1,
            Self::MissingInput(_) => 2,
            Self::CalibrationMissing(_) => 3,
            _ => 4,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<crate::cfg::Error> for Error {
    fn from(e: crate::cfg::Error) -> Self {
        Self::Config(e.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cfg::Error as ConfigError;
    use rstest::*;

    #[rstest]
    #[case(Error::from(ConfigError::EmptyStationId), 1)]
    #[case(Error::UnknownStation("nmer".to_string()), 1)]
    #[case(Error::InvalidGrid("null step".to_string()), 1)]
    #[case(Error::MissingInput("nmlb_heights".to_string()), 2)]
    #[case(Error::CalibrationMissing("nmlb".to_string()), 3)]
    #[case(Error::Io("permission denied".to_string()), 4)]
    #[case(Error::Parse("missing column #2".to_string()), 4)]
    #[case(Error::UnexpectedQuantity(Quantity::Density), 4)]
    fn exit_codes(#[case] error: Error, #[case] expected: i32) {
        assert_eq!(error.exit_code(), expected);
    }

    #[test]
    fn io_errors() {
        let error = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "rh.csv"));
        assert!(matches!(error, Error::Io(_)));
        assert_eq!(error.exit_code(), 4);
    }
}
