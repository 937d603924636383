use crate::{
    loader::{fields, leading_epoch, parse_f64, RecordParser},
    prelude::{Error, Sample},
};

/// Drops solutions whose uncertainty exceeds the limit
fn within_uncertainty(sigma: Option<f64>, limit: Option<f64>) -> bool {
    match (sigma, limit) {
        (Some(sigma), Some(limit)) => sigma <= limit,
        _ => true,
    }
}

/// `date, bias_m[, uncertainty_m]` records
#[derive(Debug, Clone, Default)]
pub struct CsvBiasParser {
    pub max_uncertainty_m: Option<f64>,
}

impl RecordParser for CsvBiasParser {
    fn parse_line(&self, line: &str) -> Result<Option<Sample>, Error> {
        let items = fields(line);
        let (epoch, offset) = leading_epoch(&items)?;

        let bias = items
            .get(offset)
            .ok_or_else(|| Error::Parse("missing bias".to_string()))
            .and_then(|item| parse_f64(item))?;

        let sigma = items.get(offset + 1).map(|s| parse_f64(s)).transpose()?;

        if within_uncertainty(sigma, self.max_uncertainty_m) {
            Ok(Some(Sample::valid(epoch, bias)))
        } else {
            Ok(None)
        }
    }
}

/// RTKLib ENU solutions:
/// `date time e-baseline n-baseline u-baseline Q ns sde sdn sdu ...`.
/// The up component is the refractometry bias.
#[derive(Debug, Clone)]
pub struct RtkPosParser {
    /// Retained solution state (1: fixed)
    pub ambiguity_state: u8,
    pub max_uncertainty_m: Option<f64>,
}

impl Default for RtkPosParser {
    fn default() -> Self {
        Self {
            ambiguity_state: 1,
            max_uncertainty_m: None,
        }
    }
}

impl RtkPosParser {
    const UP: usize = 2;
    const Q: usize = 3;
    const SDU: usize = 7;
}

impl RecordParser for RtkPosParser {
    fn parse_line(&self, line: &str) -> Result<Option<Sample>, Error> {
        let items = fields(line);
        let (epoch, offset) = leading_epoch(&items)?;

        let items = &items[offset..];
        if items.len() <= Self::Q {
            return Err(Error::Parse("truncated solution".to_string()));
        }

        let state = items[Self::Q]
            .parse::<u8>()
            .map_err(|_| Error::Parse(format!("invalid solution state \"{}\"", items[Self::Q])))?;

        if state != self.ambiguity_state {
            return Ok(None);
        }

        let up = parse_f64(items[Self::UP])?;
        let sigma = items.get(Self::SDU).map(|s| parse_f64(s)).transpose()?;

        if within_uncertainty(sigma, self.max_uncertainty_m) {
            Ok(Some(Sample::valid(epoch, up)))
        } else {
            Ok(None)
        }
    }
}
