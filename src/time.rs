use std::{cmp::Ordering, str::FromStr};

use crate::{
    constants::SECONDS_PER_DAY,
    prelude::{Duration, Epoch, Error},
};

/// Total ordering of [Epoch]s, as we never manipulate NaN epochs
pub(crate) fn epoch_cmp(a: &Epoch, b: &Epoch) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

/// Midnight (UTC) of the day this [Epoch] belongs to
pub fn day_start(t: Epoch) -> Epoch {
    let (y, m, d, _, _, _, _) = t.to_gregorian_utc();
    Epoch::from_gregorian_utc_at_midnight(y, m, d)
}

/// Day of year of this [Epoch] (1 = January 1st)
pub fn day_of_year(t: Epoch) -> u16 {
    let (y, _, _, _, _, _, _) = t.to_gregorian_utc();
    let jan1 = Epoch::from_gregorian_utc_at_midnight(y, 1, 1);
    ((day_start(t) - jan1).to_seconds() / SECONDS_PER_DAY).round() as u16 + 1
}

/// Builds an [Epoch] from year, day of year (1 = January 1st)
/// and fractional UTC hours, as found in reflectometry products.
pub fn from_year_doy(year: i32, doy: u16, utc_hours: f64) -> Result<Epoch, Error> {
    if doy == 0 || doy > 366 {
        return Err(Error::Parse(format!("invalid day of year {}", doy)));
    }
    if !(0.0..=24.0).contains(&utc_hours) {
        return Err(Error::Parse(format!("invalid utc hours {}", utc_hours)));
    }
    let jan1 = Epoch::from_gregorian_utc_at_midnight(year, 1, 1);
    let offset_s = (doy as f64 - 1.0) * SECONDS_PER_DAY + utc_hours * 3600.0;
    Ok(jan1 + Duration::from_seconds(offset_s))
}

/// Parses calendar dates found in products and on the command line:
///  - "YYYY-MM-DD" or "YYYY/MM/DD" (midnight UTC)
///  - followed by "HH:MM", "HH:MM:SS" or "HH:MM:SS.sss", separated by 'T' or white space
///  - any other format is handed to [Epoch::from_str] (like "2022-01-01T00:00:00 GPST")
pub fn parse_epoch(content: &str) -> Result<Epoch, Error> {
    let content = content.trim();

    let (date, time) = match content.find(|c: char| c == 'T' || c.is_whitespace()) {
        Some(offset) => (&content[..offset], content[offset + 1..].trim()),
        None => (content, ""),
    };

    let items = date.split(['-', '/']).collect::<Vec<_>>();

    if items.len() != 3 || time.contains(' ') {
        return Epoch::from_str(content)
            .map_err(|e| Error::Parse(format!("invalid date \"{}\": {}", content, e)));
    }

    let year = items[0]
        .parse::<i32>()
        .map_err(|_| Error::Parse(format!("invalid year \"{}\"", content)))?;
    let month = items[1]
        .parse::<u8>()
        .map_err(|_| Error::Parse(format!("invalid month \"{}\"", content)))?;
    let day = items[2]
        .parse::<u8>()
        .map_err(|_| Error::Parse(format!("invalid day \"{}\"", content)))?;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(Error::Parse(format!("invalid date \"{}\"", content)));
    }

    if time.is_empty() {
        return Ok(Epoch::from_gregorian_utc_at_midnight(year, month, day));
    }

    let hms = time.split(':').collect::<Vec<_>>();
    if hms.len() < 2 || hms.len() > 3 {
        return Err(Error::Parse(format!("invalid time \"{}\"", content)));
    }

    let hours = hms[0]
        .parse::<u8>()
        .map_err(|_| Error::Parse(format!("invalid hours \"{}\"", content)))?;
    let minutes = hms[1]
        .parse::<u8>()
        .map_err(|_| Error::Parse(format!("invalid minutes \"{}\"", content)))?;
    let seconds = match hms.get(2) {
        Some(s) => s
            .parse::<f64>()
            .map_err(|_| Error::Parse(format!("invalid seconds \"{}\"", content)))?,
        None => 0.0,
    };

    if hours > 23 || minutes > 59 || !(0.0..60.0).contains(&seconds) {
        return Err(Error::Parse(format!("invalid time \"{}\"", content)));
    }

    let whole = seconds.trunc();
    let nanos = ((seconds - whole) * 1.0E9).round() as u32;

    Ok(Epoch::from_gregorian_utc(
        year,
        month,
        day,
        hours,
        minutes,
        whole as u8,
        nanos.min(999_999_999),
    ))
}

/// Inclusive range of processing days
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DateRange {
    /// First day (midnight UTC)
    pub start: Epoch,
    /// Last day (midnight UTC), included
    pub end: Epoch,
}

impl DateRange {
    /// Builds a new [DateRange], both [Epoch]s are rounded down to midnight.
    pub fn new(start: Epoch, end: Epoch) -> Result<Self, Error> {
        let (start, end) = (day_start(start), day_start(end));
        if end < start {
            return Err(Error::InvalidGrid(format!(
                "date range ends ({}) prior its start ({})",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Parses two calendar dates
    pub fn parse(start: &str, end: &str) -> Result<Self, Error> {
        Self::new(parse_epoch(start)?, parse_epoch(end)?)
    }

    /// Iterates over each day of the range
    pub fn days(&self) -> impl Iterator<Item = Epoch> + '_ {
        let one_day = Duration::from_seconds(SECONDS_PER_DAY);
        std::iter::successors(Some(self.start), move |t| {
            let next = *t + one_day;
            if next <= self.end {
                Some(next)
            } else {
                None
            }
        })
    }

    /// Number of days in this range
    pub fn num_days(&self) -> usize {
        self.days().count()
    }

    /// End of the range (exclusive): midnight following the last day
    pub fn end_exclusive(&self) -> Epoch {
        self.end + Duration::from_seconds(SECONDS_PER_DAY)
    }

    /// True if this [Epoch] falls on any day of the range
    pub fn contains(&self, t: Epoch) -> bool {
        t >= self.start && t < self.end_exclusive()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn calendar_dates() {
        let t0 = Epoch::from_gregorian_utc_at_midnight(2022, 3, 4);
        assert_eq!(parse_epoch("2022-03-04").unwrap(), t0);
        assert_eq!(parse_epoch("2022/03/04").unwrap(), t0);
        assert_eq!(
            parse_epoch("2022/03/04 00:15:00.000").unwrap(),
            t0 + Duration::from_seconds(900.0)
        );
        assert_eq!(
            parse_epoch("2022-03-04T12:30").unwrap(),
            t0 + Duration::from_seconds(12.5 * 3600.0)
        );
        assert!(parse_epoch("2022-13-04").is_err());
        assert!(parse_epoch("not a date").is_err());
    }

    #[test]
    fn day_of_year() {
        let t = from_year_doy(2022, 32, 6.0).unwrap();
        assert_eq!(
            t,
            Epoch::from_gregorian_utc(2022, 2, 1, 6, 0, 0, 0)
        );
        assert_eq!(day_start(t), Epoch::from_gregorian_utc_at_midnight(2022, 2, 1));
        assert!(from_year_doy(2022, 0, 0.0).is_err());
        assert_eq!(super::day_of_year(t), 32);
        assert_eq!(
            super::day_of_year(Epoch::from_gregorian_utc(2020, 12, 31, 23, 0, 0, 0)),
            366
        );
    }

    #[test]
    fn date_range() {
        let range = DateRange::parse("2022-01-30", "2022-02-02").unwrap();
        assert_eq!(range.num_days(), 4);
        assert!(range.contains(parse_epoch("2022-02-02 23:59:59").unwrap()));
        assert!(!range.contains(parse_epoch("2022-02-03").unwrap()));
        assert!(DateRange::parse("2022-02-02", "2022-01-30").is_err());
    }
}
