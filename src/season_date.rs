use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Year written in place of an unknown year
pub const MISSING_YEAR: i32 = 9999;
/// Month or day written in place of an unknown month or day
pub const MISSING_MONTH_DAY: u32 = 99;
/// Years a known component may take. 9999 is reserved for "unknown".
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1..=MISSING_YEAR - 1;

/// First month of a freeze season (July)
const SEASON_START_MONTH: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeasonDateError {
    #[error("Invalid calendar date: {year}-{month}-{day}")]
    InvalidDate { year: i32, month: u32, day: u32 },
    #[error("Year out of range: {0}")]
    InvalidYear(i32),
    #[error("Month out of range: {0}")]
    InvalidMonth(u32),
    #[error("Day out of range: {0}")]
    InvalidDay(u32),
    #[error("Failed to parse date from '{0}', expected YYYY-MM-DD")]
    Parse(String),
}

/// A calendar date as the climate database sees it: fully known, known only in
/// part, or not known at all.
///
/// Incomplete dates are markers meaning "do not use this value". They never
/// compare as earlier or later than anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum SeasonDate {
    #[default]
    Missing,
    PartialMissing {
        year: Option<i32>,
        month: Option<u32>,
        day: Option<u32>,
    },
    Complete(NaiveDate),
}

impl SeasonDate {
    /// Build a date from individually optional components.
    ///
    /// All components absent yields `Missing`, all present must form a valid
    /// calendar date, anything in between is `PartialMissing`. A known year
    /// must lie in [`YEAR_RANGE`] so the value survives its text form.
    pub fn from_parts(
        year: Option<i32>,
        month: Option<u32>,
        day: Option<u32>,
    ) -> Result<Self, SeasonDateError> {
        if let Some(y) = year {
            if !YEAR_RANGE.contains(&y) {
                return Err(SeasonDateError::InvalidYear(y));
            }
        }
        match (year, month, day) {
            (None, None, None) => Ok(SeasonDate::Missing),
            (Some(y), Some(m), Some(d)) => NaiveDate::from_ymd_opt(y, m, d)
                .map(SeasonDate::Complete)
                .ok_or(SeasonDateError::InvalidDate {
                    year: y,
                    month: m,
                    day: d,
                }),
            _ => {
                if let Some(m) = month {
                    if !(1..=12).contains(&m) {
                        return Err(SeasonDateError::InvalidMonth(m));
                    }
                }
                if let Some(d) = day {
                    if !(1..=31).contains(&d) {
                        return Err(SeasonDateError::InvalidDay(d));
                    }
                }
                Ok(SeasonDate::PartialMissing { year, month, day })
            }
        }
    }

    pub fn ymd(year: i32, month: u32, day: u32) -> Result<Self, SeasonDateError> {
        Self::from_parts(Some(year), Some(month), Some(day))
    }

    /// Month and day known, year unknown (the shape of a climatological normal)
    pub fn month_day(month: u32, day: u32) -> Result<Self, SeasonDateError> {
        Self::from_parts(None, Some(month), Some(day))
    }

    /// Map a nullable column value onto the application boundary, NULL becoming `Missing`
    pub fn from_nullable(value: Option<NaiveDate>) -> Self {
        value.map(SeasonDate::Complete).unwrap_or_default()
    }

    pub fn year(&self) -> Option<i32> {
        match self {
            SeasonDate::Missing => None,
            SeasonDate::PartialMissing { year, .. } => *year,
            SeasonDate::Complete(date) => Some(date.year()),
        }
    }

    pub fn month(&self) -> Option<u32> {
        match self {
            SeasonDate::Missing => None,
            SeasonDate::PartialMissing { month, .. } => *month,
            SeasonDate::Complete(date) => Some(date.month()),
        }
    }

    pub fn day(&self) -> Option<u32> {
        match self {
            SeasonDate::Missing => None,
            SeasonDate::PartialMissing { day, .. } => *day,
            SeasonDate::Complete(date) => Some(date.day()),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, SeasonDate::Complete(_))
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, SeasonDate::Missing)
    }

    /// True when any component is unknown. A fully `Missing` date is also
    /// partially missing.
    pub fn is_partial_missing(&self) -> bool {
        !self.is_complete()
    }

    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        match self {
            SeasonDate::Complete(date) => Some(*date),
            _ => None,
        }
    }

    /// Whether this date is an earlier first freeze than `stored`.
    ///
    /// Holds when this date lies in July through December of the year before
    /// `stored` (start of the same freeze season), or in the same calendar year
    /// and calendar-earlier.
    pub fn is_before(&self, stored: &SeasonDate) -> bool {
        match (self, stored) {
            (SeasonDate::Complete(candidate), SeasonDate::Complete(stored)) => {
                (candidate.year() == stored.year() - 1
                    && candidate.month() >= SEASON_START_MONTH)
                    || (candidate.year() == stored.year()
                        && (candidate.month(), candidate.day()) < (stored.month(), stored.day()))
            }
            _ => false,
        }
    }

    /// Whether this date is a later last freeze than `stored`.
    ///
    /// Holds when this date is in the same calendar year and calendar-later,
    /// or in a later year with an earlier month (rolled over into the new
    /// year's early months).
    pub fn is_after(&self, stored: &SeasonDate) -> bool {
        match (self, stored) {
            (SeasonDate::Complete(candidate), SeasonDate::Complete(stored)) => {
                (candidate.year() == stored.year()
                    && (candidate.month(), candidate.day()) > (stored.month(), stored.day()))
                    || (candidate.year() > stored.year() && candidate.month() < stored.month())
            }
            _ => false,
        }
    }
}

impl From<NaiveDate> for SeasonDate {
    fn from(date: NaiveDate) -> Self {
        SeasonDate::Complete(date)
    }
}

/// Renders as `YYYY-MM-DD` with 9999/99 for unknown parts. Only years in
/// [`YEAR_RANGE`] parse back to the same value; a `Complete` built directly
/// from a `NaiveDate` outside it does not.
impl fmt::Display for SeasonDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.year().unwrap_or(MISSING_YEAR),
            self.month().unwrap_or(MISSING_MONTH_DAY),
            self.day().unwrap_or(MISSING_MONTH_DAY)
        )
    }
}

impl FromStr for SeasonDate {
    type Err = SeasonDateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = || SeasonDateError::Parse(s.to_string());
        let mut parts = s.trim().splitn(3, '-');
        let (Some(y), Some(m), Some(d)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(parse_err());
        };

        let year: i32 = y.parse().map_err(|_| parse_err())?;
        let month: u32 = m.parse().map_err(|_| parse_err())?;
        let day: u32 = d.parse().map_err(|_| parse_err())?;

        SeasonDate::from_parts(
            (year != MISSING_YEAR).then_some(year),
            (month != MISSING_MONTH_DAY).then_some(month),
            (day != MISSING_MONTH_DAY).then_some(day),
        )
    }
}

impl From<SeasonDate> for String {
    fn from(date: SeasonDate) -> Self {
        date.to_string()
    }
}

impl TryFrom<String> for SeasonDate {
    type Error = SeasonDateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A start/end pair of dates, used both as a query range and as the
/// first/last freeze pair handed back to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeasonDates {
    pub start: SeasonDate,
    pub end: SeasonDate,
}

impl SeasonDates {
    pub fn new(start: SeasonDate, end: SeasonDate) -> Self {
        Self { start, end }
    }

    pub fn missing() -> Self {
        Self::default()
    }
}

/// The freeze season running July 1 of one year through June 30 of the next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FreezeSeason {
    start: NaiveDate,
    end: NaiveDate,
}

impl FreezeSeason {
    pub fn starting_in(year: i32) -> Option<Self> {
        Some(Self {
            start: NaiveDate::from_ymd_opt(year, SEASON_START_MONTH, 1)?,
            end: NaiveDate::from_ymd_opt(year + 1, SEASON_START_MONTH - 1, 30)?,
        })
    }

    /// Season a given day belongs to
    pub fn containing(date: NaiveDate) -> Option<Self> {
        if date.month() >= SEASON_START_MONTH {
            Self::starting_in(date.year())
        } else {
            Self::starting_in(date.year() - 1)
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn dates(&self) -> SeasonDates {
        SeasonDates::new(self.start.into(), self.end.into())
    }
}

impl fmt::Display for FreezeSeason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.year(), self.end.year())
    }
}
