use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::season_date::SeasonDate;

/// Minimum temperature (°F) at or below which a day counts as a freeze
pub const FREEZING_TEMP_F: i32 = 32;

/// Which group of freeze-date fields an update touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateType {
    /// Current season's observed first/last freeze (code 1)
    Observed,
    /// Climatological normals (code 2)
    Normal,
    /// All-time records (code 3)
    Record,
    /// Archive the last freeze and clear observed dates for a new season (code 4)
    ResetNewSeason,
    /// Clear observed dates without archiving (code 5)
    ResetSameSeason,
    /// Any other code; touches no fields
    Unrecognized(i32),
}

impl UpdateType {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => UpdateType::Observed,
            2 => UpdateType::Normal,
            3 => UpdateType::Record,
            4 => UpdateType::ResetNewSeason,
            5 => UpdateType::ResetSameSeason,
            other => UpdateType::Unrecognized(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            UpdateType::Observed => 1,
            UpdateType::Normal => 2,
            UpdateType::Record => 3,
            UpdateType::ResetNewSeason => 4,
            UpdateType::ResetSameSeason => 5,
            UpdateType::Unrecognized(code) => *code,
        }
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateType::Observed => write!(f, "observed"),
            UpdateType::Normal => write!(f, "normal"),
            UpdateType::Record => write!(f, "record"),
            UpdateType::ResetNewSeason => write!(f, "reset-new-season"),
            UpdateType::ResetSameSeason => write!(f, "reset-same-season"),
            UpdateType::Unrecognized(code) => write!(f, "unrecognized({})", code),
        }
    }
}

/// How a reconciled record reaches the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteMode {
    Insert,
    Update,
}

/// Per-station freeze dates. `None` is a NULL column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreezeDateRecord {
    pub station_id: i32,
    pub early_freeze: Option<SeasonDate>,
    pub late_freeze: Option<SeasonDate>,
    pub norm_early_freeze: Option<SeasonDate>,
    pub norm_late_freeze: Option<SeasonDate>,
    pub last_year_freeze: Option<SeasonDate>,
    pub rec_early_freeze: Option<SeasonDate>,
    pub rec_late_freeze: Option<SeasonDate>,
}

impl FreezeDateRecord {
    pub fn empty(station_id: i32) -> Self {
        Self {
            station_id,
            ..Default::default()
        }
    }
}

// Persistence mapping between nullable DATE columns and application dates.
// Anything short of a complete date is written as NULL.

pub fn to_column(value: Option<SeasonDate>) -> Option<NaiveDate> {
    value.and_then(|date| date.to_naive_date())
}

pub fn from_column(value: Option<NaiveDate>) -> Option<SeasonDate> {
    value.map(SeasonDate::Complete)
}

/// Raw `freeze_dates` row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FreezeDateRow {
    pub station_id: i32,
    pub early_freeze: Option<NaiveDate>,
    pub late_freeze: Option<NaiveDate>,
    pub norm_early_freeze: Option<NaiveDate>,
    pub norm_late_freeze: Option<NaiveDate>,
    pub last_year_freeze: Option<NaiveDate>,
    pub rec_early_freeze: Option<NaiveDate>,
    pub rec_late_freeze: Option<NaiveDate>,
}

impl From<FreezeDateRow> for FreezeDateRecord {
    fn from(row: FreezeDateRow) -> Self {
        Self {
            station_id: row.station_id,
            early_freeze: from_column(row.early_freeze),
            late_freeze: from_column(row.late_freeze),
            norm_early_freeze: from_column(row.norm_early_freeze),
            norm_late_freeze: from_column(row.norm_late_freeze),
            last_year_freeze: from_column(row.last_year_freeze),
            rec_early_freeze: from_column(row.rec_early_freeze),
            rec_late_freeze: from_column(row.rec_late_freeze),
        }
    }
}

impl From<&FreezeDateRecord> for FreezeDateRow {
    fn from(record: &FreezeDateRecord) -> Self {
        Self {
            station_id: record.station_id,
            early_freeze: to_column(record.early_freeze),
            late_freeze: to_column(record.late_freeze),
            norm_early_freeze: to_column(record.norm_early_freeze),
            norm_late_freeze: to_column(record.norm_late_freeze),
            last_year_freeze: to_column(record.last_year_freeze),
            rec_early_freeze: to_column(record.rec_early_freeze),
            rec_late_freeze: to_column(record.rec_late_freeze),
        }
    }
}

/// One of the three column sets the retrieval queries read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetrievalModule {
    /// Observed early and late freeze
    Observed = 1,
    /// Normal and record early/late freeze
    NormalAndRecord = 2,
    /// Observed early freeze and the previous season's late freeze
    SeasonTransition = 3,
}

impl RetrievalModule {
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

impl TryFrom<i32> for RetrievalModule {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(RetrievalModule::Observed),
            2 => Ok(RetrievalModule::NormalAndRecord),
            3 => Ok(RetrievalModule::SeasonTransition),
            other => Err(other),
        }
    }
}

/// Columns returned by one retrieval query, already placed into slot order.
/// Slot 2 stays `None` for modules that only fill slot 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModuleDates {
    pub first_freeze_1: Option<NaiveDate>,
    pub last_freeze_1: Option<NaiveDate>,
    pub first_freeze_2: Option<NaiveDate>,
    pub last_freeze_2: Option<NaiveDate>,
}
