use tracing::debug;

use crate::db::{FreezeDateRecord, UpdateType, WriteMode};
use crate::season_date::{SeasonDate, SeasonDates};

/// Result of reconciling a candidate date pair against the stored record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Values to write, in full
    pub record: FreezeDateRecord,
    pub mode: WriteMode,
    /// Dates handed back to the caller. For observed updates a stored value
    /// that wins replaces the caller's candidate.
    pub dates: SeasonDates,
}

/// Decide the new freeze-date fields for a station.
///
/// With an existing record the result is an update of all seven columns;
/// without one it is an insert populated only from complete candidates.
/// Pure: no I/O happens here.
pub fn reconcile(
    existing: Option<FreezeDateRecord>,
    station_id: i32,
    update_type: UpdateType,
    candidate: SeasonDates,
) -> Reconciliation {
    match existing {
        Some(record) => reconcile_existing(record, update_type, candidate),
        None => reconcile_new(station_id, update_type, candidate),
    }
}

/// Replace a season's observed dates with freshly derived ones.
///
/// Equivalent to a same-season reset followed by an observed update, folded
/// into one record so the caller issues a single write. An insert is kept as
/// an insert.
pub fn rebuild_observed(
    existing: Option<FreezeDateRecord>,
    station_id: i32,
    derived: SeasonDates,
) -> Reconciliation {
    let reset = reconcile(
        existing,
        station_id,
        UpdateType::ResetSameSeason,
        SeasonDates::missing(),
    );
    let observed = reconcile_existing(reset.record, UpdateType::Observed, derived);

    Reconciliation {
        mode: reset.mode,
        ..observed
    }
}

fn reconcile_existing(
    mut record: FreezeDateRecord,
    update_type: UpdateType,
    candidate: SeasonDates,
) -> Reconciliation {
    let mut dates = candidate;

    match update_type {
        UpdateType::Observed => {
            let stored_early = record.early_freeze.unwrap_or_default();
            if adopts_early(&candidate.start, &stored_early) {
                record.early_freeze = Some(candidate.start);
            } else {
                dates.start = stored_early;
            }

            let stored_late = record.late_freeze.unwrap_or_default();
            if adopts_late(&candidate.end, &stored_late) {
                record.late_freeze = Some(candidate.end);
            } else {
                dates.end = stored_late;
            }
        }
        UpdateType::Normal => {
            record.norm_early_freeze = replace_or_clear(candidate.start);
            record.norm_late_freeze = replace_or_clear(candidate.end);
        }
        UpdateType::Record => {
            record.rec_early_freeze = replace_or_clear(candidate.start);
            record.rec_late_freeze = replace_or_clear(candidate.end);
        }
        UpdateType::ResetNewSeason => {
            record.last_year_freeze = record.late_freeze.take();
            record.early_freeze = None;
        }
        UpdateType::ResetSameSeason => {
            record.early_freeze = None;
            record.late_freeze = None;
        }
        UpdateType::Unrecognized(code) => {
            debug!("No field changes for freeze date update type {}", code);
        }
    }

    Reconciliation {
        record,
        mode: WriteMode::Update,
        dates,
    }
}

fn reconcile_new(
    station_id: i32,
    update_type: UpdateType,
    candidate: SeasonDates,
) -> Reconciliation {
    let mut record = FreezeDateRecord::empty(station_id);
    let start = candidate.start.is_complete().then_some(candidate.start);
    let end = candidate.end.is_complete().then_some(candidate.end);

    match update_type {
        UpdateType::Observed => {
            record.early_freeze = start;
            record.late_freeze = end;
        }
        UpdateType::Normal => {
            record.norm_early_freeze = start;
            record.norm_late_freeze = end;
        }
        UpdateType::Record => {
            record.rec_early_freeze = start;
            record.rec_late_freeze = end;
        }
        other => {
            debug!("No insert values for freeze date update type {}", other);
        }
    }

    Reconciliation {
        record,
        mode: WriteMode::Insert,
        dates: candidate,
    }
}

/// A stored first freeze is replaced when it has no year or the candidate is
/// season-earlier, and never by an incomplete candidate
fn adopts_early(candidate: &SeasonDate, stored: &SeasonDate) -> bool {
    (stored.year().is_none() || candidate.is_before(stored)) && !candidate.is_partial_missing()
}

fn adopts_late(candidate: &SeasonDate, stored: &SeasonDate) -> bool {
    (stored.year().is_none() || candidate.is_after(stored)) && !candidate.is_partial_missing()
}

/// Normals and records take the candidate as-is; an incomplete one clears the column
fn replace_or_clear(candidate: SeasonDate) -> Option<SeasonDate> {
    candidate.is_complete().then_some(candidate)
}
