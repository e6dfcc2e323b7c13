use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::db::{from_column, DbError, FreezeDateStore, RetrievalModule, UpdateType};
use crate::season_date::{FreezeSeason, SeasonDate, SeasonDates};
use crate::services::retriever::{retrieval_steps, FreezeDateSlots};

/// First and last freeze found in daily observations. `None` means no
/// qualifying observation (a NULL, not a missing date).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DerivedFreezeDates {
    pub first_freeze: Option<SeasonDate>,
    pub last_freeze: Option<SeasonDate>,
}

impl DerivedFreezeDates {
    /// Candidate pair for an observed update, absent values becoming `Missing`
    pub fn to_season_dates(&self) -> SeasonDates {
        SeasonDates::new(
            self.first_freeze.unwrap_or_default(),
            self.last_freeze.unwrap_or_default(),
        )
    }
}

#[derive(Clone)]
pub struct FreezeDateService<S> {
    store: S,
}

impl<S: FreezeDateStore> FreezeDateService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reconcile a candidate date pair into the station's record.
    ///
    /// Returns the dates the caller should treat as authoritative: for an
    /// observed update, a stored extreme that beats the candidate comes back
    /// in place of it.
    #[instrument(skip(self), fields(update_type = %update_type))]
    pub async fn update_freeze_dates(
        &self,
        station_id: i32,
        update_type: UpdateType,
        dates: SeasonDates,
    ) -> Result<SeasonDates, DbError> {
        let result = self
            .store
            .update_freeze_dates(station_id, update_type, dates)
            .await?;
        debug!(
            "Freeze dates for station {} now {} / {}",
            station_id, result.start, result.end
        );
        Ok(result)
    }

    /// First and last freeze in `range` (inclusive) from daily minimum temperatures.
    ///
    /// Counts qualifying days first so that "no freezing days" is told apart
    /// from an aggregate that came back NULL.
    #[instrument(skip(self))]
    pub async fn derive_freeze_dates(
        &self,
        station_id: i32,
        range: SeasonDates,
    ) -> Result<DerivedFreezeDates, DbError> {
        let (Some(start), Some(end)) = (range.start.to_naive_date(), range.end.to_naive_date())
        else {
            warn!(
                "Cannot derive freeze dates over incomplete range {} to {}",
                range.start, range.end
            );
            return Ok(DerivedFreezeDates::default());
        };

        let count = self
            .store
            .count_freezing_days(station_id, start, end)
            .await?;
        if count == 0 {
            debug!("No freezing days for station {} in range", station_id);
            return Ok(DerivedFreezeDates::default());
        }

        match self.store.freeze_date_bounds(station_id, start, end).await? {
            Some((first, last)) => Ok(DerivedFreezeDates {
                first_freeze: from_column(first),
                last_freeze: from_column(last),
            }),
            None => {
                warn!(
                    "Empty freeze date bounds for station {} from {} to {} despite {} freezing days",
                    station_id, start, end, count
                );
                Ok(DerivedFreezeDates::default())
            }
        }
    }

    /// Retrieve freeze dates for `module`, starting from all-missing slots
    pub async fn retrieve_freeze_dates(
        &self,
        module: RetrievalModule,
        station_id: i32,
    ) -> Result<FreezeDateSlots, DbError> {
        let mut slots = FreezeDateSlots::default();
        self.retrieve_freeze_dates_into(module, station_id, &mut slots)
            .await?;
        Ok(slots)
    }

    /// Run the retrieval steps for `module` in order, each overwriting the
    /// caller's slots with its non-null columns. A station with no row leaves
    /// the slots untouched.
    #[instrument(skip(self, slots), fields(module = module.code()))]
    pub async fn retrieve_freeze_dates_into(
        &self,
        module: RetrievalModule,
        station_id: i32,
        slots: &mut FreezeDateSlots,
    ) -> Result<(), DbError> {
        for step in retrieval_steps(module) {
            match self.store.fetch_module_dates(station_id, *step).await? {
                Some(dates) => slots.apply(&dates),
                None => warn!(
                    "No freeze dates for station {} in module {}",
                    station_id,
                    step.code()
                ),
            }
        }
        Ok(())
    }

    /// Recompute a season's observed freeze dates from daily observations,
    /// e.g. after a minimum temperature in that season was corrected.
    ///
    /// Derives first/last freeze over the whole season, then clears the
    /// observed dates without archiving and stores the derived ones in a single
    /// write. A failure anywhere leaves the stored record as it was.
    #[instrument(skip(self), fields(season = %season))]
    pub async fn redetermine_season(
        &self,
        station_id: i32,
        season: FreezeSeason,
    ) -> Result<SeasonDates, DbError> {
        let derived = self.derive_freeze_dates(station_id, season.dates()).await?;
        let stored = self
            .store
            .replace_observed_dates(station_id, derived.to_season_dates())
            .await?;

        info!(
            "Redetermined freeze dates for station {} season {}: {} / {}",
            station_id, season, stored.start, stored.end
        );
        Ok(stored)
    }
}
