use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, PgPool, Row};
use tracing::{debug, info, instrument, warn};

use crate::db::{
    DbError, FreezeDateRecord, FreezeDateRow, ModuleDates, QueryContext, RetrievalModule,
    UpdateType, WriteMode, FREEZING_TEMP_F,
};
use crate::season_date::SeasonDates;
use crate::services::reconciler::{rebuild_observed, reconcile, Reconciliation};

const SELECT_RECORD_SQL: &str = r#"
    SELECT station_id, early_freeze, late_freeze, norm_early_freeze, norm_late_freeze,
           last_year_freeze, rec_early_freeze, rec_late_freeze
    FROM freeze_dates
    WHERE station_id = $1
"#;

const SELECT_RECORD_FOR_UPDATE_SQL: &str = r#"
    SELECT station_id, early_freeze, late_freeze, norm_early_freeze, norm_late_freeze,
           last_year_freeze, rec_early_freeze, rec_late_freeze
    FROM freeze_dates
    WHERE station_id = $1
    FOR UPDATE
"#;

const INSERT_RECORD_SQL: &str = r#"
    INSERT INTO freeze_dates
        (station_id, early_freeze, late_freeze, norm_early_freeze, norm_late_freeze,
         last_year_freeze, rec_early_freeze, rec_late_freeze)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
"#;

const UPDATE_RECORD_SQL: &str = r#"
    UPDATE freeze_dates
    SET early_freeze = $2,
        late_freeze = $3,
        norm_early_freeze = $4,
        norm_late_freeze = $5,
        last_year_freeze = $6,
        rec_early_freeze = $7,
        rec_late_freeze = $8
    WHERE station_id = $1
"#;

const COUNT_FREEZING_DAYS_SQL: &str = r#"
    SELECT COUNT(obs_date)
    FROM daily_climate
    WHERE station_id = $1
      AND min_temp <= $2
      AND obs_date BETWEEN $3 AND $4
"#;

const FREEZE_DATE_BOUNDS_SQL: &str = r#"
    SELECT MIN(obs_date), MAX(obs_date)
    FROM daily_climate
    WHERE station_id = $1
      AND min_temp <= $2
      AND obs_date BETWEEN $3 AND $4
"#;

const OBSERVED_DATES_SQL: &str = r#"
    SELECT early_freeze, late_freeze
    FROM freeze_dates
    WHERE station_id = $1
"#;

const NORMAL_AND_RECORD_DATES_SQL: &str = r#"
    SELECT norm_early_freeze, norm_late_freeze, rec_early_freeze, rec_late_freeze
    FROM freeze_dates
    WHERE station_id = $1
"#;

const SEASON_TRANSITION_DATES_SQL: &str = r#"
    SELECT early_freeze, last_year_freeze
    FROM freeze_dates
    WHERE station_id = $1
"#;

/// Storage for freeze-date records and the daily observations they derive from.
///
/// Each method is a single statement. `update_freeze_dates` and
/// `replace_observed_dates` are read-modify-write: implementations backed by a
/// shared database must run them inside one transaction, otherwise concurrent
/// updates for the same station resolve as last-writer-wins.
#[async_trait]
pub trait FreezeDateStore: Send + Sync {
    async fn find_record(&self, station_id: i32) -> Result<Option<FreezeDateRecord>, DbError>;

    /// Write every column of `record` with a single INSERT or UPDATE
    async fn write_record(&self, record: &FreezeDateRecord, mode: WriteMode)
        -> Result<(), DbError>;

    /// Days in `[start, end]` with a minimum temperature at or below freezing
    async fn count_freezing_days(
        &self,
        station_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<i64, DbError>;

    /// Earliest and latest freezing day in `[start, end]`. `None` when the
    /// aggregate query returned no row at all.
    async fn freeze_date_bounds(
        &self,
        station_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<(Option<NaiveDate>, Option<NaiveDate>)>, DbError>;

    /// Run one retrieval module's query. `None` when the station has no row.
    async fn fetch_module_dates(
        &self,
        station_id: i32,
        module: RetrievalModule,
    ) -> Result<Option<ModuleDates>, DbError>;

    /// Load the station's record, reconcile the candidate dates against it and
    /// write the result back. Returns the dates the caller should see.
    async fn update_freeze_dates(
        &self,
        station_id: i32,
        update_type: UpdateType,
        dates: SeasonDates,
    ) -> Result<SeasonDates, DbError> {
        let existing = self.find_record(station_id).await?;
        let outcome = reconcile(existing, station_id, update_type, dates);
        self.write_record(&outcome.record, outcome.mode).await?;
        Ok(outcome.dates)
    }

    /// Clear the station's observed dates and store `derived` in their place
    /// with one write. Nothing changes if the read or the write fails.
    async fn replace_observed_dates(
        &self,
        station_id: i32,
        derived: SeasonDates,
    ) -> Result<SeasonDates, DbError> {
        let existing = self.find_record(station_id).await?;
        let outcome = rebuild_observed(existing, station_id, derived);
        self.write_record(&outcome.record, outcome.mode).await?;
        Ok(outcome.dates)
    }
}

#[derive(Clone)]
pub struct PgFreezeDateRepository {
    pool: PgPool,
}

impl PgFreezeDateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn select_record<'e, E>(
        executor: E,
        sql: &'static str,
        station_id: i32,
    ) -> Result<Option<FreezeDateRecord>, DbError>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, FreezeDateRow>(sql)
            .bind(station_id)
            .fetch_optional(executor)
            .await
            .map_err(|e| {
                DbError::from_sqlx(QueryContext::new(sql).param("station_id", station_id), e)
            })?;

        Ok(row.map(FreezeDateRecord::from))
    }

    async fn write_row<'e, E>(
        executor: E,
        record: &FreezeDateRecord,
        mode: WriteMode,
    ) -> Result<u64, DbError>
    where
        E: PgExecutor<'e>,
    {
        let sql = match mode {
            WriteMode::Insert => INSERT_RECORD_SQL,
            WriteMode::Update => UPDATE_RECORD_SQL,
        };
        let row = FreezeDateRow::from(record);

        let result = sqlx::query(sql)
            .bind(row.station_id)
            .bind(row.early_freeze)
            .bind(row.late_freeze)
            .bind(row.norm_early_freeze)
            .bind(row.norm_late_freeze)
            .bind(row.last_year_freeze)
            .bind(row.rec_early_freeze)
            .bind(row.rec_late_freeze)
            .execute(executor)
            .await
            .map_err(|e| DbError::from_sqlx(write_context(sql, &row), e))?;

        Ok(result.rows_affected())
    }

    /// Reconcile and write inside one transaction, locking the station's row
    /// for the duration
    #[instrument(skip(self), fields(update_type = %update_type))]
    pub async fn update_freeze_dates_atomic(
        &self,
        station_id: i32,
        update_type: UpdateType,
        dates: SeasonDates,
    ) -> Result<SeasonDates, DbError> {
        self.in_locked_transaction(station_id, |existing| {
            reconcile(existing, station_id, update_type, dates)
        })
        .await
    }

    /// Swap in re-derived observed dates inside one transaction
    #[instrument(skip(self))]
    pub async fn replace_observed_dates_atomic(
        &self,
        station_id: i32,
        derived: SeasonDates,
    ) -> Result<SeasonDates, DbError> {
        self.in_locked_transaction(station_id, |existing| {
            rebuild_observed(existing, station_id, derived)
        })
        .await
    }

    async fn in_locked_transaction<F>(
        &self,
        station_id: i32,
        decide: F,
    ) -> Result<SeasonDates, DbError>
    where
        F: FnOnce(Option<FreezeDateRecord>) -> Reconciliation + Send,
    {
        let mut tx = self.pool.begin().await.map_err(|e| {
            DbError::from_sqlx(QueryContext::new("BEGIN").param("station_id", station_id), e)
        })?;

        let existing =
            Self::select_record(&mut *tx, SELECT_RECORD_FOR_UPDATE_SQL, station_id).await?;
        let outcome = decide(existing);
        Self::write_row(&mut *tx, &outcome.record, outcome.mode).await?;

        tx.commit().await.map_err(|e| {
            DbError::from_sqlx(QueryContext::new("COMMIT").param("station_id", station_id), e)
        })?;

        info!(
            "Committed {:?} of freeze dates for station {}",
            outcome.mode, station_id
        );
        Ok(outcome.dates)
    }
}

fn write_context(sql: &'static str, row: &FreezeDateRow) -> QueryContext {
    QueryContext::new(sql)
        .param("station_id", row.station_id)
        .nullable_param("early_freeze", row.early_freeze)
        .nullable_param("late_freeze", row.late_freeze)
        .nullable_param("norm_early_freeze", row.norm_early_freeze)
        .nullable_param("norm_late_freeze", row.norm_late_freeze)
        .nullable_param("last_year_freeze", row.last_year_freeze)
        .nullable_param("rec_early_freeze", row.rec_early_freeze)
        .nullable_param("rec_late_freeze", row.rec_late_freeze)
}

fn range_context(sql: &'static str, station_id: i32, start: NaiveDate, end: NaiveDate) -> QueryContext {
    QueryContext::new(sql)
        .param("station_id", station_id)
        .param("min_temp", FREEZING_TEMP_F)
        .param("start_date", start)
        .param("end_date", end)
}

fn date_column(row: &PgRow, index: usize, context: &QueryContext) -> Result<Option<NaiveDate>, DbError> {
    row.try_get::<Option<NaiveDate>, _>(index)
        .map_err(|e| DbError::from_sqlx(context.clone(), e))
}

#[async_trait]
impl FreezeDateStore for PgFreezeDateRepository {
    #[instrument(skip(self))]
    async fn find_record(&self, station_id: i32) -> Result<Option<FreezeDateRecord>, DbError> {
        debug!("Querying freeze dates for station {}", station_id);
        let record = Self::select_record(&self.pool, SELECT_RECORD_SQL, station_id).await?;

        if record.is_some() {
            debug!("Found freeze date record");
        } else {
            debug!("No freeze date record for station {}", station_id);
        }
        Ok(record)
    }

    #[instrument(skip(self, record), fields(station_id = record.station_id))]
    async fn write_record(
        &self,
        record: &FreezeDateRecord,
        mode: WriteMode,
    ) -> Result<(), DbError> {
        let affected = Self::write_row(&self.pool, record, mode).await?;
        info!(
            "{:?} of freeze dates for station {} affected {} row(s)",
            mode, record.station_id, affected
        );
        Ok(())
    }

    #[instrument(skip(self))]
    async fn count_freezing_days(
        &self,
        station_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>(COUNT_FREEZING_DAYS_SQL)
            .bind(station_id)
            .bind(FREEZING_TEMP_F)
            .bind(start)
            .bind(end)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                DbError::from_sqlx(range_context(COUNT_FREEZING_DAYS_SQL, station_id, start, end), e)
            })?;

        debug!("Found {} freezing days from {} to {}", count, start, end);
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn freeze_date_bounds(
        &self,
        station_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<(Option<NaiveDate>, Option<NaiveDate>)>, DbError> {
        let bounds = sqlx::query_as::<_, (Option<NaiveDate>, Option<NaiveDate>)>(
            FREEZE_DATE_BOUNDS_SQL,
        )
        .bind(station_id)
        .bind(FREEZING_TEMP_F)
        .bind(start)
        .bind(end)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DbError::from_sqlx(range_context(FREEZE_DATE_BOUNDS_SQL, station_id, start, end), e)
        })?;

        Ok(bounds)
    }

    #[instrument(skip(self), fields(module = module.code()))]
    async fn fetch_module_dates(
        &self,
        station_id: i32,
        module: RetrievalModule,
    ) -> Result<Option<ModuleDates>, DbError> {
        let sql = match module {
            RetrievalModule::Observed => OBSERVED_DATES_SQL,
            RetrievalModule::NormalAndRecord => NORMAL_AND_RECORD_DATES_SQL,
            RetrievalModule::SeasonTransition => SEASON_TRANSITION_DATES_SQL,
        };
        let context = QueryContext::new(sql).param("station_id", station_id);

        let row = sqlx::query(sql)
            .bind(station_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DbError::from_sqlx(context.clone(), e))?;

        let Some(row) = row else {
            warn!("Empty freeze date results, {}", context);
            return Ok(None);
        };

        let mut dates = ModuleDates {
            first_freeze_1: date_column(&row, 0, &context)?,
            last_freeze_1: date_column(&row, 1, &context)?,
            ..Default::default()
        };
        if module == RetrievalModule::NormalAndRecord {
            dates.first_freeze_2 = date_column(&row, 2, &context)?;
            dates.last_freeze_2 = date_column(&row, 3, &context)?;
        }

        Ok(Some(dates))
    }

    async fn update_freeze_dates(
        &self,
        station_id: i32,
        update_type: UpdateType,
        dates: SeasonDates,
    ) -> Result<SeasonDates, DbError> {
        self.update_freeze_dates_atomic(station_id, update_type, dates)
            .await
    }

    async fn replace_observed_dates(
        &self,
        station_id: i32,
        derived: SeasonDates,
    ) -> Result<SeasonDates, DbError> {
        self.replace_observed_dates_atomic(station_id, derived).await
    }
}
