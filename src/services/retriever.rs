use serde::{Deserialize, Serialize};

use crate::db::{ModuleDates, RetrievalModule};
use crate::season_date::SeasonDate;

/// Caller-visible freeze date slots filled by retrieval. Every slot starts
/// `Missing` and keeps that value unless a query returns a non-null column for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreezeDateSlots {
    pub first_freeze_1: SeasonDate,
    pub last_freeze_1: SeasonDate,
    pub first_freeze_2: SeasonDate,
    pub last_freeze_2: SeasonDate,
}

impl FreezeDateSlots {
    /// Overwrite slots with every non-null column from one module's query
    pub fn apply(&mut self, dates: &ModuleDates) {
        let targets = [
            (&mut self.first_freeze_1, dates.first_freeze_1),
            (&mut self.last_freeze_1, dates.last_freeze_1),
            (&mut self.first_freeze_2, dates.first_freeze_2),
            (&mut self.last_freeze_2, dates.last_freeze_2),
        ];
        for (slot, value) in targets {
            if let Some(date) = value {
                *slot = SeasonDate::Complete(date);
            }
        }
    }
}

/// Queries run for a requested module, in order.
///
/// Requesting a module runs it and every higher-numbered module after it, so
/// later modules overwrite the shared slot 1. Requesting `Observed` therefore
/// leaves slot 1 holding the `SeasonTransition` columns when those are non-null.
// NOTE: this cascade needs product-owner sign-off before anything starts
// depending on module 1 alone filling slot 1.
pub fn retrieval_steps(module: RetrievalModule) -> &'static [RetrievalModule] {
    use RetrievalModule::*;
    match module {
        Observed => &[Observed, NormalAndRecord, SeasonTransition],
        NormalAndRecord => &[NormalAndRecord, SeasonTransition],
        SeasonTransition => &[SeasonTransition],
    }
}
