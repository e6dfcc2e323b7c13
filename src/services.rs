pub mod freeze_date_service;
pub mod reconciler;
pub mod retriever;

pub use freeze_date_service::{DerivedFreezeDates, FreezeDateService};
pub use reconciler::{rebuild_observed, reconcile, Reconciliation};
pub use retriever::{retrieval_steps, FreezeDateSlots};
