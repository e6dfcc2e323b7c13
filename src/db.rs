pub mod error;
pub mod freeze_date_repository;
pub mod models;
pub mod pool;

pub use error::{DbError, QueryContext};
pub use freeze_date_repository::{FreezeDateStore, PgFreezeDateRepository};
pub use models::*;
pub use pool::DbPool;
