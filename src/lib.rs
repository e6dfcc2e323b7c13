pub mod config;
pub mod db;
pub mod season_date;
pub mod services;
