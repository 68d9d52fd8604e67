//! Persistence layer - Settings, profiles and process bindings in SQLite

mod database;

pub use database::Database;
