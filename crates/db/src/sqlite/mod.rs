//! SQLite-Backend fuer die Button-Registry

pub mod buttons;
pub mod pool;

pub use pool::SqliteDb;
