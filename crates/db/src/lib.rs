//! quizhub-db – Persistenz-Schicht
//!
//! Zwei voneinander unabhaengige Stores, beide hinter Repository-Traits:
//! - [`ButtonRepository`]: Registry der Hardware-Buttons (SQLite via sqlx)
//! - [`PresentationRepository`]: Praesentationen und Folien-Konfiguration
//!   als JSON-Dokument mit atomaren Schreibvorgaengen

pub mod error;
pub mod models;
pub mod presentations;
pub mod repository;
pub mod sqlite;

pub use error::DbError;
pub use models::{
    mac_normalisieren, ButtonRecord, ButtonZuordnung, PresentationRecord, SlideConfig, SlideInfo,
};
pub use presentations::JsonPresentationStore;
pub use repository::{ButtonRepository, DatabaseConfig, DbResult, PresentationRepository};
pub use sqlite::SqliteDb;
