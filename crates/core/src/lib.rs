//! quizhub-core – Gemeinsame Typen, Events und Fehlerkategorien
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen quizhub-Crates gemeinsam genutzt werden.

pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{Fehlerkategorie, UngueltigerRaumCode};
pub use event::QuizEvent;
pub use types::{ConnectionId, RoomCode, TeamId};
