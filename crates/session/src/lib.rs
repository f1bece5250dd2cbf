//! quizhub-session – Raum- und Sitzungs-Engine
//!
//! Dieser Crate haelt den gesamten Live-Zustand: Raeume, Teams, die offene
//! Frage mit ihrem Antwort-Ledger und die Verbindungen pro Raum.
//!
//! ## Architektur
//!
//! ```text
//! WebSocket / REST (quizhub-api)
//!     |
//!     +-- MessageDispatcher (Client-Nachrichten, Rollenpruefung)
//!     +-- PressRouter       (Hardware-Button -> Raum/Team)
//!     |
//!     v
//! SessionEngine  – DashMap<RoomCode, Arc<RaumHandle>>
//!     |
//!     v
//! RaumHandle     – RwLock<Room>: Teams, Frage, Ledger, VerbindungsHub
//!     |
//!     v
//! VerbindungsHub – bounded mpsc pro Verbindung, try_send-Fan-out
//! ```

pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod hub;
pub mod messages;
pub mod press_router;
pub mod room;

// Bequeme Re-Exporte
pub use config::SitzungsKonfig;
pub use dispatcher::{MessageDispatcher, VerbindungsKontext};
pub use engine::{RaumHandle, SessionEngine};
pub use error::{SessionError, SessionResult};
pub use hub::{Rolle, VerbindungsEmpfaenger};
pub use messages::{ClientMessage, RaumSnapshot, ServerMessage, TeamStand};
pub use press_router::{DruckErgebnis, PressRouter};
pub use room::FrageParameter;
