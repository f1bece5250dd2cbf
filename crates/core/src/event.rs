//! Engine-Ereignisse
//!
//! Die Session-Engine veroeffentlicht jede Zustandsaenderung zusaetzlich als
//! [`QuizEvent`] auf einem tokio-Broadcast-Kanal. Metriken und Logging
//! abonnieren diesen Strom, ohne die Raum-Locks zu beruehren.

use crate::types::{RoomCode, TeamId};
use serde::{Deserialize, Serialize};

/// Alle systemweiten Ereignisse der Session-Engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuizEvent {
    // --- Raum-Ereignisse ---
    /// Ein Raum wurde angelegt
    RaumErstellt { room: RoomCode },
    /// Ein Raum wurde geschlossen oder wegen Leerlauf entfernt
    RaumEntfernt { room: RoomCode, leerlauf: bool },

    // --- Verbindungs-Ereignisse ---
    /// Eine Verbindung wurde registriert
    VerbindungRegistriert { room: RoomCode },
    /// Eine Verbindung wurde entfernt
    ///
    /// `verworfen` ist true wenn die Engine die Verbindung wegen voller
    /// oder geschlossener Send-Queue selbst getrennt hat.
    VerbindungGetrennt { room: RoomCode, verworfen: bool },

    // --- Fragen-Ereignisse ---
    /// Eine Frage wurde geoeffnet
    FrageGeoeffnet { room: RoomCode, generation: u64 },
    /// Eine Frage wurde geschlossen (manuell oder per Timer)
    FrageGeschlossen {
        room: RoomCode,
        generation: u64,
        antworten: usize,
        automatisch: bool,
    },
    /// Eine Antwort wurde angenommen
    AntwortAngenommen {
        room: RoomCode,
        team_id: TeamId,
        rang: u32,
    },
    /// Eine Antwort wurde abgelehnt (`grund` ist der Maschinen-Code)
    AntwortAbgelehnt { room: RoomCode, grund: String },
}
