//! Fehlertypen fuer die Sitzungs-Engine
//!
//! Jede Variante hat einen stabilen Maschinen-Code (`code()`), der
//! unveraendert an WebSocket- und REST-Clients geht.

use quizhub_core::{Fehlerkategorie, RoomCode, TeamId};
use quizhub_db::DbError;
use thiserror::Error;

/// Fehlertyp fuer alle Engine-Operationen
#[derive(Debug, Error)]
pub enum SessionError {
    /// Raum existiert nicht (oder wurde geschlossen)
    #[error("Raum nicht gefunden: {0}")]
    RaumNichtGefunden(RoomCode),

    /// Team existiert nicht oder wurde entfernt
    #[error("Team nicht gefunden: {0}")]
    TeamNichtGefunden(TeamId),

    /// Keine offene Frage (nie geoeffnet, geschlossen oder Zeit abgelaufen)
    #[error("Keine aktive Frage")]
    FrageNichtAktiv,

    /// Team hat fuer diese Frage bereits geantwortet
    #[error("Team hat bereits geantwortet")]
    DoppelteAntwort,

    /// Button ist registriert, aber keinem Raum/Team zugeordnet
    #[error("Button ist keinem Team zugeordnet: {0}")]
    NichtZugeordnet(String),

    /// Button ist nicht registriert
    #[error("Unbekannter Button: {0}")]
    UnbekannterButton(String),

    /// Button ist deaktiviert
    #[error("Button ist deaktiviert: {0}")]
    ButtonInaktiv(String),

    /// Bewertung ist erst nach dem Schliessen der Frage moeglich
    #[error("Frage ist noch offen")]
    FrageNochOffen,

    /// Team hat fuer die aktuelle Frage keinen Ledger-Eintrag
    #[error("Kein Ledger-Eintrag fuer Team {0}")]
    KeinLedgerEintrag(TeamId),

    /// Ledger-Eintrag wurde bereits bewertet
    #[error("Antwort von Team {0} wurde bereits bewertet")]
    BereitsBewertet(TeamId),

    /// Ungueltige Eingabe (leerer Name, unerlaubtes Kommando, ...)
    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    /// Fehler der Button-Registry oder des Praesentations-Stores
    #[error("Registry-Fehler: {0}")]
    Registry(#[from] DbError),

    /// Verletzte interne Invariante
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl SessionError {
    /// Erstellt einen internen Fehler
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Erstellt einen Eingabefehler
    pub fn ungueltig(msg: impl Into<String>) -> Self {
        Self::UngueltigeEingabe(msg.into())
    }

    /// Stabiler Maschinen-Code fuer Clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::RaumNichtGefunden(_) => "RoomNotFound",
            Self::TeamNichtGefunden(_) => "TeamNotFound",
            Self::FrageNichtAktiv => "QuestionNotActive",
            Self::DoppelteAntwort => "DuplicateAnswer",
            Self::NichtZugeordnet(_) => "NotAssigned",
            Self::UnbekannterButton(_) => "UnknownButton",
            Self::ButtonInaktiv(_) => "InactiveButton",
            Self::FrageNochOffen => "QuestionStillOpen",
            Self::KeinLedgerEintrag(_) => "NoLedgerEntry",
            Self::BereitsBewertet(_) => "AlreadyJudged",
            Self::UngueltigeEingabe(_) => "InvalidInput",
            Self::Registry(DbError::NichtGefunden(_)) => "NotFound",
            Self::Registry(e) if e.ist_client_fehler() => "InvalidInput",
            Self::Registry(_) | Self::Intern(_) => "Internal",
        }
    }

    /// Einordnung in die Fehler-Taxonomie
    pub fn kategorie(&self) -> Fehlerkategorie {
        match self {
            Self::RaumNichtGefunden(_)
            | Self::TeamNichtGefunden(_)
            | Self::UnbekannterButton(_)
            | Self::KeinLedgerEintrag(_) => Fehlerkategorie::NichtGefunden,
            Self::FrageNichtAktiv
            | Self::DoppelteAntwort
            | Self::NichtZugeordnet(_)
            | Self::ButtonInaktiv(_)
            | Self::FrageNochOffen
            | Self::BereitsBewertet(_)
            | Self::UngueltigeEingabe(_) => Fehlerkategorie::UngueltigerZustand,
            Self::Registry(DbError::NichtGefunden(_)) => Fehlerkategorie::NichtGefunden,
            Self::Registry(e) if e.ist_client_fehler() => Fehlerkategorie::UngueltigerZustand,
            Self::Registry(_) => Fehlerkategorie::TransienteIo,
            Self::Intern(_) => Fehlerkategorie::Fatal,
        }
    }
}

/// Result-Typ fuer die Sitzungs-Engine
pub type SessionResult<T> = Result<T, SessionError>;
