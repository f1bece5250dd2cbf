//! Fehlertypen fuer das Datenbank-Crate

use thiserror::Error;

/// Datenbank-Fehlertypen
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Datensatz nicht gefunden: {0}")]
    NichtGefunden(String),

    #[error("Button ist deaktiviert: {0}")]
    ButtonInaktiv(String),

    #[error("Eindeutigkeitsverletzung: {0}")]
    Eindeutigkeit(String),

    #[error("Ungueltige Daten: {0}")]
    UngueltigeDaten(String),

    #[error("SQLx-Fehler: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration-Fehler: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("JSON-Fehler: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    #[error("Base64-Fehler: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Interner DB-Fehler: {0}")]
    Intern(String),
}

impl DbError {
    pub fn nicht_gefunden(msg: impl Into<String>) -> Self {
        Self::NichtGefunden(msg.into())
    }

    pub fn ungueltig(msg: impl Into<String>) -> Self {
        Self::UngueltigeDaten(msg.into())
    }

    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler auf eine Client-Eingabe zurueckgeht
    pub fn ist_client_fehler(&self) -> bool {
        matches!(
            self,
            Self::NichtGefunden(_)
                | Self::ButtonInaktiv(_)
                | Self::Eindeutigkeit(_)
                | Self::UngueltigeDaten(_)
                | Self::Base64(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_fehler_erkennung() {
        assert!(DbError::nicht_gefunden("x").ist_client_fehler());
        assert!(DbError::ButtonInaktiv("x".into()).ist_client_fehler());
        assert!(!DbError::intern("x").ist_client_fehler());
    }
}
