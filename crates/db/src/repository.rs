//! Repository-Traits und Datenbank-Konfiguration
//!
//! Die Traits nutzen `async_trait`, damit sie als `Arc<dyn ...>` zwischen
//! Session-Engine, API und Tests geteilt werden koennen.

use async_trait::async_trait;
use quizhub_core::{RoomCode, TeamId};

use crate::error::DbError;
use crate::models::{ButtonRecord, ButtonZuordnung, SlideConfig};

/// Ergebnis-Typ fuer alle Repository-Operationen
pub type DbResult<T> = Result<T, DbError>;

/// Konfiguration fuer die Datenbankverbindung
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Verbindungs-URL (z.B. "sqlite://quizhub.db")
    pub url: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen im Pool
    pub max_verbindungen: u32,
    /// Ob WAL-Modus aktiviert werden soll
    pub sqlite_wal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://quizhub.db".into(),
            max_verbindungen: 5,
            sqlite_wal: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Hardware-Buttons
// ---------------------------------------------------------------------------

/// Registry der Hardware-Buttons
///
/// Alle Methoden erwarten die MAC-Adresse in beliebiger Schreibweise und
/// normalisieren sie selbst.
#[async_trait]
pub trait ButtonRepository: Send + Sync {
    /// Registriert einen Button oder aktualisiert Name/Button-ID eines bekannten
    async fn registrieren(&self, mac: &str, button_id: &str, name: &str) -> DbResult<ButtonRecord>;

    /// Laedt einen Button anhand seiner MAC
    async fn laden(&self, mac: &str) -> DbResult<Option<ButtonRecord>>;

    /// Zaehlt einen Druck und setzt `last_press`
    ///
    /// Fehler: `NichtGefunden` fuer unbekannte, `ButtonInaktiv` fuer
    /// deaktivierte Buttons.
    async fn druck_erfassen(&self, mac: &str) -> DbResult<ButtonRecord>;

    /// Ordnet einen Button einem Team in einem Raum zu
    async fn zuordnen(&self, mac: &str, zuordnung: ButtonZuordnung<'_>) -> DbResult<ButtonRecord>;

    /// Hebt die Zuordnung eines Buttons auf
    async fn zuordnung_aufheben(&self, mac: &str) -> DbResult<ButtonRecord>;

    /// Hebt alle Zuordnungen auf ein bestimmtes Team auf, gibt die Anzahl zurueck
    async fn team_zuordnungen_aufheben(&self, room: &RoomCode, team: TeamId) -> DbResult<u64>;

    /// Aktiviert oder deaktiviert einen Button
    async fn aktiv_setzen(&self, mac: &str, aktiv: bool) -> DbResult<ButtonRecord>;

    /// Alle Buttons, nach MAC sortiert
    async fn alle(&self) -> DbResult<Vec<ButtonRecord>>;

    /// Alle Buttons die einem Raum zugeordnet sind
    async fn fuer_raum(&self, room: &RoomCode) -> DbResult<Vec<ButtonRecord>>;

    /// Loescht einen Button, gibt true zurueck wenn er existierte
    async fn loeschen(&self, mac: &str) -> DbResult<bool>;
}

// ---------------------------------------------------------------------------
// Praesentationen
// ---------------------------------------------------------------------------

/// Store fuer Praesentationen, Folien-Konfiguration und Snapshots
#[async_trait]
pub trait PresentationRepository: Send + Sync {
    /// Raum, mit dem eine Praesentation zuletzt verknuepft wurde
    async fn raum_fuer_praesentation(&self, doc_key: &str) -> DbResult<Option<RoomCode>>;

    /// Verknuepft eine Praesentation mit einem Raum (legt sie bei Bedarf an)
    async fn raum_verknuepfen(&self, doc_key: &str, room: &RoomCode) -> DbResult<()>;

    /// Konfiguration einer Folie, falls gesetzt
    async fn folien_config(&self, doc_key: &str, slide_id: &str) -> DbResult<Option<SlideConfig>>;

    /// Speichert die Konfiguration einer Folie
    async fn folien_config_speichern(
        &self,
        doc_key: &str,
        slide_id: &str,
        config: SlideConfig,
    ) -> DbResult<()>;

    /// Speichert ein Base64-PNG als Folien-Snapshot, gibt den relativen Pfad zurueck
    async fn snapshot_speichern(
        &self,
        doc_key: &str,
        slide_id: &str,
        bild_base64: &str,
    ) -> DbResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = DatabaseConfig::default();
        assert!(cfg.sqlite_wal);
        assert_eq!(cfg.max_verbindungen, 5);
        assert!(cfg.url.starts_with("sqlite://"));
    }
}
