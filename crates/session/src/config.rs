//! Laufzeit-Parameter der Sitzungs-Engine

use std::time::Duration;

/// Groesse der Send-Queue pro Verbindung
pub const SEND_QUEUE_GROESSE: usize = 64;

/// Kapazitaet des Event-Kanals fuer Beobachter (Metriken, Logging)
pub const EVENT_KANAL_KAPAZITAET: usize = 256;

/// Obergrenze fuer Punkte pro Frage und fuer manuelle Korrekturen
pub const PUNKTE_MAX: i64 = 1_000_000;

/// Maximale Laenge eines Team-Namens
pub const TEAM_NAME_MAX_LAENGE: usize = 64;

/// Einstellungen der Engine
#[derive(Debug, Clone)]
pub struct SitzungsKonfig {
    /// Bounded Send-Queue pro Verbindung, volle Queues trennen die Verbindung
    pub send_queue_groesse: usize,
    /// Raeume ohne Verbindungen werden nach dieser Zeit entfernt
    pub leerlauf_timeout: Duration,
    /// Standard-Zeitlimit wenn weder Client noch Folie eins vorgeben
    pub standard_zeitlimit_sek: u32,
    /// Standard-Punkte fuer eine richtige Antwort
    pub standard_punkte_richtig: i64,
    /// Standard-Abzug fuer eine falsche Antwort
    pub standard_punkte_falsch: i64,
}

impl Default for SitzungsKonfig {
    fn default() -> Self {
        Self {
            send_queue_groesse: SEND_QUEUE_GROESSE,
            leerlauf_timeout: Duration::from_secs(4 * 60 * 60),
            standard_zeitlimit_sek: 30,
            standard_punkte_richtig: 100,
            standard_punkte_falsch: 0,
        }
    }
}
