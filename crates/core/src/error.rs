//! Fehlerkategorien fuer quizhub
//!
//! Jedes Crate definiert eigene Fehler-Enums; ueber [`Fehlerkategorie`]
//! ordnen alle ihre Varianten in dieselbe Taxonomie ein, damit die
//! Aufrufer einheitlich entscheiden koennen, was geloggt wird.

use thiserror::Error;

/// Grobe Einordnung eines Fehlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fehlerkategorie {
    /// Raum, Team oder Button existiert nicht (vom Client korrigierbar)
    NichtGefunden,
    /// Operation im aktuellen Zustand nicht erlaubt (Frage zu, schon geantwortet)
    UngueltigerZustand,
    /// Zustellung an eine einzelne Verbindung fehlgeschlagen
    TransienteIo,
    /// Verletzte interne Invariante oder Infrastrukturfehler
    Fatal,
}

impl Fehlerkategorie {
    /// Nur Fatal-Fehler sind fuer den Betreiber relevant
    pub fn fuer_betreiber(&self) -> bool {
        matches!(self, Self::Fatal)
    }
}

/// Fehler beim Parsen eines Raum-Codes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UngueltigerRaumCode {
    #[error("Raum-Code darf nicht leer sein")]
    Leer,

    #[error("Raum-Code zu lang ({0} Zeichen)")]
    ZuLang(usize),

    #[error("Raum-Code enthaelt ungueltige Zeichen: {0}")]
    UngueltigeZeichen(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nur_fatal_fuer_betreiber() {
        assert!(Fehlerkategorie::Fatal.fuer_betreiber());
        assert!(!Fehlerkategorie::NichtGefunden.fuer_betreiber());
        assert!(!Fehlerkategorie::UngueltigerZustand.fuer_betreiber());
        assert!(!Fehlerkategorie::TransienteIo.fuer_betreiber());
    }

    #[test]
    fn fehler_anzeige() {
        assert_eq!(
            UngueltigerRaumCode::ZuLang(20).to_string(),
            "Raum-Code zu lang (20 Zeichen)"
        );
    }
}
