//! Gemeinsame Identifikationstypen fuer quizhub
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::UngueltigerRaumCode;

/// Maximale Laenge eines Raum-Codes
pub const RAUM_CODE_MAX_LAENGE: usize = 16;

/// Laenge automatisch erzeugter Raum-Codes
const RAUM_CODE_GENERIERT_LAENGE: usize = 4;

/// Zeichen fuer generierte Raum-Codes (ohne 0/O und 1/I)
const RAUM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Code eines Quiz-Raums
///
/// Wird beim Parsen normalisiert (getrimmt, Grossbuchstaben), sodass
/// `a1b2` und `A1B2` denselben Raum bezeichnen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Parst und normalisiert einen Raum-Code
    pub fn parse(roh: &str) -> Result<Self, UngueltigerRaumCode> {
        let code = roh.trim().to_ascii_uppercase();
        if code.is_empty() {
            return Err(UngueltigerRaumCode::Leer);
        }
        if code.len() > RAUM_CODE_MAX_LAENGE {
            return Err(UngueltigerRaumCode::ZuLang(code.len()));
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(UngueltigerRaumCode::UngueltigeZeichen(code));
        }
        Ok(Self(code))
    }

    /// Erzeugt einen zufaelligen vierstelligen Raum-Code
    pub fn generieren() -> Self {
        let bytes = Uuid::new_v4().into_bytes();
        let code = bytes
            .iter()
            .take(RAUM_CODE_GENERIERT_LAENGE)
            .map(|b| RAUM_CODE_ALPHABET[*b as usize % RAUM_CODE_ALPHABET.len()] as char)
            .collect();
        Self(code)
    }

    /// Gibt den normalisierten Code als &str zurueck
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomCode {
    type Err = UngueltigerRaumCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for RoomCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let roh = String::deserialize(deserializer)?;
        Self::parse(&roh).map_err(serde::de::Error::custom)
    }
}

/// Eindeutige Team-ID (innerhalb eines Raums)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamId(pub Uuid);

impl TeamId {
    /// Erstellt eine neue zufaellige TeamId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for TeamId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "team:{}", self.0)
    }
}

impl FromStr for TeamId {
    type Err = uuid::Error;

    /// Akzeptiert sowohl die nackte UUID als auch die `team:`-Anzeigeform
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let roh = s.trim();
        let roh = roh.strip_prefix("team:").unwrap_or(roh);
        Uuid::parse_str(roh).map(Self)
    }
}

/// Eindeutige Verbindungs-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Erstellt eine neue zufaellige ConnectionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raum_code_wird_normalisiert() {
        let code = RoomCode::parse("  a1b2 ").unwrap();
        assert_eq!(code.as_str(), "A1B2");
        assert_eq!(code, RoomCode::parse("A1B2").unwrap());
    }

    #[test]
    fn raum_code_ungueltig() {
        assert_eq!(RoomCode::parse("   "), Err(UngueltigerRaumCode::Leer));
        assert!(matches!(
            RoomCode::parse("ABCDEFGHIJKLMNOPQ"),
            Err(UngueltigerRaumCode::ZuLang(17))
        ));
        assert!(matches!(
            RoomCode::parse("A B"),
            Err(UngueltigerRaumCode::UngueltigeZeichen(_))
        ));
    }

    #[test]
    fn generierter_raum_code_ist_gueltig() {
        for _ in 0..50 {
            let code = RoomCode::generieren();
            assert_eq!(code.as_str().len(), 4);
            assert_eq!(RoomCode::parse(code.as_str()).unwrap(), code);
        }
    }

    #[test]
    fn raum_code_serde_normalisiert() {
        let code: RoomCode = serde_json::from_str("\"xy12\"").unwrap();
        assert_eq!(code.as_str(), "XY12");
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"XY12\"");
        assert!(serde_json::from_str::<RoomCode>("\"\"").is_err());
    }

    #[test]
    fn team_id_parsen_mit_und_ohne_praefix() {
        let id = TeamId::new();
        assert_eq!(id.inner().to_string().parse::<TeamId>().unwrap(), id);
        assert_eq!(id.to_string().parse::<TeamId>().unwrap(), id);
        assert!("kein-team".parse::<TeamId>().is_err());
    }

    #[test]
    fn ids_eindeutig() {
        assert_ne!(TeamId::new(), TeamId::new());
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }
}
