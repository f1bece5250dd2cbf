//! Datenbank-Modelle
//!
//! Die Modelle werden per serde auch direkt ueber die REST-API ausgeliefert,
//! daher camelCase-Feldnamen.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use quizhub_core::{RoomCode, TeamId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Hardware-Buttons
// ---------------------------------------------------------------------------

/// Normalisiert eine MAC-Adresse (Grossbuchstaben, ohne `:`, `-` und Leerzeichen)
pub fn mac_normalisieren(mac: &str) -> String {
    mac.chars()
        .filter(|c| !matches!(c, ':' | '-' | ' '))
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Interne Button-ID: `btn_` plus die letzten sechs Zeichen der MAC
pub fn button_schluessel(mac_normalisiert: &str) -> String {
    let zeichen: Vec<char> = mac_normalisiert.chars().collect();
    let start = zeichen.len().saturating_sub(6);
    let suffix: String = zeichen[start..].iter().collect();
    format!("btn_{suffix}")
}

/// Ein registrierter Hardware-Button
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonRecord {
    pub id: String,
    pub mac_address: String,
    pub button_id: String,
    pub name: String,
    pub room_code: Option<RoomCode>,
    pub team_id: Option<TeamId>,
    pub team_name: String,
    pub is_active: bool,
    pub press_count: i64,
    pub last_press: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ButtonRecord {
    /// Liefert Raum und Team wenn der Button vollstaendig zugeordnet ist
    pub fn zuordnung(&self) -> Option<(&RoomCode, TeamId)> {
        match (&self.room_code, self.team_id) {
            (Some(room), Some(team)) => Some((room, team)),
            _ => None,
        }
    }
}

/// Daten fuer eine Zuordnung Button -> (Raum, Team)
#[derive(Debug, Clone)]
pub struct ButtonZuordnung<'a> {
    pub room_code: &'a RoomCode,
    pub team_id: TeamId,
    pub team_name: &'a str,
}

// ---------------------------------------------------------------------------
// Praesentationen
// ---------------------------------------------------------------------------

/// Wertung und Zeitlimit einer einzelnen Folie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideConfig {
    pub time_limit_seconds: u32,
    pub points_correct: i64,
    pub points_wrong: i64,
}

/// Eine Folie einer Praesentation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideInfo {
    #[serde(default)]
    pub image_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<SlideConfig>,
}

/// Eine Praesentation, identifiziert ueber den Dokument-Schluessel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationRecord {
    pub doc_key: String,
    #[serde(default, deserialize_with = "leerer_code_als_none")]
    pub last_room_code: Option<RoomCode>,
    #[serde(default)]
    pub slides: BTreeMap<String, SlideInfo>,
}

impl PresentationRecord {
    pub fn neu(doc_key: impl Into<String>) -> Self {
        Self {
            doc_key: doc_key.into(),
            ..Default::default()
        }
    }
}

/// Aeltere Dateien speichern "keinen Raum" als leeren String
fn leerer_code_als_none<'de, D>(deserializer: D) -> Result<Option<RoomCode>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let roh: Option<String> = Option::deserialize(deserializer)?;
    match roh.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(code) => RoomCode::parse(code)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Wurzel des JSON-Dokuments auf der Platte
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresentationsDatei {
    #[serde(default)]
    pub presentations: BTreeMap<String, PresentationRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_wird_normalisiert() {
        assert_eq!(mac_normalisieren("aa:bb:cc:dd:ee:ff"), "AABBCCDDEEFF");
        assert_eq!(mac_normalisieren(" aa-bb cc:dd:ee:01 "), "AABBCCDDEE01");
    }

    #[test]
    fn button_schluessel_aus_mac() {
        assert_eq!(button_schluessel("AABBCCDDEEFF"), "btn_DDEEFF");
        assert_eq!(button_schluessel("AB"), "btn_AB");
    }

    #[test]
    fn slide_config_json_format() {
        let cfg = SlideConfig {
            time_limit_seconds: 30,
            points_correct: 10,
            points_wrong: 5,
        };
        let json = serde_json::to_value(cfg).unwrap();
        assert_eq!(json["timeLimitSeconds"], 30);
        assert_eq!(json["pointsCorrect"], 10);
        assert_eq!(json["pointsWrong"], 5);
    }

    #[test]
    fn presentations_datei_leer_parsen() {
        let datei: PresentationsDatei = serde_json::from_str("{}").unwrap();
        assert!(datei.presentations.is_empty());
    }

    #[test]
    fn leerer_raum_code_wird_none() {
        let json = r#"{"presentations":{"doc1":{"docKey":"doc1","lastRoomCode":"","slides":{}}}}"#;
        let datei: PresentationsDatei = serde_json::from_str(json).unwrap();
        assert_eq!(datei.presentations["doc1"].last_room_code, None);
    }
}
