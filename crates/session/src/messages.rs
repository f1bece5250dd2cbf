//! Nachrichten zwischen Engine und Clients
//!
//! Beide Richtungen sind JSON-Objekte mit `type`-Tag. Jeder Zustandsuebergang
//! erzeugt genau eine [`ServerMessage`], die an jede Verbindung des Raums
//! hoechstens einmal zugestellt wird.

use chrono::{DateTime, Utc};
use quizhub_core::{RoomCode, TeamId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Gemeinsame Bausteine
// ---------------------------------------------------------------------------

/// Status einer Frage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragenStatus {
    Inactive,
    Open,
    Closed,
}

/// Urteil des Hosts ueber einen Ledger-Eintrag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urteil {
    Correct,
    Wrong,
}

/// Ein Eintrag im Antwort-Ledger einer Frage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEintrag {
    pub team_id: TeamId,
    pub rank: u32,
    pub submitted_at: DateTime<Utc>,
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Urteil>,
}

/// Oeffentlicher Stand eines Teams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStand {
    pub team_id: TeamId,
    pub name: String,
    pub score: i64,
    pub active: bool,
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_button: Option<String>,
}

/// Oeffentliche Sicht auf die aktuelle Frage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrageSnapshot {
    pub generation: u64,
    pub slide_id: String,
    pub status: FragenStatus,
    pub opens_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
    pub time_limit_seconds: u32,
    pub points_correct: i64,
    pub points_wrong: i64,
    pub ledger: Vec<LedgerEintrag>,
}

/// Vollstaendiger Raum-Zustand fuer neu verbundene Clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaumSnapshot {
    pub room: RoomCode,
    pub created_at: DateTime<Utc>,
    pub teams: Vec<TeamStand>,
    pub question_status: FragenStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<FrageSnapshot>,
    pub connections: usize,
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Nachricht vom Server an einen Client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    // --- Broadcasts ---
    QuestionOpened {
        generation: u64,
        slide_id: String,
        opens_at: DateTime<Utc>,
        closes_at: DateTime<Utc>,
        time_limit_seconds: u32,
        points_correct: i64,
        points_wrong: i64,
    },
    PressAccepted {
        team_id: TeamId,
        team_name: String,
        rank: u32,
        submitted_at: DateTime<Utc>,
    },
    QuestionClosed {
        generation: u64,
        slide_id: String,
        automatic: bool,
        ledger: Vec<LedgerEintrag>,
        scores: Vec<TeamStand>,
    },
    ScoreUpdate {
        team_id: TeamId,
        delta: i64,
        score: i64,
        scores: Vec<TeamStand>,
    },
    TeamJoined {
        team: TeamStand,
    },
    TeamRemoved {
        team_id: TeamId,
    },
    RoomSnapshot {
        snapshot: RaumSnapshot,
    },
    RoomClosed {
        room: RoomCode,
    },

    // --- Antworten an einzelne Verbindungen ---
    Joined {
        room: RoomCode,
        team_id: TeamId,
        name: String,
    },
    PressResult {
        accepted: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rank: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Error {
        code: String,
        message: String,
    },
    Pong,
}

impl ServerMessage {
    /// Fehlerantwort aus einem Engine-Fehler
    pub fn fehler(err: &crate::error::SessionError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Nachricht von einem Client an den Server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Legt ein Team an und bindet diese Verbindung daran
    JoinTeam { name: String },
    /// Antwort des an diese Verbindung gebundenen Teams
    Press,
    OpenQuestion {
        slide_id: String,
        #[serde(default)]
        time_limit_seconds: Option<u32>,
        #[serde(default)]
        points_correct: Option<i64>,
        #[serde(default)]
        points_wrong: Option<i64>,
    },
    /// Oeffnet eine Frage mit der gespeicherten Folien-Konfiguration
    OpenSlide { doc_key: String, slide_id: String },
    CloseQuestion,
    Judge { team_id: TeamId, correct: bool },
    AdjustScore { team_id: TeamId, delta: i64 },
    RemoveTeam { team_id: TeamId },
    CloseRoom,
    Ping,
}

impl ClientMessage {
    /// Nur Host-Verbindungen duerfen den Ablauf steuern
    pub fn nur_host(&self) -> bool {
        matches!(
            self,
            Self::OpenQuestion { .. }
                | Self::OpenSlide { .. }
                | Self::CloseQuestion
                | Self::Judge { .. }
                | Self::AdjustScore { .. }
                | Self::RemoveTeam { .. }
                | Self::CloseRoom
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_nachricht_parsen() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"open-question","slide_id":"7"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::OpenQuestion {
                slide_id: "7".into(),
                time_limit_seconds: None,
                points_correct: None,
                points_wrong: None,
            }
        );
        assert!(msg.nur_host());

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"press"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Press);
        assert!(!msg.nur_host());
    }

    #[test]
    fn server_nachricht_hat_type_tag() {
        let json = serde_json::to_value(ServerMessage::PressResult {
            accepted: false,
            rank: None,
            reason: Some("DuplicateAnswer".into()),
        })
        .unwrap();
        assert_eq!(json["type"], "press-result");
        assert_eq!(json["reason"], "DuplicateAnswer");
        assert!(json.get("rank").is_none());

        let json = serde_json::to_value(ServerMessage::Pong).unwrap();
        assert_eq!(json, serde_json::json!({"type": "pong"}));
    }

    #[test]
    fn unbekannter_typ_wird_abgelehnt() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"hack"}"#).is_err());
    }
}
