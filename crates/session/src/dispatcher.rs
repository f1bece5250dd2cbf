//! Message-Dispatcher – Routet Client-Nachrichten an die Engine
//!
//! Der Dispatcher bekommt jede eingehende [`ClientMessage`] einer Verbindung
//! und gibt optional eine direkte Antwort zurueck. Zustandsaenderungen
//! erreichen alle Clients ueber die Broadcasts der Engine.
//!
//! ## Rollenpruefung
//! Steuer-Kommandos (Frage oeffnen/schliessen, bewerten, Teams entfernen,
//! Raum schliessen) sind nur fuer Host-Verbindungen erlaubt.

use std::sync::Arc;

use quizhub_core::{ConnectionId, RoomCode, TeamId};
use quizhub_db::PresentationRepository;
use tracing::{debug, warn};

use crate::engine::SessionEngine;
use crate::error::{SessionError, SessionResult};
use crate::hub::Rolle;
use crate::messages::{ClientMessage, ServerMessage};
use crate::room::FrageParameter;

/// Informationen ueber die aktuelle Verbindung
#[derive(Debug, Clone)]
pub struct VerbindungsKontext {
    pub room: RoomCode,
    pub conn: ConnectionId,
    pub rolle: Rolle,
    /// Gebundenes Team (nur Rolle `Team`)
    pub team: Option<TeamId>,
}

/// Zentraler Dispatcher fuer Client-Nachrichten
#[derive(Clone)]
pub struct MessageDispatcher {
    engine: SessionEngine,
    praesentationen: Option<Arc<dyn PresentationRepository>>,
}

impl MessageDispatcher {
    pub fn neu(
        engine: SessionEngine,
        praesentationen: Option<Arc<dyn PresentationRepository>>,
    ) -> Self {
        Self {
            engine,
            praesentationen,
        }
    }

    /// Verarbeitet eine Nachricht und gibt die direkte Antwort zurueck
    ///
    /// `None` wenn der Broadcast der Engine als Antwort genuegt.
    pub async fn dispatch(
        &self,
        nachricht: ClientMessage,
        ctx: &mut VerbindungsKontext,
    ) -> Option<ServerMessage> {
        if nachricht.nur_host() && ctx.rolle != Rolle::Host {
            debug!(room = %ctx.room, conn = %ctx.conn, rolle = %ctx.rolle, "Host-Kommando ohne Host-Rolle");
            return Some(ServerMessage::fehler(&SessionError::ungueltig(
                "Nur Host-Verbindungen duerfen dieses Kommando senden",
            )));
        }

        match self.verarbeiten(nachricht, ctx).await {
            Ok(antwort) => antwort,
            Err(e) => {
                if e.kategorie().fuer_betreiber() {
                    warn!(room = %ctx.room, conn = %ctx.conn, fehler = %e, "Kommando fehlgeschlagen");
                } else {
                    debug!(room = %ctx.room, conn = %ctx.conn, code = e.code(), "Kommando abgelehnt");
                }
                Some(ServerMessage::fehler(&e))
            }
        }
    }

    async fn verarbeiten(
        &self,
        nachricht: ClientMessage,
        ctx: &mut VerbindungsKontext,
    ) -> SessionResult<Option<ServerMessage>> {
        match nachricht {
            ClientMessage::Ping => Ok(Some(ServerMessage::Pong)),

            ClientMessage::JoinTeam { name } => {
                if ctx.rolle != Rolle::Team {
                    return Err(SessionError::ungueltig("Nur Team-Verbindungen koennen beitreten"));
                }
                if ctx.team.is_some() {
                    return Err(SessionError::ungueltig("Verbindung ist bereits an ein Team gebunden"));
                }
                let stand = self.engine.team_beitreten(&ctx.room, &name)?;
                self.engine
                    .verbindung_an_team_binden(&ctx.room, ctx.conn, stand.team_id)?;
                ctx.team = Some(stand.team_id);
                Ok(Some(ServerMessage::Joined {
                    room: ctx.room.clone(),
                    team_id: stand.team_id,
                    name: stand.name,
                }))
            }

            ClientMessage::Press => {
                let team = ctx
                    .team
                    .ok_or_else(|| SessionError::ungueltig("Verbindung ist keinem Team zugeordnet"))?;
                let antwort = match self.engine.antwort_einreichen(&ctx.room, team) {
                    Ok(eintrag) => ServerMessage::PressResult {
                        accepted: true,
                        rank: Some(eintrag.rank),
                        reason: None,
                    },
                    Err(e) if e.kategorie().fuer_betreiber() => return Err(e),
                    Err(e) => ServerMessage::PressResult {
                        accepted: false,
                        rank: None,
                        reason: Some(e.code().to_string()),
                    },
                };
                Ok(Some(antwort))
            }

            ClientMessage::OpenQuestion {
                slide_id,
                time_limit_seconds,
                points_correct,
                points_wrong,
            } => {
                let konfig = self.engine.konfig();
                self.engine.frage_oeffnen(
                    &ctx.room,
                    FrageParameter {
                        slide_id,
                        time_limit_seconds: time_limit_seconds
                            .unwrap_or(konfig.standard_zeitlimit_sek),
                        points_correct: points_correct.unwrap_or(konfig.standard_punkte_richtig),
                        points_wrong: points_wrong.unwrap_or(konfig.standard_punkte_falsch),
                    },
                )?;
                Ok(None)
            }

            ClientMessage::OpenSlide { doc_key, slide_id } => {
                let param = self.folien_parameter(&doc_key, slide_id).await?;
                self.engine.frage_oeffnen(&ctx.room, param)?;
                Ok(None)
            }

            ClientMessage::CloseQuestion => {
                self.engine.frage_schliessen(&ctx.room)?;
                Ok(None)
            }

            ClientMessage::Judge { team_id, correct } => {
                self.engine.antwort_bewerten(&ctx.room, team_id, correct)?;
                Ok(None)
            }

            ClientMessage::AdjustScore { team_id, delta } => {
                self.engine.punkte_anpassen(&ctx.room, team_id, delta)?;
                Ok(None)
            }

            ClientMessage::RemoveTeam { team_id } => {
                self.engine.team_entfernen(&ctx.room, team_id).await?;
                Ok(None)
            }

            ClientMessage::CloseRoom => {
                self.engine.raum_schliessen(&ctx.room)?;
                Ok(None)
            }
        }
    }

    /// Frage-Parameter aus der Folien-Konfiguration, sonst Standardwerte
    async fn folien_parameter(&self, doc_key: &str, slide_id: String) -> SessionResult<FrageParameter> {
        let konfig = self.engine.konfig();
        let gespeichert = match &self.praesentationen {
            Some(store) => store.folien_config(doc_key, &slide_id).await?,
            None => None,
        };

        Ok(match gespeichert {
            Some(cfg) => FrageParameter {
                slide_id,
                time_limit_seconds: cfg.time_limit_seconds,
                points_correct: cfg.points_correct,
                points_wrong: cfg.points_wrong,
            },
            None => FrageParameter {
                slide_id,
                time_limit_seconds: konfig.standard_zeitlimit_sek,
                points_correct: konfig.standard_punkte_richtig,
                points_wrong: konfig.standard_punkte_falsch,
            },
        })
    }
}
