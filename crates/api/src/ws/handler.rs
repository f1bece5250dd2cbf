use axum::extract::ws::{CloseFrame, Message, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use quizhub_core::{RoomCode, TeamId};
use quizhub_session::{Rolle, ServerMessage, SessionError, VerbindungsKontext};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::state::ApiState;
use crate::ws::actor;

/// Query-Parameter beim Verbindungsaufbau
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub rolle: Rolle,
    /// Wiederverbinden eines bestehenden Teams
    #[serde(default)]
    pub team_id: Option<String>,
}

/// Close-Code wenn die Registrierung im Raum scheitert
const CLOSE_REGISTRIERUNG: u16 = 4004;

/// GET /ws/:room?rolle=team|host|display[&team_id=...]
///
/// Host-Verbindungen legen den Raum bei Bedarf an, alle anderen brauchen
/// einen bestehenden Raum.
pub async fn ws_upgrade(
    State(state): State<ApiState>,
    Path(room): Path<String>,
    Query(params): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> ApiResult<Response> {
    let room = RoomCode::parse(&room)?;
    let team = params
        .team_id
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<TeamId>()
                .map_err(|_| ApiError::ungueltig(format!("Ungueltige Team-ID: {t}")))
        })
        .transpose()?;

    if params.rolle == Rolle::Host {
        state.engine.raum_erstellen_oder_holen(&room);
    } else if !state.engine.raum_existiert(&room) {
        return Err(SessionError::RaumNichtGefunden(room).into());
    }

    Ok(ws.on_upgrade(move |mut socket| async move {
        match state.engine.verbindung_registrieren(&room, params.rolle, team) {
            Ok((conn, rx)) => {
                let ctx = VerbindungsKontext {
                    room,
                    conn,
                    rolle: params.rolle,
                    team,
                };
                actor::verbindung_betreiben(socket, state, ctx, rx).await;
            }
            Err(e) => {
                tracing::debug!(room = %room, rolle = %params.rolle, code = e.code(), "WebSocket-Registrierung abgelehnt");
                if let Ok(text) = serde_json::to_string(&ServerMessage::fehler(&e)) {
                    let _ = socket.send(Message::Text(text)).await;
                }
                let _ = socket
                    .send(Message::Close(Some(CloseFrame {
                        code: CLOSE_REGISTRIERUNG,
                        reason: e.code().into(),
                    })))
                    .await;
            }
        }
    }))
}
