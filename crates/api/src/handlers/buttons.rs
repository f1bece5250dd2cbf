//! REST-Handler fuer Hardware-Buttons (/api/button/...)

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use quizhub_core::{RoomCode, TeamId};
use quizhub_db::{ButtonRecord, ButtonZuordnung};
use quizhub_session::SessionError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::handlers::pflichtfeld;
use crate::state::ApiState;

// ---------------------------------------------------------------------------
// Druck
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DruckBody {
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub button_id: Option<String>,
}

/// Antwort auf einen Button-Druck
///
/// `success` ist nur bei Infrastrukturfehlern falsch; ob die Antwort im
/// Ledger gelandet ist, steht in `processed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DruckAntwort {
    pub success: bool,
    pub message: String,
    pub processed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// POST /api/button/press
pub async fn press(
    State(state): State<ApiState>,
    Json(body): Json<DruckBody>,
) -> ApiResult<Json<DruckAntwort>> {
    let mac = pflichtfeld(&body.mac_address, "macAddress")?;

    let ergebnis = match state.router.druck_verarbeiten(mac).await {
        Err(SessionError::UnbekannterButton(_)) if state.konfig.auto_registrierung => {
            let button_id = button_id_oder_standard(body.button_id.as_deref());
            let button = state.buttons.registrieren(mac, button_id, "").await?;
            info!(mac = %button.mac_address, id = %button.id, "Button automatisch registriert");
            state.router.druck_verarbeiten(mac).await
        }
        andere => andere,
    };

    match ergebnis {
        Ok(druck) => Ok(Json(DruckAntwort {
            success: true,
            message: "Button-Druck verarbeitet".into(),
            processed: true,
            rank: Some(druck.eintrag.rank),
            reason: None,
        })),
        // Registry nicht erreichbar oder interne Fehler
        Err(e) if e.code() == "Internal" => Err(e.into()),
        Err(e) => Ok(Json(DruckAntwort {
            success: true,
            message: e.to_string(),
            processed: false,
            rank: None,
            reason: Some(e.code().to_string()),
        })),
    }
}

fn button_id_oder_standard(button_id: Option<&str>) -> &str {
    button_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or("1")
}

// ---------------------------------------------------------------------------
// Registrierung und Zuordnung
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrierenBody {
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub button_id: Option<String>,
    #[serde(default)]
    pub name: String,
}

/// POST /api/button/register
pub async fn register(
    State(state): State<ApiState>,
    Json(body): Json<RegistrierenBody>,
) -> ApiResult<Json<ButtonRecord>> {
    let mac = pflichtfeld(&body.mac_address, "macAddress")?;
    let button_id = button_id_oder_standard(body.button_id.as_deref());
    let button = state
        .buttons
        .registrieren(mac, button_id, body.name.trim())
        .await?;
    info!(mac = %button.mac_address, id = %button.id, "Button registriert");
    Ok(Json(button))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZuordnenBody {
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub room_code: String,
    #[serde(default)]
    pub team_id: String,
}

/// POST /api/button/assign
pub async fn assign(
    State(state): State<ApiState>,
    Json(body): Json<ZuordnenBody>,
) -> ApiResult<Json<ButtonRecord>> {
    let mac = pflichtfeld(&body.mac_address, "macAddress")?;
    let room = RoomCode::parse(pflichtfeld(&body.room_code, "roomCode")?)?;
    let team_id: TeamId = pflichtfeld(&body.team_id, "teamId")?
        .parse()
        .map_err(|_| ApiError::ungueltig(format!("Ungueltige Team-ID: {}", body.team_id)))?;

    // Raum und Team muessen in der Engine existieren
    let team = state.engine.team_stand(&room, team_id)?;
    let vorher = state.buttons.laden(mac).await?;

    let button = state
        .buttons
        .zuordnen(
            mac,
            ButtonZuordnung {
                room_code: &room,
                team_id,
                team_name: &team.name,
            },
        )
        .await?;

    if let Some((alter_raum, _)) = vorher.as_ref().and_then(ButtonRecord::zuordnung) {
        if *alter_raum != room {
            raum_bindung_loesen(&state, alter_raum, &button.mac_address);
        }
    }
    state
        .engine
        .button_binden(&room, team_id, &button.mac_address)?;

    info!(mac = %button.mac_address, room = %room, team_id = %team_id, "Button zugeordnet");
    Ok(Json(button))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacBody {
    #[serde(default)]
    pub mac_address: String,
}

/// POST /api/button/unassign
pub async fn unassign(
    State(state): State<ApiState>,
    Json(body): Json<MacBody>,
) -> ApiResult<StatusCode> {
    let mac = pflichtfeld(&body.mac_address, "macAddress")?;
    let vorher = state
        .buttons
        .laden(mac)
        .await?
        .ok_or_else(|| ApiError::NichtGefunden(format!("Button {mac}")))?;

    state.buttons.zuordnung_aufheben(mac).await?;
    if let Some((raum, _)) = vorher.zuordnung() {
        raum_bindung_loesen(&state, raum, &vorher.mac_address);
    }
    info!(mac = %vorher.mac_address, "Button-Zuordnung aufgehoben");
    Ok(StatusCode::NO_CONTENT)
}

/// Entfernt den Button vom Team im Raum; ein geschlossener Raum ist kein Fehler
fn raum_bindung_loesen(state: &ApiState, raum: &RoomCode, mac: &str) {
    if let Err(e) = state.engine.button_loesen(raum, mac) {
        debug!(room = %raum, mac, code = e.code(), "Button-Bindung im Raum nicht geloest");
    }
}

// ---------------------------------------------------------------------------
// Abfragen und Verwaltung
// ---------------------------------------------------------------------------

/// GET /api/button/list
pub async fn list(State(state): State<ApiState>) -> ApiResult<Json<Vec<ButtonRecord>>> {
    Ok(Json(state.buttons.alle().await?))
}

/// GET /api/button/room/:code
pub async fn by_room(
    State(state): State<ApiState>,
    Path(code): Path<String>,
) -> ApiResult<Json<Vec<ButtonRecord>>> {
    let room = RoomCode::parse(&code)?;
    Ok(Json(state.buttons.fuer_raum(&room).await?))
}

/// GET /api/button/:mac
pub async fn get_button(
    State(state): State<ApiState>,
    Path(mac): Path<String>,
) -> ApiResult<Json<ButtonRecord>> {
    state
        .buttons
        .laden(&mac)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NichtGefunden(format!("Button {mac}")))
}

/// DELETE /api/button/:mac
pub async fn delete_button(
    State(state): State<ApiState>,
    Path(mac): Path<String>,
) -> ApiResult<StatusCode> {
    let vorher = state.buttons.laden(&mac).await?;
    if !state.buttons.loeschen(&mac).await? {
        return Err(ApiError::NichtGefunden(format!("Button {mac}")));
    }
    if let Some(button) = &vorher {
        if let Some((raum, _)) = button.zuordnung() {
            raum_bindung_loesen(&state, raum, &button.mac_address);
        }
    }
    info!(mac = %mac, "Button geloescht");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AktivBody {
    pub is_active: bool,
}

/// PUT /api/button/:mac/active
pub async fn set_active(
    State(state): State<ApiState>,
    Path(mac): Path<String>,
    Json(body): Json<AktivBody>,
) -> ApiResult<Json<ButtonRecord>> {
    let button = state.buttons.aktiv_setzen(&mac, body.is_active).await?;
    info!(mac = %button.mac_address, aktiv = button.is_active, "Button-Status geaendert");
    Ok(Json(button))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_id_standard() {
        assert_eq!(button_id_oder_standard(None), "1");
        assert_eq!(button_id_oder_standard(Some("  ")), "1");
        assert_eq!(button_id_oder_standard(Some(" 3 ")), "3");
    }

    #[test]
    fn druck_antwort_ohne_leere_felder() {
        let antwort = DruckAntwort {
            success: true,
            message: "ok".into(),
            processed: false,
            rank: None,
            reason: Some("QuestionNotActive".into()),
        };
        let json = serde_json::to_value(&antwort).unwrap();
        assert!(json.get("rank").is_none());
        assert_eq!(json["reason"], "QuestionNotActive");
    }
}
