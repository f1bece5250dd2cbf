//! REST-Handler fuer Raeume (/api/rooms/...)

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use quizhub_core::RoomCode;
use quizhub_session::RaumSnapshot;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::ApiState;

#[derive(Debug, Default, Deserialize)]
pub struct ErstellenBody {
    #[serde(default)]
    pub code: Option<String>,
}

/// POST /api/rooms
///
/// Ohne Code wird ein freier vierstelliger Code erzeugt.
pub async fn create_room(
    State(state): State<ApiState>,
    body: Option<Json<ErstellenBody>>,
) -> ApiResult<Json<RaumSnapshot>> {
    let code = match body.and_then(|Json(b)| b.code).filter(|c| !c.trim().is_empty()) {
        Some(code) => RoomCode::parse(&code)?,
        None => freier_code(&state),
    };
    state.engine.raum_erstellen_oder_holen(&code);
    Ok(Json(state.engine.snapshot(&code)?))
}

/// Erzeugt Codes bis einer nicht belegt ist
fn freier_code(state: &ApiState) -> RoomCode {
    loop {
        let code = RoomCode::generieren();
        if !state.engine.raum_existiert(&code) {
            return code;
        }
    }
}

/// GET /api/rooms/:code
pub async fn get_room(
    State(state): State<ApiState>,
    Path(code): Path<String>,
) -> ApiResult<Json<RaumSnapshot>> {
    let code = RoomCode::parse(&code)?;
    Ok(Json(state.engine.snapshot(&code)?))
}

/// DELETE /api/rooms/:code
pub async fn delete_room(
    State(state): State<ApiState>,
    Path(code): Path<String>,
) -> ApiResult<StatusCode> {
    let code = RoomCode::parse(&code)?;
    state.engine.raum_schliessen(&code)?;
    Ok(StatusCode::NO_CONTENT)
}
