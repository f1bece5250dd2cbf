//! REST-Handler fuer Praesentationen (/api/presentation/...)

use axum::extract::{Path, State};
use axum::Json;
use quizhub_core::RoomCode;
use quizhub_db::SlideConfig;
use quizhub_session::FrageParameter;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::handlers::pflichtfeld;
use crate::state::ApiState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErfolgAntwort {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerknuepfenBody {
    #[serde(default)]
    pub doc_key: String,
    #[serde(default)]
    pub room_code: String,
}

/// POST /api/presentation/link
///
/// Legt den Raum bei Bedarf an und merkt ihn fuer die Praesentation.
pub async fn link(
    State(state): State<ApiState>,
    Json(body): Json<VerknuepfenBody>,
) -> ApiResult<Json<ErfolgAntwort>> {
    let doc_key = pflichtfeld(&body.doc_key, "docKey")?;
    let room = RoomCode::parse(pflichtfeld(&body.room_code, "roomCode")?)?;

    state.engine.raum_erstellen_oder_holen(&room);
    state.praesentationen.raum_verknuepfen(doc_key, &room).await?;
    info!(doc_key, room = %room, "Praesentation mit Raum verknuepft");
    Ok(Json(ErfolgAntwort { success: true }))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaumAntwort {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_code: Option<RoomCode>,
    /// Raum ist in der Engine noch offen
    #[serde(default)]
    pub active: bool,
}

/// GET /api/presentation/room/:doc_key
pub async fn room_for_presentation(
    State(state): State<ApiState>,
    Path(doc_key): Path<String>,
) -> ApiResult<Json<RaumAntwort>> {
    let room = state.praesentationen.raum_fuer_praesentation(&doc_key).await?;
    Ok(Json(RaumAntwort {
        success: room.is_some(),
        active: room
            .as_ref()
            .map(|r| state.engine.raum_existiert(r))
            .unwrap_or(false),
        room_code: room,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotBody {
    #[serde(default)]
    pub doc_key: String,
    #[serde(default)]
    pub slide_id: String,
    #[serde(default)]
    pub image_base64: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotAntwort {
    pub success: bool,
    pub image_path: String,
}

/// POST /api/presentation/snapshot
pub async fn snapshot(
    State(state): State<ApiState>,
    Json(body): Json<SnapshotBody>,
) -> ApiResult<Json<SnapshotAntwort>> {
    let doc_key = pflichtfeld(&body.doc_key, "docKey")?;
    let slide_id = pflichtfeld(&body.slide_id, "slideId")?;
    let bild = pflichtfeld(&body.image_base64, "imageBase64")?;

    let image_path = state
        .praesentationen
        .snapshot_speichern(doc_key, slide_id, bild)
        .await?;
    Ok(Json(SnapshotAntwort {
        success: true,
        image_path,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigBody {
    #[serde(default)]
    pub doc_key: String,
    #[serde(default)]
    pub slide_id: String,
    pub config: Option<SlideConfig>,
}

/// POST /api/presentation/config
pub async fn save_config(
    State(state): State<ApiState>,
    Json(body): Json<ConfigBody>,
) -> ApiResult<Json<ErfolgAntwort>> {
    let doc_key = pflichtfeld(&body.doc_key, "docKey")?;
    let slide_id = pflichtfeld(&body.slide_id, "slideId")?;
    let config = body
        .config
        .ok_or_else(|| ApiError::ungueltig("config ist erforderlich"))?;

    // Gleiche Grenzen wie beim Oeffnen einer Frage
    FrageParameter {
        slide_id: slide_id.to_string(),
        time_limit_seconds: config.time_limit_seconds,
        points_correct: config.points_correct,
        points_wrong: config.points_wrong,
    }
    .pruefen()?;

    state
        .praesentationen
        .folien_config_speichern(doc_key, slide_id, config)
        .await?;
    info!(doc_key, slide_id, zeitlimit = config.time_limit_seconds, "Folien-Konfiguration gespeichert");
    Ok(Json(ErfolgAntwort { success: true }))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigAntwort {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<SlideConfig>,
}

/// GET /api/presentation/config/:doc_key/:slide_id
pub async fn get_config(
    State(state): State<ApiState>,
    Path((doc_key, slide_id)): Path<(String, String)>,
) -> ApiResult<Json<ConfigAntwort>> {
    let config = state
        .praesentationen
        .folien_config(&doc_key, &slide_id)
        .await?;
    Ok(Json(ConfigAntwort {
        success: config.is_some(),
        config,
    }))
}
