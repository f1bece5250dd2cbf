//! Fehlertypen fuer die quizhub API

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use quizhub_core::UngueltigerRaumCode;
use quizhub_db::DbError;
use quizhub_session::SessionError;
use serde_json::json;
use thiserror::Error;

/// Alle moeglichen Fehler im API-Crate
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Session(#[from] SessionError),

    #[error("Datenbankfehler: {0}")]
    Datenbank(#[from] DbError),

    #[error("Ungueltiger Raum-Code: {0}")]
    RaumCode(#[from] UngueltigerRaumCode),

    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    #[error("Ressource nicht gefunden: {0}")]
    NichtGefunden(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn ungueltig(msg: impl Into<String>) -> Self {
        Self::UngueltigeEingabe(msg.into())
    }

    /// Stabiler Fehler-Code fuer Clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::Session(e) => e.code(),
            Self::Datenbank(DbError::NichtGefunden(_)) | Self::NichtGefunden(_) => "NotFound",
            Self::Datenbank(DbError::ButtonInaktiv(_)) => "InactiveButton",
            Self::Datenbank(DbError::Eindeutigkeit(_)) => "Conflict",
            Self::Datenbank(e) if e.ist_client_fehler() => "InvalidInput",
            Self::Datenbank(_) => "Internal",
            Self::RaumCode(_) | Self::UngueltigeEingabe(_) => "InvalidInput",
        }
    }

    /// HTTP-Statuscode fuer REST-Fehler
    pub fn http_status(&self) -> StatusCode {
        match self.code() {
            "RoomNotFound" | "TeamNotFound" | "NotFound" | "UnknownButton" => StatusCode::NOT_FOUND,
            "QuestionNotActive" | "DuplicateAnswer" | "NotAssigned" | "InactiveButton"
            | "QuestionStillOpen" | "NoLedgerEntry" | "AlreadyJudged" | "Conflict" => {
                StatusCode::CONFLICT
            }
            "InvalidInput" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        if status.is_server_error() {
            tracing::error!(fehler = %self, "REST-Anfrage fehlgeschlagen");
        } else {
            tracing::debug!(code = self.code(), fehler = %self, "REST-Anfrage abgelehnt");
        }
        (
            status,
            Json(json!({
                "error": {
                    "code": self.code(),
                    "message": self.to_string()
                }
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizhub_core::TeamId;

    #[test]
    fn session_fehler_behalten_ihren_code() {
        let fehler = ApiError::from(SessionError::TeamNichtGefunden(TeamId::new()));
        assert_eq!(fehler.code(), "TeamNotFound");
        assert_eq!(fehler.http_status(), StatusCode::NOT_FOUND);

        let fehler = ApiError::from(SessionError::DoppelteAntwort);
        assert_eq!(fehler.http_status(), StatusCode::CONFLICT);
    }

    #[test]
    fn db_fehler_abbildung() {
        assert_eq!(
            ApiError::from(DbError::nicht_gefunden("AABB")).http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(DbError::ungueltig("kaputt")).http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(DbError::intern("kaputt")).http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn raum_code_fehler_ist_client_fehler() {
        let fehler = ApiError::from(UngueltigerRaumCode::Leer);
        assert_eq!(fehler.code(), "InvalidInput");
        assert_eq!(fehler.http_status(), StatusCode::BAD_REQUEST);
    }
}
