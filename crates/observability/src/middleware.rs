//! Request-Timing Middleware fuer Axum
//!
//! Misst die Antwortzeit jeder HTTP-Anfrage, protokolliert sie als
//! strukturiertes Log-Event und verbucht sie in den Prometheus-Metriken.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, Response},
    middleware::Next,
};
use std::time::Instant;

use crate::metrics::QuizMetriken;

/// Label fuer Anfragen ohne passende Route
const UNBEKANNTE_ROUTE: &str = "unmatched";

/// Axum-Middleware-Funktion: misst Antwortzeit und loggt strukturiert.
///
/// Als Label dient das Routen-Muster (`/api/rooms/:code`), nicht der
/// konkrete Pfad, damit die Kardinalitaet begrenzt bleibt.
///
/// Verwendung:
/// ```ignore
/// Router::new()
///     .route("/", get(handler))
///     .layer(axum::middleware::from_fn_with_state(metriken, timing_middleware))
/// ```
pub async fn timing_middleware(
    State(metriken): State<QuizMetriken>,
    req: Request<Body>,
    next: Next,
) -> Response<Body> {
    let methode = req.method().to_string();
    let pfad = routen_label(req.extensions().get::<MatchedPath>());
    let start = Instant::now();

    let response = next.run(req).await;

    let dauer = start.elapsed();
    let status = response.status().as_u16();

    metriken
        .http_requests_total
        .with_label_values(&[methode.as_str(), pfad.as_str(), &status.to_string()])
        .inc();
    metriken
        .http_request_duration_seconds
        .with_label_values(&[methode.as_str(), pfad.as_str()])
        .observe(dauer.as_secs_f64());

    tracing::debug!(
        method = %methode,
        path = %pfad,
        status = status,
        duration_ms = dauer.as_millis(),
        "HTTP-Anfrage abgeschlossen"
    );

    response
}

fn routen_label(pfad: Option<&MatchedPath>) -> String {
    pfad.map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNBEKANNTE_ROUTE.to_string())
}
