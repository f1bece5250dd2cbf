//! Prometheus-kompatible Metriken fuer quizhub
//!
//! Registrierte Metriken:
//! - `quizhub_rooms_active` – Gauge: Offene Raeume
//! - `quizhub_connections_active` – Gauge: Registrierte Verbindungen
//! - `quizhub_connections_dropped_total` – Counter: Wegen voller Queue getrennte Verbindungen
//! - `quizhub_questions_opened_total` – Counter: Geoeffnete Fragen
//! - `quizhub_questions_closed_total` – Counter: Geschlossene Fragen (trigger)
//! - `quizhub_presses_accepted_total` – Counter: Angenommene Antworten
//! - `quizhub_presses_rejected_total` – Counter: Abgelehnte Antworten (reason)
//! - `quizhub_http_requests_total` – Counter: HTTP-Anfragen (method, path, status)
//! - `quizhub_http_request_duration_seconds` – Histogram: HTTP-Antwortzeit
//!
//! Die Quiz-Metriken werden aus dem Event-Strom der Engine gespeist
//! ([`QuizMetriken::events_verfolgen`]). Der Event-Kanal ist verlustbehaftet,
//! deshalb werden die beiden Gauges aus einer [`Bestandsquelle`] gelesen,
//! sobald eine gesetzt ist: bei jedem Raum-/Verbindungs-Event, nach einem
//! `Lagged` und vor jedem Export.

use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use quizhub_core::QuizEvent;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Tatsaechlicher Bestand an Raeumen und Verbindungen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bestand {
    pub raeume: usize,
    pub verbindungen: usize,
}

/// Liefert den aktuellen [`Bestand`], typischerweise direkt aus der Engine
pub type Bestandsquelle = Arc<dyn Fn() -> Bestand + Send + Sync>;

/// Alle quizhub-Prometheus-Metriken
#[derive(Clone)]
pub struct QuizMetriken {
    pub registry: Arc<Registry>,
    bestand: Option<Bestandsquelle>,

    // Quiz-Metriken
    pub rooms_active: IntGauge,
    pub connections_active: IntGauge,
    pub connections_dropped_total: IntCounter,
    pub questions_opened_total: IntCounter,
    pub questions_closed_total: IntCounterVec,
    pub presses_accepted_total: IntCounter,
    pub presses_rejected_total: IntCounterVec,

    // HTTP-Metriken
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
}

impl QuizMetriken {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        // --- Quiz-Metriken ---
        let rooms_active = IntGauge::with_opts(Opts::new(
            "quizhub_rooms_active",
            "Anzahl offener Raeume",
        ))?;
        registry.register(Box::new(rooms_active.clone()))?;

        let connections_active = IntGauge::with_opts(Opts::new(
            "quizhub_connections_active",
            "Anzahl registrierter Verbindungen",
        ))?;
        registry.register(Box::new(connections_active.clone()))?;

        let connections_dropped_total = IntCounter::with_opts(Opts::new(
            "quizhub_connections_dropped_total",
            "Verbindungen, die wegen voller oder geschlossener Send-Queue getrennt wurden",
        ))?;
        registry.register(Box::new(connections_dropped_total.clone()))?;

        let questions_opened_total = IntCounter::with_opts(Opts::new(
            "quizhub_questions_opened_total",
            "Gesamtanzahl geoeffneter Fragen",
        ))?;
        registry.register(Box::new(questions_opened_total.clone()))?;

        let questions_closed_total = IntCounterVec::new(
            Opts::new(
                "quizhub_questions_closed_total",
                "Gesamtanzahl geschlossener Fragen",
            ),
            &["trigger"],
        )?;
        registry.register(Box::new(questions_closed_total.clone()))?;

        let presses_accepted_total = IntCounter::with_opts(Opts::new(
            "quizhub_presses_accepted_total",
            "Gesamtanzahl angenommener Antworten",
        ))?;
        registry.register(Box::new(presses_accepted_total.clone()))?;

        let presses_rejected_total = IntCounterVec::new(
            Opts::new(
                "quizhub_presses_rejected_total",
                "Gesamtanzahl abgelehnter Antworten",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(presses_rejected_total.clone()))?;

        // --- HTTP-Metriken ---
        let http_requests_total = IntCounterVec::new(
            Opts::new("quizhub_http_requests_total", "Gesamtanzahl HTTP-Anfragen"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "quizhub_http_request_duration_seconds",
                "HTTP-Antwortzeit in Sekunden",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
            ]),
            &["method", "path"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            bestand: None,
            rooms_active,
            connections_active,
            connections_dropped_total,
            questions_opened_total,
            questions_closed_total,
            presses_accepted_total,
            presses_rejected_total,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    /// Liest die Gauges fuer Raeume und Verbindungen kuenftig aus `quelle`
    pub fn mit_bestandsquelle<F>(mut self, quelle: F) -> Self
    where
        F: Fn() -> Bestand + Send + Sync + 'static,
    {
        self.bestand = Some(Arc::new(quelle));
        self.bestand_abgleichen();
        self
    }

    /// Setzt die Gauges auf den Bestand der Quelle
    ///
    /// Gibt `false` zurueck, wenn keine Quelle gesetzt ist.
    pub fn bestand_abgleichen(&self) -> bool {
        let Some(quelle) = &self.bestand else {
            return false;
        };
        let bestand = quelle();
        self.rooms_active.set(bestand.raeume as i64);
        self.connections_active.set(bestand.verbindungen as i64);
        true
    }

    /// Verbucht ein einzelnes Engine-Ereignis
    pub fn event_verbuchen(&self, event: &QuizEvent) {
        match event {
            QuizEvent::RaumErstellt { .. } => {
                if !self.bestand_abgleichen() {
                    self.rooms_active.inc();
                }
            }
            QuizEvent::RaumEntfernt { .. } => {
                if !self.bestand_abgleichen() {
                    self.rooms_active.dec();
                }
            }
            QuizEvent::VerbindungRegistriert { .. } => {
                if !self.bestand_abgleichen() {
                    self.connections_active.inc();
                }
            }
            QuizEvent::VerbindungGetrennt { verworfen, .. } => {
                if !self.bestand_abgleichen() {
                    self.connections_active.dec();
                }
                if *verworfen {
                    self.connections_dropped_total.inc();
                }
            }
            QuizEvent::FrageGeoeffnet { .. } => self.questions_opened_total.inc(),
            QuizEvent::FrageGeschlossen { automatisch, .. } => {
                let trigger = if *automatisch { "timer" } else { "host" };
                self.questions_closed_total
                    .with_label_values(&[trigger])
                    .inc();
            }
            QuizEvent::AntwortAngenommen { .. } => self.presses_accepted_total.inc(),
            QuizEvent::AntwortAbgelehnt { grund, .. } => {
                self.presses_rejected_total
                    .with_label_values(&[grund.as_str()])
                    .inc();
            }
        }
    }

    /// Startet einen Task, der den Event-Strom der Engine verbucht
    ///
    /// Endet, wenn der Sender geschlossen wird.
    pub fn events_verfolgen(&self, mut events: broadcast::Receiver<QuizEvent>) -> JoinHandle<()> {
        let metriken = self.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => metriken.event_verbuchen(&event),
                    Err(broadcast::error::RecvError::Lagged(verpasst)) => {
                        let abgeglichen = metriken.bestand_abgleichen();
                        tracing::warn!(
                            verpasst,
                            abgeglichen,
                            "Metriken hinken dem Event-Strom hinterher"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        self.bestand_abgleichen();
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: QuizMetriken) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<QuizMetriken>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
