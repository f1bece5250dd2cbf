//! quizhub-server – Bibliotheks-Root
//!
//! Verdrahtet Datenbank, Praesentations-Store, Sitzungs-Engine, API und
//! Observability zu einem lauffaehigen Server.

pub mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use config::ServerConfig;
use quizhub_api::{ApiState, RestServer};
use quizhub_db::{ButtonRepository, JsonPresentationStore, SqliteDb};
use quizhub_observability::{
    observability_server_starten, timing_middleware, Bestand, HealthState, QuizMetriken,
};
use quizhub_session::SessionEngine;
use tokio::task::JoinHandle;

/// Intervall, in dem die Datenbank fuer den Health-Check angepingt wird
const DB_PING_INTERVALL: Duration = Duration::from_secs(15);

/// Alle aufgebauten Dienste eines Servers
///
/// Getrennt von [`Server::starten`], damit Tests die App ohne offenen
/// Port ansprechen koennen.
pub struct Dienste {
    pub state: ApiState,
    pub db: Arc<SqliteDb>,
    pub metriken: QuizMetriken,
    pub health: HealthState,
}

impl Dienste {
    /// Oeffnet Datenbank und Store und baut Engine samt API-State
    pub async fn aufbauen(config: &ServerConfig) -> Result<Self> {
        let db = Arc::new(
            SqliteDb::oeffnen(&config.datenbank_konfig())
                .await
                .with_context(|| format!("Datenbank '{}' nicht verfuegbar", config.datenbank.url))?,
        );
        let store = Arc::new(
            JsonPresentationStore::oeffnen(&config.praesentationen.daten_pfad)
                .await
                .context("Praesentations-Store nicht verfuegbar")?,
        );

        let engine = SessionEngine::neu(
            config.sitzungs_konfig(),
            Some(db.clone() as Arc<dyn ButtonRepository>),
        );
        let bestand_engine = engine.clone();
        let metriken = QuizMetriken::neu()?.mit_bestandsquelle(move || Bestand {
            raeume: bestand_engine.raum_anzahl(),
            verbindungen: bestand_engine.verbindungs_anzahl(),
        });
        metriken.events_verfolgen(engine.events_abonnieren());

        let state = ApiState::neu(engine, db.clone(), store, config.api_konfig());

        Ok(Self {
            state,
            db,
            metriken,
            health: HealthState::neu(),
        })
    }

    /// REST/WebSocket-App inklusive Timing-Middleware
    pub fn app(&self, config: &ServerConfig) -> Result<Router> {
        let app = RestServer::neu(config.rest_server_konfig()?)
            .app(self.state.clone())
            .layer(axum::middleware::from_fn_with_state(
                self.metriken.clone(),
                timing_middleware,
            ));
        Ok(app)
    }

    /// Pingt die Datenbank regelmaessig und pflegt den Health-Status
    fn db_ueberwachung_starten(&self) -> JoinHandle<()> {
        let db = self.db.clone();
        let health = self.health.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(DB_PING_INTERVALL);
            loop {
                ticker.tick().await;
                match db.ping().await {
                    Ok(()) => health.db_status_setzen(true),
                    Err(e) => {
                        if health.db_verbunden() {
                            tracing::error!(fehler = %e, "Datenbank nicht erreichbar");
                        }
                        health.db_status_setzen(false);
                    }
                }
            }
        })
    }
}

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Datenbank und Praesentations-Store oeffnen
    /// 2. Engine, Leerlauf-Reaper und Metriken starten
    /// 3. Observability-Server starten (optional)
    /// 4. REST/WebSocket-Server starten
    /// 5. Auf Ctrl-C warten
    pub async fn starten(self) -> Result<()> {
        let api_adresse = self.config.api_bind_adresse()?;
        tracing::info!(
            server_name = %self.config.server.name,
            api = %api_adresse,
            datenbank = %self.config.datenbank.url,
            "Server startet"
        );

        let dienste = Dienste::aufbauen(&self.config).await?;
        let reaper = dienste
            .state
            .engine
            .leerlauf_reaper_starten(self.config.reaper_intervall());
        let db_ueberwachung = dienste.db_ueberwachung_starten();

        let observability = if self.config.observability.aktiviert {
            let adresse = self.config.observability_bind_adresse()?;
            let metriken = dienste.metriken.clone();
            let health = dienste.health.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = observability_server_starten(adresse, metriken, health).await {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            }))
        } else {
            None
        };

        let app = dienste.app(&self.config)?;
        let listener = tokio::net::TcpListener::bind(api_adresse)
            .await
            .with_context(|| format!("Port {api_adresse} nicht verfuegbar"))?;
        tracing::info!(addr = %api_adresse, "REST/WebSocket-Server gestartet");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server wird beendet");
        reaper.abort();
        db_ueberwachung.abort();
        if let Some(handle) = observability {
            handle.abort();
        }
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(fehler = %e, "Ctrl-C Handler konnte nicht installiert werden");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown-Signal empfangen");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_config(dir: &std::path::Path) -> ServerConfig {
        let mut config = ServerConfig::default();
        config.datenbank.url = format!("sqlite://{}", dir.join("quizhub.db").display());
        config.praesentationen.daten_pfad = dir.join("data");
        config.netzwerk.bind_adresse = "127.0.0.1".into();
        config
    }

    #[tokio::test]
    async fn dienste_aufbauen_und_anfrage_zaehlen() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let dienste = Dienste::aufbauen(&config).await.unwrap();
        let app = dienste.app(&config).unwrap();

        let antwort = app
            .oneshot(
                Request::post("/api/rooms")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"code":"A1B2"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::OK);
        assert!(dienste
            .state
            .engine
            .raum_existiert(&quizhub_core::RoomCode::parse("A1B2").unwrap()));

        assert_eq!(
            dienste
                .metriken
                .http_requests_total
                .with_label_values(&["POST", "/api/rooms", "200"])
                .get(),
            1
        );

        // Raum-Gauge kommt ueber den Event-Strom
        tokio::time::timeout(Duration::from_secs(5), async {
            while dienste.metriken.rooms_active.get() != 1 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn db_ueberwachung_setzt_status() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let dienste = Dienste::aufbauen(&config).await.unwrap();
        dienste.health.db_status_setzen(false);

        let handle = dienste.db_ueberwachung_starten();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !dienste.health.db_verbunden() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        handle.abort();
    }
}
