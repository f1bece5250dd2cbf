//! Axum HTTP-Server fuer REST und WebSocket

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::routes::api_router;
use crate::state::ApiState;

/// REST-Server-Konfiguration
#[derive(Debug, Clone)]
pub struct RestServerKonfig {
    pub bind_addr: SocketAddr,
    /// Erlaubte CORS-Origins. Leer = alle Origins erlaubt (nur fuer Entwicklung).
    pub cors_origins: Vec<String>,
    /// Verzeichnis mit dem gebauten Frontend, als Fallback ausgeliefert
    pub static_dir: Option<PathBuf>,
}

impl Default for RestServerKonfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            cors_origins: vec![],
            static_dir: None,
        }
    }
}

/// Axum HTTP-Server fuer quizhub
pub struct RestServer {
    konfig: RestServerKonfig,
}

impl RestServer {
    pub fn neu(konfig: RestServerKonfig) -> Self {
        Self { konfig }
    }

    /// Baut die vollstaendige App mit allen Layern
    pub fn app(&self, state: ApiState) -> Router {
        // CORS konfigurieren: entweder spezifische Origins oder Any
        let cors = if self.konfig.cors_origins.is_empty() {
            CorsLayer::permissive()
        } else {
            let origins: Vec<HeaderValue> = self
                .konfig
                .cors_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers(tower_http::cors::Any)
        };

        let mut app = api_router();
        if let Some(dir) = &self.konfig.static_dir {
            app = app.fallback_service(ServeDir::new(dir));
        }

        app.layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(state)
    }

    /// Startet den Server und laeuft bis zum Fehler
    pub async fn starten(self, state: ApiState) -> Result<()> {
        let app = self.app(state);
        let listener = tokio::net::TcpListener::bind(self.konfig.bind_addr).await?;
        tracing::info!(addr = %self.konfig.bind_addr, "REST/WebSocket-Server gestartet");

        axum::serve(listener, app).await?;
        Ok(())
    }
}
