//! quizhub Server – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den Server.

use anyhow::Result;
use quizhub_observability::logging_initialisieren;
use quizhub_server::config::{ServerConfig, CONFIG_ENV, STANDARD_CONFIG_PFAD};
use quizhub_server::Server;

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var(CONFIG_ENV).unwrap_or_else(|_| STANDARD_CONFIG_PFAD.into());

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let config = ServerConfig::laden(&config_pfad)?;

    logging_initialisieren(&config.logging.level, &config.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "quizhub Server wird initialisiert"
    );

    Server::neu(config).starten().await
}
