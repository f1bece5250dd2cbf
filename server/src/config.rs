//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use quizhub_api::{ApiKonfig, RestServerKonfig};
use quizhub_db::DatabaseConfig;
use quizhub_session::config::PUNKTE_MAX;
use quizhub_session::SitzungsKonfig;
use serde::{Deserialize, Serialize};

/// Umgebungsvariable mit dem Pfad zur Konfigurationsdatei
pub const CONFIG_ENV: &str = "QUIZHUB_CONFIG";

/// Standard-Pfad wenn [`CONFIG_ENV`] nicht gesetzt ist
pub const STANDARD_CONFIG_PFAD: &str = "config.toml";

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Datenbank-Einstellungen (Button-Registry)
    pub datenbank: DatenbankEinstellungen,
    /// Raeume, Fragen und Send-Queues
    pub sitzung: SitzungsEinstellungen,
    /// Hardware-Buttons
    pub knoepfe: KnopfEinstellungen,
    /// Praesentations-Store
    pub praesentationen: PraesentationsEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// Verzeichnis mit dem gebauten Frontend (leer = keine statischen Dateien)
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "quizhub".into(),
            static_dir: None,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer REST und WebSocket
    pub bind_adresse: String,
    /// Port fuer REST und WebSocket
    pub port: u16,
    /// CORS-Origins fuer REST (leer = alle erlaubt)
    pub cors_origins: Vec<String>,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 8080,
            cors_origins: vec![],
        }
    }
}

/// Datenbank-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatenbankEinstellungen {
    /// Verbindungs-URL
    pub url: String,
    /// Maximale Verbindungspool-Groesse
    pub max_verbindungen: u32,
    /// WAL-Modus fuer SQLite
    pub sqlite_wal: bool,
}

impl Default for DatenbankEinstellungen {
    fn default() -> Self {
        let standard = DatabaseConfig::default();
        Self {
            url: standard.url,
            max_verbindungen: standard.max_verbindungen,
            sqlite_wal: standard.sqlite_wal,
        }
    }
}

/// Einstellungen der Sitzungs-Engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SitzungsEinstellungen {
    /// Groesse der Send-Queue pro Verbindung
    pub send_queue_groesse: usize,
    /// Raeume ohne Verbindungen werden nach so vielen Sekunden entfernt
    pub leerlauf_timeout_sek: u64,
    /// Intervall des Leerlauf-Reapers in Sekunden
    pub reaper_intervall_sek: u64,
    /// Zeitlimit wenn weder Client noch Folie eins vorgeben
    pub standard_zeitlimit_sek: u32,
    pub standard_punkte_richtig: i64,
    pub standard_punkte_falsch: i64,
}

impl Default for SitzungsEinstellungen {
    fn default() -> Self {
        let standard = SitzungsKonfig::default();
        Self {
            send_queue_groesse: standard.send_queue_groesse,
            leerlauf_timeout_sek: standard.leerlauf_timeout.as_secs(),
            reaper_intervall_sek: 60,
            standard_zeitlimit_sek: standard.standard_zeitlimit_sek,
            standard_punkte_richtig: standard.standard_punkte_richtig,
            standard_punkte_falsch: standard.standard_punkte_falsch,
        }
    }
}

/// Hardware-Button-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnopfEinstellungen {
    /// Unbekannte Buttons beim ersten Druck automatisch registrieren
    pub auto_registrierung: bool,
}

impl Default for KnopfEinstellungen {
    fn default() -> Self {
        Self {
            auto_registrierung: ApiKonfig::default().auto_registrierung,
        }
    }
}

/// Praesentations-Store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PraesentationsEinstellungen {
    /// Verzeichnis fuer `presentations.json` und Folienbilder
    pub daten_pfad: PathBuf,
}

impl Default for PraesentationsEinstellungen {
    fn default() -> Self {
        Self {
            daten_pfad: PathBuf::from("data"),
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    /// Port fuer Metriken und Health (Standard: 9300)
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            port: 9300,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Parst und prueft eine Konfiguration aus einem TOML-String
    pub fn aus_toml(inhalt: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(inhalt)?;
        config.pruefen()?;
        Ok(config)
    }

    /// Prueft Werte, die serde allein nicht abfangen kann
    pub fn pruefen(&self) -> anyhow::Result<()> {
        if self.sitzung.send_queue_groesse == 0 {
            anyhow::bail!("sitzung.send_queue_groesse muss groesser als 0 sein");
        }
        if self.sitzung.reaper_intervall_sek == 0 {
            anyhow::bail!("sitzung.reaper_intervall_sek muss groesser als 0 sein");
        }
        if self.sitzung.standard_zeitlimit_sek == 0 {
            anyhow::bail!("sitzung.standard_zeitlimit_sek muss mindestens 1 sein");
        }
        if self.sitzung.standard_punkte_richtig < 0 || self.sitzung.standard_punkte_falsch < 0 {
            anyhow::bail!("sitzung.standard_punkte_* darf nicht negativ sein");
        }
        if self.sitzung.standard_punkte_richtig > PUNKTE_MAX
            || self.sitzung.standard_punkte_falsch > PUNKTE_MAX
        {
            anyhow::bail!("sitzung.standard_punkte_* darf hoechstens {PUNKTE_MAX} sein");
        }
        if self.datenbank.max_verbindungen == 0 {
            anyhow::bail!("datenbank.max_verbindungen muss groesser als 0 sein");
        }
        Ok(())
    }

    /// Bind-Adresse fuer REST und WebSocket
    pub fn api_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        adresse_parsen(&self.netzwerk.bind_adresse, self.netzwerk.port)
    }

    /// Bind-Adresse fuer den Observability-Server
    pub fn observability_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        adresse_parsen(&self.netzwerk.bind_adresse, self.observability.port)
    }

    pub fn datenbank_konfig(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.datenbank.url.clone(),
            max_verbindungen: self.datenbank.max_verbindungen,
            sqlite_wal: self.datenbank.sqlite_wal,
        }
    }

    pub fn sitzungs_konfig(&self) -> SitzungsKonfig {
        SitzungsKonfig {
            send_queue_groesse: self.sitzung.send_queue_groesse,
            leerlauf_timeout: Duration::from_secs(self.sitzung.leerlauf_timeout_sek),
            standard_zeitlimit_sek: self.sitzung.standard_zeitlimit_sek,
            standard_punkte_richtig: self.sitzung.standard_punkte_richtig,
            standard_punkte_falsch: self.sitzung.standard_punkte_falsch,
        }
    }

    pub fn api_konfig(&self) -> ApiKonfig {
        ApiKonfig {
            auto_registrierung: self.knoepfe.auto_registrierung,
        }
    }

    pub fn rest_server_konfig(&self) -> anyhow::Result<RestServerKonfig> {
        Ok(RestServerKonfig {
            bind_addr: self.api_bind_adresse()?,
            cors_origins: self.netzwerk.cors_origins.clone(),
            static_dir: self.server.static_dir.clone(),
        })
    }

    pub fn reaper_intervall(&self) -> Duration {
        Duration::from_secs(self.sitzung.reaper_intervall_sek)
    }
}

fn adresse_parsen(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    format!("{host}:{port}")
        .parse()
        .map_err(|e| anyhow::anyhow!("Ungueltige Bind-Adresse '{host}:{port}': {e}"))
}
