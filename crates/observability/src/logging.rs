//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `QH_LOG_LEVEL`: Log-Level oder EnvFilter-Direktive, Standard aus der Config
//! - `QH_LOG_FORMAT`: Format (text/json), Standard aus der Config
//!
//! Die Umgebung hat Vorrang vor der Konfigurationsdatei.

use tracing_subscriber::{fmt, EnvFilter};

/// Umgebungsvariable fuer den Log-Level
pub const LOG_LEVEL_ENV: &str = "QH_LOG_LEVEL";

/// Umgebungsvariable fuer das Log-Format
pub const LOG_FORMAT_ENV: &str = "QH_LOG_FORMAT";

/// Initialisiert das Logging-System.
///
/// Darf pro Prozess nur einmal aufgerufen werden.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let aus_env = std::env::var(LOG_FORMAT_ENV).ok();
    let format = format_waehlen(aus_env.as_deref(), format);

    match format {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_current_span(true)
                .init();
        }
        _ => {
            fmt().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Waehlt das Log-Format: Umgebung vor Konfiguration, Unbekanntes wird `text`
fn format_waehlen(aus_env: Option<&str>, aus_config: &str) -> &'static str {
    match aus_env.unwrap_or(aus_config) {
        "json" => "json",
        _ => "text",
    }
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_gueltige_werte() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(log_level_gueltig(level));
        }
        assert!(!log_level_gueltig("verbose"));
        assert!(!log_level_gueltig("INFO"));
        assert!(!log_level_gueltig(""));
    }

    #[test]
    fn log_format_gueltige_werte() {
        assert!(log_format_gueltig("text"));
        assert!(log_format_gueltig("json"));
        assert!(!log_format_gueltig("xml"));
        assert!(!log_format_gueltig("JSON"));
    }

    #[test]
    fn umgebung_hat_vorrang() {
        assert_eq!(format_waehlen(Some("json"), "text"), "json");
        assert_eq!(format_waehlen(None, "json"), "json");
        assert_eq!(format_waehlen(Some("xml"), "json"), "text");
        assert_eq!(format_waehlen(None, "text"), "text");
    }

    #[test]
    fn format_ueberlebt_kurzlebigen_env_wert() {
        let format = format_waehlen(Some(String::from("json")).as_deref(), "text");
        assert_eq!(format, "json");
    }
}
