//! JSON-Store fuer Praesentationen
//!
//! Alle Daten liegen in `<daten_pfad>/presentations.json`, Folien-Snapshots
//! unter `<daten_pfad>/presentations/<docKey>/slides/<slideId>.png`.
//! Schreibvorgaenge laufen ueber eine temporaere Datei mit anschliessendem
//! `rename`, sodass die Datei nie halb geschrieben auf der Platte liegt.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine as _;
use quizhub_core::RoomCode;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::DbError;
use crate::models::{PresentationRecord, PresentationsDatei, SlideConfig};
use crate::repository::{DbResult, PresentationRepository};

const DATEI_NAME: &str = "presentations.json";
const PNG_DATA_URL_PRAEFIX: &str = "data:image/png;base64,";

/// Dateibasierter Praesentations-Store
pub struct JsonPresentationStore {
    daten_pfad: PathBuf,
    datei_pfad: PathBuf,
    /// Der Mutex wird waehrend des Schreibens gehalten und serialisiert so
    /// alle Schreibzugriffe auf die Datei
    daten: Mutex<PresentationsDatei>,
}

impl JsonPresentationStore {
    /// Oeffnet den Store im angegebenen Datenverzeichnis
    ///
    /// Eine fehlende Datei ergibt einen leeren Store, eine beschaedigte
    /// wird mit Warnung ignoriert.
    pub async fn oeffnen(daten_pfad: impl Into<PathBuf>) -> DbResult<Self> {
        let daten_pfad = daten_pfad.into();
        tokio::fs::create_dir_all(&daten_pfad).await?;
        let datei_pfad = daten_pfad.join(DATEI_NAME);

        let daten = match tokio::fs::read(&datei_pfad).await {
            Ok(bytes) => match serde_json::from_slice::<PresentationsDatei>(&bytes) {
                Ok(daten) => daten,
                Err(e) => {
                    warn!(
                        pfad = %datei_pfad.display(),
                        fehler = %e,
                        "presentations.json beschaedigt, starte mit leerem Store"
                    );
                    PresentationsDatei::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PresentationsDatei::default(),
            Err(e) => return Err(e.into()),
        };

        info!(
            pfad = %datei_pfad.display(),
            anzahl = daten.presentations.len(),
            "Praesentations-Store geladen"
        );

        Ok(Self {
            daten_pfad,
            datei_pfad,
            daten: Mutex::new(daten),
        })
    }

    /// Datenverzeichnis (Basis fuer relative Bildpfade)
    pub fn daten_pfad(&self) -> &Path {
        &self.daten_pfad
    }

    /// Kopie einer Praesentation
    pub async fn praesentation(&self, doc_key: &str) -> Option<PresentationRecord> {
        self.daten.lock().await.presentations.get(doc_key).cloned()
    }

    /// Schreibt den Inhalt atomar (temp-Datei, fsync, rename)
    async fn schreiben(&self, daten: &PresentationsDatei) -> DbResult<()> {
        let json = serde_json::to_vec_pretty(daten)?;
        let temp_pfad = self.datei_pfad.with_extension("json.tmp");

        let mut datei = tokio::fs::File::create(&temp_pfad).await?;
        datei.write_all(&json).await?;
        datei.sync_all().await?;
        drop(datei);

        tokio::fs::rename(&temp_pfad, &self.datei_pfad).await?;
        debug!(pfad = %self.datei_pfad.display(), bytes = json.len(), "presentations.json geschrieben");
        Ok(())
    }
}

/// Schluessel landen im Dateisystem und duerfen daher keine Pfadanteile enthalten
fn schluessel_pruefen(wert: &str, feld: &str) -> DbResult<()> {
    if wert.trim().is_empty() {
        return Err(DbError::ungueltig(format!("{feld} ist erforderlich")));
    }
    if wert.contains(['/', '\\']) || wert.starts_with('.') || wert.contains('\0') {
        return Err(DbError::ungueltig(format!("{feld} enthaelt ungueltige Zeichen")));
    }
    Ok(())
}

#[async_trait]
impl PresentationRepository for JsonPresentationStore {
    async fn raum_fuer_praesentation(&self, doc_key: &str) -> DbResult<Option<RoomCode>> {
        let daten = self.daten.lock().await;
        Ok(daten
            .presentations
            .get(doc_key)
            .and_then(|p| p.last_room_code.clone()))
    }

    async fn raum_verknuepfen(&self, doc_key: &str, room: &RoomCode) -> DbResult<()> {
        schluessel_pruefen(doc_key, "docKey")?;

        let mut daten = self.daten.lock().await;
        let mut neu = daten.clone();
        neu.presentations
            .entry(doc_key.to_string())
            .or_insert_with(|| PresentationRecord::neu(doc_key))
            .last_room_code = Some(room.clone());

        self.schreiben(&neu).await?;
        *daten = neu;

        info!(doc_key, room = %room, "Praesentation mit Raum verknuepft");
        Ok(())
    }

    async fn folien_config(&self, doc_key: &str, slide_id: &str) -> DbResult<Option<SlideConfig>> {
        let daten = self.daten.lock().await;
        Ok(daten
            .presentations
            .get(doc_key)
            .and_then(|p| p.slides.get(slide_id))
            .and_then(|s| s.config))
    }

    async fn folien_config_speichern(
        &self,
        doc_key: &str,
        slide_id: &str,
        config: SlideConfig,
    ) -> DbResult<()> {
        schluessel_pruefen(doc_key, "docKey")?;
        schluessel_pruefen(slide_id, "slideId")?;

        let mut daten = self.daten.lock().await;
        let mut neu = daten.clone();
        neu.presentations
            .entry(doc_key.to_string())
            .or_insert_with(|| PresentationRecord::neu(doc_key))
            .slides
            .entry(slide_id.to_string())
            .or_default()
            .config = Some(config);

        self.schreiben(&neu).await?;
        *daten = neu;

        debug!(doc_key, slide_id, ?config, "Folien-Konfiguration gespeichert");
        Ok(())
    }

    async fn snapshot_speichern(
        &self,
        doc_key: &str,
        slide_id: &str,
        bild_base64: &str,
    ) -> DbResult<String> {
        schluessel_pruefen(doc_key, "docKey")?;
        schluessel_pruefen(slide_id, "slideId")?;
        if bild_base64.is_empty() {
            return Err(DbError::ungueltig("imageBase64 ist erforderlich"));
        }

        let roh = bild_base64
            .strip_prefix(PNG_DATA_URL_PRAEFIX)
            .unwrap_or(bild_base64);
        let bytes = base64::engine::general_purpose::STANDARD.decode(roh.trim())?;

        let relativ = format!("presentations/{doc_key}/slides/{slide_id}.png");
        let verzeichnis = self
            .daten_pfad
            .join("presentations")
            .join(doc_key)
            .join("slides");
        tokio::fs::create_dir_all(&verzeichnis).await?;
        tokio::fs::write(verzeichnis.join(format!("{slide_id}.png")), &bytes).await?;

        let mut daten = self.daten.lock().await;
        let mut neu = daten.clone();
        neu.presentations
            .entry(doc_key.to_string())
            .or_insert_with(|| PresentationRecord::neu(doc_key))
            .slides
            .entry(slide_id.to_string())
            .or_default()
            .image_path = relativ.clone();

        self.schreiben(&neu).await?;
        *daten = neu;

        info!(doc_key, slide_id, bytes = bytes.len(), "Folien-Snapshot gespeichert");
        Ok(relativ)
    }
}
