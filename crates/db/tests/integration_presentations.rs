//! Integration-Tests fuer den JSON-Praesentations-Store

use base64::Engine as _;
use quizhub_core::RoomCode;
use quizhub_db::{DbError, JsonPresentationStore, PresentationRepository, SlideConfig};

fn cfg(sekunden: u32) -> SlideConfig {
    SlideConfig {
        time_limit_seconds: sekunden,
        points_correct: 10,
        points_wrong: 5,
    }
}

#[tokio::test]
async fn leerer_store_ohne_datei() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonPresentationStore::oeffnen(dir.path()).await.unwrap();
    assert_eq!(store.raum_fuer_praesentation("doc1").await.unwrap(), None);
    assert_eq!(store.folien_config("doc1", "s1").await.unwrap(), None);
}

#[tokio::test]
async fn verknuepfung_ueberlebt_neustart() {
    let dir = tempfile::tempdir().unwrap();
    let room = RoomCode::parse("A1B2").unwrap();

    {
        let store = JsonPresentationStore::oeffnen(dir.path()).await.unwrap();
        store.raum_verknuepfen("doc1", &room).await.unwrap();
        store.folien_config_speichern("doc1", "s1", cfg(30)).await.unwrap();
    }

    let store = JsonPresentationStore::oeffnen(dir.path()).await.unwrap();
    assert_eq!(
        store.raum_fuer_praesentation("doc1").await.unwrap(),
        Some(room)
    );
    assert_eq!(store.folien_config("doc1", "s1").await.unwrap(), Some(cfg(30)));
    assert!(!dir.path().join("presentations.json.tmp").exists());
}

#[tokio::test]
async fn beschaedigte_datei_ergibt_leeren_store() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("presentations.json"), b"{kein json").unwrap();

    let store = JsonPresentationStore::oeffnen(dir.path()).await.unwrap();
    assert_eq!(store.raum_fuer_praesentation("doc1").await.unwrap(), None);
}

#[tokio::test]
async fn snapshot_wird_dekodiert_und_abgelegt() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonPresentationStore::oeffnen(dir.path()).await.unwrap();

    let png = [0x89u8, b'P', b'N', b'G', 1, 2, 3];
    let b64 = base64::engine::general_purpose::STANDARD.encode(png);
    let pfad = store
        .snapshot_speichern("doc1", "s7", &format!("data:image/png;base64,{b64}"))
        .await
        .unwrap();

    assert_eq!(pfad, "presentations/doc1/slides/s7.png");
    assert_eq!(std::fs::read(dir.path().join(&pfad)).unwrap(), png);

    let p = store.praesentation("doc1").await.unwrap();
    assert_eq!(p.slides["s7"].image_path, pfad);
    assert_eq!(p.slides["s7"].config, None);
}

#[tokio::test]
async fn snapshot_mit_ungueltigen_daten() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonPresentationStore::oeffnen(dir.path()).await.unwrap();

    let err = store.snapshot_speichern("doc1", "s1", "%%%").await.unwrap_err();
    assert!(matches!(err, DbError::Base64(_)));

    let err = store.snapshot_speichern("../x", "s1", "AAAA").await.unwrap_err();
    assert!(matches!(err, DbError::UngueltigeDaten(_)));
}
