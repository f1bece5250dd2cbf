//! Integration-Tests fuer ButtonRepository (In-Memory SQLite)

use quizhub_core::{RoomCode, TeamId};
use quizhub_db::{ButtonRepository, ButtonZuordnung, DbError, SqliteDb};

async fn db() -> SqliteDb {
    SqliteDb::in_memory()
        .await
        .expect("In-Memory DB konnte nicht erstellt werden")
}

fn raum(code: &str) -> RoomCode {
    RoomCode::parse(code).unwrap()
}

#[tokio::test]
async fn button_registrieren_und_laden() {
    let db = db().await;

    let button = db
        .registrieren("aa:bb:cc:dd:ee:ff", "", "Pult 1")
        .await
        .unwrap();
    assert_eq!(button.id, "btn_DDEEFF");
    assert_eq!(button.mac_address, "AABBCCDDEEFF");
    assert_eq!(button.button_id, "1");
    assert_eq!(button.name, "Pult 1");
    assert!(button.is_active);
    assert_eq!(button.press_count, 0);
    assert!(button.zuordnung().is_none());

    // Andere Schreibweise derselben MAC
    let geladen = db.laden("AA-BB-CC-DD-EE-FF").await.unwrap().unwrap();
    assert_eq!(geladen, button);
}

#[tokio::test]
async fn erneutes_registrieren_behaelt_namen_und_zaehler() {
    let db = db().await;
    db.registrieren("AABBCCDDEEFF", "1", "Pult 1").await.unwrap();
    db.druck_erfassen("AABBCCDDEEFF").await.unwrap();

    let erneut = db.registrieren("aabbccddeeff", "2", "").await.unwrap();
    assert_eq!(erneut.name, "Pult 1");
    assert_eq!(erneut.button_id, "2");
    assert_eq!(erneut.press_count, 1);
    assert_eq!(db.alle().await.unwrap().len(), 1);
}

#[tokio::test]
async fn kollidierende_button_id_wird_abgelehnt() {
    let db = db().await;
    db.registrieren("111111DDEEFF", "1", "").await.unwrap();
    let err = db.registrieren("222222DDEEFF", "1", "").await.unwrap_err();
    assert!(matches!(err, DbError::Eindeutigkeit(_)));
}

#[tokio::test]
async fn druck_erfassen_zaehlt_und_prueft_status() {
    let db = db().await;

    let err = db.druck_erfassen("001122334455").await.unwrap_err();
    assert!(matches!(err, DbError::NichtGefunden(_)));

    db.registrieren("001122334455", "1", "").await.unwrap();
    let nach_druck = db.druck_erfassen("00:11:22:33:44:55").await.unwrap();
    assert_eq!(nach_druck.press_count, 1);
    assert!(nach_druck.last_press.is_some());

    db.aktiv_setzen("001122334455", false).await.unwrap();
    let err = db.druck_erfassen("001122334455").await.unwrap_err();
    assert!(matches!(err, DbError::ButtonInaktiv(_)));

    // Deaktivierte Drucke werden nicht gezaehlt
    let button = db.laden("001122334455").await.unwrap().unwrap();
    assert_eq!(button.press_count, 1);
}

#[tokio::test]
async fn zuordnen_und_aufheben() {
    let db = db().await;
    let room = raum("a1b2");
    let team = TeamId::new();
    db.registrieren("AABBCC000001", "1", "").await.unwrap();

    let zugeordnet = db
        .zuordnen(
            "AABBCC000001",
            ButtonZuordnung {
                room_code: &room,
                team_id: team,
                team_name: "Rot",
            },
        )
        .await
        .unwrap();
    assert_eq!(zugeordnet.zuordnung(), Some((&room, team)));
    assert_eq!(zugeordnet.team_name, "Rot");
    assert_eq!(db.fuer_raum(&room).await.unwrap().len(), 1);

    let frei = db.zuordnung_aufheben("AABBCC000001").await.unwrap();
    assert!(frei.zuordnung().is_none());
    assert!(frei.team_name.is_empty());
    assert!(db.fuer_raum(&room).await.unwrap().is_empty());
}

#[tokio::test]
async fn zuordnen_unbekannter_button() {
    let db = db().await;
    let room = raum("A1B2");
    let err = db
        .zuordnen(
            "FFFFFF000000",
            ButtonZuordnung {
                room_code: &room,
                team_id: TeamId::new(),
                team_name: "Rot",
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NichtGefunden(_)));
}

#[tokio::test]
async fn team_zuordnungen_aufheben_betrifft_nur_dieses_team() {
    let db = db().await;
    let room = raum("A1B2");
    let rot = TeamId::new();
    let blau = TeamId::new();

    for (mac, team, name) in [
        ("AABBCC000001", rot, "Rot"),
        ("AABBCC000002", rot, "Rot"),
        ("AABBCC000003", blau, "Blau"),
    ] {
        db.registrieren(mac, "1", "").await.unwrap();
        db.zuordnen(
            mac,
            ButtonZuordnung {
                room_code: &room,
                team_id: team,
                team_name: name,
            },
        )
        .await
        .unwrap();
    }

    let anzahl = db.team_zuordnungen_aufheben(&room, rot).await.unwrap();
    assert_eq!(anzahl, 2);

    let verbleibend = db.fuer_raum(&room).await.unwrap();
    assert_eq!(verbleibend.len(), 1);
    assert_eq!(verbleibend[0].team_id, Some(blau));
}

#[tokio::test]
async fn button_loeschen() {
    let db = db().await;
    db.registrieren("AABBCC000001", "1", "").await.unwrap();
    assert!(db.loeschen("aa:bb:cc:00:00:01").await.unwrap());
    assert!(!db.loeschen("AABBCC000001").await.unwrap());
    assert!(db.laden("AABBCC000001").await.unwrap().is_none());
}
