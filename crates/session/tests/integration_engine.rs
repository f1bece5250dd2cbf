//! Integration-Tests fuer die Session-Engine
//!
//! Zeitabhaengige Tests laufen mit pausierter Tokio-Uhr.

use std::sync::Arc;
use std::time::Duration;

use quizhub_core::{RoomCode, TeamId};
use quizhub_db::{ButtonRepository, ButtonZuordnung, SqliteDb};
use quizhub_session::messages::FragenStatus;
use quizhub_session::{
    FrageParameter, Rolle, ServerMessage, SessionEngine, SessionError, SitzungsKonfig,
    VerbindungsEmpfaenger,
};

fn engine() -> SessionEngine {
    SessionEngine::neu(SitzungsKonfig::default(), None)
}

fn raum(engine: &SessionEngine, code: &str) -> RoomCode {
    let code = RoomCode::parse(code).unwrap();
    engine.raum_erstellen_oder_holen(&code);
    code
}

fn frage(zeitlimit: u32, richtig: i64, falsch: i64) -> FrageParameter {
    FrageParameter {
        slide_id: "1".into(),
        time_limit_seconds: zeitlimit,
        points_correct: richtig,
        points_wrong: falsch,
    }
}

/// Liest alle bereits eingereihten Nachrichten
fn abholen(rx: &mut VerbindungsEmpfaenger) -> Vec<ServerMessage> {
    let mut nachrichten = Vec::new();
    while let Ok(n) = rx.try_recv() {
        nachrichten.push((*n).clone());
    }
    nachrichten
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn gleichzeitige_antworten_bekommen_lueckenlose_raenge() {
    let engine = engine();
    let code = raum(&engine, "RACE");
    let teams: Vec<TeamId> = (0..32)
        .map(|i| engine.team_beitreten(&code, &format!("Team {i}")).unwrap().team_id)
        .collect();
    engine.frage_oeffnen(&code, frage(60, 100, 0)).unwrap();

    let mut tasks = Vec::new();
    for team in teams.clone() {
        let engine = engine.clone();
        let code = code.clone();
        tasks.push(tokio::spawn(async move {
            engine.antwort_einreichen(&code, team).map(|e| e.rank)
        }));
    }

    let mut raenge = Vec::new();
    for task in tasks {
        raenge.push(task.await.unwrap().unwrap());
    }
    raenge.sort_unstable();
    assert_eq!(raenge, (1..=32).collect::<Vec<u32>>());

    // Ledger-Reihenfolge entspricht den Raengen
    let snapshot = engine.snapshot(&code).unwrap();
    let ledger = snapshot.question.unwrap().ledger;
    for (index, eintrag) in ledger.iter().enumerate() {
        assert_eq!(eintrag.rank as usize, index + 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn gleichzeitige_duplikate_werden_genau_einmal_angenommen() {
    let engine = engine();
    let code = raum(&engine, "DUPE");
    let team = engine.team_beitreten(&code, "Rot").unwrap().team_id;
    engine.frage_oeffnen(&code, frage(60, 100, 0)).unwrap();

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let engine = engine.clone();
        let code = code.clone();
        tasks.push(tokio::spawn(async move { engine.antwort_einreichen(&code, team) }));
    }

    let mut angenommen = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => angenommen += 1,
            Err(SessionError::DoppelteAntwort) => {}
            Err(e) => panic!("unerwarteter Fehler: {e}"),
        }
    }
    assert_eq!(angenommen, 1);
}

#[tokio::test(start_paused = true)]
async fn szenario_a1b2_mit_automatischem_schliessen() {
    let engine = engine();
    let code = raum(&engine, "A1B2");
    let t1 = engine.team_beitreten(&code, "T1").unwrap().team_id;
    let t2 = engine.team_beitreten(&code, "T2").unwrap().team_id;
    let (_conn, mut anzeige) = engine
        .verbindung_registrieren(&code, Rolle::Display, None)
        .unwrap();
    abholen(&mut anzeige);

    engine.frage_oeffnen(&code, frage(30, 100, 0)).unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(engine.antwort_einreichen(&code, t1).unwrap().rank, 1);
    assert_eq!(engine.antwort_einreichen(&code, t2).unwrap().rank, 2);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(matches!(
        engine.antwort_einreichen(&code, t1),
        Err(SessionError::DoppelteAntwort)
    ));

    // t = 31s: der Timer hat bei 30s geschlossen
    tokio::time::sleep(Duration::from_secs(26)).await;
    assert!(matches!(
        engine.antwort_einreichen(&code, t2),
        Err(SessionError::FrageNichtAktiv)
    ));

    let nachrichten = abholen(&mut anzeige);
    let geschlossen: Vec<_> = nachrichten
        .iter()
        .filter_map(|n| match n {
            ServerMessage::QuestionClosed {
                automatic, ledger, ..
            } => Some((*automatic, ledger.len())),
            _ => None,
        })
        .collect();
    assert_eq!(geschlossen, vec![(true, 2)]);

    let akzeptiert = nachrichten
        .iter()
        .filter(|n| matches!(n, ServerMessage::PressAccepted { .. }))
        .count();
    assert_eq!(akzeptiert, 2);
}

#[tokio::test(start_paused = true)]
async fn manuelles_schliessen_verhindert_zweiten_close_broadcast() {
    let engine = engine();
    let code = raum(&engine, "A1B2");
    let (_conn, mut anzeige) = engine
        .verbindung_registrieren(&code, Rolle::Display, None)
        .unwrap();
    abholen(&mut anzeige);

    engine.frage_oeffnen(&code, frage(10, 100, 0)).unwrap();
    assert!(engine.frage_schliessen(&code).unwrap());
    assert!(!engine.frage_schliessen(&code).unwrap());

    tokio::time::sleep(Duration::from_secs(15)).await;
    let anzahl = abholen(&mut anzeige)
        .iter()
        .filter(|n| matches!(n, ServerMessage::QuestionClosed { .. }))
        .count();
    assert_eq!(anzahl, 1);
}

#[tokio::test(start_paused = true)]
async fn veralteter_timer_schliesst_neue_frage_nicht() {
    let engine = engine();
    let code = raum(&engine, "A1B2");
    let team = engine.team_beitreten(&code, "Rot").unwrap().team_id;

    engine.frage_oeffnen(&code, frage(10, 100, 0)).unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    engine.frage_oeffnen(&code, frage(60, 100, 0)).unwrap();

    // Der erste Timer waere bei t = 10s abgelaufen
    tokio::time::sleep(Duration::from_secs(10)).await;
    let snapshot = engine.snapshot(&code).unwrap();
    assert_eq!(snapshot.question_status, FragenStatus::Open);
    assert_eq!(snapshot.question.unwrap().generation, 2);
    assert_eq!(engine.antwort_einreichen(&code, team).unwrap().rank, 1);
}

#[tokio::test]
async fn neue_frage_leert_das_ledger() {
    let engine = engine();
    let code = raum(&engine, "A1B2");
    let team = engine.team_beitreten(&code, "Rot").unwrap().team_id;

    engine.frage_oeffnen(&code, frage(30, 100, 0)).unwrap();
    engine.antwort_einreichen(&code, team).unwrap();
    engine.frage_schliessen(&code).unwrap();

    let neu = engine.frage_oeffnen(&code, frage(30, 100, 0)).unwrap();
    assert!(neu.ledger.is_empty());
    assert_eq!(engine.antwort_einreichen(&code, team).unwrap().rank, 1);
}

#[tokio::test]
async fn antwort_nach_schliessen_aendert_ledger_nicht() {
    let engine = engine();
    let code = raum(&engine, "A1B2");
    let rot = engine.team_beitreten(&code, "Rot").unwrap().team_id;
    let blau = engine.team_beitreten(&code, "Blau").unwrap().team_id;

    engine.frage_oeffnen(&code, frage(30, 100, 0)).unwrap();
    engine.antwort_einreichen(&code, rot).unwrap();
    engine.frage_schliessen(&code).unwrap();

    assert!(matches!(
        engine.antwort_einreichen(&code, blau),
        Err(SessionError::FrageNichtAktiv)
    ));
    let ledger = engine.snapshot(&code).unwrap().question.unwrap().ledger;
    assert_eq!(ledger.len(), 1);
}

#[tokio::test]
async fn bewertung_und_punktekorrektur() {
    let engine = engine();
    let code = raum(&engine, "A1B2");
    let rot = engine.team_beitreten(&code, "Rot").unwrap().team_id;
    let blau = engine.team_beitreten(&code, "Blau").unwrap().team_id;

    engine.frage_oeffnen(&code, frage(30, 100, 40)).unwrap();
    engine.antwort_einreichen(&code, rot).unwrap();
    engine.antwort_einreichen(&code, blau).unwrap();
    assert!(matches!(
        engine.antwort_bewerten(&code, rot, true),
        Err(SessionError::FrageNochOffen)
    ));

    engine.frage_schliessen(&code).unwrap();
    assert_eq!(engine.antwort_bewerten(&code, rot, true).unwrap(), 100);
    assert_eq!(engine.antwort_bewerten(&code, blau, false).unwrap(), -40);
    assert!(matches!(
        engine.antwort_bewerten(&code, blau, true),
        Err(SessionError::BereitsBewertet(_))
    ));

    assert_eq!(engine.punkte_anpassen(&code, blau, 40).unwrap(), 0);
}

#[tokio::test]
async fn verbindungsabbruch_behaelt_team_und_punkte() {
    let engine = engine();
    let code = raum(&engine, "A1B2");
    let team = engine.team_beitreten(&code, "Rot").unwrap().team_id;
    engine.punkte_anpassen(&code, team, 50).unwrap();

    let (conn, rx) = engine
        .verbindung_registrieren(&code, Rolle::Team, Some(team))
        .unwrap();
    assert!(engine.team_stand(&code, team).unwrap().connected);

    drop(rx);
    assert!(engine.verbindung_abmelden(&code, &conn));
    assert!(!engine.verbindung_abmelden(&code, &conn));

    let stand = engine.team_stand(&code, team).unwrap();
    assert!(!stand.connected);
    assert_eq!(stand.score, 50);

    // Wiederverbinden bindet eine neue Verbindung an dasselbe Team
    let (neu, _rx) = engine
        .verbindung_registrieren(&code, Rolle::Team, Some(team))
        .unwrap();
    assert_ne!(neu, conn);
    let stand = engine.team_stand(&code, team).unwrap();
    assert!(stand.connected);
    assert_eq!(stand.score, 50);
}

#[tokio::test]
async fn neue_team_verbindung_ersetzt_die_alte() {
    let engine = engine();
    let code = raum(&engine, "A1B2");
    let team = engine.team_beitreten(&code, "Rot").unwrap().team_id;

    let (_alt, mut rx_alt) = engine
        .verbindung_registrieren(&code, Rolle::Team, Some(team))
        .unwrap();
    let (_neu, _rx_neu) = engine
        .verbindung_registrieren(&code, Rolle::Team, Some(team))
        .unwrap();

    // Snapshot noch in der Queue, danach ist die alte Queue geschlossen
    assert!(matches!(
        *rx_alt.recv().await.unwrap(),
        ServerMessage::RoomSnapshot { .. }
    ));
    assert!(rx_alt.recv().await.is_none());
    assert_eq!(engine.snapshot(&code).unwrap().connections, 1);
}

#[tokio::test]
async fn langsame_verbindung_wird_getrennt_ohne_andere_zu_blockieren() {
    let engine = SessionEngine::neu(
        SitzungsKonfig {
            send_queue_groesse: 2,
            ..Default::default()
        },
        None,
    );
    let code = raum(&engine, "SLOW");
    let mut events = engine.events_abonnieren();
    let (_langsam, _rx_langsam) = engine
        .verbindung_registrieren(&code, Rolle::Display, None)
        .unwrap();
    let (_schnell, mut rx_schnell) = engine
        .verbindung_registrieren(&code, Rolle::Display, None)
        .unwrap();

    for i in 0..5 {
        engine.team_beitreten(&code, &format!("Team {i}")).unwrap();
        abholen(&mut rx_schnell);
    }

    assert_eq!(engine.snapshot(&code).unwrap().connections, 1);
    let mut verworfen = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(
            event,
            quizhub_core::QuizEvent::VerbindungGetrennt {
                verworfen: true,
                ..
            }
        ) {
            verworfen += 1;
        }
    }
    assert_eq!(verworfen, 1);
}

#[tokio::test]
async fn team_entfernen_loest_buttons_und_behaelt_punkte() {
    let db = Arc::new(SqliteDb::in_memory().await.unwrap());
    let engine = SessionEngine::neu(
        SitzungsKonfig::default(),
        Some(db.clone() as Arc<dyn ButtonRepository>),
    );
    let code = raum(&engine, "A1B2");
    let team = engine.team_beitreten(&code, "Rot").unwrap().team_id;
    engine.punkte_anpassen(&code, team, 70).unwrap();

    db.registrieren("AABBCC000001", "1", "").await.unwrap();
    db.zuordnen(
        "AABBCC000001",
        ButtonZuordnung {
            room_code: &code,
            team_id: team,
            team_name: "Rot",
        },
    )
    .await
    .unwrap();
    engine.button_binden(&code, team, "AABBCC000001").unwrap();

    engine.team_entfernen(&code, team).await.unwrap();

    let button = db.laden("AABBCC000001").await.unwrap().unwrap();
    assert!(button.zuordnung().is_none());
    assert!(matches!(
        engine.team_stand(&code, team),
        Err(SessionError::TeamNichtGefunden(_))
    ));
    assert!(matches!(
        engine.team_entfernen(&code, team).await,
        Err(SessionError::TeamNichtGefunden(_))
    ));

    let snapshot = engine.snapshot(&code).unwrap();
    assert_eq!(snapshot.teams[0].score, 70);
    assert!(!snapshot.teams[0].active);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn gleichzeitiges_erstellen_liefert_einen_raum() {
    let engine = engine();
    let code = RoomCode::parse("SAME").unwrap();

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let engine = engine.clone();
        let code = code.clone();
        tasks.push(tokio::spawn(async move {
            engine.raum_erstellen_oder_holen(&code)
        }));
    }
    let mut handles = Vec::new();
    for task in tasks {
        handles.push(task.await.unwrap());
    }
    assert!(handles.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(engine.raum_anzahl(), 1);
}

#[tokio::test]
async fn verbindungen_ueber_alle_raeume_zaehlen() {
    let engine = engine();
    let a = raum(&engine, "AAAA");
    let b = raum(&engine, "BBBB");
    let (_, _rx1) = engine.verbindung_registrieren(&a, Rolle::Host, None).unwrap();
    let (_, _rx2) = engine.verbindung_registrieren(&a, Rolle::Display, None).unwrap();
    let (conn, _rx3) = engine.verbindung_registrieren(&b, Rolle::Host, None).unwrap();
    assert_eq!(engine.verbindungs_anzahl(), 3);

    engine.verbindung_abmelden(&b, &conn);
    assert_eq!(engine.verbindungs_anzahl(), 2);
}

#[tokio::test]
async fn ueberlaufende_punktekorrektur_laesst_raum_intakt() {
    let engine = engine();
    let code = raum(&engine, "A1B2");
    let team = engine.team_beitreten(&code, "Rot").unwrap().team_id;
    let (_, mut rx) = engine.verbindung_registrieren(&code, Rolle::Host, None).unwrap();
    abholen(&mut rx);

    let fehler = engine.punkte_anpassen(&code, team, i64::MAX).unwrap_err();
    assert_eq!(fehler.code(), "InvalidInput");
    assert!(abholen(&mut rx).is_empty());

    // Der Raum arbeitet danach normal weiter
    assert_eq!(engine.punkte_anpassen(&code, team, 5).unwrap(), 5);
    assert_eq!(engine.team_stand(&code, team).unwrap().score, 5);
}
