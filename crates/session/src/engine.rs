//! Session-Engine – Registry aller Raeume
//!
//! Die Engine ist die einzige Stelle, die Raum-Zustand veraendert. Jeder Raum
//! hat einen eigenen `RwLock`; die Registry (`DashMap`) wird nur fuer
//! Einfuegen und Nachschlagen benutzt. Unabhaengige Raeume laufen dadurch
//! parallel, Operationen auf einem Raum werden in Ankunftsreihenfolge am
//! Raum-Lock linearisiert.
//!
//! Unter dem Raum-Lock wird nie auf I/O gewartet: Nachrichten werden per
//! `try_send` in die Queues der Verbindungen gelegt, Registry-Aufrufe laufen
//! erst nach dem Freigeben des Locks.

use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;
use quizhub_core::{ConnectionId, Fehlerkategorie, QuizEvent, RoomCode, TeamId};
use quizhub_db::ButtonRepository;
use tokio::sync::broadcast;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{SitzungsKonfig, EVENT_KANAL_KAPAZITAET, TEAM_NAME_MAX_LAENGE};
use crate::error::{SessionError, SessionResult};
use crate::hub::{Rolle, Verbindung, VerbindungsEmpfaenger};
use crate::messages::{FrageSnapshot, LedgerEintrag, RaumSnapshot, ServerMessage, TeamStand};
use crate::room::{FrageParameter, Room};

// ---------------------------------------------------------------------------
// RaumHandle
// ---------------------------------------------------------------------------

/// Eintrag in der Registry: ein Raum hinter seinem eigenen Lock
#[derive(Debug)]
pub struct RaumHandle {
    pub code: RoomCode,
    zustand: RwLock<Room>,
}

impl RaumHandle {
    fn neu(code: RoomCode, queue_groesse: usize) -> Self {
        Self {
            zustand: RwLock::new(Room::neu(code.clone(), queue_groesse)),
            code,
        }
    }
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen unter dem Raum-Lock
// ---------------------------------------------------------------------------

fn melden(events: &broadcast::Sender<QuizEvent>, event: QuizEvent) {
    // Ohne Abonnenten schlaegt send fehl, das ist kein Fehler
    let _ = events.send(event);
}

fn verworfene_melden(
    code: &RoomCode,
    getrennt: Vec<Verbindung>,
    events: &broadcast::Sender<QuizEvent>,
) {
    for v in getrennt {
        warn!(
            room = %code,
            conn = %v.id,
            rolle = %v.rolle,
            "Verbindung wegen voller oder geschlossener Send-Queue getrennt"
        );
        melden(
            events,
            QuizEvent::VerbindungGetrennt {
                room: code.clone(),
                verworfen: true,
            },
        );
    }
}

/// Sendet an alle Verbindungen des Raums und meldet getrennte Verbindungen
fn rundsenden(room: &mut Room, nachricht: ServerMessage, events: &broadcast::Sender<QuizEvent>) {
    let getrennt = room.an_alle_senden(nachricht);
    verworfene_melden(&room.code, getrennt, events);
}

/// Schliesst die offene Frage und sendet Ledger und Punktestand
///
/// Gibt `false` zurueck wenn keine (passende) Frage offen war.
fn frage_schliessen_und_senden(
    room: &mut Room,
    generation: Option<u64>,
    automatisch: bool,
    events: &broadcast::Sender<QuizEvent>,
) -> bool {
    let Some(frage) = room.frage_schliessen(generation) else {
        return false;
    };
    let generation = frage.generation;
    let slide_id = frage.slide_id.clone();
    let ledger = frage.ledger.clone();
    let antworten = ledger.len();
    let scores = room.punktestand();

    rundsenden(
        room,
        ServerMessage::QuestionClosed {
            generation,
            slide_id,
            automatic: automatisch,
            ledger,
            scores,
        },
        events,
    );
    info!(room = %room.code, generation, antworten, automatisch, "Frage geschlossen");
    melden(
        events,
        QuizEvent::FrageGeschlossen {
            room: room.code.clone(),
            generation,
            antworten,
            automatisch,
        },
    );
    true
}

// ---------------------------------------------------------------------------
// SessionEngine
// ---------------------------------------------------------------------------

/// Prozessweite Registry der Raeume
///
/// Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct SessionEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    raeume: DashMap<RoomCode, Arc<RaumHandle>>,
    konfig: SitzungsKonfig,
    events: broadcast::Sender<QuizEvent>,
    /// Registry fuer das Loesen von Button-Zuordnungen beim Entfernen von Teams
    buttons: Option<Arc<dyn ButtonRepository>>,
}

impl SessionEngine {
    /// Erstellt eine neue Engine
    pub fn neu(konfig: SitzungsKonfig, buttons: Option<Arc<dyn ButtonRepository>>) -> Self {
        let (events, _) = broadcast::channel(EVENT_KANAL_KAPAZITAET);
        Self {
            inner: Arc::new(EngineInner {
                raeume: DashMap::new(),
                konfig,
                events,
                buttons,
            }),
        }
    }

    pub fn konfig(&self) -> &SitzungsKonfig {
        &self.inner.konfig
    }

    /// Abonniert den Event-Strom der Engine
    pub fn events_abonnieren(&self) -> broadcast::Receiver<QuizEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn melden(&self, event: QuizEvent) {
        melden(&self.inner.events, event);
    }

    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    /// Liefert den Raum zum Code und legt ihn bei Bedarf an
    ///
    /// Auch bei gleichzeitigen Aufrufen existiert pro Code hoechstens ein Raum.
    pub fn raum_erstellen_oder_holen(&self, code: &RoomCode) -> Arc<RaumHandle> {
        loop {
            let mut angelegt = false;
            let handle = {
                let eintrag = self.inner.raeume.entry(code.clone()).or_insert_with(|| {
                    angelegt = true;
                    Arc::new(RaumHandle::neu(
                        code.clone(),
                        self.inner.konfig.send_queue_groesse,
                    ))
                });
                Arc::clone(eintrag.value())
            };

            if angelegt {
                info!(room = %code, "Raum erstellt");
                self.melden(QuizEvent::RaumErstellt { room: code.clone() });
                return handle;
            }

            // Ein gerade abgebauter Raum kann noch kurz in der Map stehen
            if !handle.zustand.read().geschlossen {
                return handle;
            }
            self.inner
                .raeume
                .remove_if(code, |_, h| Arc::ptr_eq(h, &handle));
        }
    }

    /// Schlaegt einen Raum nach
    pub fn raum(&self, code: &RoomCode) -> SessionResult<Arc<RaumHandle>> {
        self.inner
            .raeume
            .get(code)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| SessionError::RaumNichtGefunden(code.clone()))
    }

    pub fn raum_existiert(&self, code: &RoomCode) -> bool {
        self.inner.raeume.contains_key(code)
    }

    pub fn raum_anzahl(&self) -> usize {
        self.inner.raeume.len()
    }

    /// Registrierte Verbindungen ueber alle Raeume
    pub fn verbindungs_anzahl(&self) -> usize {
        // Handles zuerst einsammeln, Raum-Locks nie unter einem Shard-Guard
        let handles: Vec<Arc<RaumHandle>> =
            self.inner.raeume.iter().map(|e| e.value().clone()).collect();
        handles.iter().map(|h| h.zustand.read().hub.anzahl()).sum()
    }

    /// Alle Raum-Codes, sortiert
    pub fn raum_codes(&self) -> Vec<RoomCode> {
        let mut codes: Vec<RoomCode> = self.inner.raeume.iter().map(|e| e.key().clone()).collect();
        codes.sort();
        codes
    }

    /// Lesender Zugriff auf einen Raum
    fn mit_raum<T>(
        &self,
        code: &RoomCode,
        f: impl FnOnce(&Room) -> SessionResult<T>,
    ) -> SessionResult<T> {
        let handle = self.raum(code)?;
        let room = handle.zustand.read();
        if room.geschlossen {
            return Err(SessionError::RaumNichtGefunden(code.clone()));
        }
        f(&room)
    }

    /// Schreibender Zugriff auf einen Raum
    ///
    /// Meldet `f` eine verletzte Invariante, wird der Raum verworfen.
    fn mit_raum_mut<T>(
        &self,
        code: &RoomCode,
        f: impl FnOnce(&mut Room) -> SessionResult<T>,
    ) -> SessionResult<T> {
        let handle = self.raum(code)?;
        let ergebnis = {
            let mut room = handle.zustand.write();
            if room.geschlossen {
                return Err(SessionError::RaumNichtGefunden(code.clone()));
            }
            f(&mut room)
        };

        if let Err(e) = &ergebnis {
            if e.kategorie() == Fehlerkategorie::Fatal {
                error!(room = %code, fehler = %e, "Interne Invariante verletzt – Raum wird verworfen");
                self.inner
                    .raeume
                    .remove_if(code, |_, h| Arc::ptr_eq(h, &handle));
                self.raum_abbauen(&handle, false);
            }
        }
        ergebnis
    }

    // -----------------------------------------------------------------------
    // Teams
    // -----------------------------------------------------------------------

    /// Legt ein Team mit Punktestand 0 an
    pub fn team_beitreten(&self, code: &RoomCode, name: &str) -> SessionResult<TeamStand> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::ungueltig("Team-Name darf nicht leer sein"));
        }
        if name.chars().count() > TEAM_NAME_MAX_LAENGE {
            return Err(SessionError::ungueltig(format!(
                "Team-Name laenger als {TEAM_NAME_MAX_LAENGE} Zeichen"
            )));
        }

        let events = &self.inner.events;
        self.mit_raum_mut(code, |room| {
            let id = room.team_hinzufuegen(name.to_string()).id;
            let stand = room.team_stand(id)?;
            room.beruehren();
            rundsenden(room, ServerMessage::TeamJoined { team: stand.clone() }, events);
            info!(room = %code, team_id = %id, name, "Team beigetreten");
            Ok(stand)
        })
    }

    /// Stand eines aktiven Teams
    pub fn team_stand(&self, code: &RoomCode, team_id: TeamId) -> SessionResult<TeamStand> {
        self.mit_raum(code, |room| room.team_stand(team_id))
    }

    /// Entfernt ein Team (weich: Punktestand bleibt, Team wird inaktiv)
    ///
    /// Trennt die Verbindung des Teams und loest alle Buttons, die in der
    /// Registry auf dieses Team zeigen.
    pub async fn team_entfernen(&self, code: &RoomCode, team_id: TeamId) -> SessionResult<()> {
        let events = &self.inner.events;
        let getrennt = self.mit_raum_mut(code, |room| {
            let verbindung = room.team_deaktivieren(team_id)?;
            room.beruehren();
            rundsenden(room, ServerMessage::TeamRemoved { team_id }, events);
            Ok(verbindung)
        })?;

        info!(room = %code, team_id = %team_id, "Team entfernt");
        if getrennt.is_some() {
            self.melden(QuizEvent::VerbindungGetrennt {
                room: code.clone(),
                verworfen: false,
            });
        }

        if let Some(buttons) = &self.inner.buttons {
            match buttons.team_zuordnungen_aufheben(code, team_id).await {
                Ok(anzahl) => {
                    debug!(room = %code, team_id = %team_id, anzahl, "Button-Zuordnungen geloest")
                }
                Err(e) => {
                    warn!(room = %code, team_id = %team_id, fehler = %e, "Button-Zuordnungen konnten nicht geloest werden")
                }
            }
        }
        Ok(())
    }

    /// Vermerkt einen zugeordneten Button am Team
    pub fn button_binden(&self, code: &RoomCode, team_id: TeamId, mac: &str) -> SessionResult<TeamStand> {
        self.mit_raum_mut(code, |room| {
            room.team(team_id)?;
            // Ein Button gehoert hoechstens einem Team
            for team in room.teams.iter_mut() {
                if team.bound_button.as_deref() == Some(mac) {
                    team.bound_button = None;
                }
            }
            room.team_mut(team_id)?.bound_button = Some(mac.to_string());
            room.team_stand(team_id)
        })
    }

    /// Entfernt einen Button von allen Teams des Raums
    pub fn button_loesen(&self, code: &RoomCode, mac: &str) -> SessionResult<()> {
        self.mit_raum_mut(code, |room| {
            for team in room.teams.iter_mut() {
                if team.bound_button.as_deref() == Some(mac) {
                    team.bound_button = None;
                }
            }
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Fragen
    // -----------------------------------------------------------------------

    /// Oeffnet eine neue Frage und plant das automatische Schliessen
    pub fn frage_oeffnen(&self, code: &RoomCode, param: FrageParameter) -> SessionResult<FrageSnapshot> {
        param.pruefen()?;
        let handle = self.raum(code)?;
        let mut room = handle.zustand.write();
        if room.geschlossen {
            return Err(SessionError::RaumNichtGefunden(code.clone()));
        }

        let frage = room.frage_oeffnen(param, Instant::now());
        let snapshot = frage.snapshot();
        let frist = frage.frist;

        if let Some(alt) = room.timer.take() {
            alt.abort();
        }
        room.timer = Some(self.timer_planen(Arc::downgrade(&handle), snapshot.generation, frist));

        rundsenden(
            &mut room,
            ServerMessage::QuestionOpened {
                generation: snapshot.generation,
                slide_id: snapshot.slide_id.clone(),
                opens_at: snapshot.opens_at,
                closes_at: snapshot.closes_at,
                time_limit_seconds: snapshot.time_limit_seconds,
                points_correct: snapshot.points_correct,
                points_wrong: snapshot.points_wrong,
            },
            &self.inner.events,
        );

        info!(
            room = %code,
            generation = snapshot.generation,
            slide_id = %snapshot.slide_id,
            zeitlimit = snapshot.time_limit_seconds,
            "Frage geoeffnet"
        );
        self.melden(QuizEvent::FrageGeoeffnet {
            room: code.clone(),
            generation: snapshot.generation,
        });
        Ok(snapshot)
    }

    /// Plant das automatische Schliessen einer Frage
    ///
    /// Der Task haelt nur eine schwache Referenz auf den Raum und prueft die
    /// Generation; ein veralteter Timer aendert nichts.
    fn timer_planen(&self, raum: Weak<RaumHandle>, generation: u64, frist: Instant) -> AbortHandle {
        let events = self.inner.events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(frist).await;
            let Some(raum) = raum.upgrade() else {
                return;
            };
            let mut room = raum.zustand.write();
            if room.geschlossen {
                return;
            }
            if !frage_schliessen_und_senden(&mut room, Some(generation), true, &events) {
                debug!(room = %raum.code, generation, "Veralteter Timer ignoriert");
            }
        });
        task.abort_handle()
    }

    /// Schliesst die offene Frage (idempotent)
    ///
    /// Gibt `true` zurueck wenn dadurch eine Frage geschlossen wurde.
    pub fn frage_schliessen(&self, code: &RoomCode) -> SessionResult<bool> {
        let events = &self.inner.events;
        self.mit_raum_mut(code, |room| {
            Ok(frage_schliessen_und_senden(room, None, false, events))
        })
    }

    /// Nimmt die Antwort eines Teams auf die offene Frage an
    ///
    /// Erreicht die Antwort den Raum nach Ablauf der Frist, wird die Frage
    /// hier geschlossen, falls der Timer noch nicht gelaufen ist.
    pub fn antwort_einreichen(&self, code: &RoomCode, team_id: TeamId) -> SessionResult<LedgerEintrag> {
        let events = &self.inner.events;
        let ergebnis = self.mit_raum_mut(code, |room| {
            let jetzt = Instant::now();
            if room.frist_abgelaufen(jetzt) {
                frage_schliessen_und_senden(room, None, true, events);
            }

            let eintrag = room.antwort_einreichen(team_id, jetzt)?;
            let team_name = room.team(team_id)?.name.clone();
            rundsenden(
                room,
                ServerMessage::PressAccepted {
                    team_id,
                    team_name,
                    rank: eintrag.rank,
                    submitted_at: eintrag.submitted_at,
                },
                events,
            );
            Ok(eintrag)
        });

        match &ergebnis {
            Ok(eintrag) => {
                debug!(room = %code, team_id = %team_id, rang = eintrag.rank, "Antwort angenommen");
                self.melden(QuizEvent::AntwortAngenommen {
                    room: code.clone(),
                    team_id,
                    rang: eintrag.rank,
                });
            }
            Err(e) => {
                debug!(room = %code, team_id = %team_id, grund = e.code(), "Antwort abgelehnt");
                self.melden(QuizEvent::AntwortAbgelehnt {
                    room: code.clone(),
                    grund: e.code().to_string(),
                });
            }
        }
        ergebnis
    }

    /// Bewertet die Antwort eines Teams auf der geschlossenen Frage
    ///
    /// Richtig addiert `points_correct`, falsch zieht `points_wrong` ab.
    /// Gibt den neuen Punktestand zurueck.
    pub fn antwort_bewerten(&self, code: &RoomCode, team_id: TeamId, korrekt: bool) -> SessionResult<i64> {
        let events = &self.inner.events;
        self.mit_raum_mut(code, |room| {
            let (delta, score) = room.antwort_bewerten(team_id, korrekt)?;
            let scores = room.punktestand();
            rundsenden(
                room,
                ServerMessage::ScoreUpdate {
                    team_id,
                    delta,
                    score,
                    scores,
                },
                events,
            );
            info!(room = %code, team_id = %team_id, korrekt, delta, score, "Antwort bewertet");
            Ok(score)
        })
    }

    /// Korrigiert den Punktestand eines Teams
    pub fn punkte_anpassen(&self, code: &RoomCode, team_id: TeamId, delta: i64) -> SessionResult<i64> {
        let events = &self.inner.events;
        self.mit_raum_mut(code, |room| {
            let score = room.punkte_anpassen(team_id, delta)?;
            let scores = room.punktestand();
            rundsenden(
                room,
                ServerMessage::ScoreUpdate {
                    team_id,
                    delta,
                    score,
                    scores,
                },
                events,
            );
            info!(room = %code, team_id = %team_id, delta, score, "Punktestand angepasst");
            Ok(score)
        })
    }

    /// Lesbare Momentaufnahme eines Raums
    pub fn snapshot(&self, code: &RoomCode) -> SessionResult<RaumSnapshot> {
        self.mit_raum(code, |room| Ok(room.snapshot()))
    }

    // -----------------------------------------------------------------------
    // Verbindungen
    // -----------------------------------------------------------------------

    /// Registriert eine Verbindung und sendet ihr zuerst den Raum-Snapshot
    ///
    /// Mit `team` wird die Verbindung sofort an das Team gebunden; eine
    /// vorherige Verbindung des Teams wird dabei getrennt.
    pub fn verbindung_registrieren(
        &self,
        code: &RoomCode,
        rolle: Rolle,
        team: Option<TeamId>,
    ) -> SessionResult<(ConnectionId, VerbindungsEmpfaenger)> {
        if team.is_some() && rolle != Rolle::Team {
            return Err(SessionError::ungueltig(format!(
                "Rolle {rolle} kann nicht an ein Team gebunden werden"
            )));
        }

        let events = &self.inner.events;
        let (id, rx, ersetzt) = self.mit_raum_mut(code, |room| {
            if let Some(team_id) = team {
                room.team(team_id)?;
            }
            let (id, rx) = room.hub.registrieren(rolle, None);
            let ersetzt = match team {
                Some(team_id) => room.verbindung_binden(id, team_id)?,
                None => None,
            };
            room.beruehren();

            let snapshot = room.snapshot();
            if let Some(v) = room.an_verbindung_senden(&id, ServerMessage::RoomSnapshot { snapshot }) {
                verworfene_melden(code, vec![v], events);
            }
            Ok((id, rx, ersetzt))
        })?;

        info!(room = %code, conn = %id, rolle = %rolle, team = ?team, "Verbindung registriert");
        self.melden(QuizEvent::VerbindungRegistriert { room: code.clone() });
        if let Some(alt) = ersetzt {
            debug!(room = %code, conn = %alt.id, "Vorherige Team-Verbindung ersetzt");
            self.melden(QuizEvent::VerbindungGetrennt {
                room: code.clone(),
                verworfen: false,
            });
        }
        Ok((id, rx))
    }

    /// Bindet eine bereits registrierte Verbindung an ein Team
    pub fn verbindung_an_team_binden(
        &self,
        code: &RoomCode,
        conn: ConnectionId,
        team_id: TeamId,
    ) -> SessionResult<()> {
        let ersetzt = self.mit_raum_mut(code, |room| room.verbindung_binden(conn, team_id))?;
        if let Some(alt) = ersetzt {
            debug!(room = %code, conn = %alt.id, "Vorherige Team-Verbindung ersetzt");
            self.melden(QuizEvent::VerbindungGetrennt {
                room: code.clone(),
                verworfen: false,
            });
        }
        Ok(())
    }

    /// Meldet eine Verbindung ab (idempotent)
    ///
    /// Das Team der Verbindung bleibt mit Punktestand erhalten.
    pub fn verbindung_abmelden(&self, code: &RoomCode, conn: &ConnectionId) -> bool {
        let entfernt = self
            .mit_raum_mut(code, |room| {
                let entfernt = room.verbindung_abmelden(conn).is_some();
                if entfernt {
                    room.beruehren();
                }
                Ok(entfernt)
            })
            .unwrap_or(false);

        if entfernt {
            info!(room = %code, conn = %conn, "Verbindung abgemeldet");
            self.melden(QuizEvent::VerbindungGetrennt {
                room: code.clone(),
                verworfen: false,
            });
        }
        entfernt
    }

    /// Sendet eine Nachricht an alle Verbindungen eines Raums
    pub fn an_raum_senden(&self, code: &RoomCode, nachricht: ServerMessage) -> SessionResult<()> {
        let events = &self.inner.events;
        self.mit_raum_mut(code, |room| {
            rundsenden(room, nachricht, events);
            Ok(())
        })
    }

    /// Sendet eine Nachricht an eine einzelne Verbindung
    pub fn an_verbindung_senden(
        &self,
        code: &RoomCode,
        conn: &ConnectionId,
        nachricht: ServerMessage,
    ) -> bool {
        let events = &self.inner.events;
        self.mit_raum_mut(code, |room| {
            match room.an_verbindung_senden(conn, nachricht) {
                Some(v) => {
                    verworfene_melden(code, vec![v], events);
                    Ok(false)
                }
                None => Ok(room.hub.get(conn).is_some()),
            }
        })
        .unwrap_or(false)
    }

    // -----------------------------------------------------------------------
    // Abbau
    // -----------------------------------------------------------------------

    /// Schliesst einen Raum explizit
    pub fn raum_schliessen(&self, code: &RoomCode) -> SessionResult<()> {
        let (_, handle) = self
            .inner
            .raeume
            .remove(code)
            .ok_or_else(|| SessionError::RaumNichtGefunden(code.clone()))?;
        self.raum_abbauen(&handle, false);
        Ok(())
    }

    /// Markiert den Raum als geschlossen, sendet room-closed und trennt alle
    fn raum_abbauen(&self, handle: &RaumHandle, leerlauf: bool) {
        let mut room = handle.zustand.write();
        if room.geschlossen {
            return;
        }
        room.geschlossen = true;
        if let Some(timer) = room.timer.take() {
            timer.abort();
        }
        rundsenden(
            &mut room,
            ServerMessage::RoomClosed {
                room: handle.code.clone(),
            },
            &self.inner.events,
        );
        let getrennt = room.hub.alle_trennen();
        drop(room);

        info!(room = %handle.code, getrennt, leerlauf, "Raum geschlossen");
        for _ in 0..getrennt {
            self.melden(QuizEvent::VerbindungGetrennt {
                room: handle.code.clone(),
                verworfen: false,
            });
        }
        self.melden(QuizEvent::RaumEntfernt {
            room: handle.code.clone(),
            leerlauf,
        });
    }

    /// Entfernt Raeume ohne Verbindungen, die laenger als der Leerlauf-Timeout
    /// unbenutzt sind
    pub fn leerlauf_raeume_entfernen(&self) -> Vec<RoomCode> {
        let timeout = self.inner.konfig.leerlauf_timeout;
        let kandidaten: Vec<Arc<RaumHandle>> = self
            .inner
            .raeume
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect();

        let mut entfernt = Vec::new();
        for handle in kandidaten {
            {
                let room = handle.zustand.read();
                if room.geschlossen
                    || !room.hub.ist_leer()
                    || room.letzte_aktivitaet.elapsed() < timeout
                {
                    continue;
                }
            }
            let entfernt_aus_map = self
                .inner
                .raeume
                .remove_if(&handle.code, |_, h| Arc::ptr_eq(h, &handle))
                .is_some();
            if entfernt_aus_map {
                self.raum_abbauen(&handle, true);
                entfernt.push(handle.code.clone());
            }
        }
        entfernt
    }

    /// Startet den Hintergrund-Task, der leerlaufende Raeume entfernt
    pub fn leerlauf_reaper_starten(&self, intervall: Duration) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(intervall);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // Erster Tick kommt sofort
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let entfernt = engine.leerlauf_raeume_entfernen();
                if !entfernt.is_empty() {
                    info!(anzahl = entfernt.len(), "Leerlaufende Raeume entfernt");
                }
            }
        })
    }
}
