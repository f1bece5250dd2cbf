//! Raum-Modell: Teams, Frage-Zustandsmaschine und Antwort-Ledger
//!
//! Alle Methoden hier sind synchron und setzen voraus, dass der Aufrufer den
//! Lock des Raums haelt. Broadcasts, Timer und Events erledigt die Engine.
//!
//! ```text
//! Inactive --oeffnen--> Open --schliessen | Timer--> Closed --oeffnen--> Open
//! ```

use chrono::{DateTime, Utc};
use quizhub_core::{ConnectionId, RoomCode, TeamId};
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::config::PUNKTE_MAX;
use crate::error::{SessionError, SessionResult};
use crate::hub::{Verbindung, VerbindungsHub};
use crate::messages::{
    FrageSnapshot, FragenStatus, LedgerEintrag, RaumSnapshot, ServerMessage, TeamStand, Urteil,
};

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

/// Ein Team innerhalb eines Raums
#[derive(Debug, Clone)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub score: i64,
    /// MAC des zugeordneten Buttons (schwache Referenz in die Registry)
    pub bound_button: Option<String>,
    pub current_connection: Option<ConnectionId>,
    /// `false` nach dem Entfernen; der Punktestand bleibt erhalten
    pub active: bool,
}

impl Team {
    fn stand(&self) -> TeamStand {
        TeamStand {
            team_id: self.id,
            name: self.name.clone(),
            score: self.score,
            active: self.active,
            connected: self.current_connection.is_some(),
            bound_button: self.bound_button.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Frage
// ---------------------------------------------------------------------------

/// Parameter zum Oeffnen einer Frage
#[derive(Debug, Clone)]
pub struct FrageParameter {
    pub slide_id: String,
    pub time_limit_seconds: u32,
    pub points_correct: i64,
    pub points_wrong: i64,
}

impl FrageParameter {
    pub fn pruefen(&self) -> SessionResult<()> {
        if self.slide_id.trim().is_empty() {
            return Err(SessionError::ungueltig("slide_id darf nicht leer sein"));
        }
        if self.time_limit_seconds == 0 {
            return Err(SessionError::ungueltig("Zeitlimit muss groesser als 0 sein"));
        }
        if self.points_correct < 0 || self.points_wrong < 0 {
            return Err(SessionError::ungueltig("Punkte duerfen nicht negativ sein"));
        }
        if self.points_correct > PUNKTE_MAX || self.points_wrong > PUNKTE_MAX {
            return Err(SessionError::ungueltig(format!(
                "Punkte duerfen hoechstens {PUNKTE_MAX} betragen"
            )));
        }
        Ok(())
    }
}

/// Zustand einer einzelnen Frage
///
/// Wird beim naechsten Oeffnen ersetzt, nie in eine neue Frage umgebaut.
#[derive(Debug, Clone)]
pub struct QuestionState {
    pub generation: u64,
    pub slide_id: String,
    pub status: FragenStatus,
    pub opens_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
    /// Monotone Frist fuer die Annahme-Entscheidung
    pub frist: Instant,
    pub time_limit_seconds: u32,
    pub points_correct: i64,
    pub points_wrong: i64,
    /// Nach Annahme-Reihenfolge sortiert, Rang = Index + 1
    pub ledger: Vec<LedgerEintrag>,
}

impl QuestionState {
    pub fn snapshot(&self) -> FrageSnapshot {
        FrageSnapshot {
            generation: self.generation,
            slide_id: self.slide_id.clone(),
            status: self.status,
            opens_at: self.opens_at,
            closes_at: self.closes_at,
            time_limit_seconds: self.time_limit_seconds,
            points_correct: self.points_correct,
            points_wrong: self.points_wrong,
            ledger: self.ledger.clone(),
        }
    }

    fn ist_offen(&self, jetzt: Instant) -> bool {
        self.status == FragenStatus::Open && jetzt < self.frist
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// Ein Quiz-Raum
#[derive(Debug)]
pub struct Room {
    pub code: RoomCode,
    pub created_at: DateTime<Utc>,
    pub letzte_aktivitaet: Instant,
    /// Teams in Beitrittsreihenfolge
    pub teams: Vec<Team>,
    pub frage: Option<QuestionState>,
    pub hub: VerbindungsHub,
    /// Gesetzt sobald der Raum aus der Registry entfernt wurde
    pub geschlossen: bool,
    pub(crate) timer: Option<AbortHandle>,
    letzte_generation: u64,
}

impl Room {
    pub fn neu(code: RoomCode, queue_groesse: usize) -> Self {
        Self {
            code,
            created_at: Utc::now(),
            letzte_aktivitaet: Instant::now(),
            teams: Vec::new(),
            frage: None,
            hub: VerbindungsHub::neu(queue_groesse),
            geschlossen: false,
            timer: None,
            letzte_generation: 0,
        }
    }

    pub fn beruehren(&mut self) {
        self.letzte_aktivitaet = Instant::now();
    }

    pub fn fragen_status(&self) -> FragenStatus {
        self.frage
            .as_ref()
            .map(|f| f.status)
            .unwrap_or(FragenStatus::Inactive)
    }

    // --- Teams ---

    /// Legt ein neues Team mit Punktestand 0 an
    pub fn team_hinzufuegen(&mut self, name: String) -> &Team {
        // TeamIds sind UUIDs, eine Kollision wird trotzdem ausgeschlossen
        let mut id = TeamId::new();
        while self.teams.iter().any(|t| t.id == id) {
            id = TeamId::new();
        }
        self.teams.push(Team {
            id,
            name,
            score: 0,
            bound_button: None,
            current_connection: None,
            active: true,
        });
        &self.teams[self.teams.len() - 1]
    }

    /// Aktives Team nachschlagen
    pub fn team(&self, id: TeamId) -> SessionResult<&Team> {
        self.teams
            .iter()
            .find(|t| t.id == id && t.active)
            .ok_or(SessionError::TeamNichtGefunden(id))
    }

    pub fn team_mut(&mut self, id: TeamId) -> SessionResult<&mut Team> {
        self.teams
            .iter_mut()
            .find(|t| t.id == id && t.active)
            .ok_or(SessionError::TeamNichtGefunden(id))
    }

    pub fn punktestand(&self) -> Vec<TeamStand> {
        self.teams.iter().map(Team::stand).collect()
    }

    pub fn team_stand(&self, id: TeamId) -> SessionResult<TeamStand> {
        self.team(id).map(Team::stand)
    }

    /// Markiert ein Team als entfernt und trennt seine Verbindung
    pub fn team_deaktivieren(&mut self, id: TeamId) -> SessionResult<Option<Verbindung>> {
        let team = self.team_mut(id)?;
        team.active = false;
        team.bound_button = None;
        let verbindung = team.current_connection.take();
        Ok(verbindung.and_then(|conn| self.hub.entfernen(&conn)))
    }

    // --- Verbindungen ---

    /// Bindet eine Verbindung an ein Team
    ///
    /// Eine bestehende Verbindung des Teams wird ersetzt und zurueckgegeben.
    pub fn verbindung_binden(
        &mut self,
        conn: ConnectionId,
        team_id: TeamId,
    ) -> SessionResult<Option<Verbindung>> {
        if self.hub.get(&conn).is_none() {
            return Err(SessionError::ungueltig(format!(
                "Verbindung {conn} ist nicht mehr registriert"
            )));
        }
        let team = self.team_mut(team_id)?;
        let alte = team.current_connection.replace(conn);
        self.hub.team_setzen(&conn, Some(team_id));
        Ok(alte
            .filter(|alt| *alt != conn)
            .and_then(|alt| self.hub.entfernen(&alt)))
    }

    /// Entfernt eine Verbindung und loest sie von ihrem Team (idempotent)
    pub fn verbindung_abmelden(&mut self, conn: &ConnectionId) -> Option<Verbindung> {
        let verbindung = self.hub.entfernen(conn)?;
        self.team_verbindung_loesen(&verbindung);
        Some(verbindung)
    }

    fn team_verbindung_loesen(&mut self, verbindung: &Verbindung) {
        if let Some(team_id) = verbindung.team {
            if let Some(team) = self.teams.iter_mut().find(|t| t.id == team_id) {
                if team.current_connection == Some(verbindung.id) {
                    team.current_connection = None;
                }
            }
        }
    }

    /// Sendet an alle Verbindungen und raeumt getrennte Verbindungen auf
    pub fn an_alle_senden(&mut self, nachricht: ServerMessage) -> Vec<Verbindung> {
        let getrennt = self.hub.an_alle_senden(nachricht);
        for v in &getrennt {
            self.team_verbindung_loesen(v);
        }
        getrennt
    }

    /// Sendet an eine Verbindung, gibt sie zurueck falls sie getrennt wurde
    pub fn an_verbindung_senden(
        &mut self,
        conn: &ConnectionId,
        nachricht: ServerMessage,
    ) -> Option<Verbindung> {
        match self.hub.an_verbindung_senden(conn, nachricht) {
            Ok(_) => None,
            Err(v) => {
                self.team_verbindung_loesen(&v);
                Some(v)
            }
        }
    }

    // --- Frage-Zustandsmaschine ---

    /// Ersetzt die aktuelle Frage durch eine neue offene Frage
    pub fn frage_oeffnen(&mut self, param: FrageParameter, jetzt: Instant) -> &QuestionState {
        self.letzte_generation += 1;
        let dauer = std::time::Duration::from_secs(u64::from(param.time_limit_seconds));
        let opens_at = Utc::now();
        let closes_at = opens_at
            + chrono::Duration::seconds(i64::from(param.time_limit_seconds));

        let frage = QuestionState {
            generation: self.letzte_generation,
            slide_id: param.slide_id,
            status: FragenStatus::Open,
            opens_at,
            closes_at,
            frist: jetzt + dauer,
            time_limit_seconds: param.time_limit_seconds,
            points_correct: param.points_correct,
            points_wrong: param.points_wrong,
            ledger: Vec::new(),
        };
        self.beruehren();
        self.frage.insert(frage)
    }

    /// Ob die offene Frage ihre Frist erreicht hat
    pub fn frist_abgelaufen(&self, jetzt: Instant) -> bool {
        self.frage
            .as_ref()
            .is_some_and(|f| f.status == FragenStatus::Open && jetzt >= f.frist)
    }

    /// Schliesst die offene Frage
    ///
    /// `generation` schraenkt auf eine bestimmte Frage ein (Timer). Gibt die
    /// geschlossene Frage zurueck oder `None` wenn nichts zu tun war.
    pub fn frage_schliessen(&mut self, generation: Option<u64>) -> Option<&QuestionState> {
        let frage = self.frage.as_mut()?;
        if frage.status != FragenStatus::Open {
            return None;
        }
        if generation.is_some_and(|g| g != frage.generation) {
            return None;
        }
        frage.status = FragenStatus::Closed;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.letzte_aktivitaet = Instant::now();
        self.frage.as_ref()
    }

    /// Nimmt die Antwort eines Teams an
    ///
    /// Reihenfolge der Pruefungen: Frage offen, Team bekannt, kein Duplikat.
    pub fn antwort_einreichen(&mut self, team_id: TeamId, jetzt: Instant) -> SessionResult<LedgerEintrag> {
        let offen = self.frage.as_ref().is_some_and(|f| f.ist_offen(jetzt));
        if !offen {
            return Err(SessionError::FrageNichtAktiv);
        }
        self.team(team_id)?;

        let frage = self
            .frage
            .as_mut()
            .ok_or(SessionError::FrageNichtAktiv)?;
        if frage.ledger.iter().any(|e| e.team_id == team_id) {
            return Err(SessionError::DoppelteAntwort);
        }

        let eintrag = LedgerEintrag {
            team_id,
            rank: frage.ledger.len() as u32 + 1,
            submitted_at: Utc::now(),
            accepted: true,
            verdict: None,
        };
        frage.ledger.push(eintrag.clone());
        self.letzte_aktivitaet = jetzt;
        Ok(eintrag)
    }

    /// Bewertet den Ledger-Eintrag eines Teams auf der geschlossenen Frage
    ///
    /// Gibt die Punktedifferenz und den neuen Punktestand zurueck.
    pub fn antwort_bewerten(&mut self, team_id: TeamId, korrekt: bool) -> SessionResult<(i64, i64)> {
        let frage = self.frage.as_mut().ok_or(SessionError::FrageNichtAktiv)?;
        match frage.status {
            FragenStatus::Open => return Err(SessionError::FrageNochOffen),
            FragenStatus::Inactive => return Err(SessionError::FrageNichtAktiv),
            FragenStatus::Closed => {}
        }

        let eintrag = frage
            .ledger
            .iter_mut()
            .find(|e| e.team_id == team_id)
            .ok_or(SessionError::KeinLedgerEintrag(team_id))?;
        if eintrag.verdict.is_some() {
            return Err(SessionError::BereitsBewertet(team_id));
        }

        let delta = if korrekt {
            frage.points_correct
        } else {
            -frage.points_wrong
        };

        // Entfernte Teams behalten ihren Punktestand und koennen weiter bewertet werden
        let team = self
            .teams
            .iter_mut()
            .find(|t| t.id == team_id)
            .ok_or_else(|| {
                SessionError::intern(format!(
                    "Ledger-Eintrag fuer unbekanntes Team {team_id} in Raum {}",
                    self.code
                ))
            })?;

        let score = punkte_addieren(team.score, delta)?;
        eintrag.verdict = Some(if korrekt { Urteil::Correct } else { Urteil::Wrong });
        team.score = score;
        self.letzte_aktivitaet = Instant::now();
        Ok((delta, score))
    }

    /// Korrigiert den Punktestand eines Teams manuell
    pub fn punkte_anpassen(&mut self, team_id: TeamId, delta: i64) -> SessionResult<i64> {
        if delta.unsigned_abs() > PUNKTE_MAX as u64 {
            return Err(SessionError::ungueltig(format!(
                "Punktekorrektur darf hoechstens {PUNKTE_MAX} betragen"
            )));
        }
        let team = self.team_mut(team_id)?;
        let score = punkte_addieren(team.score, delta)?;
        team.score = score;
        self.beruehren();
        Ok(score)
    }

    // --- Snapshot ---

    pub fn snapshot(&self) -> RaumSnapshot {
        RaumSnapshot {
            room: self.code.clone(),
            created_at: self.created_at,
            teams: self.punktestand(),
            question_status: self.fragen_status(),
            question: self.frage.as_ref().map(QuestionState::snapshot),
            connections: self.hub.anzahl(),
        }
    }
}

/// Punktestand ohne Ueberlauf fortschreiben
fn punkte_addieren(score: i64, delta: i64) -> SessionResult<i64> {
    score
        .checked_add(delta)
        .ok_or_else(|| SessionError::ungueltig("Punktestand ausserhalb des gueltigen Bereichs"))
}
